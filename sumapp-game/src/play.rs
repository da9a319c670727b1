//! Headless game loop for one level attempt.
//!
//! A [`PlayRound`] draws the questions, opens the quiz, and then moves
//! through `Asking -> Feedback -> Asking ... -> Complete` as the caller
//! feeds it ticks, answers, and elapsed feedback time. Each answer or
//! timeout is persisted through the engine before the round moves on.
use crate::constants::FEEDBACK_DELAY_MS;
use crate::document::DocumentStore;
use crate::error::GameError;
use crate::levels::{LevelConfig, LevelResult, check_answer};
use crate::profiles::is_admin;
use crate::selector::{Question, number_questions};
use crate::timer::{Countdown, Deferred, Tick};
use crate::{Clock, GameEngine};
use rand::Rng;

/// Where the round currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Waiting for an answer to the current question.
    Asking,
    /// Showing the outcome of the last answer.
    Feedback(AnswerFeedback),
    /// All questions answered.
    Complete(LevelResult),
    /// Abandoned by the learner.
    Quit,
}

/// Outcome of a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub timed_out: bool,
    pub expected: i32,
}

/// What a fired feedback delay led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    NextQuestion(u32),
    LevelComplete(LevelResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Advance;

/// One attempt at one level for one learner.
#[derive(Debug)]
pub struct PlayRound<'a, S, C> {
    engine: &'a GameEngine<S, C>,
    profile: String,
    level: u32,
    config: LevelConfig,
    questions: Vec<Question>,
    index: usize,
    answered: u32,
    correct: u32,
    phase: RoundPhase,
    countdown: Option<Countdown>,
    pending: Option<Deferred<Advance>>,
}

impl<'a, S: DocumentStore, C: Clock> PlayRound<'a, S, C> {
    /// Draw questions at the profile's level, open a quiz, and start the
    /// clock on the first question.
    ///
    /// # Errors
    ///
    /// [`GameError::AdminProfile`] for the administrative profile,
    /// [`GameError::ProfileNotFound`] for unknown names, storage errors.
    pub fn start<R: Rng>(
        engine: &'a GameEngine<S, C>,
        profile: &str,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        if is_admin(profile) {
            return Err(GameError::AdminProfile(profile.to_string()));
        }
        let level = engine.profile(profile)?.level();
        // A level missing from the table keeps its number; only timing and size fall back.
        let config = engine.policy().level_config(level).clone();
        let questions = engine.generate_questions(profile, level, rng)?;
        engine.start_quiz(profile, level)?;
        log::debug!(
            "round started for {profile} at level {level} ({} questions)",
            questions.len()
        );
        let countdown = Countdown::start(config.time_limit_ticks());
        Ok(Self {
            engine,
            profile: profile.to_string(),
            level,
            config,
            questions,
            index: 0,
            answered: 0,
            correct: 0,
            phase: RoundPhase::Asking,
            countdown: Some(countdown),
            pending: None,
        })
    }

    #[must_use]
    pub const fn phase(&self) -> RoundPhase {
        self.phase
    }

    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// The question being asked or just answered.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            RoundPhase::Asking | RoundPhase::Feedback(_) => self.questions.get(self.index),
            RoundPhase::Complete(_) | RoundPhase::Quit => None,
        }
    }

    #[must_use]
    pub const fn correct_count(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub const fn answered_count(&self) -> u32 {
        self.answered
    }

    #[must_use]
    pub const fn countdown(&self) -> Option<&Countdown> {
        self.countdown.as_ref()
    }

    /// True while a feedback delay is waiting to fire.
    #[must_use]
    pub fn feedback_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(Deferred::is_pending)
    }

    /// Advance the question clock by one 100 ms step. When it runs out the
    /// question is recorded wrong and the round shows feedback.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout cannot be recorded.
    pub fn tick(&mut self) -> Result<Tick, GameError> {
        if self.phase != RoundPhase::Asking {
            return Ok(Tick::Inactive);
        }
        let Some(countdown) = self.countdown.as_mut() else {
            return Ok(Tick::Inactive);
        };
        let tick = countdown.tick();
        if tick == Tick::Expired {
            log::debug!("question {} timed out", self.index + 1);
            self.resolve(false, true)?;
        }
        Ok(tick)
    }

    /// Answer the current question. Ignored (`Ok(None)`) outside `Asking`.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be recorded.
    pub fn submit(&mut self, answer: i32) -> Result<Option<AnswerFeedback>, GameError> {
        if self.phase != RoundPhase::Asking {
            return Ok(None);
        }
        let Some(question) = self.questions.get(self.index) else {
            return Ok(None);
        };
        let problem = question.problem;
        let correct = check_answer(
            i32::from(problem.a),
            i32::from(problem.b),
            problem.operation,
            answer,
        );
        self.resolve(correct, false).map(Some)
    }

    fn resolve(&mut self, correct: bool, timed_out: bool) -> Result<AnswerFeedback, GameError> {
        if let Some(countdown) = self.countdown.as_mut() {
            countdown.cancel();
        }
        let question = &self.questions[self.index];
        let feedback = AnswerFeedback {
            correct,
            timed_out,
            expected: question.problem.answer(),
        };
        self.engine
            .update_stats(&self.profile, &question.key, correct)?;
        self.answered += 1;
        if correct {
            self.correct += 1;
        }
        self.phase = RoundPhase::Feedback(feedback);
        self.pending = Some(Deferred::schedule(Advance, FEEDBACK_DELAY_MS));
        Ok(feedback)
    }

    /// Let `elapsed_ms` of feedback time pass. Fires at most once per answer.
    ///
    /// # Errors
    ///
    /// Returns an error if completing the level cannot be recorded.
    pub fn advance(&mut self, elapsed_ms: u64) -> Result<Option<RoundEvent>, GameError> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(None);
        };
        if pending.advance(elapsed_ms).is_none() {
            return Ok(None);
        }
        self.pending = None;
        if self.index + 1 < self.questions.len() {
            self.index += 1;
            self.phase = RoundPhase::Asking;
            self.countdown = Some(Countdown::start(self.config.time_limit_ticks()));
            let number = self.questions[self.index].question_number;
            return Ok(Some(RoundEvent::NextQuestion(number)));
        }
        self.complete_level().map(|result| Some(RoundEvent::LevelComplete(result)))
    }

    fn complete_level(&mut self) -> Result<LevelResult, GameError> {
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        let policy = self.engine.policy();
        let result = policy.calculate_level_result(self.correct, total);
        self.engine
            .end_quiz(&self.profile, result.passed, result.correct_count, result.total_questions)?;
        if result.passed {
            let next = policy.next_level(self.level);
            if next > self.level {
                self.engine.update_level(&self.profile, next)?;
            }
            self.engine.end_session(&self.profile)?;
        }
        log::debug!(
            "round complete for {}: {}% passed={}",
            self.profile,
            result.percentage,
            result.passed
        );
        self.phase = RoundPhase::Complete(result);
        Ok(result)
    }

    /// Abandon the round: stop both timers, close the quiz as failed with
    /// the answers given so far, and close the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the closing records cannot be written.
    pub fn quit(&mut self) -> Result<(), GameError> {
        self.cancel_timers();
        if matches!(self.phase, RoundPhase::Complete(_) | RoundPhase::Quit) {
            return Ok(());
        }
        self.engine
            .end_quiz(&self.profile, false, self.correct, self.answered)?;
        self.engine.end_session(&self.profile)?;
        self.phase = RoundPhase::Quit;
        Ok(())
    }

    /// Stop the countdown and drop any pending feedback advance.
    pub fn cancel_timers(&mut self) {
        if let Some(countdown) = self.countdown.as_mut() {
            countdown.cancel();
        }
        if let Some(pending) = self.pending.as_mut() {
            pending.cancel();
        }
    }
}
