//! Session and quiz lifecycle for a single profile.
//!
//! A session is one continuous visit and a quiz one attempt at a level.
//! Only the most recent record of each kind can be open. Closing is
//! idempotent: closing when nothing is open changes nothing, so
//! out-of-order calls from the presentation layer cannot double-record.
use crate::problems::ProblemKey;
use crate::profiles::Profile;
use crate::stats::ProblemStat;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, alias = "quizzes")]
    pub quiz_ids: Vec<String>,
}

impl Session {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Elapsed time between start and end, `None` while open.
    #[must_use]
    pub fn duration(&self) -> Option<TimeDelta> {
        self.end_time.map(|end| end - self.start_time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub level: u32,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub correct_count: u32,
    #[serde(default)]
    pub total_questions: u32,
}

impl Quiz {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    #[must_use]
    pub fn duration(&self) -> Option<TimeDelta> {
        self.end_time.map(|end| end - self.start_time)
    }

    fn close(&mut self, passed: bool, correct_count: u32, total_questions: u32, now: DateTime<Utc>) {
        if correct_count > total_questions {
            log::warn!(
                "quiz {} closing with {correct_count} correct of {total_questions}; clamping",
                self.id
            );
        }
        self.end_time = Some(now);
        self.passed = passed;
        self.correct_count = correct_count.min(total_questions);
        self.total_questions = total_questions;
    }
}

fn record_id(now: DateTime<Utc>, ordinal: usize) -> String {
    format!("{}-{ordinal}", now.timestamp_millis())
}

impl Profile {
    /// The most recent session, if it is still open.
    #[must_use]
    pub fn open_session(&self) -> Option<&Session> {
        self.sessions.last().filter(|session| session.is_open())
    }

    /// The most recent quiz, if it is still open.
    #[must_use]
    pub fn open_quiz(&self) -> Option<&Quiz> {
        self.quizzes.last().filter(|quiz| quiz.is_open())
    }

    /// Open a session, or return the one already open.
    pub fn start_session(&mut self, now: DateTime<Utc>) -> Session {
        if let Some(open) = self.open_session() {
            log::debug!("session {} already open", open.id);
            return open.clone();
        }
        let session = Session {
            id: record_id(now, self.sessions.len() + 1),
            start_time: now,
            end_time: None,
            quiz_ids: Vec::new(),
        };
        log::debug!("session {} opened", session.id);
        self.sessions.push(session.clone());
        self.last_played = now;
        session
    }

    /// Close the open session. No-op (returns `None`) when none is open.
    pub fn end_session(&mut self, now: DateTime<Utc>) -> Option<Session> {
        let Some(session) = self.sessions.last_mut().filter(|s| s.is_open()) else {
            log::debug!("end_session ignored: no open session");
            return None;
        };
        session.end_time = Some(now);
        log::debug!("session {} closed", session.id);
        Some(session.clone())
    }

    /// Open a quiz at `level`, opening a session first if none is open.
    ///
    /// A quiz left open by an earlier attempt is closed as failed, keeping
    /// whatever outcome it had recorded, before the new one starts.
    pub fn start_quiz(&mut self, level: u32, now: DateTime<Utc>) -> Quiz {
        if let Some(stale) = self.quizzes.last_mut().filter(|q| q.is_open()) {
            log::warn!("quiz {} was still open; closing it as failed", stale.id);
            let (correct, total) = (stale.correct_count, stale.total_questions);
            stale.close(false, correct, total, now);
        }
        self.start_session(now);
        let quiz = Quiz {
            id: record_id(now, self.quizzes.len() + 1),
            level,
            start_time: now,
            end_time: None,
            passed: false,
            correct_count: 0,
            total_questions: 0,
        };
        if let Some(session) = self.sessions.last_mut() {
            session.quiz_ids.push(quiz.id.clone());
        }
        log::debug!("quiz {} opened at level {level}", quiz.id);
        self.quizzes.push(quiz.clone());
        self.last_played = now;
        quiz
    }

    /// Close the open quiz with its final outcome. No-op when none is open.
    pub fn end_quiz(
        &mut self,
        passed: bool,
        correct_count: u32,
        total_questions: u32,
        now: DateTime<Utc>,
    ) -> Option<Quiz> {
        let Some(quiz) = self.quizzes.last_mut().filter(|q| q.is_open()) else {
            log::debug!("end_quiz ignored: no open quiz");
            return None;
        };
        quiz.close(passed, correct_count, total_questions, now);
        log::debug!(
            "quiz {} closed: {}/{} passed={passed}",
            quiz.id,
            quiz.correct_count,
            quiz.total_questions
        );
        Some(quiz.clone())
    }

    /// Count one answer (or timeout) against `key`.
    pub fn update_stats(&mut self, key: &ProblemKey, is_correct: bool, now: DateTime<Utc>) -> ProblemStat {
        if key.problem().is_none() {
            log::warn!("recording stats for key outside the problem universe: {key}");
        }
        self.last_played = now;
        self.stats.record(key, is_correct)
    }
}
