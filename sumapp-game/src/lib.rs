//! Sumapp Game Engine
//!
//! Platform-agnostic core logic for the sumapp arithmetic practice game:
//! the fact universe, adaptive question selection, the level table, and
//! learner history. This crate has no UI or platform-specific dependencies;
//! persistence and time are injected through [`DocumentStore`] and [`Clock`].

pub mod analytics;
pub mod clock;
pub mod constants;
pub mod document;
pub mod error;
pub mod levels;
pub mod numbers;
pub mod play;
pub mod problems;
pub mod profiles;
pub mod records;
pub mod selector;
pub mod stats;
pub mod timer;

// Re-export commonly used types
pub use analytics::{
    AccuracyBucket, AccuracyEvolution, Dashboard, ErrorMatrix, ProblemRow, ProfileDetail,
    ProfileSummary, RecordSpan, accuracy_evolution, dashboard, error_matrix, learner_summaries,
    profile_detail, profile_summary,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use document::{DocumentStore, GameDocument, JsonFileStore, MemoryStore};
pub use error::{ErrorKind, GameError};
pub use levels::{
    LevelConfig, LevelConfigError, LevelPolicy, LevelResult, check_answer, check_symbol_answer,
};
pub use play::{AnswerFeedback, PlayRound, RoundEvent, RoundPhase};
pub use problems::{Operation, Problem, ProblemKey, all_problems, problem_key};
pub use profiles::{Profile, is_admin};
pub use records::{Quiz, Session};
pub use selector::{Question, WeightTable, number_questions, select_questions};
pub use stats::{ProblemStat, StatBook};
pub use timer::{Countdown, Deferred, Tick};

use chrono::{DateTime, Utc};
use rand::Rng;

/// Entry point the presentation layer talks to.
///
/// Every mutating call is a read-modify-write of the whole stored document:
/// load, change a private copy, save. If anything fails before the save the
/// stored document is left exactly as it was.
#[derive(Debug, Clone)]
pub struct GameEngine<S, C = SystemClock> {
    store: S,
    clock: C,
    policy: LevelPolicy,
}

impl<S: DocumentStore> GameEngine<S, SystemClock> {
    /// Engine on the wall clock with the reference level table.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: DocumentStore, C: Clock> GameEngine<S, C> {
    #[must_use]
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            policy: LevelPolicy::default(),
        }
    }

    /// Replace the level table.
    #[must_use]
    pub fn with_policy(mut self, policy: LevelPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> &LevelPolicy {
        &self.policy
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Current stored document, or an empty one if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored document cannot be read.
    pub fn document(&self) -> Result<GameDocument, GameError> {
        Ok(self.store.load()?.unwrap_or_default())
    }

    fn update<T>(
        &self,
        change: impl FnOnce(&mut GameDocument, DateTime<Utc>) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let mut document = self.document()?;
        let value = change(&mut document, self.clock.now())?;
        self.store.save(&document)?;
        Ok(value)
    }

    fn with_profile<T>(
        &self,
        name: &str,
        change: impl FnOnce(&mut Profile, DateTime<Utc>) -> T,
    ) -> Result<T, GameError> {
        self.update(|document, now| {
            let profile = document.profile_mut(name)?;
            Ok(change(profile, now))
        })
    }

    // Profile management -------------------------------------------------

    /// Create a profile and make it current.
    ///
    /// # Errors
    ///
    /// Validation errors for blank or taken names; storage errors.
    pub fn create(&self, name: &str) -> Result<Profile, GameError> {
        self.update(|document, now| document.create_profile(name, now).cloned())
    }

    /// Make an existing profile current.
    ///
    /// # Errors
    ///
    /// [`GameError::ProfileNotFound`] for unknown names; storage errors.
    pub fn select(&self, name: &str) -> Result<Profile, GameError> {
        self.update(|document, _| document.select_profile(name).cloned())
    }

    /// Delete a profile and its history. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub fn delete(&self, name: &str) -> Result<bool, GameError> {
        self.update(|document, _| Ok(document.delete_profile(name)))
    }

    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    pub fn get_current(&self) -> Result<Option<(String, Profile)>, GameError> {
        let document = self.document()?;
        Ok(document
            .current()
            .map(|(name, profile)| (name.to_string(), profile.clone())))
    }

    /// Every profile, administrative one included, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    pub fn get_all(&self) -> Result<Vec<(String, Profile)>, GameError> {
        let document = self.document()?;
        Ok(document
            .profiles()
            .map(|(name, profile)| (name.to_string(), profile.clone()))
            .collect())
    }

    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    pub fn profile(&self, name: &str) -> Result<Profile, GameError> {
        self.document()?
            .profile(name)
            .cloned()
            .ok_or_else(|| GameError::ProfileNotFound(name.to_string()))
    }

    /// # Errors
    ///
    /// [`GameError::ProfileNotFound`] for unknown names; storage errors.
    pub fn get_stats(&self, name: &str) -> Result<StatBook, GameError> {
        Ok(self.profile(name)?.stats)
    }

    /// Move a profile one level up after a passed quiz.
    ///
    /// # Errors
    ///
    /// [`GameError::LevelTransition`] unless `level` is the next configured
    /// level and the latest quiz was passed at the current one.
    pub fn update_level(&self, name: &str, level: u32) -> Result<u32, GameError> {
        let max_level = self.policy.max_level();
        self.update(|document, now| {
            document
                .profile_mut(name)?
                .advance_level(level, max_level, now)
        })
    }

    // Recorder -----------------------------------------------------------

    /// # Errors
    ///
    /// [`GameError::ProfileNotFound`] for unknown names; storage errors.
    pub fn start_session(&self, name: &str) -> Result<Session, GameError> {
        self.with_profile(name, Profile::start_session)
    }

    /// # Errors
    ///
    /// [`GameError::ProfileNotFound`] for unknown names; storage errors.
    pub fn end_session(&self, name: &str) -> Result<Option<Session>, GameError> {
        self.with_profile(name, Profile::end_session)
    }

    /// # Errors
    ///
    /// [`GameError::ProfileNotFound`] for unknown names; storage errors.
    pub fn start_quiz(&self, name: &str, level: u32) -> Result<Quiz, GameError> {
        self.with_profile(name, |profile, now| profile.start_quiz(level, now))
    }

    /// # Errors
    ///
    /// [`GameError::ProfileNotFound`] for unknown names; storage errors.
    pub fn end_quiz(
        &self,
        name: &str,
        passed: bool,
        correct_count: u32,
        total_questions: u32,
    ) -> Result<Option<Quiz>, GameError> {
        self.with_profile(name, |profile, now| {
            profile.end_quiz(passed, correct_count, total_questions, now)
        })
    }

    /// Record one answer. Persisted before returning.
    ///
    /// # Errors
    ///
    /// [`GameError::ProfileNotFound`] for unknown names; storage errors.
    pub fn update_stats(
        &self,
        name: &str,
        key: &ProblemKey,
        is_correct: bool,
    ) -> Result<ProblemStat, GameError> {
        self.with_profile(name, |profile, now| {
            profile.update_stats(key, is_correct, now)
        })
    }

    // Selection ----------------------------------------------------------

    /// Draw `count` facts for `name` at `level`.
    ///
    /// # Errors
    ///
    /// [`GameError::ProfileNotFound`] for unknown names; storage errors.
    pub fn select_questions<R: Rng>(
        &self,
        name: &str,
        level: u32,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Problem>, GameError> {
        let profile = self.profile(name)?;
        Ok(select_questions(profile.stats(), level, count, rng))
    }

    /// A full numbered quiz for `name` at `level`, sized by the level table.
    ///
    /// # Errors
    ///
    /// [`GameError::ProfileNotFound`] for unknown names; storage errors.
    pub fn generate_questions<R: Rng>(
        &self,
        name: &str,
        level: u32,
        rng: &mut R,
    ) -> Result<Vec<Question>, GameError> {
        let count = self.policy.level_config(level).questions_per_level;
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        let problems = self.select_questions(name, level, count, rng)?;
        Ok(number_questions(problems))
    }
}
