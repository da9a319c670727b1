//! Learner profiles and the current-profile pointer.
use crate::constants::ADMIN_PROFILE;
use crate::document::GameDocument;
use crate::error::GameError;
use crate::records::{Quiz, Session};
use crate::stats::StatBook;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A learner's persistent identity and history. The name is the key the
/// profile is stored under in [`GameDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default = "Profile::first_level")]
    pub(crate) level: u32,
    #[serde(default)]
    pub(crate) stats: StatBook,
    #[serde(default = "Profile::never")]
    pub(crate) last_played: DateTime<Utc>,
    #[serde(default)]
    pub(crate) sessions: Vec<Session>,
    #[serde(default)]
    pub(crate) quizzes: Vec<Quiz>,
}

impl Profile {
    const fn first_level() -> u32 {
        1
    }

    const fn never() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    /// Fresh profile at level 1 with no history.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            level: Self::first_level(),
            stats: StatBook::new(),
            last_played: now,
            sessions: Vec::new(),
            quizzes: Vec::new(),
        }
    }

    /// Highest unlocked level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub const fn stats(&self) -> &StatBook {
        &self.stats
    }

    #[must_use]
    pub const fn last_played(&self) -> DateTime<Utc> {
        self.last_played
    }

    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    #[must_use]
    pub fn quizzes(&self) -> &[Quiz] {
        &self.quizzes
    }

    /// Raise the unlocked level by one step.
    ///
    /// Only accepted when `to` is exactly one above the current level, does
    /// not exceed `max_level`, and the latest quiz is a closed pass at the
    /// current level. Re-applying the current level is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::LevelTransition`] for any other request.
    pub fn advance_level(
        &mut self,
        to: u32,
        max_level: u32,
        now: DateTime<Utc>,
    ) -> Result<u32, GameError> {
        if to == self.level {
            return Ok(self.level);
        }
        let earned = self
            .quizzes
            .last()
            .is_some_and(|quiz| !quiz.is_open() && quiz.passed && quiz.level == self.level);
        if self.level.checked_add(1) != Some(to) || to > max_level || !earned {
            return Err(GameError::LevelTransition {
                from: self.level,
                to,
            });
        }
        log::debug!("level advanced {} -> {to}", self.level);
        self.level = to;
        self.last_played = now;
        Ok(to)
    }
}

/// True when `name` is the reserved administrative identity.
#[must_use]
pub fn is_admin(name: &str) -> bool {
    name.eq_ignore_ascii_case(ADMIN_PROFILE)
}

fn normalize_name(name: &str) -> Result<&str, GameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(GameError::EmptyName);
    }
    Ok(trimmed)
}

impl GameDocument {
    /// Create a profile and make it current.
    ///
    /// Surrounding whitespace is stripped; identity is otherwise case-sensitive.
    ///
    /// # Errors
    ///
    /// [`GameError::EmptyName`] for blank input, [`GameError::DuplicateName`]
    /// when the name is taken. Nothing changes on error.
    pub fn create_profile(&mut self, name: &str, now: DateTime<Utc>) -> Result<&Profile, GameError> {
        let name = normalize_name(name)?;
        if self.profiles.contains_key(name) {
            return Err(GameError::DuplicateName(name.to_string()));
        }
        log::debug!("profile {name} created");
        self.current_profile = Some(name.to_string());
        Ok(&*self
            .profiles
            .entry(name.to_string())
            .or_insert_with(|| Profile::new(now)))
    }

    /// Make an existing profile current.
    ///
    /// # Errors
    ///
    /// [`GameError::ProfileNotFound`] when no such profile exists.
    pub fn select_profile(&mut self, name: &str) -> Result<&Profile, GameError> {
        let Some(profile) = self.profiles.get(name) else {
            return Err(GameError::ProfileNotFound(name.to_string()));
        };
        self.current_profile = Some(name.to_string());
        Ok(profile)
    }

    /// Remove a profile and its whole history. Clears the current pointer if
    /// it named this profile; nothing is reselected. Returns whether a
    /// profile was removed.
    pub fn delete_profile(&mut self, name: &str) -> bool {
        if self.profiles.remove(name).is_none() {
            return false;
        }
        if self.current_profile.as_deref() == Some(name) {
            self.current_profile = None;
        }
        log::debug!("profile {name} deleted");
        true
    }

    /// Name of the current profile, if any.
    #[must_use]
    pub fn current_name(&self) -> Option<&str> {
        self.current_profile.as_deref()
    }

    #[must_use]
    pub fn current(&self) -> Option<(&str, &Profile)> {
        let name = self.current_profile.as_deref()?;
        self.profiles.get(name).map(|profile| (name, profile))
    }

    #[must_use]
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// # Errors
    ///
    /// [`GameError::ProfileNotFound`] when no such profile exists.
    pub fn profile_mut(&mut self, name: &str) -> Result<&mut Profile, GameError> {
        self.profiles
            .get_mut(name)
            .ok_or_else(|| GameError::ProfileNotFound(name.to_string()))
    }

    pub fn profiles(&self) -> impl Iterator<Item = (&str, &Profile)> {
        self.profiles.iter().map(|(name, profile)| (name.as_str(), profile))
    }

    /// Every profile except the administrative one.
    pub fn learners(&self) -> impl Iterator<Item = (&str, &Profile)> {
        self.profiles().filter(|(name, _)| !is_admin(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn saturated_level_never_advances() {
        let mut profile: Profile =
            serde_json::from_str(r#"{"level":4294967295,"lastPlayed":"2024-02-10T18:30:00Z"}"#)
                .unwrap();
        assert!(matches!(
            profile.advance_level(0, u32::MAX, now()),
            Err(GameError::LevelTransition { from: u32::MAX, to: 0 })
        ));
        assert_eq!(profile.level(), u32::MAX);
    }

    #[test]
    fn create_validates_names() {
        let mut doc = GameDocument::default();
        assert!(matches!(
            doc.create_profile("   ", now()),
            Err(GameError::EmptyName)
        ));
        doc.create_profile("Mia", now()).unwrap();
        assert!(matches!(
            doc.create_profile("Mia", now()),
            Err(GameError::DuplicateName(name)) if name == "Mia"
        ));
        doc.create_profile("mia", now()).unwrap();
        assert_eq!(doc.profiles().count(), 2);
        assert_eq!(doc.current_name(), Some("mia"));
    }

    #[test]
    fn created_profile_starts_clean() {
        let mut doc = GameDocument::default();
        let profile = doc.create_profile("  Leo ", now()).unwrap();
        assert_eq!(profile.level(), 1);
        assert!(profile.stats().is_empty());
        assert!(profile.sessions().is_empty());
        assert!(profile.quizzes().is_empty());
        assert_eq!(doc.current_name(), Some("Leo"));
    }

    #[test]
    fn select_requires_existing_profile() {
        let mut doc = GameDocument::default();
        doc.create_profile("Ana", now()).unwrap();
        doc.create_profile("Ben", now()).unwrap();
        assert!(matches!(
            doc.select_profile("Cy"),
            Err(GameError::ProfileNotFound(_))
        ));
        assert_eq!(doc.current_name(), Some("Ben"));
        doc.select_profile("Ana").unwrap();
        assert_eq!(doc.current().map(|(name, _)| name), Some("Ana"));
    }

    #[test]
    fn delete_only_clears_matching_pointer() {
        let mut doc = GameDocument::default();
        doc.create_profile("Ana", now()).unwrap();
        doc.create_profile("Ben", now()).unwrap();

        assert!(doc.delete_profile("Ana"));
        assert_eq!(doc.current_name(), Some("Ben"));
        assert!(doc.delete_profile("Ben"));
        assert_eq!(doc.current_name(), None);
        assert!(!doc.delete_profile("Ben"));
    }

    #[test]
    fn learners_exclude_admin() {
        let mut doc = GameDocument::default();
        doc.create_profile("ADMIN", now()).unwrap();
        doc.create_profile("Zoe", now()).unwrap();
        let names: Vec<&str> = doc.learners().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Zoe"]);
        assert!(is_admin("Admin"));
        assert!(!is_admin("administrator"));
    }

    #[test]
    fn level_only_advances_after_pass() {
        let mut profile = Profile::new(now());
        assert!(profile.advance_level(2, 10, now()).is_err());

        profile.start_quiz(1, now());
        profile.end_quiz(false, 9, 10, now());
        assert!(profile.advance_level(2, 10, now()).is_err());

        profile.start_quiz(1, now());
        profile.end_quiz(true, 10, 10, now());
        assert!(matches!(
            profile.advance_level(3, 10, now()),
            Err(GameError::LevelTransition { from: 1, to: 3 })
        ));
        assert_eq!(profile.advance_level(2, 10, now()).unwrap(), 2);
        assert_eq!(profile.advance_level(2, 10, now()).unwrap(), 2);
        assert!(profile.advance_level(3, 10, now()).is_err());
    }

    #[test]
    fn level_capped_at_max() {
        let mut profile = Profile::new(now());
        profile.start_quiz(1, now());
        profile.end_quiz(true, 10, 10, now());
        assert!(profile.advance_level(2, 1, now()).is_err());
        assert_eq!(profile.level(), 1);
    }
}
