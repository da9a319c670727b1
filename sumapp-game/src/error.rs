//! Error taxonomy shared by every engine operation.
use thiserror::Error;

/// Broad classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller input; never retried and nothing was changed.
    Validation,
    /// The named profile does not exist.
    NotFound,
    /// The document could not be read or written; the operation did not apply.
    Storage,
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("profile name cannot be empty")]
    EmptyName,
    #[error("profile name already exists: {0}")]
    DuplicateName(String),
    #[error("profile not found: {0}")]
    ProfileNotFound(String),
    #[error("level cannot move from {from} to {to}")]
    LevelTransition { from: u32, to: u32 },
    #[error("administrative profile cannot play: {0}")]
    AdminProfile(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GameError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyName
            | Self::DuplicateName(_)
            | Self::LevelTransition { .. }
            | Self::AdminProfile(_)
            | Self::Config(_) => ErrorKind::Validation,
            Self::ProfileNotFound(_) => ErrorKind::NotFound,
            Self::Storage(_) | Self::Serialization(_) => ErrorKind::Storage,
        }
    }
}

impl From<std::io::Error> for GameError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(GameError::EmptyName.kind(), ErrorKind::Validation);
        assert_eq!(
            GameError::DuplicateName("ada".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            GameError::ProfileNotFound("ada".into()).kind(),
            ErrorKind::NotFound
        );
        let io = std::io::Error::other("quota exceeded");
        assert_eq!(GameError::from(io).kind(), ErrorKind::Storage);
    }

    #[test]
    fn messages_name_the_profile() {
        let err = GameError::DuplicateName("Mia".into());
        assert_eq!(err.to_string(), "profile name already exists: Mia");
    }
}
