use thiserror::Error;

/// Marker phrase carried by every conflict message. HTTP clients and the
/// retry helper both recognise a conflict by it.
pub const CONFLICT_MESSAGE: &str = "modified by another process";

#[derive(Debug, Error)]
pub enum McError {
    #[error("not initialized: run 'mc init'")]
    NotInitialized,

    #[error("invalid document key '{0}': expected a lowercase file name ending in .json")]
    InvalidKey(String),

    #[error("invalid version token '{0}'")]
    InvalidVersion(String),

    #[error("'{key}' was modified by another process, please retry (expected version {expected}, found {actual})")]
    VersionConflict {
        key: String,
        expected: String,
        actual: String,
    },

    #[error("corrupt document '{key}': {source}")]
    Parse {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("document '{key}' does not match its schema: {reason}")]
    InvalidDocument { key: String, reason: String },

    #[error("document '{0}' is not a JSON array")]
    NotAnArray(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl McError {
    /// True for the one recoverable failure: a stale expected version.
    pub fn is_conflict(&self) -> bool {
        matches!(self, McError::VersionConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, McError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_carries_marker() {
        let err = McError::VersionConflict {
            key: "tasks.json".into(),
            expected: "abc".into(),
            actual: "def".into(),
        };
        assert!(err.is_conflict());
        assert!(err.to_string().contains(CONFLICT_MESSAGE));
        assert!(err.to_string().contains("tasks.json"));
    }

    #[test]
    fn io_is_not_conflict() {
        let err = McError::Io(std::io::Error::other("disk full"));
        assert!(!err.is_conflict());
    }
}
