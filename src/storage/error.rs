//! Error types for local storage operations.

use thiserror::Error;

/// Errors raised by [`LocalStorage`](super::LocalStorage).
///
/// The profile, playlist and continue-watching stores absorb these and log
/// them; only the raw storage API surfaces them to callers.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing database rejected a read or write.
    #[error("storage database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value is not valid JSON for the expected shape.
    #[error("stored value under '{key}' is corrupt: {source}")]
    Corrupt {
        /// Storage key holding the bad value.
        key: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded before writing.
    #[error("failed to serialize value for '{key}': {source}")]
    Serialize {
        /// Storage key being written.
        key: String,
        /// The underlying encode error.
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Creates a corrupt-value error.
    pub fn corrupt(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Corrupt {
            key: key.into(),
            source,
        }
    }

    /// Creates a serialization error.
    pub fn serialize(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialize {
            key: key.into(),
            source,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_display_names_key() {
        let source = serde_json::from_str::<Vec<u8>>("{oops").unwrap_err();
        let error = StorageError::corrupt("kebijo_playlists", source);
        let msg = error.to_string();
        assert!(msg.contains("kebijo_playlists"), "Expected key in: {msg}");
        assert!(msg.contains("corrupt"), "Expected 'corrupt' in: {msg}");
    }
}
