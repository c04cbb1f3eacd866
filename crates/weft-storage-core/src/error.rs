//! Error taxonomy shared by every storage backend.
//!
//! The engine decides how to react to a failed operation (abort the job,
//! mark the step retryable, report a bad query) purely from the error
//! kind, so backends must classify rather than stringify.

use thiserror::Error;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Query failed syntactic validation. Never retried.
    #[error("invalid query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },

    /// Network or session failure (connect, handshake, channel, reset).
    #[error("connection error: {0}")]
    Connection(String),

    /// A remote round-trip took longer than the configured timeout.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Remote path absent where the operation requires presence.
    #[error("not found: {0}")]
    NotFound(String),

    /// Server host key missing from or conflicting with the known-hosts store.
    #[error("host key verification failed: {0}")]
    HostKey(String),

    /// Remote-side rejection: permission denied, quota, protocol violation.
    /// Retrying cannot change the outcome.
    #[error("remote rejected operation: {0}")]
    Remote(String),

    /// Capability intentionally not implemented by this backend.
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// Local I/O failure while staging or reading a materialisation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether a retry may succeed: the next attempt can hit a healthy
    /// network or a re-established session.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Connection(_) | StorageError::Timeout(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StorageError::Connection("reset".into()).is_transient());
        assert!(StorageError::Timeout("stat".into()).is_transient());
        assert!(!StorageError::NotFound("/x".into()).is_transient());
        assert!(!StorageError::Remote("permission denied".into()).is_transient());
        assert!(!StorageError::Unsupported("listing".into()).is_transient());
        assert!(!StorageError::HostKey("mismatch".into()).is_transient());
        let io = StorageError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!io.is_transient());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(StorageError::NotFound("/x".into()).is_not_found());
        assert!(!StorageError::Connection("reset".into()).is_not_found());
    }

    #[test]
    fn test_display_carries_query_and_reason() {
        let err = StorageError::InvalidQuery {
            query: "ftp://x".into(),
            reason: "scheme is not 'sftp'".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ftp://x"));
        assert!(msg.contains("scheme is not 'sftp'"));
    }
}
