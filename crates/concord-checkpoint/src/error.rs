//! Checkpoint errors.

use thiserror::Error;

/// Checkpoint error types.
///
/// Store failures are never swallowed: the executor propagates them to its
/// caller instead of continuing without a durable record.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or corrupted checkpoint data.
    #[error("Invalid checkpoint data: {0}")]
    InvalidData(String),

    /// Underlying medium is unreachable.
    #[error("Checkpoint storage unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = CheckpointError::from(io_err);
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_unavailable_display() {
        let err = CheckpointError::Unavailable("disk detached".to_string());
        assert!(err.to_string().contains("unavailable"));
    }
}
