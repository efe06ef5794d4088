//! Port errors.

use thiserror::Error;

/// Failure of an external collaborator reached through a port.
///
/// These are infrastructure failures and are surfaced to callers unmasked.
#[derive(Debug, Error)]
pub enum PortError {
    #[error("Port unavailable: {0}")]
    Unavailable(String),

    #[error("Port rejected input: {0}")]
    Rejected(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("{0}")]
    Custom(String),
}
