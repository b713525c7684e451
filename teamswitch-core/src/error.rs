use std::time::Duration;

use thiserror::Error;

/// A single backend call that did not produce a usable answer.
///
/// Always scoped to one backend and one call; callers log it and move on to
/// the next backend or the next cycle.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected http status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("request rejected by rcon: {0}")]
    Rejected(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no rcon backends configured")]
    NoBackends,

    #[error("backend name '{0}' is configured more than once")]
    DuplicateBackend(String),

    #[error("unknown faction '{0}' (expected axis or allies)")]
    InvalidFaction(String),

    #[error("number {0} is not part of the latest player list")]
    UnknownNumber(usize),

    #[error("player number {0} has no usable player id")]
    MissingPlayerId(usize),

    #[error("backend '{backend}' failed: {source}")]
    Fetch {
        backend: String,
        #[source]
        source: FetchError,
    },
}

impl CoreError {
    /// Configuration errors are fatal at startup and never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CoreError::NoBackends | CoreError::DuplicateBackend(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
