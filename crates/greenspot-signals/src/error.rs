//! Errors raised by signal collaborators

use std::time::Duration;
use thiserror::Error;

/// Failure of a single collaborator call
#[derive(Error, Debug)]
pub enum SignalError {
    /// Call did not complete within the configured bound
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Connection or HTTP status failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body did not have the expected shape
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SignalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SignalError::Decode(err.to_string())
        } else {
            SignalError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = SignalError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "timed out after 250ms");
    }
}
