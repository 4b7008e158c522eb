use std::io;
use thiserror::Error;

/// Custom error types for the driver station link
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed packet: {len} bytes, expected at least {expected}")]
    MalformedPacket {
        /// Length of the datagram that was received
        len: usize,
        /// Minimum length the decoder accepts
        expected: usize,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Creates a new malformed packet error
    pub fn malformed(len: usize, expected: usize) -> Self {
        Error::MalformedPacket { len, expected }
    }

    /// Creates a new network error
    pub fn network(msg: impl Into<String>) -> Self {
        Error::Network(msg.into())
    }

    /// Creates a new invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Returns true for errors that only affect a single datagram
    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::MalformedPacket { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("team number is required");
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), "Configuration error: team number is required");
    }

    #[test]
    fn test_malformed_display() {
        let err = Error::malformed(3, 7);
        assert!(err.is_malformed());
        assert_eq!(err.to_string(), "Malformed packet: 3 bytes, expected at least 7");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::AddrInUse, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_malformed());
    }
}
