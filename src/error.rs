//! Common error types used throughout the crate.

use std::fmt;

/// Result type used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type covering failures across the succinct structures.
#[derive(Debug)]
pub enum Error {
    /// An index or count was beyond the valid range of a query.
    OutOfBounds(String),
    /// A query was issued before `build()` finalized the structure.
    NotBuilt(String),
    /// A bit width was outside `0..=64`.
    InvalidWidth(String),
    /// A pushed value was smaller than its predecessor.
    OrderViolation(String),
    /// More values were pushed than the declared capacity.
    CapacityExceeded(String),
    /// A pushed value was larger than the declared universe.
    UpperBoundExceeded(String),
    /// Deserialized data was malformed or inconsistent.
    InvalidMetadata(String),
    /// Wrapper around [`std::io::Error`] values.
    Io(std::io::Error),
}

impl Error {
    /// Creates an [`Error::OutOfBounds`] with the provided message.
    pub fn out_of_bounds(msg: impl Into<String>) -> Self {
        Self::OutOfBounds(msg.into())
    }

    /// Creates an [`Error::NotBuilt`] with the provided message.
    pub fn not_built(msg: impl Into<String>) -> Self {
        Self::NotBuilt(msg.into())
    }

    /// Creates an [`Error::InvalidWidth`] with the provided message.
    pub fn invalid_width(msg: impl Into<String>) -> Self {
        Self::InvalidWidth(msg.into())
    }

    /// Creates an [`Error::OrderViolation`] with the provided message.
    pub fn order_violation(msg: impl Into<String>) -> Self {
        Self::OrderViolation(msg.into())
    }

    /// Creates an [`Error::CapacityExceeded`] with the provided message.
    pub fn capacity_exceeded(msg: impl Into<String>) -> Self {
        Self::CapacityExceeded(msg.into())
    }

    /// Creates an [`Error::UpperBoundExceeded`] with the provided message.
    pub fn upper_bound_exceeded(msg: impl Into<String>) -> Self {
        Self::UpperBoundExceeded(msg.into())
    }

    /// Creates an [`Error::InvalidMetadata`] with the provided message.
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfBounds(msg)
            | Error::NotBuilt(msg)
            | Error::InvalidWidth(msg)
            | Error::OrderViolation(msg)
            | Error::CapacityExceeded(msg)
            | Error::UpperBoundExceeded(msg)
            | Error::InvalidMetadata(msg) => write!(f, "{msg}"),
            Error::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_message() {
        let e = Error::out_of_bounds("pos must be less than 4, but got 7.");
        assert_eq!(e.to_string(), "pos must be less than 4, but got 7.");
    }

    #[test]
    fn io_source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let e = Error::from(io);
        assert!(std::error::Error::source(&e).is_some());
        assert!(matches!(e, Error::Io(_)));
    }
}
