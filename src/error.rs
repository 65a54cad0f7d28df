use thiserror::Error;

use crate::constant::{CHARACTER_NOT_IN_REPERTOIRE, MAX_CHAR_LEN};

pub use color_eyre::eyre::eyre;

#[derive(Debug, Error)]
pub enum Error {
    /// The column is NULL, or its type has no character representation.
    #[error("Invalid cast: {0}")]
    InvalidCast(String),

    /// The call violates the access-mode contract of the cursor.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error(
        "Destination buffer too small: requested {requested} chars at offset {offset}, buffer holds {capacity}"
    )]
    BufferTooSmall {
        requested: usize,
        offset: usize,
        capacity: usize,
    },

    /// The reader or row was closed, either explicitly or by cursor advancement.
    #[error("Object disposed: {0}")]
    Disposed(&'static str),

    /// Invalid byte sequence, or the NUL code point which the server never stores.
    #[error("{}: {}", CHARACTER_NOT_IN_REPERTOIRE, .0)]
    EncodingViolation(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Bad config error: {0}")]
    BadConfigError(String),

    #[error("Bad usage error: {0}")]
    BadUsageError(String),

    #[error("Invalid packet")]
    InvalidPacket,

    #[error("Unexpected end of packet")]
    UnexpectedEof,

    #[error("Library bug: {0}")]
    LibraryBug(color_eyre::Report),
}

impl Error {
    /// SQLSTATE the server reports for the same failure, if any.
    pub fn sql_state(&self) -> Option<&'static str> {
        match self {
            Error::EncodingViolation(_) => Some(CHARACTER_NOT_IN_REPERTOIRE),
            _ => None,
        }
    }

    pub(crate) fn invalid_byte_sequence(bytes: &[u8]) -> Self {
        let shown = &bytes[..bytes.len().min(MAX_CHAR_LEN)];
        let hex = shown
            .iter()
            .map(|b| format!("0x{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ");
        Error::EncodingViolation(format!("invalid byte sequence for encoding \"UTF8\": {hex}"))
    }

    pub(crate) fn seek_back(what: &str) -> Self {
        Error::InvalidState(format!(
            "{what}: seek back not supported in sequential access mode"
        ))
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

pub type Result<T> = std::result::Result<T, Error>;
