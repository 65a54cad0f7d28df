use smart_default::SmartDefault;

use crate::constant::{DEFAULT_BUFFER_SIZE, MAX_CHAR_LEN};
use crate::error::Error;

/// How the columns of a row may be visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, SmartDefault)]
pub enum AccessMode {
    /// Any column, any character offset, any number of times while the row is current.
    #[default]
    Buffered,
    /// Columns in non-decreasing order, characters in non-decreasing offsets.
    /// Consumed bytes are released.
    Sequential,
}

impl AccessMode {
    pub fn is_sequential(self) -> bool {
        self == Self::Sequential
    }
}

/// A configuration for a result cursor
///
/// ```rs
/// let mut opts1 = Opts::default();
/// opts1.access_mode = AccessMode::Sequential;
///
/// let opts2 = Opts::try_from("postgres://localhost/app?buffer_size=16384");
/// ```
#[derive(Debug, Clone, SmartDefault)]
pub struct Opts {
    pub access_mode: AccessMode,

    /// Maximum number of bytes decoded per chunk, as advertised by the transport
    #[default(DEFAULT_BUFFER_SIZE)]
    pub buffer_size: usize,
}

impl TryFrom<&str> for Opts {
    type Error = Error;

    fn try_from(url: &str) -> Result<Self, Self::Error> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::BadConfigError(format!("Failed to parse Postgres URL: {}", e)))?;

        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(Error::BadConfigError(format!(
                "Invalid URL scheme '{}', expected 'postgres' or 'postgresql'",
                parsed.scheme()
            )));
        }

        let mut opts = Self::default();
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "access_mode" => {
                    opts.access_mode = match value.as_ref() {
                        "buffered" | "default" => AccessMode::Buffered,
                        "sequential" => AccessMode::Sequential,
                        other => {
                            return Err(Error::BadConfigError(format!(
                                "Invalid access mode '{}', expected 'buffered' or 'sequential'",
                                other
                            )));
                        }
                    };
                }
                "sequential" => {
                    opts.access_mode = if parse_bool(&key, &value)? {
                        AccessMode::Sequential
                    } else {
                        AccessMode::Buffered
                    };
                }
                "buffer_size" => {
                    let size = parse_usize(&key, &value)?;
                    if size < MAX_CHAR_LEN {
                        return Err(Error::BadConfigError(format!(
                            "buffer_size must be at least {} bytes, got {}",
                            MAX_CHAR_LEN, size
                        )));
                    }
                    opts.buffer_size = size;
                }
                other => {
                    return Err(Error::BadConfigError(format!(
                        "Unknown query parameter '{}'",
                        other
                    )));
                }
            }
        }
        Ok(opts)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Error> {
    match value {
        "true" | "True" | "1" => Ok(true),
        "false" | "False" | "0" => Ok(false),
        _ => Err(Error::BadConfigError(format!(
            "Invalid boolean value '{}' for '{}'",
            value, key
        ))),
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, Error> {
    value.parse().map_err(|e| {
        Error::BadConfigError(format!(
            "Invalid unsigned integer value '{}' for '{}': {}",
            value, key, e
        ))
    })
}
