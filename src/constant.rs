/// Longest UTF-8 encoding of a single character in bytes
pub const MAX_CHAR_LEN: usize = 4;

/// Default size of a decode chunk when the transport does not advertise one
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Column length marking a NULL value in a DataRow
pub const NULL_LENGTH: i32 = -1;

/// SQLSTATE 22021 `character_not_in_repertoire`
///
/// Reported by the server for invalid byte sequences, including `0x00`.
pub const CHARACTER_NOT_IN_REPERTOIRE: &str = "22021";

/// Format code of a column or parameter
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatCode {
    Text = 0,
    Binary = 1,
}

impl FormatCode {
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Text),
            1 => Some(Self::Binary),
            _ => None,
        }
    }
}

/// Type OIDs of the built-in types this crate knows about
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgType {
    Bool = 16,
    /// Single-byte internal `"char"`
    Char = 18,
    Name = 19,
    Int8 = 20,
    Int2 = 21,
    Int4 = 23,
    Text = 25,
    Unknown = 705,
    /// `character(n)`
    Bpchar = 1042,
    Varchar = 1043,
}

impl PgType {
    pub fn from_oid(oid: u32) -> Option<Self> {
        match oid {
            16 => Some(Self::Bool),
            18 => Some(Self::Char),
            19 => Some(Self::Name),
            20 => Some(Self::Int8),
            21 => Some(Self::Int2),
            23 => Some(Self::Int4),
            25 => Some(Self::Text),
            705 => Some(Self::Unknown),
            1042 => Some(Self::Bpchar),
            1043 => Some(Self::Varchar),
            _ => None,
        }
    }

    pub fn oid(self) -> u32 {
        self as u32
    }

    /// Whether values of this type travel as UTF-8 text and can be read as characters
    pub fn is_text_like(self) -> bool {
        matches!(
            self,
            Self::Text | Self::Varchar | Self::Bpchar | Self::Name | Self::Char | Self::Unknown
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Self::Int2 | Self::Int4 | Self::Int8)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Char => "\"char\"",
            Self::Name => "name",
            Self::Int8 => "bigint",
            Self::Int2 => "smallint",
            Self::Int4 => "integer",
            Self::Text => "text",
            Self::Unknown => "unknown",
            Self::Bpchar => "character",
            Self::Varchar => "character varying",
        }
    }
}
