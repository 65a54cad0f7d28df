use crate::constant::{FormatCode, PgType};
use crate::error::{Error, Result, eyre};
use crate::protocol::primitive::*;
use simdutf8::basic::from_utf8;
use zerocopy::byteorder::big_endian::{I16 as I16BE, I32 as I32BE, U32 as U32BE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// Fixed-size tail of a RowDescription field (18 bytes, follows the field name)
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct ColumnDescriptionTail {
    table_oid: U32BE,
    column_attr: I16BE,
    type_oid: U32BE,
    type_size: I16BE,
    type_modifier: I32BE,
    format: I16BE,
}

impl ColumnDescriptionTail {
    pub const SIZE: usize = 18;

    fn new(type_oid: u32, format: FormatCode) -> Self {
        Self {
            table_oid: U32BE::new(0),
            column_attr: I16BE::new(0),
            type_oid: U32BE::new(type_oid),
            type_size: I16BE::new(-1),
            type_modifier: I32BE::new(-1),
            format: I16BE::new(format as i16),
        }
    }

    pub fn table_oid(&self) -> u32 {
        self.table_oid.get()
    }

    pub fn type_oid(&self) -> u32 {
        self.type_oid.get()
    }

    pub fn type_size(&self) -> i16 {
        self.type_size.get()
    }

    pub fn type_modifier(&self) -> i32 {
        self.type_modifier.get()
    }

    pub fn format(&self) -> Result<FormatCode> {
        FormatCode::from_i16(self.format.get())
            .ok_or_else(|| Error::LibraryBug(eyre!("unknown format code: {}", self.format.get())))
    }
}

/// One field of a RowDescription message
#[derive(Debug, Clone)]
pub struct ColumnDescription {
    pub name: String,
    pub tail: ColumnDescriptionTail,
}

impl ColumnDescription {
    /// A text-format column of the given type
    pub fn new(name: impl Into<String>, ty: PgType) -> Self {
        Self::with_oid(name, ty.oid())
    }

    pub fn with_oid(name: impl Into<String>, type_oid: u32) -> Self {
        Self {
            name: name.into(),
            tail: ColumnDescriptionTail::new(type_oid, FormatCode::Text),
        }
    }

    /// `None` for types outside the built-in catalog
    pub fn pg_type(&self) -> Option<PgType> {
        PgType::from_oid(self.tail.type_oid())
    }

    pub fn is_text_like(&self) -> bool {
        self.pg_type().is_some_and(PgType::is_text_like)
    }

    pub fn type_name(&self) -> String {
        match self.pg_type() {
            Some(ty) => ty.name().to_string(),
            None => format!("oid {}", self.tail.type_oid()),
        }
    }
}

/// Parse the payload of a RowDescription message
pub fn parse_row_description(payload: &[u8]) -> Result<Vec<ColumnDescription>> {
    let (count, mut data) = read_i16(payload)?;
    let count = usize::try_from(count).map_err(|_| Error::InvalidPacket)?;
    let mut columns = Vec::with_capacity(count);
    for _ in 0..count {
        let (name, rest) = read_string_null(data)?;
        let name = from_utf8(name).map_err(|_| Error::invalid_byte_sequence(name))?;
        let (tail, rest) =
            ColumnDescriptionTail::read_from_prefix(rest).map_err(|_| Error::UnexpectedEof)?;
        columns.push(ColumnDescription {
            name: name.to_string(),
            tail,
        });
        data = rest;
    }
    if !data.is_empty() {
        return Err(Error::InvalidPacket);
    }
    Ok(columns)
}

/// Encode a RowDescription payload, the inverse of [`parse_row_description`]
pub fn write_row_description(out: &mut Vec<u8>, columns: &[ColumnDescription]) -> Result<()> {
    let count = i16::try_from(columns.len())
        .map_err(|_| Error::BadUsageError(format!("too many columns: {}", columns.len())))?;
    write_i16(out, count);
    for col in columns {
        write_string_null(out, &col.name);
        write_u32(out, col.tail.table_oid());
        write_i16(out, col.tail.column_attr.get());
        write_u32(out, col.tail.type_oid());
        write_i16(out, col.tail.type_size());
        write_i32(out, col.tail.type_modifier());
        write_i16(out, col.tail.format.get());
    }
    Ok(())
}
