use std::ops::Range;
use std::rc::Rc;

use crate::constant::NULL_LENGTH;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;

/// The payload of a DataRow message, indexed by column.
///
/// The raw bytes are shared with every column cursor and text reader opened on the row.
#[derive(Debug, Clone)]
pub struct DataRow {
    buf: Rc<[u8]>,
    /// Byte range of each column inside `buf`, `None` for NULL
    fields: Vec<Option<Range<usize>>>,
}

impl DataRow {
    pub fn parse(payload: impl Into<Rc<[u8]>>) -> Result<Self> {
        let buf: Rc<[u8]> = payload.into();
        let (count, mut data) = read_i16(&buf)?;
        let count = usize::try_from(count).map_err(|_| Error::InvalidPacket)?;
        let mut fields = Vec::with_capacity(count);
        for _ in 0..count {
            let (len, rest) = read_i32(data)?;
            if len == NULL_LENGTH {
                fields.push(None);
                data = rest;
                continue;
            }
            let len = usize::try_from(len).map_err(|_| Error::InvalidPacket)?;
            let (value, rest) = read_bytes_fix(rest, len)?;
            let start = buf.len() - rest.len() - value.len();
            fields.push(Some(start..start + len));
            data = rest;
        }
        if !data.is_empty() {
            return Err(Error::InvalidPacket);
        }
        Ok(Self { buf, fields })
    }

    pub fn num_columns(&self) -> usize {
        self.fields.len()
    }

    pub fn is_null(&self, idx: usize) -> Result<bool> {
        Ok(self.field(idx)?.is_none())
    }

    /// Byte range of a column within [`DataRow::buffer`]
    pub fn field(&self, idx: usize) -> Result<Option<Range<usize>>> {
        self.fields.get(idx).cloned().ok_or_else(|| {
            Error::OutOfRange(format!(
                "column index {idx} (row has {} columns)",
                self.fields.len()
            ))
        })
    }

    /// Raw bytes of a column, `None` for NULL
    pub fn value(&self, idx: usize) -> Result<Option<&[u8]>> {
        Ok(self.field(idx)?.map(|range| &self.buf[range]))
    }

    pub fn buffer(&self) -> &Rc<[u8]> {
        &self.buf
    }
}

/// Encode a DataRow payload, the inverse of [`DataRow::parse`]
pub fn write_data_row(out: &mut Vec<u8>, values: &[Option<&[u8]>]) -> Result<()> {
    let count = i16::try_from(values.len())
        .map_err(|_| Error::BadUsageError(format!("too many columns: {}", values.len())))?;
    write_i16(out, count);
    for value in values {
        match value {
            Some(bytes) => write_bytes_len(out, bytes)?,
            None => write_i32(out, NULL_LENGTH),
        }
    }
    Ok(())
}
