use crate::constant::{NULL_LENGTH, PgType};
use crate::error::{Error, Result};
use crate::guard::reject_nul;
use crate::protocol::primitive::*;

/// A value that can be bound to a statement parameter
///
/// # Examples
/// - `"hello"`, `String::from("hello")`
/// - `42i32`
/// - `None::<&str>` // NULL
/// - `Parameter::new("p", PgType::Varchar).with_value("AnotherValue").with_size(4)`
pub trait Param {
    /// Returns true if this parameter is NULL
    fn is_null(&self) -> bool {
        false
    }

    /// Type OID announced to the server
    fn type_oid(&self) -> u32;

    /// Encode the value in text format, without the length prefix.
    ///
    /// Only called if is_null() returns false.
    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()>;
}

fn write_text(out: &mut Vec<u8>, text: &str) -> Result<()> {
    reject_nul(text)?;
    out.extend_from_slice(text.as_bytes());
    Ok(())
}

impl Param for &str {
    fn type_oid(&self) -> u32 {
        PgType::Text.oid()
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_text(out, self)
    }
}

impl Param for String {
    fn type_oid(&self) -> u32 {
        PgType::Text.oid()
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_text(out, self)
    }
}

impl Param for &String {
    fn type_oid(&self) -> u32 {
        PgType::Text.oid()
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_text(out, self)
    }
}

impl Param for i32 {
    fn type_oid(&self) -> u32 {
        PgType::Int4.oid()
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(self.to_string().as_bytes());
        Ok(())
    }
}

impl<T: Param> Param for Option<T> {
    fn is_null(&self) -> bool {
        self.as_ref().is_none_or(|value| value.is_null())
    }

    fn type_oid(&self) -> u32 {
        match self {
            Some(value) => value.type_oid(),
            None => PgType::Unknown.oid(),
        }
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Some(value) => value.encode_value(out),
            None => Ok(()),
        }
    }
}

/// A named text parameter with an optional character limit.
///
/// A positive `size` transmits only the first `size` characters. The limit is applied when the
/// parameter is encoded, so changing either the value or the size later is always honoured.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    ty: PgType,
    value: Option<String>,
    size: i32,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: PgType) -> Self {
        Self {
            name: name.into(),
            ty,
            value: None,
            size: 0,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.set_value(value);
        self
    }

    pub fn with_size(mut self, size: i32) -> Self {
        self.size = size;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
    }

    pub fn set_null(&mut self) {
        self.value = None;
    }

    /// Character limit; zero or negative means unlimited
    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn set_size(&mut self, size: i32) {
        self.size = size;
    }

    /// The text that will be sent, after truncation
    pub fn transmitted(&self) -> Option<&str> {
        let value = self.value.as_deref()?;
        let Ok(limit) = usize::try_from(self.size) else {
            return Some(value);
        };
        if limit == 0 {
            return Some(value);
        }
        match value.char_indices().nth(limit) {
            Some((end, _)) => value.get(..end),
            None => Some(value),
        }
    }
}

impl Param for Parameter {
    fn is_null(&self) -> bool {
        self.value.is_none()
    }

    fn type_oid(&self) -> u32 {
        self.ty.oid()
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        match self.transmitted() {
            Some(text) => write_text(out, text),
            None => Ok(()),
        }
    }
}

/// Write the parameter value block of a Bind message: Int16 count, then per parameter an Int32
/// length (-1 for NULL) followed by the text bytes.
///
/// On error `out` is restored to its previous length, so nothing partial is ever sent.
pub fn encode_params(params: &[&dyn Param], out: &mut Vec<u8>) -> Result<()> {
    let start = out.len();
    let result = write_params(params, out);
    if result.is_err() {
        out.truncate(start);
        tracing::debug!(count = params.len(), "parameter encoding rolled back");
    }
    result
}

fn write_params(params: &[&dyn Param], out: &mut Vec<u8>) -> Result<()> {
    let count = i16::try_from(params.len())
        .map_err(|_| Error::BadUsageError(format!("too many parameters: {}", params.len())))?;
    write_i16(out, count);
    for param in params {
        if param.is_null() {
            write_i32(out, NULL_LENGTH);
            continue;
        }
        let len_at = out.len();
        write_i32(out, 0);
        param.encode_value(out)?;
        let len = out.len() - len_at - 4;
        let len = i32::try_from(len)
            .map_err(|_| Error::BadUsageError(format!("value too large: {len} bytes")))?;
        out[len_at..len_at + 4].copy_from_slice(&len.to_be_bytes());
    }
    Ok(())
}

/// Write the parameter type block of a Parse message: Int16 count, then one OID per parameter
pub fn encode_param_types(params: &[&dyn Param], out: &mut Vec<u8>) -> Result<()> {
    let count = i16::try_from(params.len())
        .map_err(|_| Error::BadUsageError(format!("too many parameters: {}", params.len())))?;
    write_i16(out, count);
    for param in params {
        write_u32(out, param.type_oid());
    }
    Ok(())
}
