/// A column value in its natural representation, as returned by
/// [`RowCursor::get_value`](crate::RowCursor::get_value)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// NULL value
    Null,
    /// text, varchar, bpchar, name, unknown
    Text(String),
    /// Single-byte internal `"char"`
    Char(char),
    /// smallint, integer, bigint
    Int(i64),
    /// boolean
    Bool(bool),
    /// Raw bytes of any other type
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Convert to `i32`, `None` for non-integers and values out of range
    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().and_then(|n| i32::try_from(n).ok())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
