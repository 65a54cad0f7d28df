//! NUL code point policy shared by the read and write paths.
//!
//! The server never stores `U+0000` in a text value and answers with SQLSTATE 22021 when one
//! is sent. Decoded text is checked before it reaches the caller, and parameter text is checked
//! before it is written, so both paths fail with the same [`Error::EncodingViolation`].

use crate::error::{Error, Result};

/// Fail if `text` contains the NUL code point.
///
/// In UTF-8 the byte `0x00` only ever encodes `U+0000`, so a byte scan is exact.
pub fn reject_nul(text: &str) -> Result<()> {
    if text.as_bytes().contains(&0) {
        return Err(Error::invalid_byte_sequence(&[0]));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::CHARACTER_NOT_IN_REPERTOIRE;

    #[test]
    fn test_accepts_plain_text() {
        assert!(reject_nul("").is_ok());
        assert!(reject_nul("ABCDE\u{e9}\u{1F600}").is_ok());
    }

    #[test]
    fn test_rejects_nul() {
        let err = reject_nul("string with \0\0\0 null \0bytes").unwrap_err();
        assert!(matches!(err, Error::EncodingViolation(_)));
        assert_eq!(err.sql_state(), Some(CHARACTER_NOT_IN_REPERTOIRE));
        assert!(err.to_string().contains("0x00"));
    }
}
