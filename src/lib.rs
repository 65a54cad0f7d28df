//! Character-accurate text column cursors for PostgreSQL-style row protocols.
//!
//! A [`RowCursor`] is built from a RowDescription payload and fed DataRow payloads by the
//! transport. Text columns can be materialized whole ([`RowCursor::get_string`]), copied in
//! character ranges ([`RowCursor::get_chars`]) or streamed ([`RowCursor::get_text_reader`]),
//! in either [`AccessMode`].

pub mod constant;
pub mod cursor;
pub mod decode;
pub mod error;
pub mod guard;
mod opts;
pub mod protocol;
mod value;
pub mod window;

pub use cursor::{RowCursor, TextReader};
pub use error::{Error, Result};
pub use opts::{AccessMode, Opts};
pub use value::Value;
