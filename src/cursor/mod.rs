//! Result cursors: per-row column access and character streams.

mod column;
mod reader;
mod row;

pub use column::{ColumnCursor, ColumnState, Position};
pub use reader::TextReader;
pub use row::RowCursor;

#[cfg(test)]
mod row_test;
