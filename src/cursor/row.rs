use std::cell::{RefCell, RefMut};
use std::rc::{Rc, Weak};

use simdutf8::basic::from_utf8;
use tracing::{debug, warn};

use crate::constant::PgType;
use crate::cursor::column::{ColumnCursor, dest_slice};
use crate::cursor::reader::{ReaderHandle, TextReader};
use crate::decode::CharacterDecoder;
use crate::error::{Error, Result};
use crate::opts::{AccessMode, Opts};
use crate::protocol::{ColumnDescription, DataRow, parse_row_description};
use crate::value::Value;
use crate::window::ByteWindow;

type SharedCursor = Rc<RefCell<ColumnCursor>>;

#[derive(Debug)]
enum CursorState {
    Idle,
    RowLoaded(LoadedRow),
    Closed,
}

#[derive(Debug)]
struct LoadedRow {
    row: DataRow,
    /// Created on first access
    cursors: Vec<Option<SharedCursor>>,
    /// Last column visited, for the sequential ordering check
    current: Option<usize>,
}

/// Cursor over the rows of one result set.
///
/// ```rs
/// let mut cursor = RowCursor::from_row_description(&description, opts)?;
/// cursor.advance_row(DataRow::parse(payload)?)?;
/// let s = cursor.get_string(0)?;
/// let mut reader = cursor.get_text_reader(1)?;
/// ```
///
/// In [`AccessMode::Sequential`] columns must be visited in non-decreasing order and characters
/// within a column at non-decreasing offsets; leaving a column releases it and disposes its
/// reader. In both modes, moving to the next row disposes every reader of the previous one.
#[derive(Debug)]
pub struct RowCursor {
    opts: Opts,
    decoder: CharacterDecoder,
    columns: Vec<ColumnDescription>,
    state: CursorState,
    readers: Vec<Weak<ReaderHandle>>,
}

impl RowCursor {
    pub fn new(columns: Vec<ColumnDescription>, opts: Opts) -> Self {
        Self {
            decoder: CharacterDecoder::new(opts.buffer_size),
            opts,
            columns,
            state: CursorState::Idle,
            readers: Vec::new(),
        }
    }

    /// Build a cursor from a RowDescription payload
    pub fn from_row_description(payload: &[u8], opts: Opts) -> Result<Self> {
        Ok(Self::new(parse_row_description(payload)?, opts))
    }

    pub fn access_mode(&self) -> AccessMode {
        self.opts.access_mode
    }

    pub fn columns(&self) -> &[ColumnDescription] {
        &self.columns
    }

    pub fn field_count(&self) -> usize {
        self.columns.len()
    }

    /// Last column visited in the current row
    pub fn current_column(&self) -> Option<usize> {
        match &self.state {
            CursorState::RowLoaded(loaded) => loaded.current,
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, CursorState::Closed)
    }

    /// Make `row` the current row.
    ///
    /// Every reader of the previous row is disposed.
    #[tracing::instrument(skip_all)]
    pub fn advance_row(&mut self, row: DataRow) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Disposed("row cursor"));
        }
        if row.num_columns() != self.columns.len() {
            warn!(
                expected = self.columns.len(),
                actual = row.num_columns(),
                "row does not match its description"
            );
            return Err(Error::InvalidPacket);
        }
        self.dispose_readers(|_| true);
        let cursors = (0..row.num_columns()).map(|_| None).collect();
        self.state = CursorState::RowLoaded(LoadedRow {
            row,
            cursors,
            current: None,
        });
        Ok(())
    }

    /// Close the result set. Later calls fail with `Disposed`.
    pub fn close(&mut self) {
        self.dispose_readers(|_| true);
        self.state = CursorState::Closed;
    }

    /// Like [`RowCursor::close`], for a result set cut short by the transport
    pub fn abort(&mut self) {
        warn!(open_readers = self.live_readers(), "row cursor aborted");
        self.close();
    }

    /// Move to column `col` without reading it.
    ///
    /// Sequential: moving backwards fails, moving forwards releases the column being left and
    /// disposes its reader.
    pub fn advance_column(&mut self, col: usize) -> Result<()> {
        self.column(col)?;
        self.column_cursor(col).map(drop)
    }

    pub fn is_null(&self, col: usize) -> Result<bool> {
        match &self.state {
            CursorState::RowLoaded(loaded) => loaded.row.is_null(col),
            CursorState::Idle => Err(Error::InvalidState("no row is loaded".to_string())),
            CursorState::Closed => Err(Error::Disposed("row cursor")),
        }
    }

    /// The whole value of a text column
    pub fn get_string(&mut self, col: usize) -> Result<String> {
        self.check_text(col)?;
        let cursor = self.column_cursor(col)?;
        let mut cursor = borrow(&cursor)?;
        let mut out = String::with_capacity(cursor.byte_len());
        cursor.materialize(&mut out)?;
        Ok(out)
    }

    /// The whole value of a text column as characters
    pub fn get_char_array(&mut self, col: usize) -> Result<Vec<char>> {
        self.check_text(col)?;
        let cursor = self.column_cursor(col)?;
        let mut cursor = borrow(&cursor)?;
        let mut out = Vec::with_capacity(cursor.byte_len());
        cursor.materialize(&mut out)?;
        Ok(out)
    }

    /// Copy up to `count` characters starting at character `char_offset` into
    /// `dest[dest_offset..]`, returning how many were copied.
    ///
    /// Without a destination, returns the total character length of the column. In
    /// sequential mode this consumes the column.
    pub fn get_chars(
        &mut self,
        col: usize,
        char_offset: usize,
        dest: Option<&mut [char]>,
        dest_offset: usize,
        count: usize,
    ) -> Result<usize> {
        let dest = dest
            .map(|dest| dest_slice(dest, dest_offset, count))
            .transpose()?;
        self.check_text(col)?;
        let cursor = self.column_cursor(col)?;
        let mut cursor = borrow(&cursor)?;
        cursor.read(char_offset, dest, 0, count)
    }

    /// Open a character stream over a text column.
    ///
    /// Sequential: one open reader per column, sharing the column's position. Buffered: any
    /// number, each starting from the first character.
    pub fn get_text_reader(&mut self, col: usize) -> Result<TextReader> {
        self.check_text(col)?;
        let cursor = self.column_cursor(col)?;
        self.readers
            .retain(|handle| handle.upgrade().is_some_and(|h| !h.is_disposed()));

        let reader = if self.access_mode().is_sequential() {
            let busy = self
                .readers
                .iter()
                .filter_map(Weak::upgrade)
                .any(|h| h.column() == col);
            if busy {
                return Err(Error::InvalidState(format!(
                    "a text reader is already open on column {col}"
                )));
            }
            TextReader::open(col, cursor)
        } else {
            let fork = borrow(&cursor)?.fork();
            TextReader::open(col, Rc::new(RefCell::new(fork)))
        };
        self.readers.push(Rc::downgrade(reader.handle()));
        Ok(reader)
    }

    /// Value of a single-byte `"char"` column; the byte maps to the code point of the same value
    pub fn get_char(&mut self, col: usize) -> Result<char> {
        self.check_type(col, |ty| ty == PgType::Char, "\"char\"")?;
        self.check_not_null(col)?;
        let cursor = self.column_cursor(col)?;
        let bytes = borrow(&cursor)?.take_bytes()?;
        Ok(bytes.first().map_or('\0', |&b| char::from(b)))
    }

    /// Value of a text-format `smallint` or `integer` column
    pub fn get_i32(&mut self, col: usize) -> Result<i32> {
        self.check_type(
            col,
            |ty| matches!(ty, PgType::Int2 | PgType::Int4),
            "smallint or integer",
        )?;
        self.check_not_null(col)?;
        let cursor = self.column_cursor(col)?;
        let bytes = borrow(&cursor)?.take_bytes()?;
        parse_int(&bytes)
    }

    /// The column value in its natural representation
    pub fn get_value(&mut self, col: usize) -> Result<Value> {
        let ty = self.column(col)?.pg_type();
        if self.is_null(col)? {
            self.column_cursor(col)?;
            return Ok(Value::Null);
        }
        match ty {
            Some(PgType::Char) => self.get_char(col).map(Value::Char),
            Some(ty) if ty.is_text_like() => self.get_string(col).map(Value::Text),
            Some(ty) if ty.is_integer() => {
                let cursor = self.column_cursor(col)?;
                let bytes = borrow(&cursor)?.take_bytes()?;
                parse_int(&bytes).map(Value::Int)
            }
            Some(PgType::Bool) => {
                let cursor = self.column_cursor(col)?;
                let bytes = borrow(&cursor)?.take_bytes()?;
                match bytes.as_slice() {
                    b"t" => Ok(Value::Bool(true)),
                    b"f" => Ok(Value::Bool(false)),
                    _ => Err(Error::InvalidCast(format!(
                        "column {col} holds an invalid boolean"
                    ))),
                }
            }
            _ => {
                let cursor = self.column_cursor(col)?;
                let bytes = borrow(&cursor)?.take_bytes()?;
                Ok(Value::Bytes(bytes))
            }
        }
    }

    fn column(&self, col: usize) -> Result<&ColumnDescription> {
        self.columns.get(col).ok_or_else(|| {
            Error::OutOfRange(format!(
                "column index {col} (result has {} columns)",
                self.columns.len()
            ))
        })
    }

    fn check_type(
        &self,
        col: usize,
        accept: impl Fn(PgType) -> bool,
        wanted: &str,
    ) -> Result<()> {
        let column = self.column(col)?;
        if !column.pg_type().is_some_and(accept) {
            return Err(Error::InvalidCast(format!(
                "column {col} ({}) has type {}, expected {wanted}",
                column.name,
                column.type_name()
            )));
        }
        Ok(())
    }

    fn check_not_null(&self, col: usize) -> Result<()> {
        if self.is_null(col)? {
            return Err(Error::InvalidCast(format!("column {col} is NULL")));
        }
        Ok(())
    }

    fn check_text(&self, col: usize) -> Result<()> {
        self.check_type(col, PgType::is_text_like, "text")?;
        self.check_not_null(col)
    }

    /// Move to column `col` and return its cursor.
    fn column_cursor(&mut self, col: usize) -> Result<SharedCursor> {
        let mode = self.opts.access_mode;
        let decoder = self.decoder;
        let Self { state, readers, .. } = self;
        let loaded = match state {
            CursorState::RowLoaded(loaded) => loaded,
            CursorState::Idle => return Err(Error::InvalidState("no row is loaded".to_string())),
            CursorState::Closed => return Err(Error::Disposed("row cursor")),
        };

        if mode.is_sequential() {
            match loaded.current {
                Some(current) if col < current => {
                    return Err(Error::seek_back(&format!(
                        "column {col} is before the current column {current}"
                    )));
                }
                Some(current) if col > current => {
                    let disposed = dispose_where(readers, |h| h.column() == current);
                    if let Some(Some(left)) = loaded.cursors.get(current) {
                        borrow(left)?.close();
                    }
                    debug!(from = current, to = col, disposed, "left column");
                }
                _ => {}
            }
        }
        loaded.current = Some(col);

        let slot = loaded.cursors.get_mut(col).ok_or_else(|| {
            Error::OutOfRange(format!("column index {col} outside the current row"))
        })?;
        if let Some(cursor) = slot {
            return Ok(Rc::clone(cursor));
        }
        let range = loaded.row.field(col)?.unwrap_or_default();
        let window = ByteWindow::new(Rc::clone(loaded.row.buffer()), range, mode)?;
        let cursor = Rc::new(RefCell::new(ColumnCursor::new(col, window, decoder)));
        *slot = Some(Rc::clone(&cursor));
        Ok(cursor)
    }

    fn live_readers(&self) -> usize {
        self.readers
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|h| !h.is_disposed())
            .count()
    }

    fn dispose_readers(&mut self, pred: impl Fn(&ReaderHandle) -> bool) {
        let disposed = dispose_where(&mut self.readers, pred);
        if disposed > 0 {
            debug!(disposed, "disposed text readers");
        }
    }
}

impl Drop for RowCursor {
    fn drop(&mut self) {
        self.dispose_readers(|_| true);
    }
}

/// Dispose the live readers matching `pred` and forget them. Returns how many were disposed.
fn dispose_where(
    readers: &mut Vec<Weak<ReaderHandle>>,
    pred: impl Fn(&ReaderHandle) -> bool,
) -> usize {
    let mut disposed = 0;
    readers.retain(|weak| {
        let Some(handle) = weak.upgrade() else {
            return false;
        };
        if handle.is_disposed() {
            return false;
        }
        if pred(&handle) {
            handle.dispose();
            disposed += 1;
            return false;
        }
        true
    });
    disposed
}

fn borrow(cursor: &SharedCursor) -> Result<RefMut<'_, ColumnCursor>> {
    cursor
        .try_borrow_mut()
        .map_err(|e| Error::InvalidState(format!("column cursor is in use: {e}")))
}

fn parse_int<T: std::str::FromStr>(bytes: &[u8]) -> Result<T> {
    from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            Error::InvalidCast(format!(
                "'{}' is not a valid integer",
                String::from_utf8_lossy(bytes)
            ))
        })
}
