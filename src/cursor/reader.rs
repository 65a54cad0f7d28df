use std::cell::{Cell, RefCell, RefMut};
use std::rc::Rc;

use crate::cursor::column::ColumnCursor;
use crate::decode::SliceSink;
use crate::error::{Error, Result};

/// A live text reader as seen by the row cursor.
///
/// The row cursor only keeps a `Weak` to this and disposes it when the reader's column or row
/// goes away. Disposal drops the column cursor, and with it the row buffer it views.
#[derive(Debug)]
pub(crate) struct ReaderHandle {
    column: usize,
    cursor: RefCell<Option<Rc<RefCell<ColumnCursor>>>>,
    disposed: Cell<bool>,
}

impl ReaderHandle {
    pub(crate) fn column(&self) -> usize {
        self.column
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub(crate) fn dispose(&self) {
        self.disposed.set(true);
        self.cursor.replace(None);
    }

    fn cursor(&self) -> Result<Rc<RefCell<ColumnCursor>>> {
        if self.is_disposed() {
            return Err(Error::Disposed("text reader"));
        }
        self.cursor
            .borrow()
            .clone()
            .ok_or(Error::Disposed("text reader"))
    }
}

/// Pull-based character stream over one column.
///
/// Obtained from [`RowCursor::get_text_reader`](crate::RowCursor::get_text_reader). Reads
/// fail with [`Error::Disposed`] once the reader is closed, or once the row cursor moves to
/// another row (or, in sequential mode, another column).
#[derive(Debug)]
pub struct TextReader {
    handle: Rc<ReaderHandle>,
}

impl TextReader {
    pub(crate) fn open(column: usize, cursor: Rc<RefCell<ColumnCursor>>) -> Self {
        Self {
            handle: Rc::new(ReaderHandle {
                column,
                cursor: RefCell::new(Some(cursor)),
                disposed: Cell::new(false),
            }),
        }
    }

    pub(crate) fn handle(&self) -> &Rc<ReaderHandle> {
        &self.handle
    }

    pub fn column(&self) -> usize {
        self.handle.column
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_disposed()
    }

    /// Close the reader. Closing twice is a no-op.
    pub fn close(&mut self) {
        self.handle.dispose();
    }

    /// Read up to `count` characters into `buf[offset..]`.
    ///
    /// Returns 0 at the end of the column.
    pub fn read(&mut self, buf: &mut [char], offset: usize, count: usize) -> Result<usize> {
        let cursor = self.handle.cursor()?;
        let capacity = buf.len();
        let dest = offset
            .checked_add(count)
            .and_then(|end| buf.get_mut(offset..end))
            .ok_or(Error::BufferTooSmall {
                requested: count,
                offset,
                capacity,
            })?;
        let mut sink = SliceSink::new(dest);
        borrow(&cursor)?.read_next(count, &mut sink)
    }

    /// The next character without consuming it, `None` at the end of the column
    pub fn peek(&self) -> Result<Option<char>> {
        let cursor = self.handle.cursor()?;
        borrow(&cursor)?.peek()
    }

    /// Everything left in the column
    pub fn read_to_string(&mut self) -> Result<String> {
        let shared = self.handle.cursor()?;
        let mut cursor = borrow(&shared)?;
        let mut out = String::with_capacity(cursor.byte_len());
        cursor.read_next(usize::MAX, &mut out)?;
        Ok(out)
    }
}

fn borrow(cursor: &RefCell<ColumnCursor>) -> Result<RefMut<'_, ColumnCursor>> {
    cursor
        .try_borrow_mut()
        .map_err(|e| Error::InvalidState(format!("column cursor is in use: {e}")))
}

impl Iterator for TextReader {
    type Item = Result<char>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut one = ['\0'];
        match self.read(&mut one, 0, 1) {
            Ok(0) => None,
            Ok(_) => Some(Ok(one[0])),
            Err(e) => Some(Err(e)),
        }
    }
}
