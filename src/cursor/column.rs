use crate::decode::{CharSink, CharacterDecoder, Discard, Residue, SliceSink};
use crate::error::{Error, Result};
use crate::opts::AccessMode;
use crate::window::ByteWindow;

/// Where a column cursor stands: bytes consumed, characters produced, and the leading
/// bytes of a character that is not complete yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub byte_offset: usize,
    pub char_offset: usize,
    pub residue: Residue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnState {
    Untouched,
    InProgress,
    Exhausted,
}

/// Decoding state of one column.
///
/// Every operation works on a copy of the [`Position`] and commits it only once the whole
/// call succeeded, so a failed call leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct ColumnCursor {
    index: usize,
    window: ByteWindow,
    decoder: CharacterDecoder,
    position: Position,
    state: ColumnState,
    closed: bool,
}

impl ColumnCursor {
    pub fn new(index: usize, window: ByteWindow, decoder: CharacterDecoder) -> Self {
        Self {
            index,
            window,
            decoder,
            position: Position::default(),
            state: ColumnState::Untouched,
            closed: false,
        }
    }

    /// An independent cursor over the same bytes, positioned at the start
    pub fn fork(&self) -> Self {
        Self::new(self.index, self.window.rewound(), self.decoder)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn mode(&self) -> AccessMode {
        self.window.mode()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn state(&self) -> ColumnState {
        self.state
    }

    pub fn byte_len(&self) -> usize {
        self.window.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the column. Later calls fail with `Disposed`.
    pub fn close(&mut self) {
        self.closed = true;
        self.window.release(self.window.len());
    }

    /// Extract characters starting at character offset `char_offset`.
    ///
    /// With a destination, copies at most `max_chars` characters into
    /// `dest[dest_offset..]` and returns how many were copied. Without one, `char_offset` is
    /// ignored and the total character length of the column is returned; this consumes the
    /// column in sequential mode because counting requires decoding.
    pub fn read(
        &mut self,
        char_offset: usize,
        dest: Option<&mut [char]>,
        dest_offset: usize,
        max_chars: usize,
    ) -> Result<usize> {
        let dest = match dest {
            Some(dest) => Some(dest_slice(dest, dest_offset, max_chars)?),
            None => None,
        };
        self.ensure_open()?;

        match dest {
            None => {
                let mut pos = self.position;
                self.decode(&mut pos, usize::MAX, &mut Discard)?;
                if self.mode().is_sequential() {
                    self.commit(pos);
                }
                Ok(pos.char_offset)
            }
            Some(dest) => {
                let mut pos = self.seek(char_offset)?;
                let mut sink = SliceSink::new(dest);
                let copied = self.decode(&mut pos, max_chars, &mut sink)?;
                self.commit(pos);
                Ok(copied)
            }
        }
    }

    /// Decode up to `max_chars` characters from the current position into `sink`.
    pub fn read_next(&mut self, max_chars: usize, sink: &mut impl CharSink) -> Result<usize> {
        self.ensure_open()?;
        let mut pos = self.position;
        let n = self.decode(&mut pos, max_chars, sink)?;
        self.commit(pos);
        Ok(n)
    }

    /// The next character without consuming it
    pub fn peek(&self) -> Result<Option<char>> {
        self.ensure_open()?;
        let mut pos = self.position;
        let mut one = ['\0'];
        let n = self.decode(&mut pos, 1, &mut SliceSink::new(&mut one))?;
        Ok((n == 1).then_some(one[0]))
    }

    /// Decode the whole value into `sink`.
    ///
    /// In sequential mode a column can be materialized only while untouched.
    pub fn materialize(&mut self, sink: &mut impl CharSink) -> Result<usize> {
        self.ensure_open()?;
        if self.mode().is_sequential() && self.state != ColumnState::Untouched {
            return Err(Error::seek_back(&format!(
                "column {} was already read",
                self.index
            )));
        }
        let mut pos = Position::default();
        let n = self.decode(&mut pos, usize::MAX, sink)?;
        self.commit(pos);
        Ok(n)
    }

    /// Raw bytes of a column that is not read as characters.
    ///
    /// Same one-shot rule as [`ColumnCursor::materialize`] in sequential mode.
    pub fn take_bytes(&mut self) -> Result<Vec<u8>> {
        self.ensure_open()?;
        if self.mode().is_sequential() && self.state != ColumnState::Untouched {
            return Err(Error::seek_back(&format!(
                "column {} was already read",
                self.index
            )));
        }
        let bytes = self.window.slice(0, self.window.len())?.to_vec();
        self.state = ColumnState::Exhausted;
        self.position.byte_offset = self.window.len();
        self.window.release(self.window.len());
        Ok(bytes)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Disposed("column cursor"));
        }
        Ok(())
    }

    /// Position of character `char_offset`, or the end of the column if it is shorter.
    fn seek(&self, char_offset: usize) -> Result<Position> {
        let mut pos = self.position;
        if char_offset < pos.char_offset {
            if self.mode().is_sequential() {
                return Err(Error::seek_back(&format!(
                    "character {char_offset} of column {} was already consumed (at {})",
                    self.index, pos.char_offset
                )));
            }
            tracing::trace!(column = self.index, char_offset, "re-decoding from start");
            pos = Position::default();
        }
        let skip = char_offset - pos.char_offset;
        if skip > 0 {
            self.decode(&mut pos, skip, &mut Discard)?;
        }
        Ok(pos)
    }

    fn decode(
        &self,
        pos: &mut Position,
        max_chars: usize,
        sink: &mut impl CharSink,
    ) -> Result<usize> {
        let decoded = self.decoder.decode_count(
            &self.window,
            pos.byte_offset,
            &mut pos.residue,
            max_chars,
            sink,
        )?;
        pos.byte_offset += decoded.bytes;
        pos.char_offset += decoded.chars;
        Ok(decoded.chars)
    }

    fn commit(&mut self, pos: Position) {
        self.position = pos;
        self.window.release(pos.byte_offset);
        self.state = if pos.byte_offset == self.window.len() && pos.residue.is_empty() {
            ColumnState::Exhausted
        } else {
            ColumnState::InProgress
        };
    }
}

pub(crate) fn dest_slice(dest: &mut [char], offset: usize, count: usize) -> Result<&mut [char]> {
    let capacity = dest.len();
    offset
        .checked_add(count)
        .and_then(|end| dest.get_mut(offset..end))
        .ok_or(Error::BufferTooSmall {
            requested: count,
            offset,
            capacity,
        })
}
