//! Character-accurate UTF-8 decoding over a [`ByteWindow`].
//!
//! Columns are decoded in chunks of at most `chunk_size` bytes. A character whose bytes
//! straddle two chunks is carried between calls in an explicit [`Residue`], so the number of
//! characters produced is exact no matter where chunk boundaries fall.

use crate::constant::MAX_CHAR_LEN;
use crate::error::{Error, Result, eyre};
use crate::guard::reject_nul;
use crate::window::ByteWindow;

/// Destination of decoded characters
pub trait CharSink {
    fn push(&mut self, c: char);

    fn push_str(&mut self, s: &str) {
        for c in s.chars() {
            self.push(c);
        }
    }
}

impl CharSink for String {
    fn push(&mut self, c: char) {
        String::push(self, c);
    }

    fn push_str(&mut self, s: &str) {
        String::push_str(self, s);
    }
}

impl CharSink for Vec<char> {
    fn push(&mut self, c: char) {
        Vec::push(self, c);
    }

    fn push_str(&mut self, s: &str) {
        self.extend(s.chars());
    }
}

/// Drops every character; used for skipping and counting
#[derive(Debug, Default)]
pub struct Discard;

impl CharSink for Discard {
    fn push(&mut self, _c: char) {}

    fn push_str(&mut self, _s: &str) {}
}

/// Writes into a caller-provided `[char]` buffer.
///
/// The decoder is never asked for more characters than the slice holds.
#[derive(Debug)]
pub struct SliceSink<'a> {
    buf: &'a mut [char],
    written: usize,
}

impl<'a> SliceSink<'a> {
    pub fn new(buf: &'a mut [char]) -> Self {
        Self { buf, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl CharSink for SliceSink<'_> {
    fn push(&mut self, c: char) {
        if let Some(slot) = self.buf.get_mut(self.written) {
            *slot = c;
            self.written += 1;
        }
    }
}

/// Leading bytes of a character whose remaining bytes have not been decoded yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Residue {
    bytes: [u8; MAX_CHAR_LEN],
    len: usize,
}

impl Residue {
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    fn start(&mut self, prefix: &[u8]) -> Result<()> {
        let slot = self
            .bytes
            .get_mut(..prefix.len())
            .filter(|_| prefix.len() < MAX_CHAR_LEN)
            .ok_or_else(|| {
                Error::LibraryBug(eyre!("incomplete sequence of {} bytes", prefix.len()))
            })?;
        slot.copy_from_slice(prefix);
        self.len = prefix.len();
        Ok(())
    }

    /// Feed bytes from the start of `chunk` until the pending character is complete.
    ///
    /// Returns the number of bytes taken and the character, if it was completed.
    fn complete(&mut self, chunk: &[u8]) -> Result<(usize, Option<char>)> {
        let width = utf8_width(self.bytes[0]).ok_or_else(|| {
            Error::LibraryBug(eyre!("residue starts with 0x{:02x}", self.bytes[0]))
        })?;
        let take = width.saturating_sub(self.len).min(chunk.len());
        self.bytes[self.len..self.len + take].copy_from_slice(&chunk[..take]);
        self.len += take;

        match simdutf8::compat::from_utf8(self.as_bytes()) {
            Ok(s) => {
                let c = s.chars().next();
                *self = Self::default();
                Ok((take, c))
            }
            Err(e) if e.error_len().is_none() => Ok((take, None)),
            Err(_) => Err(Error::invalid_byte_sequence(self.as_bytes())),
        }
    }
}

fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

/// Result of a decode call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Bytes consumed, including bytes moved into the residue
    pub bytes: usize,
    /// Complete characters handed to the sink
    pub chars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterDecoder {
    chunk_size: usize,
}

impl CharacterDecoder {
    /// `chunk_size` is clamped so that every chunk can hold at least one whole character
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(MAX_CHAR_LEN),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Decode up to `char_count` characters starting at byte `from`.
    ///
    /// Stops on a character boundary. Producing fewer than `char_count` characters means the
    /// column ended first.
    pub fn decode_count(
        &self,
        window: &ByteWindow,
        from: usize,
        residue: &mut Residue,
        char_count: usize,
        sink: &mut impl CharSink,
    ) -> Result<Decoded> {
        let end = window.len();
        let mut pos = from;
        let mut decoded = Decoded::default();

        while decoded.chars < char_count && pos < end {
            // A small budget never needs more than MAX_CHAR_LEN bytes per character
            let wanted = (char_count - decoded.chars).saturating_mul(MAX_CHAR_LEN);
            let len = (end - pos).min(self.chunk_size).min(wanted);
            let chunk = window.slice(pos, len)?;
            let step = decode_chunk(chunk, residue, char_count - decoded.chars, sink)?;
            tracing::trace!(pos, bytes = step.bytes, chars = step.chars, "decoded chunk");

            pos += step.bytes;
            decoded.bytes += step.bytes;
            decoded.chars += step.chars;
            if step.bytes < len {
                break;
            }
        }

        if pos == end && !residue.is_empty() {
            return Err(Error::invalid_byte_sequence(residue.as_bytes()));
        }
        Ok(decoded)
    }

    /// Decode everything from byte `from` to the end of the window.
    pub fn decode_all(
        &self,
        window: &ByteWindow,
        from: usize,
        residue: &mut Residue,
        sink: &mut impl CharSink,
    ) -> Result<Decoded> {
        self.decode_count(window, from, residue, usize::MAX, sink)
    }
}

enum Tail<'a> {
    Clean,
    Incomplete(&'a [u8]),
    Invalid(&'a [u8]),
}

fn decode_chunk(
    chunk: &[u8],
    residue: &mut Residue,
    budget: usize,
    sink: &mut impl CharSink,
) -> Result<Decoded> {
    let mut decoded = Decoded::default();

    if !residue.is_empty() {
        let (taken, completed) = residue.complete(chunk)?;
        decoded.bytes += taken;
        let Some(c) = completed else {
            return Ok(decoded);
        };
        let mut utf8 = [0u8; MAX_CHAR_LEN];
        reject_nul(c.encode_utf8(&mut utf8))?;
        sink.push(c);
        decoded.chars += 1;
    }

    let rest = &chunk[decoded.bytes..];
    let (valid, tail) = match simdutf8::compat::from_utf8(rest) {
        Ok(s) => (s, Tail::Clean),
        Err(e) => {
            let (ok, bad) = rest.split_at(e.valid_up_to());
            let s = std::str::from_utf8(ok).map_err(|e| Error::LibraryBug(e.into()))?;
            match e.error_len() {
                Some(_) => (s, Tail::Invalid(bad)),
                None => (s, Tail::Incomplete(bad)),
            }
        }
    };

    let want = budget - decoded.chars;
    let mut count = 0;
    let mut split = valid.len();
    for (idx, _) in valid.char_indices() {
        if count == want {
            split = idx;
            break;
        }
        count += 1;
    }
    let (text, _) = valid.split_at(split);
    reject_nul(text)?;
    sink.push_str(text);
    decoded.bytes += text.len();
    decoded.chars += count;

    if count == want {
        return Ok(decoded);
    }

    match tail {
        Tail::Clean => {}
        Tail::Invalid(bad) => return Err(Error::invalid_byte_sequence(bad)),
        Tail::Incomplete(bad) => {
            residue.start(bad)?;
            decoded.bytes += bad.len();
        }
    }
    Ok(decoded)
}
