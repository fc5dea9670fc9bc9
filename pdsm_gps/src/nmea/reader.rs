use tracing::trace;

use crate::constants::NMEA_MAX_SIZE;

/// Accumulates device bytes into newline-terminated lines.
///
/// A line that grows past [`NMEA_MAX_SIZE`] bytes is dropped whole: the
/// reader discards everything up to and including the next `\n`.
pub struct SentenceReader {
    buf: [u8; NMEA_MAX_SIZE + 1],
    pos: usize,
    overflow: bool,
    complete: bool,
}

impl Default for SentenceReader {
    fn default() -> Self {
        Self {
            buf: [0; NMEA_MAX_SIZE + 1],
            pos: 0,
            overflow: false,
            complete: false,
        }
    }
}

impl SentenceReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds `data` into the reader, returning an iterator-like object that
    /// yields each line completed by it.
    pub fn consume<'a>(&'a mut self, data: &'a [u8]) -> SentenceIter<'a> {
        SentenceIter {
            reader: self,
            data,
            offset: 0,
        }
    }

    /// Bytes of the line being accumulated.
    pub fn pending(&self) -> usize {
        if self.complete {
            0
        } else {
            self.pos
        }
    }

    pub fn is_overflowing(&self) -> bool {
        self.overflow
    }

    fn push(&mut self, c: u8) -> Option<usize> {
        if self.complete {
            self.pos = 0;
            self.complete = false;
        }

        if self.overflow {
            self.overflow = c != b'\n';
            return None;
        }

        if self.pos >= NMEA_MAX_SIZE {
            trace!("sentence longer than {} bytes dropped", NMEA_MAX_SIZE);
            // A newline here ends the dropped line itself.
            self.overflow = c != b'\n';
            self.pos = 0;
            return None;
        }

        self.buf[self.pos] = c;
        self.pos += 1;

        if c == b'\n' {
            self.complete = true;
            Some(self.pos)
        } else {
            None
        }
    }
}

/// Iterator-like view over the lines completed by one [`SentenceReader::consume`] call.
pub struct SentenceIter<'a> {
    reader: &'a mut SentenceReader,
    data: &'a [u8],
    offset: usize,
}

impl SentenceIter<'_> {
    /// Next complete line, terminator included.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&[u8]> {
        while self.offset < self.data.len() {
            let c = self.data[self.offset];
            self.offset += 1;
            if let Some(len) = self.reader.push(c) {
                return Some(&self.reader.buf[..len]);
            }
        }
        None
    }
}
