//! Line framing for the incoming byte stream

use crate::smtp::error::SmtpError;

/// Default maximum line length accepted by the protocol layer
pub const DEFAULT_LINE_LIMIT: usize = 1000;

/// Default line delimiter
pub const DEFAULT_DELIMITER: &[u8] = b"\r\n";

/// Splits an unbounded sequence of byte chunks into delimiter-terminated lines.
///
/// A line may arrive split across any number of [`LineFramer::write`] calls;
/// the lines handed to the callback are the same as if the whole input had
/// been written at once. The delimiter itself is never part of a line.
///
/// Memory is bounded: a line longer than `limit` bytes is discarded together
/// with everything buffered, and the write fails with
/// [`SmtpError::LineTooLong`]. The framer stays usable afterwards.
#[derive(Debug, Clone)]
pub struct LineFramer {
    buffer: Vec<u8>,
    limit: usize,
    delimiter: Vec<u8>,
}

impl LineFramer {
    /// Create a framer with the given line limit and delimiter
    pub fn new(limit: usize, delimiter: &[u8]) -> Self {
        Self {
            buffer: Vec::new(),
            limit,
            delimiter: delimiter.to_vec(),
        }
    }

    /// Create a CRLF framer with the given line limit
    pub fn with_limit(limit: usize) -> Self {
        Self::new(limit, DEFAULT_DELIMITER)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    /// Bytes received but not yet terminated by a delimiter
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    pub fn set_limit(&mut self, limit: usize) -> &mut Self {
        self.limit = limit;
        self
    }

    /// Change the delimiter. An empty delimiter is ignored.
    pub fn set_delimiter(&mut self, delimiter: &[u8]) -> &mut Self {
        if !delimiter.is_empty() {
            self.delimiter = delimiter.to_vec();
        }
        self
    }

    /// Append `chunk` and hand every complete line to `on_line`, in order.
    ///
    /// Lines completed before an over-long line are still delivered; the
    /// over-long line and anything after it in the buffer are dropped.
    pub fn write<F>(&mut self, chunk: &[u8], mut on_line: F) -> Result<(), SmtpError>
    where
        F: FnMut(&[u8]),
    {
        if chunk.is_empty() {
            return Ok(());
        }
        self.buffer.extend_from_slice(chunk);

        let delimiter_len = self.delimiter.len();
        let mut start = 0;
        while let Some(pos) = find(&self.buffer[start..], &self.delimiter) {
            if pos > self.limit {
                return Err(self.overflow());
            }
            on_line(&self.buffer[start..start + pos]);
            start += pos + delimiter_len;
        }
        self.buffer.drain(..start);

        // Even a delimiter starting right at `limit` would be complete by now.
        if self.buffer.len() >= self.limit + delimiter_len {
            return Err(self.overflow());
        }

        Ok(())
    }

    /// Drop any buffered partial line
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    fn overflow(&mut self) -> SmtpError {
        self.buffer.clear();
        SmtpError::LineTooLong { max: self.limit }
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_LIMIT, DEFAULT_DELIMITER)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
