//! # Wire Codec
//!
//! A streaming parser that reconstructs command frames from arbitrarily
//! chunked byte streams, and a writer that serializes reply frames.
//!
//! ## Design Principles
//! 1. **Resumable State Machine**: The parser never blocks on a partial
//!    frame; it reports "need more" and resumes on the next call with
//!    whatever additional bytes arrive.
//! 2. **Zero-Copy Where Possible**: Parsed bulk strings are drained
//!    directly out of the caller's `BytesMut`, not copied twice.
//! 3. **Fail Fast on Framing**: Any malformed header is fatal to the
//!    connection; partial data is never silently discarded.

use bytes::{Buf, BytesMut};

/// Default ceiling on a single bulk-string length, bounding per-frame memory.
pub const DEFAULT_MAX_BULK_LEN: i64 = 64 * 1024 * 1024;

/// A fatal parsing error. The connection must be closed after writing a
/// single error reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespError {
    /// Leading byte of a header was not `*` or `$`.
    UnexpectedByte,
    /// A decimal length/count field was not a valid non-negative integer.
    InvalidLength,
    /// Bulk string length exceeds the configured maximum.
    BulkTooLarge,
    /// The CRLF terminator was missing where required.
    MissingCrlf,
    /// End of stream occurred in the middle of a frame.
    UnexpectedEof,
}

impl RespError {
    /// Renders this error as the text of a wire error reply.
    pub fn message(&self) -> &'static str {
        match self {
            RespError::UnexpectedByte => "protocol error: expected '*' or '$'",
            RespError::InvalidLength => "protocol error: invalid length",
            RespError::BulkTooLarge => "protocol error: bulk string too large",
            RespError::MissingCrlf => "protocol error: expected CRLF",
            RespError::UnexpectedEof => "protocol error: unexpected end of stream",
        }
    }
}

/// Parser progress, tracked so a partial frame can resume across reads.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for the `*<count>\r\n` array header.
    ExpectArrayHeader,
    /// Waiting for the `$<len>\r\n` header of the next element.
    ExpectBulkHeader { remaining: usize, items: Vec<Vec<u8>> },
    /// Waiting for `len` bytes of body plus the trailing CRLF.
    ExpectBulkBody {
        remaining: usize,
        items: Vec<Vec<u8>>,
        len: usize,
    },
}

/// Streaming command-frame parser.
///
/// A command frame is an Array of BulkStrings (spec.md §4.1). The parser
/// consumes exactly the bytes of completed frames from the supplied buffer
/// and leaves the rest for the next call.
#[derive(Debug, Clone)]
pub struct RespParser {
    state: State,
    max_bulk_len: i64,
}

impl Default for RespParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RespParser {
    /// Creates a parser with the default bulk-string length ceiling.
    pub fn new() -> Self {
        Self::with_max_bulk_len(DEFAULT_MAX_BULK_LEN)
    }

    /// Creates a parser with an explicit bulk-string length ceiling.
    pub fn with_max_bulk_len(max_bulk_len: i64) -> Self {
        RespParser {
            state: State::ExpectArrayHeader,
            max_bulk_len,
        }
    }

    /// Attempts to parse one command frame out of `buffer`.
    ///
    /// Returns `Ok(Some(args))` when a full frame was consumed,
    /// `Ok(None)` when more bytes are needed, or `Err` on a malformed
    /// frame (fatal; the caller should close the connection after
    /// replying).
    pub fn parse(&mut self, buffer: &mut BytesMut) -> Result<Option<Vec<Vec<u8>>>, RespError> {
        loop {
            match &mut self.state {
                State::ExpectArrayHeader => {
                    let count = match read_header(buffer, b'*')? {
                        Some(count) => count,
                        None => return Ok(None),
                    };
                    if count < 0 {
                        return Err(RespError::InvalidLength);
                    }
                    self.state = State::ExpectBulkHeader {
                        remaining: count as usize,
                        items: Vec::with_capacity(count as usize),
                    };
                }
                State::ExpectBulkHeader { remaining, items } => {
                    if *remaining == 0 {
                        let args = std::mem::take(items);
                        self.state = State::ExpectArrayHeader;
                        return Ok(Some(args));
                    }

                    let len = match read_header(buffer, b'$')? {
                        Some(len) => len,
                        None => return Ok(None),
                    };
                    if len < 0 || len > self.max_bulk_len {
                        return Err(RespError::BulkTooLarge);
                    }

                    let remaining = *remaining;
                    let items = std::mem::take(items);
                    self.state = State::ExpectBulkBody {
                        remaining,
                        items,
                        len: len as usize,
                    };
                }
                State::ExpectBulkBody {
                    remaining,
                    items,
                    len,
                } => {
                    let needed = *len + 2;
                    if buffer.len() < needed {
                        return Ok(None);
                    }

                    let body = buffer.split_to(*len);
                    if &buffer[..2] != b"\r\n" {
                        return Err(RespError::MissingCrlf);
                    }
                    buffer.advance(2);

                    items.push(body.to_vec());
                    let items = std::mem::take(items);
                    let remaining = *remaining - 1;
                    self.state = State::ExpectBulkHeader { remaining, items };
                }
            }
        }
    }
}

/// Reads a `<prefix><decimal>\r\n` header line, returning `None` if the
/// buffer does not yet contain a full line.
fn read_header(buffer: &mut BytesMut, prefix: u8) -> Result<Option<i64>, RespError> {
    let line_end = match find_crlf(buffer) {
        Some(pos) => pos,
        None => return Ok(None),
    };

    if buffer.is_empty() || buffer[0] != prefix {
        return Err(RespError::UnexpectedByte);
    }

    let digits = &buffer[1..line_end];
    let value = parse_i64(digits)?;
    buffer.advance(line_end + 2);
    Ok(Some(value))
}

fn find_crlf(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(2)
        .position(|pair| pair == b"\r\n")
}

fn parse_i64(digits: &[u8]) -> Result<i64, RespError> {
    if digits.is_empty() {
        return Err(RespError::InvalidLength);
    }

    let (negative, digits) = match digits[0] {
        b'-' => (true, &digits[1..]),
        _ => (false, digits),
    };
    if digits.is_empty() || !digits.iter().all(|b| b.is_ascii_digit()) {
        return Err(RespError::InvalidLength);
    }

    let text = std::str::from_utf8(digits).map_err(|_| RespError::InvalidLength)?;
    let magnitude: i64 = text.parse().map_err(|_| RespError::InvalidLength)?;
    Ok(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(input: &[u8]) -> Vec<Vec<Vec<u8>>> {
        let mut parser = RespParser::new();
        let mut buffer = BytesMut::from(input);
        let mut frames = Vec::new();
        while let Some(frame) = parser.parse(&mut buffer).unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn parses_single_command() {
        let frames = parse_all(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n");
        assert_eq!(frames, vec![vec![b"GET".to_vec(), b"k".to_vec()]]);
    }

    #[test]
    fn parses_pipelined_commands() {
        let input = b"*1\r\n$4\r\nPING\r\n*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n";
        let frames = parse_all(input);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], vec![b"PING".to_vec()]);
        assert_eq!(frames[1], vec![b"SET".to_vec(), b"k".to_vec(), b"v".to_vec()]);
    }

    #[test]
    fn resumes_across_chunk_boundaries() {
        let mut parser = RespParser::new();
        let mut buffer = BytesMut::from(&b"*2\r\n$3\r\nGET\r\n"[..]);
        assert_eq!(parser.parse(&mut buffer).unwrap(), None);

        buffer.extend_from_slice(b"$1\r\nk");
        assert_eq!(parser.parse(&mut buffer).unwrap(), None);

        buffer.extend_from_slice(b"\r\n");
        let frame = parser.parse(&mut buffer).unwrap();
        assert_eq!(frame, Some(vec![b"GET".to_vec(), b"k".to_vec()]));
    }

    #[test]
    fn rejects_wrong_leading_byte() {
        let mut parser = RespParser::new();
        let mut buffer = BytesMut::from(&b"!2\r\n"[..]);
        assert_eq!(parser.parse(&mut buffer), Err(RespError::UnexpectedByte));
    }

    #[test]
    fn rejects_negative_array_count() {
        let mut parser = RespParser::new();
        let mut buffer = BytesMut::from(&b"*-1\r\n"[..]);
        assert_eq!(parser.parse(&mut buffer), Err(RespError::InvalidLength));
    }

    #[test]
    fn rejects_missing_crlf_after_bulk_body() {
        let mut parser = RespParser::new();
        let mut buffer = BytesMut::from(&b"*1\r\n$3\r\nabcXX"[..]);
        assert_eq!(parser.parse(&mut buffer), Err(RespError::MissingCrlf));
    }

    #[test]
    fn rejects_oversized_bulk_string() {
        let mut parser = RespParser::with_max_bulk_len(4);
        let mut buffer = BytesMut::from(&b"*1\r\n$5\r\n"[..]);
        assert_eq!(parser.parse(&mut buffer), Err(RespError::BulkTooLarge));
    }

    #[test]
    fn empty_array_yields_empty_frame() {
        let frames = parse_all(b"*0\r\n");
        assert_eq!(frames, vec![Vec::<Vec<u8>>::new()]);
    }
}
