//! # Wire Value Types
//!
//! The closed set of reply variants the wire protocol can carry, plus the
//! array-of-bulk-strings shape a command frame is restricted to. See
//! spec.md §3 and §4.1.

/// A fully decoded wire value.
///
/// Inbound command frames are always `Array` of `Bulk(Some(_))`; the other
/// variants only ever appear in replies written by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `+...\r\n`: short in-band status. Must not contain CR or LF.
    Simple(String),
    /// `-...\r\n`: short error text. Must not contain CR or LF.
    Error(String),
    /// `:...\r\n`: signed 64-bit decimal.
    Integer(i64),
    /// `$len\r\n...\r\n`, or `$-1\r\n` for `None` (Nil).
    Bulk(Option<Vec<u8>>),
    /// `*len\r\n...`, a sequence of frames. Used only for inbound commands.
    Array(Vec<Frame>),
}

impl Frame {
    /// Shorthand for the Nil bulk string.
    pub fn nil() -> Self {
        Frame::Bulk(None)
    }

    /// Shorthand for a present bulk string from owned bytes.
    pub fn bulk(data: impl Into<Vec<u8>>) -> Self {
        Frame::Bulk(Some(data.into()))
    }

    /// Shorthand for a simple status string.
    pub fn simple(text: impl Into<String>) -> Self {
        Frame::Simple(text.into())
    }

    /// Shorthand for an error reply.
    pub fn error(text: impl Into<String>) -> Self {
        Frame::Error(text.into())
    }

    /// Serializes this frame into `out`, appending the wire bytes.
    ///
    /// `Simple`/`Error` bodies must already be free of CR/LF; callers are
    /// expected to sanitize text before constructing those variants (the
    /// command layer only ever builds them from fixed strings or validated
    /// error messages).
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Frame::Simple(text) => {
                out.push(b'+');
                out.extend_from_slice(text.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Frame::Error(text) => {
                out.push(b'-');
                out.extend_from_slice(text.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Frame::Integer(value) => {
                out.push(b':');
                out.extend_from_slice(value.to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Frame::Bulk(None) => out.extend_from_slice(b"$-1\r\n"),
            Frame::Bulk(Some(data)) => {
                out.push(b'$');
                out.extend_from_slice(data.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(data);
                out.extend_from_slice(b"\r\n");
            }
            Frame::Array(items) => {
                out.push(b'*');
                out.extend_from_slice(items.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                for item in items {
                    item.write_to(out);
                }
            }
        }
    }

    /// Serializes this frame into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_simple() {
        assert_eq!(Frame::simple("OK").to_bytes(), b"+OK\r\n");
    }

    #[test]
    fn writes_error() {
        assert_eq!(Frame::error("ERR bad").to_bytes(), b"-ERR bad\r\n");
    }

    #[test]
    fn writes_integer() {
        assert_eq!(Frame::Integer(-7).to_bytes(), b":-7\r\n");
    }

    #[test]
    fn writes_nil() {
        assert_eq!(Frame::nil().to_bytes(), b"$-1\r\n");
    }

    #[test]
    fn writes_bulk() {
        assert_eq!(Frame::bulk(*b"abc").to_bytes(), b"$3\r\nabc\r\n");
    }

    #[test]
    fn writes_nested_array() {
        let frame = Frame::Array(vec![Frame::bulk(*b"GET"), Frame::bulk(*b"k")]);
        assert_eq!(frame.to_bytes(), b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n");
    }
}
