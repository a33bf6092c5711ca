//! # Stored Value Type
//!
//! The closed sum of value representations the store holds, per spec.md §3:
//! values that parse exactly as a signed 64-bit decimal integer are kept as
//! `Int` so arithmetic commands avoid a parse-and-reformat round trip;
//! everything else is kept as opaque bytes.

use std::sync::Arc;

/// A value as held in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    /// Opaque bytes, stored verbatim.
    Str(Arc<[u8]>),
    /// A value that round-trips exactly through signed decimal formatting.
    Int(i64),
}

impl StoredValue {
    /// Classifies raw bytes: integer-typed if they parse as an exact
    /// signed decimal (no surrounding whitespace, no leading `+`, no
    /// leading zeros other than the literal value `0`), string-typed
    /// otherwise.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match parse_strict_i64(&bytes) {
            Some(value) => StoredValue::Int(value),
            None => StoredValue::Str(Arc::from(bytes)),
        }
    }

    /// Renders the value back to its wire byte representation.
    pub fn to_bytes(&self) -> Arc<[u8]> {
        match self {
            StoredValue::Str(bytes) => Arc::clone(bytes),
            StoredValue::Int(value) => Arc::from(value.to_string().into_bytes()),
        }
    }

    /// Returns the integer value, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            StoredValue::Int(value) => Some(*value),
            StoredValue::Str(_) => None,
        }
    }
}

/// Parses `bytes` as a signed 64-bit decimal integer, requiring an exact,
/// canonical representation (rejects leading zeros, a bare sign, empty
/// input, or a leading `+`) so that re-formatting the parsed value always
/// reproduces the original bytes.
fn parse_strict_i64(bytes: &[u8]) -> Option<i64> {
    if bytes.is_empty() {
        return None;
    }

    let (negative, digits) = match bytes[0] {
        b'-' => (true, &bytes[1..]),
        b'0'..=b'9' => (false, bytes),
        _ => return None,
    };

    if digits.is_empty() {
        return None;
    }
    if digits.len() > 1 && digits[0] == b'0' {
        return None;
    }
    if !digits.iter().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let text = std::str::from_utf8(bytes).ok()?;
    text.parse::<i64>().ok().filter(|value| {
        // Reject forms like "-0" that `str::parse` accepts but that do not
        // round-trip back to the original bytes.
        value.to_string().as_bytes() == bytes || (*value == 0 && !negative)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_plain_integer() {
        assert_eq!(StoredValue::from_bytes(b"42".to_vec()), StoredValue::Int(42));
    }

    #[test]
    fn classifies_negative_integer() {
        assert_eq!(StoredValue::from_bytes(b"-7".to_vec()), StoredValue::Int(-7));
    }

    #[test]
    fn rejects_leading_zero() {
        let value = StoredValue::from_bytes(b"007".to_vec());
        assert!(matches!(value, StoredValue::Str(_)));
    }

    #[test]
    fn rejects_non_canonical_negative_zero() {
        let value = StoredValue::from_bytes(b"-0".to_vec());
        assert!(matches!(value, StoredValue::Str(_)));
    }

    #[test]
    fn classifies_non_numeric_as_string() {
        let value = StoredValue::from_bytes(b"10abc".to_vec());
        assert!(matches!(value, StoredValue::Str(_)));
    }

    #[test]
    fn round_trips_to_bytes() {
        let value = StoredValue::from_bytes(b"123".to_vec());
        assert_eq!(&*value.to_bytes(), b"123");
    }
}
