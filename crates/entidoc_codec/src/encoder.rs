//! Document-to-bytes encoding.
//!
//! Every value has exactly one byte form, so equal documents always produce
//! equal bytes regardless of field insertion order.

use std::cmp::Ordering;

use crate::document::Document;
use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Tag wrapping the 12 raw bytes of an [`ObjectId`](crate::ObjectId).
pub(crate) const TAG_OBJECT_ID: u64 = 1050;

/// Tag wrapping the epoch milliseconds of a [`DateTime`](crate::DateTime).
pub(crate) const TAG_DATE_TIME: u64 = 1051;

/// CBOR major types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Major {
    Unsigned = 0,
    Negative = 1,
    Bytes = 2,
    Text = 3,
    Array = 4,
    Map = 5,
    Tag = 6,
    Simple = 7,
}

impl Major {
    pub(crate) fn of(initial: u8) -> Self {
        match initial >> 5 {
            0 => Self::Unsigned,
            1 => Self::Negative,
            2 => Self::Bytes,
            3 => Self::Text,
            4 => Self::Array,
            5 => Self::Map,
            6 => Self::Tag,
            _ => Self::Simple,
        }
    }
}

const FALSE: u8 = 0xf4;
const TRUE: u8 = 0xf5;
const NULL: u8 = 0xf6;
const FLOAT64: u8 = 0xfb;

/// Encodes `value` on its own.
///
/// # Errors
///
/// Returns [`CodecError::NaNForbidden`] when `value` holds a NaN anywhere.
pub fn encode_value(value: &Value) -> CodecResult<Vec<u8>> {
    let mut encoder = CborEncoder::default();
    encoder.value(value)?;
    Ok(encoder.finish())
}

/// Encodes `document` as a map.
///
/// # Errors
///
/// Returns [`CodecError::NaNForbidden`] when a field holds a NaN.
pub fn encode_document(document: &Document) -> CodecResult<Vec<u8>> {
    let mut encoder = CborEncoder::default();
    encoder.document(document)?;
    Ok(encoder.finish())
}

/// Appends values to a byte buffer in canonical form.
///
/// Map keys are ordered length-first, integers take the shortest head,
/// doubles are always eight bytes, and lengths are always definite.
#[derive(Debug, Default)]
pub struct CborEncoder {
    out: Vec<u8>,
}

impl CborEncoder {
    /// An encoder that preallocates `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: Vec::with_capacity(capacity),
        }
    }

    /// Appends `value`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NaNForbidden`] for NaN doubles.
    pub fn value(&mut self, value: &Value) -> CodecResult<()> {
        match value {
            Value::Null => self.out.push(NULL),
            Value::Bool(false) => self.out.push(FALSE),
            Value::Bool(true) => self.out.push(TRUE),
            Value::Integer(n) => self.integer(*n),
            Value::Double(d) => {
                if d.is_nan() {
                    return Err(CodecError::NaNForbidden);
                }
                self.out.push(FLOAT64);
                self.out.extend(d.to_bits().to_be_bytes());
            }
            Value::Text(s) => self.string(Major::Text, s.as_bytes()),
            Value::Bytes(b) => self.string(Major::Bytes, b),
            Value::ObjectId(id) => {
                self.head(Major::Tag, TAG_OBJECT_ID);
                self.string(Major::Bytes, &id.bytes());
            }
            Value::DateTime(dt) => {
                self.head(Major::Tag, TAG_DATE_TIME);
                self.integer(dt.timestamp_millis());
            }
            Value::Array(items) => {
                self.head(Major::Array, items.len() as u64);
                items.iter().try_for_each(|item| self.value(item))?;
            }
            Value::Document(doc) => self.document(doc)?,
        }
        Ok(())
    }

    /// Appends `document` as a map with its keys in canonical order.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NaNForbidden`] for NaN doubles.
    pub fn document(&mut self, document: &Document) -> CodecResult<()> {
        let mut fields: Vec<_> = document.iter().collect();
        fields.sort_unstable_by(|(a, _), (b, _)| canonical_key_order(a, b));

        self.head(Major::Map, fields.len() as u64);
        for (key, value) in fields {
            self.string(Major::Text, key.as_bytes());
            self.value(value)?;
        }
        Ok(())
    }

    /// The bytes written so far.
    pub fn bytes(&self) -> &[u8] {
        &self.out
    }

    /// Takes the written bytes.
    pub fn finish(self) -> Vec<u8> {
        self.out
    }

    fn integer(&mut self, n: i64) {
        match u64::try_from(n) {
            Ok(positive) => self.head(Major::Unsigned, positive),
            // -1 - n, computed without overflow at i64::MIN
            Err(_) => self.head(Major::Negative, !(n as u64)),
        }
    }

    fn string(&mut self, major: Major, payload: &[u8]) {
        self.head(major, payload.len() as u64);
        self.out.extend_from_slice(payload);
    }

    /// Writes a major type with its argument in the fewest bytes.
    fn head(&mut self, major: Major, argument: u64) {
        let major = (major as u8) << 5;
        let be = argument.to_be_bytes();
        let (info, width) = match argument {
            0..=23 => {
                self.out.push(major | be[7]);
                return;
            }
            24..=0xff => (24, 1),
            0x100..=0xffff => (25, 2),
            0x1_0000..=0xffff_ffff => (26, 4),
            _ => (27, 8),
        };
        self.out.push(major | info);
        self.out.extend_from_slice(&be[8 - width..]);
    }
}

/// Canonical key order: shorter keys first, equal lengths bytewise.
///
/// A text head grows with the text length, so this matches ordering the
/// encoded keys.
pub(crate) fn canonical_key_order(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.as_bytes().cmp(b.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid::{DateTime, ObjectId};

    fn bytes_of(value: impl Into<Value>) -> Vec<u8> {
        encode_value(&value.into()).unwrap()
    }

    #[test]
    fn simple_values() {
        assert_eq!(bytes_of(Value::Null), [NULL]);
        assert_eq!(bytes_of(true), [TRUE]);
        assert_eq!(bytes_of(false), [FALSE]);
    }

    #[test]
    fn integer_heads_are_minimal() {
        assert_eq!(bytes_of(0), [0x00]);
        assert_eq!(bytes_of(10), [0x0a]);
        assert_eq!(bytes_of(100), [0x18, 0x64]);
        assert_eq!(bytes_of(1000), [0x19, 0x03, 0xe8]);
        assert_eq!(bytes_of(1_000_000), [0x1a, 0x00, 0x0f, 0x42, 0x40]);
        assert_eq!(
            bytes_of(1_000_000_000_000i64),
            [0x1b, 0x00, 0x00, 0x00, 0xe8, 0xd4, 0xa5, 0x10, 0x00]
        );
        assert_eq!(bytes_of(-10), [0x29]);
        assert_eq!(bytes_of(-1000), [0x39, 0x03, 0xe7]);
    }

    #[test]
    fn extreme_integers() {
        let mut min = vec![0x3b];
        min.extend(i64::MAX.to_be_bytes());
        assert_eq!(bytes_of(i64::MIN), min);
    }

    #[test]
    fn doubles_are_eight_bytes() {
        let bytes = bytes_of(-0.5);
        assert_eq!(bytes.len(), 9);
        assert_eq!(bytes[0], FLOAT64);
        assert_eq!(
            encode_value(&Value::Double(f64::NAN)),
            Err(CodecError::NaNForbidden)
        );
    }

    #[test]
    fn nan_nested_in_document_fails() {
        let doc = Document::new().with("ok", 1).with("bad", f64::NAN);
        assert_eq!(encode_document(&doc), Err(CodecError::NaNForbidden));
    }

    #[test]
    fn tagged_identity_and_time() {
        let id = ObjectId::from_bytes([0x11; 12]);
        let bytes = bytes_of(id);
        assert_eq!(bytes[..4], [0xd9, 0x04, 0x1a, 0x4c]);
        assert_eq!(bytes[4..], [0x11; 12]);

        assert_eq!(
            bytes_of(DateTime::from_millis(500)),
            [0xd9, 0x04, 0x1b, 0x19, 0x01, 0xf4]
        );
    }

    #[test]
    fn keys_ordered_length_first() {
        let doc = Document::new().with("aa", 1).with("b", 2).with("a", 3);
        assert_eq!(
            encode_document(&doc).unwrap(),
            [0xa3, 0x61, b'a', 0x03, 0x61, b'b', 0x02, 0x62, b'a', b'a', 0x01]
        );
    }

    #[test]
    fn insertion_order_is_irrelevant() {
        let forward = Document::new().with("x", "1").with("yy", "2");
        let backward = Document::new().with("yy", "2").with("x", "1");
        assert_eq!(
            encode_document(&forward).unwrap(),
            encode_document(&backward).unwrap()
        );
    }
}
