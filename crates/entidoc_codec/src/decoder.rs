//! Bytes-to-document decoding.
//!
//! Only the canonical form produced by the encoder is accepted. Anything
//! another encoder might emit for the same value is rejected.

use std::cmp::Ordering;

use crate::document::Document;
use crate::encoder::{canonical_key_order, Major, TAG_DATE_TIME, TAG_OBJECT_ID};
use crate::error::{CodecError, CodecResult};
use crate::oid::{DateTime, ObjectId};
use crate::value::Value;

/// Largest element count accepted for an array or map.
const MAX_ELEMENTS: u64 = 1 << 24;

/// Largest byte length accepted for a text or byte string.
const MAX_STRING_BYTES: u64 = 1 << 28;

/// Decodes exactly one value from `bytes`.
///
/// # Errors
///
/// Returns an error for truncated, trailing or non-canonical input.
pub fn decode_value(bytes: &[u8]) -> CodecResult<Value> {
    let mut decoder = CborDecoder::new(bytes);
    let value = decoder.value()?;
    if !decoder.is_exhausted() {
        return Err(CodecError::invalid_structure(format!(
            "{} bytes left after the value",
            decoder.remaining().len()
        )));
    }
    Ok(value)
}

/// Decodes a document written by [`encode_document`](crate::encode_document).
///
/// # Errors
///
/// Returns [`CodecError::UnexpectedType`] when the bytes hold something other
/// than a map, or any error [`decode_value`] returns.
pub fn decode_document(bytes: &[u8]) -> CodecResult<Document> {
    match decode_value(bytes)? {
        Value::Document(doc) => Ok(doc),
        other => Err(CodecError::UnexpectedType {
            expected: "document",
            actual: other.type_name(),
        }),
    }
}

/// Reads canonical values from a byte slice.
#[derive(Debug)]
pub struct CborDecoder<'a> {
    input: &'a [u8],
    offset: usize,
}

impl<'a> CborDecoder<'a> {
    /// A decoder positioned at the start of `input`.
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, offset: 0 }
    }

    /// Whether every input byte has been read.
    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.input.len()
    }

    /// The unread input.
    pub fn remaining(&self) -> &'a [u8] {
        self.input.get(self.offset..).unwrap_or_default()
    }

    /// Reads the next value.
    ///
    /// # Errors
    ///
    /// Returns an error for truncated or non-canonical input.
    pub fn value(&mut self) -> CodecResult<Value> {
        let initial = self.byte()?;
        let info = initial & 0x1f;
        match Major::of(initial) {
            Major::Unsigned => {
                let n = self.argument(info)?;
                i64::try_from(n)
                    .map(Value::Integer)
                    .map_err(|_| CodecError::IntegerOverflow)
            }
            Major::Negative => {
                let n = self.argument(info)?;
                i64::try_from(n)
                    .map(|n| Value::Integer(!n))
                    .map_err(|_| CodecError::IntegerOverflow)
            }
            Major::Bytes => Ok(Value::Bytes(self.string(info)?.to_vec())),
            Major::Text => self.text(info).map(Value::Text),
            Major::Array => {
                let len = self.length(info, MAX_ELEMENTS)?;
                (0..len)
                    .map(|_| self.value())
                    .collect::<CodecResult<_>>()
                    .map(Value::Array)
            }
            Major::Map => self.map(info).map(Value::Document),
            Major::Tag => self.tagged(info),
            Major::Simple => self.simple(info),
        }
    }

    fn byte(&mut self) -> CodecResult<u8> {
        let byte = *self.input.get(self.offset).ok_or(CodecError::UnexpectedEof)?;
        self.offset += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self.offset.checked_add(len).ok_or(CodecError::UnexpectedEof)?;
        let slice = self
            .input
            .get(self.offset..end)
            .ok_or(CodecError::UnexpectedEof)?;
        self.offset = end;
        Ok(slice)
    }

    /// Reads a head argument and checks it used the fewest bytes.
    fn argument(&mut self, info: u8) -> CodecResult<u64> {
        let (width, floor) = match info {
            0..=23 => return Ok(u64::from(info)),
            24 => (1, 24),
            25 => (2, 0x100),
            26 => (4, 0x1_0000),
            27 => (8, 0x1_0000_0000),
            31 => return Err(CodecError::IndefiniteLengthForbidden),
            _ => {
                return Err(CodecError::invalid_structure(format!(
                    "reserved additional information {info}"
                )))
            }
        };
        let mut be = [0u8; 8];
        be[8 - width..].copy_from_slice(self.take(width)?);
        let argument = u64::from_be_bytes(be);
        if argument < floor {
            return Err(CodecError::invalid_structure(format!(
                "argument {argument} not in its shortest form"
            )));
        }
        Ok(argument)
    }

    fn length(&mut self, info: u8, max_allowed: u64) -> CodecResult<usize> {
        let claimed = self.argument(info)?;
        if claimed > max_allowed {
            return Err(CodecError::SizeLimitExceeded {
                claimed,
                max_allowed,
            });
        }
        usize::try_from(claimed).map_err(|_| CodecError::IntegerOverflow)
    }

    fn string(&mut self, info: u8) -> CodecResult<&'a [u8]> {
        let len = self.length(info, MAX_STRING_BYTES)?;
        self.take(len)
    }

    fn text(&mut self, info: u8) -> CodecResult<String> {
        let bytes = self.string(info)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    fn map(&mut self, info: u8) -> CodecResult<Document> {
        let len = self.length(info, MAX_ELEMENTS)?;
        let mut doc = Document::with_capacity(len.min(64));
        let mut previous: Option<String> = None;
        for _ in 0..len {
            let initial = self.byte()?;
            if Major::of(initial) != Major::Text {
                return Err(CodecError::unsupported_type("non-text document key"));
            }
            let key = self.text(initial & 0x1f)?;
            if previous
                .as_deref()
                .is_some_and(|p| canonical_key_order(p, &key) != Ordering::Less)
            {
                return Err(CodecError::invalid_structure(format!(
                    "document key {key:?} out of order"
                )));
            }
            let value = self.value()?;
            doc.insert(key.clone(), value);
            previous = Some(key);
        }
        Ok(doc)
    }

    fn tagged(&mut self, info: u8) -> CodecResult<Value> {
        match self.argument(info)? {
            TAG_OBJECT_ID => match self.value()? {
                Value::Bytes(bytes) => ObjectId::from_slice(&bytes).map(Value::ObjectId),
                other => Err(CodecError::UnexpectedType {
                    expected: "bytes",
                    actual: other.type_name(),
                }),
            },
            TAG_DATE_TIME => match self.value()? {
                Value::Integer(millis) => Ok(Value::DateTime(DateTime::from_millis(millis))),
                other => Err(CodecError::UnexpectedType {
                    expected: "integer",
                    actual: other.type_name(),
                }),
            },
            // Unknown tags are transparent.
            _ => self.value(),
        }
    }

    fn simple(&mut self, info: u8) -> CodecResult<Value> {
        match info {
            20 => Ok(Value::Bool(false)),
            21 => Ok(Value::Bool(true)),
            22 | 23 => Ok(Value::Null),
            25 | 26 => Err(CodecError::invalid_structure(
                "half and single precision floats are not canonical",
            )),
            27 => {
                let be: [u8; 8] = self
                    .take(8)?
                    .try_into()
                    .map_err(|_| CodecError::UnexpectedEof)?;
                let value = f64::from_bits(u64::from_be_bytes(be));
                if value.is_nan() {
                    return Err(CodecError::NaNForbidden);
                }
                Ok(Value::Double(value))
            }
            31 => Err(CodecError::invalid_structure("break outside an indefinite item")),
            _ => Err(CodecError::unsupported_type(format!("simple value {info}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode_value;

    fn decodes_to(bytes: &[u8], expected: impl Into<Value>) {
        assert_eq!(decode_value(bytes).unwrap(), expected.into());
    }

    #[test]
    fn integers() {
        decodes_to(&[0x0a], 10);
        decodes_to(&[0x19, 0x03, 0xe8], 1000);
        decodes_to(&[0x29], -10);
        decodes_to(&[0x39, 0x03, 0xe7], -1000);
    }

    #[test]
    fn unsigned_beyond_i64_overflows() {
        let mut bytes = vec![0x1b];
        bytes.extend(u64::MAX.to_be_bytes());
        assert_eq!(decode_value(&bytes), Err(CodecError::IntegerOverflow));
    }

    #[test]
    fn tagged_values() {
        let id = ObjectId::from_bytes([3; 12]);
        decodes_to(&encode_value(&id.into()).unwrap(), id);
        decodes_to(&[0xd9, 0x04, 0x1b, 0x19, 0x01, 0xf4], DateTime::from_millis(500));
        // Object id payload must be 12 bytes.
        assert!(decode_value(&[0xd9, 0x04, 0x1a, 0x42, 0x00, 0x01]).is_err());
    }

    #[test]
    fn unknown_tag_is_transparent() {
        // tag 1 (epoch time) around an integer
        decodes_to(&[0xc1, 0x0a], 10);
    }

    #[test]
    fn documents() {
        let doc = decode_document(&[0xa2, 0x61, b'n', 0x05, 0x62, b'o', b'k', 0xf5]).unwrap();
        assert_eq!(doc.get_i64("n"), Some(5));
        assert_eq!(doc.get_bool("ok"), Some(true));

        assert!(matches!(
            decode_document(&[0x80]),
            Err(CodecError::UnexpectedType { expected: "document", .. })
        ));
    }

    #[test]
    fn non_canonical_input_rejected() {
        // 10 in a one-byte argument
        assert!(matches!(
            decode_value(&[0x18, 0x0a]),
            Err(CodecError::InvalidStructure { .. })
        ));
        // keys "ok" before "n"
        assert!(matches!(
            decode_value(&[0xa2, 0x62, b'o', b'k', 0xf5, 0x61, b'n', 0x05]),
            Err(CodecError::InvalidStructure { .. })
        ));
        // single precision float
        assert!(matches!(
            decode_value(&[0xfa, 0x3f, 0x80, 0x00, 0x00]),
            Err(CodecError::InvalidStructure { .. })
        ));
        // indefinite text
        assert_eq!(
            decode_value(&[0x7f, 0x61, b'a', 0xff]),
            Err(CodecError::IndefiniteLengthForbidden)
        );
    }

    #[test]
    fn malformed_input_rejected() {
        assert_eq!(decode_value(&[]), Err(CodecError::UnexpectedEof));
        assert_eq!(decode_value(&[0x62, b'a']), Err(CodecError::UnexpectedEof));
        assert_eq!(decode_value(&[0x61, 0xc3]), Err(CodecError::InvalidUtf8));
        assert!(matches!(
            decode_value(&[0xa1, 0x0a, 0x0a]),
            Err(CodecError::UnsupportedType { .. })
        ));
        assert!(matches!(
            decode_value(&[0xf6, 0xf6]),
            Err(CodecError::InvalidStructure { .. })
        ));

        let mut nan = vec![0xfb];
        nan.extend(f64::NAN.to_bits().to_be_bytes());
        assert_eq!(decode_value(&nan), Err(CodecError::NaNForbidden));
    }

    #[test]
    fn oversized_length_rejected_before_reading() {
        assert!(matches!(
            decode_value(&[0x9b, 0, 0, 0, 1, 0, 0, 0, 0]),
            Err(CodecError::SizeLimitExceeded { .. })
        ));
    }
}
