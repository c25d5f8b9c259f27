//! Streaming document reader.

use std::iter::Peekable;
use std::vec::IntoIter;

use crate::document::Document;
use crate::error::{CodecError, CodecResult};
use crate::oid::{DateTime, ObjectId};
use crate::value::Value;

enum Frame {
    Document(Peekable<IntoIter<(String, Value)>>),
    Array(Peekable<IntoIter<Value>>),
}

/// Reads a [`Document`] back through start/name/value/end calls.
///
/// The mirror image of [`DocumentWriter`](crate::DocumentWriter): inside a
/// document call [`read_name`](Self::read_name) before reading each value;
/// inside an array read values directly.
pub struct DocumentReader {
    stack: Vec<Frame>,
    current: Option<Value>,
}

impl DocumentReader {
    /// Create a reader positioned before the given document.
    pub fn new(document: Document) -> Self {
        Self {
            stack: Vec::new(),
            current: Some(Value::Document(document)),
        }
    }

    /// Enter the next value, which must be a document.
    pub fn read_start_document(&mut self) -> CodecResult<()> {
        match self.take_value()? {
            Value::Document(doc) => {
                let fields: Vec<(String, Value)> = doc.into_iter().collect();
                self.stack
                    .push(Frame::Document(fields.into_iter().peekable()));
                Ok(())
            }
            other => Err(unexpected("document", &other)),
        }
    }

    /// Leave the innermost document, skipping any unread fields.
    pub fn read_end_document(&mut self) -> CodecResult<()> {
        match self.stack.last() {
            Some(Frame::Document(_)) => {
                self.current = None;
                self.stack.pop();
                Ok(())
            }
            Some(Frame::Array(_)) => Err(CodecError::invalid_state("end of document inside an array")),
            None => Err(CodecError::invalid_state("no open document")),
        }
    }

    /// Enter the next value, which must be an array.
    pub fn read_start_array(&mut self) -> CodecResult<()> {
        match self.take_value()? {
            Value::Array(items) => {
                self.stack.push(Frame::Array(items.into_iter().peekable()));
                Ok(())
            }
            other => Err(unexpected("array", &other)),
        }
    }

    /// Leave the innermost array, skipping any unread elements.
    pub fn read_end_array(&mut self) -> CodecResult<()> {
        match self.stack.last() {
            Some(Frame::Array(_)) => {
                self.stack.pop();
                Ok(())
            }
            Some(Frame::Document(_)) => Err(CodecError::invalid_state("end of array inside a document")),
            None => Err(CodecError::invalid_state("no open array")),
        }
    }

    /// Returns `true` if the innermost document or array has unread entries.
    pub fn has_next(&mut self) -> bool {
        match self.stack.last_mut() {
            Some(Frame::Document(fields)) => fields.peek().is_some(),
            Some(Frame::Array(items)) => items.peek().is_some(),
            None => false,
        }
    }

    /// Advance to the next field and return its name.
    pub fn read_name(&mut self) -> CodecResult<String> {
        if self.current.is_some() {
            return Err(CodecError::invalid_state(
                "previous field value was not read",
            ));
        }
        match self.stack.last_mut() {
            Some(Frame::Document(fields)) => {
                let (name, value) = fields
                    .next()
                    .ok_or_else(|| CodecError::invalid_state("no more fields"))?;
                self.current = Some(value);
                Ok(name)
            }
            Some(Frame::Array(_)) => Err(CodecError::invalid_state("names are not present in arrays")),
            None => Err(CodecError::invalid_state("no open document")),
        }
    }

    /// Wire type name of the next value, without consuming it.
    pub fn peek_type(&mut self) -> Option<&'static str> {
        if let Some(value) = &self.current {
            return Some(value.type_name());
        }
        match self.stack.last_mut() {
            Some(Frame::Array(items)) => items.peek().map(Value::type_name),
            _ => None,
        }
    }

    /// Read the next value whatever its type.
    pub fn read_value(&mut self) -> CodecResult<Value> {
        self.take_value()
    }

    /// Skip the next value.
    pub fn skip_value(&mut self) -> CodecResult<()> {
        self.take_value().map(|_| ())
    }

    /// Read a null.
    pub fn read_null(&mut self) -> CodecResult<()> {
        match self.take_value()? {
            Value::Null => Ok(()),
            other => Err(unexpected("null", &other)),
        }
    }

    /// Read a boolean.
    pub fn read_bool(&mut self) -> CodecResult<bool> {
        match self.take_value()? {
            Value::Bool(b) => Ok(b),
            other => Err(unexpected("bool", &other)),
        }
    }

    /// Read a 64-bit integer.
    pub fn read_int64(&mut self) -> CodecResult<i64> {
        match self.take_value()? {
            Value::Integer(n) => Ok(n),
            other => Err(unexpected("integer", &other)),
        }
    }

    /// Read a 32-bit integer.
    pub fn read_int32(&mut self) -> CodecResult<i32> {
        i32::try_from(self.read_int64()?).map_err(|_| CodecError::IntegerOverflow)
    }

    /// Read a double. Integers are widened.
    pub fn read_double(&mut self) -> CodecResult<f64> {
        let value = self.take_value()?;
        value.as_f64().ok_or_else(|| unexpected("double", &value))
    }

    /// Read a string.
    pub fn read_string(&mut self) -> CodecResult<String> {
        match self.take_value()? {
            Value::Text(s) => Ok(s),
            other => Err(unexpected("text", &other)),
        }
    }

    /// Read a byte string.
    pub fn read_binary(&mut self) -> CodecResult<Vec<u8>> {
        match self.take_value()? {
            Value::Bytes(b) => Ok(b),
            other => Err(unexpected("bytes", &other)),
        }
    }

    /// Read an object id.
    pub fn read_object_id(&mut self) -> CodecResult<ObjectId> {
        match self.take_value()? {
            Value::ObjectId(id) => Ok(id),
            other => Err(unexpected("objectId", &other)),
        }
    }

    /// Read a timestamp.
    pub fn read_date_time(&mut self) -> CodecResult<DateTime> {
        match self.take_value()? {
            Value::DateTime(dt) => Ok(dt),
            other => Err(unexpected("dateTime", &other)),
        }
    }

    /// Read a whole nested document.
    pub fn read_document(&mut self) -> CodecResult<Document> {
        match self.take_value()? {
            Value::Document(doc) => Ok(doc),
            other => Err(unexpected("document", &other)),
        }
    }

    fn take_value(&mut self) -> CodecResult<Value> {
        if let Some(value) = self.current.take() {
            return Ok(value);
        }
        match self.stack.last_mut() {
            Some(Frame::Array(items)) => items
                .next()
                .ok_or_else(|| CodecError::invalid_state("no more array elements")),
            Some(Frame::Document(_)) => Err(CodecError::invalid_state(
                "read_name must be called before reading a field value",
            )),
            None => Err(CodecError::invalid_state("document already consumed")),
        }
    }
}

fn unexpected(expected: &'static str, actual: &Value) -> CodecError {
    CodecError::UnexpectedType {
        expected,
        actual: actual.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::new()
            .with("name", "gear")
            .with("count", 3)
            .with("tags", Value::Array(vec![Value::from("x"), Value::from("y")]))
            .with("inner", Document::new().with("ok", true))
    }

    #[test]
    fn read_fields_in_order() {
        let mut reader = DocumentReader::new(sample());
        reader.read_start_document().unwrap();

        assert_eq!(reader.read_name().unwrap(), "name");
        assert_eq!(reader.read_string().unwrap(), "gear");
        assert_eq!(reader.read_name().unwrap(), "count");
        assert_eq!(reader.read_int32().unwrap(), 3);

        assert_eq!(reader.read_name().unwrap(), "tags");
        reader.read_start_array().unwrap();
        assert_eq!(reader.peek_type(), Some("text"));
        assert_eq!(reader.read_string().unwrap(), "x");
        assert!(reader.has_next());
        reader.skip_value().unwrap();
        assert!(!reader.has_next());
        reader.read_end_array().unwrap();

        assert_eq!(reader.read_name().unwrap(), "inner");
        reader.read_start_document().unwrap();
        assert_eq!(reader.read_name().unwrap(), "ok");
        assert!(reader.read_bool().unwrap());
        reader.read_end_document().unwrap();

        assert!(!reader.has_next());
        reader.read_end_document().unwrap();
    }

    #[test]
    fn type_mismatch_is_reported() {
        let mut reader = DocumentReader::new(sample());
        reader.read_start_document().unwrap();
        reader.read_name().unwrap();
        assert_eq!(
            reader.read_int64(),
            Err(CodecError::UnexpectedType {
                expected: "integer",
                actual: "text"
            })
        );
    }

    #[test]
    fn value_before_name_is_rejected() {
        let mut reader = DocumentReader::new(sample());
        reader.read_start_document().unwrap();
        assert!(matches!(
            reader.read_string(),
            Err(CodecError::InvalidState { .. })
        ));
    }

    #[test]
    fn end_document_skips_unread_fields() {
        let mut reader = DocumentReader::new(sample());
        reader.read_start_document().unwrap();
        reader.read_name().unwrap();
        reader.read_end_document().unwrap();
        assert!(!reader.has_next());
    }
}
