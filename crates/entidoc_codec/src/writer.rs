//! Streaming document writer.

use crate::document::Document;
use crate::error::{CodecError, CodecResult};
use crate::oid::{DateTime, ObjectId};
use crate::value::Value;

enum Frame {
    Document {
        doc: Document,
        pending_name: Option<String>,
    },
    Array(Vec<Value>),
}

/// Builds a [`Document`] from a sequence of start/name/value/end calls.
///
/// Inside a document every value must be preceded by [`write_name`];
/// inside an array values are appended in order. The outermost value must be
/// a document.
///
/// [`write_name`]: DocumentWriter::write_name
///
/// # Example
///
/// ```
/// use entidoc_codec::DocumentWriter;
///
/// let mut writer = DocumentWriter::new();
/// writer.write_start_document().unwrap();
/// writer.write_name("name").unwrap();
/// writer.write_string("widget").unwrap();
/// writer.write_end_document().unwrap();
///
/// let doc = writer.into_document().unwrap();
/// assert_eq!(doc.get_str("name"), Some("widget"));
/// ```
#[derive(Default)]
pub struct DocumentWriter {
    stack: Vec<Frame>,
    root: Option<Document>,
}

impl DocumentWriter {
    /// Create a writer with nothing written yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a document, either at the top level or as the next value.
    pub fn write_start_document(&mut self) -> CodecResult<()> {
        self.check_value_allowed()?;
        self.stack.push(Frame::Document {
            doc: Document::new(),
            pending_name: None,
        });
        Ok(())
    }

    /// Close the innermost open document.
    pub fn write_end_document(&mut self) -> CodecResult<()> {
        match self.stack.pop() {
            Some(Frame::Document {
                doc,
                pending_name: None,
            }) => self.emit(Value::Document(doc)),
            Some(Frame::Document {
                pending_name: Some(name),
                ..
            }) => Err(CodecError::invalid_state(format!(
                "field '{name}' has no value"
            ))),
            Some(frame @ Frame::Array(_)) => {
                self.stack.push(frame);
                Err(CodecError::invalid_state("end of document inside an array"))
            }
            None => Err(CodecError::invalid_state("no open document")),
        }
    }

    /// Open an array as the next value.
    pub fn write_start_array(&mut self) -> CodecResult<()> {
        if self.stack.is_empty() {
            return Err(CodecError::invalid_state(
                "top-level value must be a document",
            ));
        }
        self.check_value_allowed()?;
        self.stack.push(Frame::Array(Vec::new()));
        Ok(())
    }

    /// Close the innermost open array.
    pub fn write_end_array(&mut self) -> CodecResult<()> {
        match self.stack.pop() {
            Some(Frame::Array(items)) => self.emit(Value::Array(items)),
            Some(frame) => {
                self.stack.push(frame);
                Err(CodecError::invalid_state("end of array inside a document"))
            }
            None => Err(CodecError::invalid_state("no open array")),
        }
    }

    /// Name the next field of the innermost open document.
    pub fn write_name(&mut self, name: &str) -> CodecResult<()> {
        match self.stack.last_mut() {
            Some(Frame::Document { pending_name, .. }) if pending_name.is_none() => {
                *pending_name = Some(name.to_string());
                Ok(())
            }
            Some(Frame::Document { .. }) => Err(CodecError::invalid_state(format!(
                "name '{name}' written twice without a value"
            ))),
            Some(Frame::Array(_)) => Err(CodecError::invalid_state("names are not allowed in arrays")),
            None => Err(CodecError::invalid_state("no open document")),
        }
    }

    /// Write any value.
    pub fn write_value(&mut self, value: Value) -> CodecResult<()> {
        if self.stack.is_empty() {
            return match value {
                Value::Document(doc) if self.root.is_none() => {
                    self.root = Some(doc);
                    Ok(())
                }
                _ => Err(CodecError::invalid_state(
                    "top-level value must be a single document",
                )),
            };
        }
        self.emit(value)
    }

    /// Write a null.
    pub fn write_null(&mut self) -> CodecResult<()> {
        self.write_value(Value::Null)
    }

    /// Write a boolean.
    pub fn write_bool(&mut self, value: bool) -> CodecResult<()> {
        self.write_value(Value::Bool(value))
    }

    /// Write a 32-bit integer.
    pub fn write_int32(&mut self, value: i32) -> CodecResult<()> {
        self.write_value(Value::Integer(i64::from(value)))
    }

    /// Write a 64-bit integer.
    pub fn write_int64(&mut self, value: i64) -> CodecResult<()> {
        self.write_value(Value::Integer(value))
    }

    /// Write a double.
    pub fn write_double(&mut self, value: f64) -> CodecResult<()> {
        if value.is_nan() {
            return Err(CodecError::NaNForbidden);
        }
        self.write_value(Value::Double(value))
    }

    /// Write a string.
    pub fn write_string(&mut self, value: &str) -> CodecResult<()> {
        self.write_value(Value::Text(value.to_string()))
    }

    /// Write a byte string.
    pub fn write_binary(&mut self, value: &[u8]) -> CodecResult<()> {
        self.write_value(Value::Bytes(value.to_vec()))
    }

    /// Write an object id.
    pub fn write_object_id(&mut self, value: ObjectId) -> CodecResult<()> {
        self.write_value(Value::ObjectId(value))
    }

    /// Write a timestamp.
    pub fn write_date_time(&mut self, value: DateTime) -> CodecResult<()> {
        self.write_value(Value::DateTime(value))
    }

    /// Returns `true` once the outermost document has been closed.
    pub fn is_finished(&self) -> bool {
        self.stack.is_empty() && self.root.is_some()
    }

    /// Consume the writer and return the finished document.
    ///
    /// # Errors
    ///
    /// Returns an error if a document or array is still open, or if nothing
    /// was written.
    pub fn into_document(self) -> CodecResult<Document> {
        if !self.stack.is_empty() {
            return Err(CodecError::invalid_state("document is not closed"));
        }
        self.root
            .ok_or_else(|| CodecError::invalid_state("nothing was written"))
    }

    fn check_value_allowed(&self) -> CodecResult<()> {
        match self.stack.last() {
            None if self.root.is_some() => Err(CodecError::invalid_state(
                "top-level document already written",
            )),
            None | Some(Frame::Array(_)) => Ok(()),
            Some(Frame::Document {
                pending_name: Some(_),
                ..
            }) => Ok(()),
            Some(Frame::Document { .. }) => Err(CodecError::invalid_state(
                "value written without a name",
            )),
        }
    }

    fn emit(&mut self, value: Value) -> CodecResult<()> {
        match self.stack.last_mut() {
            Some(Frame::Document { doc, pending_name }) => {
                let name = pending_name
                    .take()
                    .ok_or_else(|| CodecError::invalid_state("value written without a name"))?;
                doc.insert(name, value);
                Ok(())
            }
            Some(Frame::Array(items)) => {
                items.push(value);
                Ok(())
            }
            None => self.write_value(value),
        }
    }
}
