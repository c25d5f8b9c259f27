//! Update operators.

use entidoc_codec::{Document, Value};

use crate::error::{StoreError, StoreResult};
use crate::filter::ID_FIELD;

#[derive(Debug, Clone, PartialEq)]
enum UpdateOp {
    Set(String, Value),
    Unset(String),
    Inc(String, Value),
}

/// A list of field modifications applied to matching documents.
///
/// # Example
///
/// ```
/// use entidoc_codec::Document;
/// use entidoc_store::Update;
///
/// let mut doc = Document::new().with("count", 1);
/// Update::set("name", "gear").and_inc("count", 2).apply(&mut doc).unwrap();
/// assert_eq!(doc.get_str("name"), Some("gear"));
/// assert_eq!(doc.get_i64("count"), Some(3));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    /// An update that sets one field.
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_set(field, value)
    }

    /// An update that removes one field.
    pub fn unset(field: impl Into<String>) -> Self {
        Self::default().and_unset(field)
    }

    /// An update that increments one numeric field.
    pub fn inc(field: impl Into<String>, by: impl Into<Value>) -> Self {
        Self::default().and_inc(field, by)
    }

    /// Also set a field.
    #[must_use]
    pub fn and_set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set(field.into(), value.into()));
        self
    }

    /// Also remove a field.
    #[must_use]
    pub fn and_unset(mut self, field: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Unset(field.into()));
        self
    }

    /// Also increment a numeric field. A missing field starts at zero.
    #[must_use]
    pub fn and_inc(mut self, field: impl Into<String>, by: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Inc(field.into(), by.into()));
        self
    }

    /// Returns `true` if the update has no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply the update to a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the update touches `_id` or increments a
    /// non-numeric field.
    pub fn apply(&self, doc: &mut Document) -> StoreResult<()> {
        for op in &self.ops {
            match op {
                UpdateOp::Set(field, value) => {
                    check_field(field)?;
                    doc.insert(field.clone(), value.clone());
                }
                UpdateOp::Unset(field) => {
                    check_field(field)?;
                    doc.remove(field);
                }
                UpdateOp::Inc(field, by) => {
                    check_field(field)?;
                    let current = doc.get(field).cloned().unwrap_or(Value::Integer(0));
                    let next = match (&current, by) {
                        (Value::Integer(a), Value::Integer(b)) => a
                            .checked_add(*b)
                            .map(Value::Integer)
                            .ok_or_else(|| StoreError::InvalidUpdate(format!("overflow incrementing '{field}'")))?,
                        _ => match (current.as_f64(), by.as_f64()) {
                            (Some(a), Some(b)) => Value::Double(a + b),
                            _ => {
                                return Err(StoreError::InvalidUpdate(format!(
                                    "cannot increment non-numeric field '{field}'"
                                )))
                            }
                        },
                    };
                    doc.insert(field.clone(), next);
                }
            }
        }
        Ok(())
    }
}

fn check_field(field: &str) -> StoreResult<()> {
    if field == ID_FIELD {
        return Err(StoreError::InvalidUpdate(format!(
            "field '{ID_FIELD}' is immutable"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_unset() {
        let mut doc = Document::new().with("a", 1).with("b", 2);
        Update::set("a", "x").and_unset("b").apply(&mut doc).unwrap();
        assert_eq!(doc.get_str("a"), Some("x"));
        assert!(!doc.contains_key("b"));
    }

    #[test]
    fn inc_mixed_numbers() {
        let mut doc = Document::new().with("n", 1);
        Update::inc("n", 0.5).apply(&mut doc).unwrap();
        assert_eq!(doc.get("n"), Some(&Value::Double(1.5)));
        Update::inc("fresh", 2).apply(&mut doc).unwrap();
        assert_eq!(doc.get_i64("fresh"), Some(2));
    }

    #[test]
    fn inc_non_numeric_fails() {
        let mut doc = Document::new().with("n", "x");
        assert!(matches!(
            Update::inc("n", 1).apply(&mut doc),
            Err(StoreError::InvalidUpdate(_))
        ));
    }

    #[test]
    fn id_is_immutable() {
        let mut doc = Document::new();
        assert!(Update::set("_id", 1).apply(&mut doc).is_err());
        assert!(Update::unset("_id").apply(&mut doc).is_err());
    }
}
