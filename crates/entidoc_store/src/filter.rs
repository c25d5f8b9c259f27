//! Query filters.

use std::cmp::Ordering;

use entidoc_codec::{Document, ObjectId, Value};

/// Name of the identity field.
pub const ID_FIELD: &str = "_id";

/// A predicate over documents.
///
/// This is the small vocabulary the collection layer needs, not a query
/// language. Field names may be dotted paths into nested documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// Field equals the value. A missing field equals `Null`; an array field
    /// matches if any element equals the value.
    Eq(String, Value),
    /// Negation of [`Filter::Eq`].
    Ne(String, Value),
    /// Field equals any of the values.
    In(String, Vec<Value>),
    /// Field is greater than the value.
    Gt(String, Value),
    /// Field is less than the value.
    Lt(String, Value),
    /// Field presence.
    Exists(String, bool),
    /// All sub-filters match.
    And(Vec<Filter>),
    /// Any sub-filter matches.
    Or(Vec<Filter>),
}

impl Filter {
    /// `field == value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    /// `field != value`.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne(field.into(), value.into())
    }

    /// `field in values`.
    pub fn in_values(field: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        Self::In(field.into(), values.into_iter().collect())
    }

    /// `field > value`.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt(field.into(), value.into())
    }

    /// `field < value`.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt(field.into(), value.into())
    }

    /// Field presence test.
    pub fn exists(field: impl Into<String>, present: bool) -> Self {
        Self::Exists(field.into(), present)
    }

    /// Identity equality.
    pub fn id(id: ObjectId) -> Self {
        Self::eq(ID_FIELD, id)
    }

    /// Conjunction of filters.
    ///
    /// `All` operands are dropped; a single remaining operand is returned
    /// unwrapped, none yields `All`.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut parts: Vec<Filter> = filters
            .into_iter()
            .filter(|f| *f != Filter::All)
            .collect();
        match parts.len() {
            0 => Filter::All,
            1 => parts.remove(0),
            _ => Filter::And(parts),
        }
    }

    /// Disjunction of filters.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::Or(filters.into_iter().collect())
    }

    /// Evaluate the filter against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => field_equals(doc, field, value),
            Filter::Ne(field, value) => !field_equals(doc, field, value),
            Filter::In(field, values) => values.iter().any(|v| field_equals(doc, field, v)),
            Filter::Gt(field, value) => field_compares(doc, field, value, Ordering::Greater),
            Filter::Lt(field, value) => field_compares(doc, field, value, Ordering::Less),
            Filter::Exists(field, present) => doc.get_path(field).is_some() == *present,
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    a == b || a.compare(b) == Some(Ordering::Equal)
}

fn field_equals(doc: &Document, field: &str, value: &Value) -> bool {
    match doc.get_path(field) {
        None => value.is_null(),
        Some(Value::Array(items)) if !matches!(value, Value::Array(_)) => {
            items.iter().any(|item| values_equal(item, value))
        }
        Some(actual) => values_equal(actual, value),
    }
}

fn field_compares(doc: &Document, field: &str, value: &Value, wanted: Ordering) -> bool {
    doc.get_path(field)
        .and_then(|actual| actual.compare(value))
        .is_some_and(|ordering| ordering == wanted)
}
