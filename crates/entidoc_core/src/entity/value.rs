//! In-memory attribute values.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use entidoc_codec::{DateTime, Document, ObjectId, Value};

use super::class::{EnumValue, Primitive, ValueType, ANY};
use super::dynamic::Entity;

/// A value held in an entity's attribute store.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Boolean.
    Bool(bool),
    /// 8-bit integer.
    Byte(i8),
    /// 16-bit integer.
    Short(i16),
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Unicode scalar.
    Char(char),
    /// Text.
    Text(String),
    /// Binary payload.
    Bytes(Vec<u8>),
    /// Object identifier.
    ObjectId(ObjectId),
    /// Timestamp.
    DateTime(DateTime),
    /// Enumeration symbol.
    Enum(EnumValue),
    /// Nested entity.
    Entity(Box<Entity>),
    /// List of values.
    List(Vec<FieldValue>),
    /// Schema-less nested document.
    Document(Document),
    /// Foreign value that needs a registered codec.
    Opaque(Opaque),
}

impl FieldValue {
    /// The exact runtime type, used for codec dispatch on encode.
    pub fn value_type(&self) -> ValueType {
        match self {
            FieldValue::Bool(_) => ValueType::Primitive(Primitive::Bool),
            FieldValue::Byte(_) => ValueType::Primitive(Primitive::Byte),
            FieldValue::Short(_) => ValueType::Primitive(Primitive::Short),
            FieldValue::Int(_) => ValueType::Primitive(Primitive::Int),
            FieldValue::Long(_) => ValueType::Primitive(Primitive::Long),
            FieldValue::Float(_) => ValueType::Primitive(Primitive::Float),
            FieldValue::Double(_) => ValueType::Primitive(Primitive::Double),
            FieldValue::Char(_) => ValueType::Primitive(Primitive::Char),
            FieldValue::Text(_) => ValueType::Text,
            FieldValue::Bytes(_) => ValueType::Bytes,
            FieldValue::ObjectId(_) => ValueType::ObjectId,
            FieldValue::DateTime(_) => ValueType::DateTime,
            FieldValue::Enum(e) => ValueType::Enum(e.class()),
            FieldValue::Entity(e) => ValueType::Entity(e.entity_class()),
            FieldValue::List(_) => ValueType::List(&ANY),
            FieldValue::Document(_) => ValueType::Document,
            FieldValue::Opaque(o) => ValueType::Opaque(o.type_name()),
        }
    }

    /// Whether this value may be stored under a property declared as `declared`.
    pub fn fits(&self, declared: &ValueType) -> bool {
        match (declared, self) {
            (ValueType::Any, _) => true,
            (ValueType::Primitive(p) | ValueType::Boxed(p), _) => {
                matches!(self.value_type(), ValueType::Primitive(q) if q == *p)
            }
            (ValueType::Entity(class), FieldValue::Entity(e)) => e.entity_class().is_a(class),
            (ValueType::List(element), FieldValue::List(items)) => {
                items.iter().all(|item| item.fits(element))
            }
            _ => self.value_type() == *declared,
        }
    }

    /// Returns the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns any integer kind widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Byte(v) => Some(i64::from(*v)),
            FieldValue::Short(v) => Some(i64::from(*v)),
            FieldValue::Int(v) => Some(i64::from(*v)),
            FieldValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the bytes, if this is a binary payload.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the object id, if this is one.
    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            FieldValue::ObjectId(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the timestamp, if this is one.
    pub fn as_date_time(&self) -> Option<DateTime> {
        match self {
            FieldValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Returns the enum symbol, if this is one.
    pub fn as_enum(&self) -> Option<EnumValue> {
        match self {
            FieldValue::Enum(e) => Some(*e),
            _ => None,
        }
    }

    /// Returns the nested entity, if this is one.
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            FieldValue::Entity(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the list items, if this is a list.
    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether a NaN float appears anywhere in this value.
    ///
    /// NaN has no stored form and never compares equal, so attribute stores
    /// refuse it.
    pub fn contains_nan(&self) -> bool {
        match self {
            FieldValue::Float(v) => v.is_nan(),
            FieldValue::Double(v) => v.is_nan(),
            FieldValue::List(items) => items.iter().any(Self::contains_nan),
            FieldValue::Document(doc) => doc.iter().any(|(_, v)| wire_nan(v)),
            _ => false,
        }
    }

    /// The value as it reads back from the store under `declared`.
    ///
    /// Only values read through the untyped codec change shape: integers
    /// widen to `Long`, `Float` to `Double`, and characters and enum symbols
    /// become text. Entities and opaque values have no untyped form; their
    /// type is returned as the error.
    pub(crate) fn into_stored_form(self, declared: &ValueType) -> Result<Self, ValueType> {
        match (declared, self) {
            (ValueType::Any, value) => value.into_untyped(),
            (ValueType::List(element), FieldValue::List(items)) => items
                .into_iter()
                .map(|item| item.into_stored_form(element))
                .collect::<Result<_, _>>()
                .map(FieldValue::List),
            (_, value) => Ok(value),
        }
    }

    fn into_untyped(self) -> Result<Self, ValueType> {
        Ok(match self {
            FieldValue::Byte(v) => FieldValue::Long(i64::from(v)),
            FieldValue::Short(v) => FieldValue::Long(i64::from(v)),
            FieldValue::Int(v) => FieldValue::Long(i64::from(v)),
            FieldValue::Float(v) => FieldValue::Double(f64::from(v)),
            FieldValue::Char(c) => FieldValue::Text(c.to_string()),
            FieldValue::Enum(e) => FieldValue::Text(e.name().to_string()),
            FieldValue::List(items) => FieldValue::List(
                items
                    .into_iter()
                    .map(Self::into_untyped)
                    .collect::<Result<_, _>>()?,
            ),
            v @ (FieldValue::Entity(_) | FieldValue::Opaque(_)) => return Err(v.value_type()),
            other => other,
        })
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(v: $ty) -> Self {
                    FieldValue::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    char => Char,
    String => Text,
    Vec<u8> => Bytes,
    ObjectId => ObjectId,
    DateTime => DateTime,
    EnumValue => Enum,
    Document => Document,
    Opaque => Opaque,
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<Entity> for FieldValue {
    fn from(v: Entity) -> Self {
        FieldValue::Entity(Box::new(v))
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(v: Vec<FieldValue>) -> Self {
        FieldValue::List(v)
    }
}

/// A foreign value carried by name. Equality is identity of the shared value.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    /// Wrap a foreign value under the given type name.
    pub fn new<T: Any + Send + Sync>(type_name: &'static str, value: T) -> Self {
        Self {
            type_name,
            value: Arc::new(value),
        }
    }

    /// The type name codecs are registered under.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the wrapped value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.type_name)
    }
}

fn wire_nan(value: &Value) -> bool {
    match value {
        Value::Double(d) => d.is_nan(),
        Value::Array(items) => items.iter().any(wire_nan),
        Value::Document(doc) => doc.iter().any(|(_, v)| wire_nan(v)),
        _ => false,
    }
}
