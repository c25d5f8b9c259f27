//! Static entity type metadata.
//!
//! Entity types are described by `'static` declarations rather than by
//! runtime reflection:
//!
//! ```
//! use entidoc_core::entity::{ClassForm, EntityClass, Method, ValueType, NAMABLE};
//!
//! static WIDGET: EntityClass = EntityClass::new("inventory::Widget", ClassForm::Trait)
//!     .table("")
//!     .namespace("inv")
//!     .capabilities(&[&NAMABLE])
//!     .methods(&[
//!         Method::getter("getWeight", ValueType::Primitive(entidoc_core::entity::Primitive::Int)),
//!         Method::setter("setWeight", &[ValueType::Primitive(entidoc_core::entity::Primitive::Int)]),
//!     ]);
//!
//! assert_eq!(WIDGET.simple_name(), "Widget");
//! assert!(WIDGET.implements(&NAMABLE));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use super::value::FieldValue;

/// Primitive value kinds. Primitive-typed properties are never unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Boolean.
    Bool,
    /// 8-bit integer.
    Byte,
    /// 16-bit integer.
    Short,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    Long,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Unicode scalar.
    Char,
}

impl Primitive {
    /// Type name used in messages.
    pub const fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Char => "char",
        }
    }

    /// The zero value a fresh entity reports for this kind.
    pub fn zero(self) -> FieldValue {
        match self {
            Primitive::Bool => FieldValue::Bool(false),
            Primitive::Byte => FieldValue::Byte(0),
            Primitive::Short => FieldValue::Short(0),
            Primitive::Int => FieldValue::Int(0),
            Primitive::Long => FieldValue::Long(0),
            Primitive::Float => FieldValue::Float(0.0),
            Primitive::Double => FieldValue::Double(0.0),
            Primitive::Char => FieldValue::Char('\0'),
        }
    }
}

/// A declared or runtime value type.
#[derive(Debug, Clone, Copy)]
pub enum ValueType {
    /// Non-nullable primitive.
    Primitive(Primitive),
    /// Nullable primitive.
    Boxed(Primitive),
    /// Text.
    Text,
    /// Binary payload.
    Bytes,
    /// Object identifier.
    ObjectId,
    /// Timestamp.
    DateTime,
    /// Schema-less nested document.
    Document,
    /// Enumeration.
    Enum(&'static EnumClass),
    /// Nested entity.
    Entity(&'static EntityClass),
    /// List with the given element type.
    List(&'static ValueType),
    /// A foreign value type identified by name.
    Opaque(&'static str),
    /// Any value; decoded from its natural wire form.
    Any,
}

/// `ValueType::Any`, for use as a list element type.
pub static ANY: ValueType = ValueType::Any;

impl ValueType {
    /// Returns `true` for non-nullable primitives.
    pub const fn is_primitive(&self) -> bool {
        matches!(self, ValueType::Primitive(_))
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueType::Primitive(a), ValueType::Primitive(b))
            | (ValueType::Boxed(a), ValueType::Boxed(b)) => a == b,
            (ValueType::Text, ValueType::Text)
            | (ValueType::Bytes, ValueType::Bytes)
            | (ValueType::ObjectId, ValueType::ObjectId)
            | (ValueType::DateTime, ValueType::DateTime)
            | (ValueType::Document, ValueType::Document)
            | (ValueType::Any, ValueType::Any) => true,
            (ValueType::Enum(a), ValueType::Enum(b)) => a == b,
            (ValueType::Entity(a), ValueType::Entity(b)) => a == b,
            (ValueType::List(a), ValueType::List(b)) => a == b,
            (ValueType::Opaque(a), ValueType::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ValueType {}

impl Hash for ValueType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ValueType::Primitive(p) | ValueType::Boxed(p) => p.hash(state),
            ValueType::Enum(e) => e.name.hash(state),
            ValueType::Entity(c) => c.name.hash(state),
            ValueType::List(t) => t.hash(state),
            ValueType::Opaque(n) => n.hash(state),
            _ => {}
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Primitive(p) => f.write_str(p.name()),
            ValueType::Boxed(p) => write!(f, "Option<{}>", p.name()),
            ValueType::Text => f.write_str("text"),
            ValueType::Bytes => f.write_str("bytes"),
            ValueType::ObjectId => f.write_str("objectId"),
            ValueType::DateTime => f.write_str("dateTime"),
            ValueType::Document => f.write_str("document"),
            ValueType::Enum(e) => f.write_str(e.name),
            ValueType::Entity(c) => f.write_str(c.name),
            ValueType::List(t) => write!(f, "list<{t}>"),
            ValueType::Opaque(n) => f.write_str(n),
            ValueType::Any => f.write_str("any"),
        }
    }
}

/// An enumeration type: a name and its ordered symbols.
#[derive(Debug)]
pub struct EnumClass {
    /// Qualified name.
    pub name: &'static str,
    /// Symbol names in declaration order.
    pub symbols: &'static [&'static str],
}

impl EnumClass {
    /// Declare an enumeration.
    pub const fn new(name: &'static str, symbols: &'static [&'static str]) -> Self {
        Self { name, symbols }
    }

    /// Look up a symbol by name.
    pub fn value_of(&'static self, symbol: &str) -> Option<EnumValue> {
        self.symbols
            .iter()
            .position(|s| *s == symbol)
            .map(|ordinal| EnumValue {
                class: self,
                ordinal,
            })
    }

    /// Symbol at the given ordinal.
    pub fn value(&'static self, ordinal: usize) -> Option<EnumValue> {
        (ordinal < self.symbols.len()).then_some(EnumValue {
            class: self,
            ordinal,
        })
    }
}

impl PartialEq for EnumClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EnumClass {}

/// One symbol of an [`EnumClass`].
#[derive(Clone, Copy)]
pub struct EnumValue {
    class: &'static EnumClass,
    ordinal: usize,
}

impl EnumValue {
    /// The enumeration this symbol belongs to.
    pub fn class(&self) -> &'static EnumClass {
        self.class
    }

    /// Position in declaration order.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Symbol name.
    pub fn name(&self) -> &'static str {
        self.class.symbols.get(self.ordinal).copied().unwrap_or("")
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.ordinal == other.ordinal
    }
}

impl fmt::Debug for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class.name, self.name())
    }
}

/// A declared accessor signature.
#[derive(Debug, Clone, Copy)]
pub struct Method {
    /// Method name, e.g. `getName`.
    pub name: &'static str,
    /// Parameter types.
    pub params: &'static [ValueType],
    /// Return type; `None` for no value.
    pub returns: Option<ValueType>,
}

impl Method {
    /// Declare a method with an arbitrary signature.
    pub const fn new(
        name: &'static str,
        params: &'static [ValueType],
        returns: Option<ValueType>,
    ) -> Self {
        Self {
            name,
            params,
            returns,
        }
    }

    /// Declare a no-argument method returning `returns`.
    pub const fn getter(name: &'static str, returns: ValueType) -> Self {
        Self::new(name, &[], Some(returns))
    }

    /// Declare a method taking `params` and returning nothing.
    pub const fn setter(name: &'static str, params: &'static [ValueType]) -> Self {
        Self::new(name, params, None)
    }
}

/// A capability trait: a named set of accessors entity types can implement.
#[derive(Debug)]
pub struct Capability {
    /// Capability name.
    pub name: &'static str,
    /// Accessors the capability contributes.
    pub methods: &'static [Method],
}

impl Capability {
    /// Declare a capability.
    pub const fn new(name: &'static str, methods: &'static [Method]) -> Self {
        Self { name, methods }
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// How an entity type is realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassForm {
    /// A capability-trait declaration; instances are dynamic entities.
    Trait,
    /// A concrete record type.
    Concrete {
        /// Whether a public no-argument constructor exists.
        public_constructor: bool,
    },
    /// An abstract base; never instantiated.
    Abstract,
}

/// Accessors every entity type has.
pub(crate) static BASE_METHODS: [Method; 3] = [
    Method::getter("getId", ValueType::ObjectId),
    Method::getter("getDateCreated", ValueType::DateTime),
    Method::getter("getLastModified", ValueType::DateTime),
];

/// Static metadata of an entity type.
#[derive(Debug)]
pub struct EntityClass {
    /// Qualified name, `module::Type`.
    pub name: &'static str,
    /// How the type is realized.
    pub form: ClassForm,
    /// Table marker; `Some("")` is a marker without a name.
    pub table: Option<&'static str>,
    /// Namespace marker.
    pub namespace: Option<&'static str>,
    /// Direct supertypes, most specific first.
    pub parents: &'static [&'static EntityClass],
    /// Capabilities implemented directly.
    pub capabilities: &'static [&'static Capability],
    /// Accessors declared directly.
    pub methods: &'static [Method],
}

impl EntityClass {
    /// Declare an entity type with no markers, parents or methods.
    pub const fn new(name: &'static str, form: ClassForm) -> Self {
        Self {
            name,
            form,
            table: None,
            namespace: None,
            parents: &[],
            capabilities: &[],
            methods: &[],
        }
    }

    /// Attach a table marker.
    #[must_use]
    pub const fn table(mut self, table: &'static str) -> Self {
        self.table = Some(table);
        self
    }

    /// Attach a namespace marker.
    #[must_use]
    pub const fn namespace(mut self, namespace: &'static str) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Set the direct supertypes.
    #[must_use]
    pub const fn parents(mut self, parents: &'static [&'static EntityClass]) -> Self {
        self.parents = parents;
        self
    }

    /// Set the directly implemented capabilities.
    #[must_use]
    pub const fn capabilities(mut self, capabilities: &'static [&'static Capability]) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the directly declared accessors.
    #[must_use]
    pub const fn methods(mut self, methods: &'static [Method]) -> Self {
        self.methods = methods;
        self
    }

    /// The unqualified type name.
    pub fn simple_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }

    /// This type followed by all its ancestors, depth-first.
    pub fn lineage(&'static self) -> Vec<&'static EntityClass> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(class) = stack.pop() {
            if out.iter().any(|seen: &&EntityClass| seen.name == class.name) {
                continue;
            }
            out.push(class);
            stack.extend(class.parents.iter().rev().copied());
        }
        out
    }

    /// Whether this type or an ancestor implements the capability.
    pub fn implements(&'static self, capability: &Capability) -> bool {
        self.lineage()
            .iter()
            .any(|class| class.capabilities.iter().any(|c| *c == capability))
    }

    /// Whether `ancestor` is this type or one of its ancestors.
    pub fn is_a(&'static self, ancestor: &EntityClass) -> bool {
        self.lineage().iter().any(|class| *class == ancestor)
    }

    /// Every accessor visible on this type: the base accessors, then for each
    /// type in the lineage its own methods followed by its capabilities'.
    ///
    /// The first declaration of a name wins.
    pub fn all_methods(&'static self) -> Vec<&'static Method> {
        let mut out: Vec<&'static Method> = Vec::new();
        let mut push = |method: &'static Method| {
            if !out.iter().any(|m| m.name == method.name && m.params.len() == method.params.len()) {
                out.push(method);
            }
        };
        BASE_METHODS.iter().for_each(&mut push);
        for class in self.lineage() {
            class.methods.iter().for_each(&mut push);
            for capability in class.capabilities {
                capability.methods.iter().for_each(&mut push);
            }
        }
        out
    }
}

impl PartialEq for EntityClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EntityClass {}

impl Hash for EntityClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
