//! Per-class accessor tables.
//!
//! A descriptor is computed from an [`EntityClass`]'s declared methods the
//! first time the class is used and cached for the rest of the process.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

use super::attributes::Fields;
use super::class::{EntityClass, Method, ValueType};
use crate::entity::record::ID_PROPERTY;

/// What a dispatched method does.
#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    /// Return the property's value.
    Read {
        /// Property name.
        property: String,
    },
    /// Store or remove the property's value.
    Write {
        /// Property name.
        property: String,
        /// Declared parameter type.
        value_type: ValueType,
    },
    /// Copy the entity.
    Clone,
}

/// How a property can be accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessShape {
    /// Getter only.
    ReadOnly,
    /// Setter only.
    WriteOnly,
    /// Getter and setter.
    ReadWrite,
}

impl AccessShape {
    fn merge(self, other: AccessShape) -> AccessShape {
        if self == other {
            self
        } else {
            AccessShape::ReadWrite
        }
    }
}

/// A property derived from a class's accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    /// Property name as stored.
    pub name: String,
    /// Declared type; `Any` when accessors disagree.
    pub value_type: ValueType,
    /// Access shape.
    pub shape: AccessShape,
}

/// Cached metadata of one entity class.
#[derive(Debug)]
pub struct EntityDescriptor {
    class: &'static EntityClass,
    accessors: HashMap<&'static str, Accessor>,
    properties: Vec<PropertyDescriptor>,
    defaults: Fields,
}

impl EntityDescriptor {
    fn compute(class: &'static EntityClass) -> Self {
        let mut accessors = HashMap::new();
        let mut properties: Vec<PropertyDescriptor> = Vec::new();
        let mut defaults = BTreeMap::new();

        for method in class.all_methods() {
            let Some(accessor) = classify(method) else {
                continue;
            };
            if accessor == Accessor::Clone {
                accessors.insert(method.name, accessor);
                continue;
            }
            let (property, value_type, shape) = match &accessor {
                Accessor::Read { property } => (
                    property.clone(),
                    method.returns.unwrap_or(ValueType::Any),
                    AccessShape::ReadOnly,
                ),
                Accessor::Write {
                    property,
                    value_type,
                } => {
                    if let ValueType::Primitive(p) = value_type {
                        defaults.entry(property.clone()).or_insert_with(|| p.zero());
                    }
                    (property.clone(), *value_type, AccessShape::WriteOnly)
                }
                Accessor::Clone => continue,
            };
            match properties.iter_mut().find(|p| p.name == property) {
                Some(existing) => {
                    if existing.value_type != value_type {
                        existing.value_type = ValueType::Any;
                    }
                    existing.shape = existing.shape.merge(shape);
                }
                None => properties.push(PropertyDescriptor {
                    name: property,
                    value_type,
                    shape,
                }),
            }
            accessors.insert(method.name, accessor);
        }

        Self {
            class,
            accessors,
            properties,
            defaults,
        }
    }

    /// The described class.
    pub fn entity_class(&self) -> &'static EntityClass {
        self.class
    }

    /// Dispatch entry for a method name.
    pub fn accessor(&self, method: &str) -> Option<&Accessor> {
        self.accessors.get(method)
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Looks up a property by stored name.
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Zero values seeded into fresh instances.
    pub fn defaults(&self) -> &Fields {
        &self.defaults
    }
}

static DESCRIPTORS: LazyLock<RwLock<HashMap<&'static str, Arc<EntityDescriptor>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Returns the cached descriptor for `class`, computing it on first use.
pub fn descriptor_of(class: &'static EntityClass) -> Arc<EntityDescriptor> {
    if let Some(descriptor) = DESCRIPTORS.read().get(class.name) {
        return Arc::clone(descriptor);
    }
    let computed = Arc::new(EntityDescriptor::compute(class));
    let mut cache = DESCRIPTORS.write();
    let entry = cache.entry(class.name).or_insert_with(|| {
        debug!(
            class = class.name,
            properties = computed.properties.len(),
            "Entity descriptor cached"
        );
        Arc::clone(&computed)
    });
    Arc::clone(entry)
}

fn classify(method: &Method) -> Option<Accessor> {
    let name = method.name;
    if name == "clone" && method.params.is_empty() {
        return Some(Accessor::Clone);
    }
    if method.params.is_empty() && method.returns.is_some() {
        let rest = name
            .strip_prefix("get")
            .or_else(|| name.strip_prefix("is"))
            .filter(|rest| !rest.is_empty())?;
        return Some(Accessor::Read {
            property: property_name(rest),
        });
    }
    if let [param] = method.params {
        if method.returns.is_none() {
            let rest = name.strip_prefix("set").filter(|rest| !rest.is_empty())?;
            return Some(Accessor::Write {
                property: property_name(rest),
                value_type: *param,
            });
        }
    }
    None
}

/// Maps an accessor suffix to its stored property name.
///
/// `Name` becomes `name`, `URL` stays `URL`, and `Id` becomes `_id`.
pub fn property_name(suffix: &str) -> String {
    let mut chars = suffix.chars();
    let name = match (chars.next(), chars.next()) {
        (Some(a), Some(b)) if a.is_uppercase() && b.is_uppercase() => suffix.to_string(),
        (Some(a), _) => a.to_lowercase().chain(suffix[a.len_utf8()..].chars()).collect(),
        (None, _) => String::new(),
    };
    if name == "id" {
        ID_PROPERTY.to_string()
    } else {
        name
    }
}
