//! Dynamic entities backed by an attribute store.

use std::fmt;
use std::sync::Arc;

use super::attributes::{AttributeStore, Fields};
use super::class::{ClassForm, EntityClass, ValueType};
use super::descriptor::{descriptor_of, Accessor, EntityDescriptor};
use super::record::{EntityModifier, EntityObject, EntityRecord};
use super::value::FieldValue;
use crate::error::{CoreError, CoreResult};

/// An instance of a trait-form entity class.
///
/// Accessor calls go through [`invoke`](Self::invoke), which interprets the
/// class's cached accessor table against the attribute store.
///
/// ```
/// use entidoc_core::entity::{ClassForm, Entity, EntityClass, EntityFactory, Method, ValueType};
///
/// static NOTE: EntityClass = EntityClass::new("docs::Note", ClassForm::Trait)
///     .table("")
///     .methods(&[
///         Method::getter("getText", ValueType::Text),
///         Method::setter("setText", &[ValueType::Text]),
///     ]);
///
/// let note: Entity = EntityFactory::new_instance(&NOTE).unwrap();
/// note.invoke("setText", &[Some("hello".into())]).unwrap();
/// assert_eq!(note.invoke("getText", &[]).unwrap(), Some("hello".into()));
/// ```
pub struct Entity {
    class: &'static EntityClass,
    descriptor: Arc<EntityDescriptor>,
    attributes: AttributeStore,
}

impl Entity {
    /// Builds an entity over `seed`, then fills unset primitive properties
    /// with their zero values.
    ///
    /// Seed values are written like [`set`](Self::set) writes them.
    pub(crate) fn create(class: &'static EntityClass, seed: Option<Fields>) -> CoreResult<Self> {
        let entity = Self {
            class,
            descriptor: descriptor_of(class),
            attributes: AttributeStore::new(),
        };
        for (name, value) in seed.unwrap_or_default() {
            entity.set(&name, value)?;
        }
        for (name, zero) in entity.descriptor.defaults() {
            entity.attributes.insert_if_absent(name, zero.clone());
        }
        Ok(entity)
    }

    /// The entity's class.
    pub fn entity_class(&self) -> &'static EntityClass {
        self.class
    }

    /// The class's cached descriptor.
    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    /// Dispatches an accessor call.
    ///
    /// Reads return the stored value, writes return `None`, and `clone`
    /// returns a copy wrapped in [`FieldValue::Entity`].
    ///
    /// # Errors
    ///
    /// - [`CoreError::UnsupportedOperation`] for a method that is not an
    ///   accessor of the class, or a call with the wrong number of arguments
    /// - [`CoreError::IllegalArgument`] when a write passes a value of the
    ///   wrong type or unsets a primitive property
    pub fn invoke(&self, method: &str, args: &[Option<FieldValue>]) -> CoreResult<Option<FieldValue>> {
        match (self.descriptor.accessor(method), args) {
            (Some(Accessor::Read { property }), []) => Ok(self.attributes.get(property)),
            (
                Some(Accessor::Write {
                    property,
                    value_type,
                }),
                [value],
            ) => {
                self.write(property, value_type, value.clone())?;
                Ok(None)
            }
            (Some(Accessor::Clone), []) => Ok(Some(FieldValue::Entity(Box::new(self.clone())))),
            _ => Err(CoreError::unsupported(format!(
                "{}.{} with {} argument(s)",
                self.class.name,
                method,
                args.len()
            ))),
        }
    }

    /// Reads a property by stored name, bypassing dispatch.
    pub fn get(&self, property: &str) -> Option<FieldValue> {
        self.attributes.get(property)
    }

    /// Writes a property by stored name, bypassing dispatch.
    ///
    /// Declared properties are type-checked. Undeclared ones are stored in
    /// the form they read back from the store, so integers become `Long`,
    /// floats become `Double`, and characters and enum symbols become text.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalArgument`] on a type mismatch, a NaN,
    /// an undeclared entity or opaque value, or when unsetting a primitive
    /// property.
    pub fn set(&self, property: &str, value: impl Into<Option<FieldValue>>) -> CoreResult<()> {
        let declared = self
            .descriptor
            .property(property)
            .map_or(ValueType::Any, |p| p.value_type);
        self.write(property, &declared, value.into())
    }

    fn write(&self, property: &str, declared: &ValueType, value: Option<FieldValue>) -> CoreResult<()> {
        let illegal = |reason: String| {
            CoreError::illegal_argument(format!(
                "{}.{} {reason}",
                self.class.simple_name(),
                property
            ))
        };
        let value = match value {
            None if declared.is_primitive() => return Err(illegal("cannot be unset".into())),
            None => None,
            Some(v) if !v.fits(declared) => {
                return Err(illegal(format!("expects {declared}, got {}", v.value_type())))
            }
            Some(v) if v.contains_nan() => return Err(illegal("cannot hold NaN".into())),
            Some(v) => Some(
                v.into_stored_form(declared)
                    .map_err(|t| illegal(format!("is undeclared and cannot hold {t}")))?,
            ),
        };
        self.attributes.set(property, value);
        Ok(())
    }
}

impl Clone for Entity {
    fn clone(&self) -> Self {
        Self {
            class: self.class,
            descriptor: Arc::clone(&self.descriptor),
            attributes: self.attributes.clone(),
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.attributes == other.attributes
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("class", &self.class.name)
            .field("attributes", &self.attributes.snapshot())
            .finish()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.class.simple_name())?;
        f.debug_map().entries(self.attributes.snapshot()).finish()
    }
}

impl EntityObject for Entity {
    fn entity_class(&self) -> &'static EntityClass {
        self.class
    }

    fn property(&self, name: &str) -> Option<FieldValue> {
        self.attributes.get(name)
    }

    fn fields(&self) -> Fields {
        self.attributes.snapshot()
    }

    fn modifier(&self) -> Option<&dyn EntityModifier> {
        Some(self)
    }
}

impl EntityModifier for Entity {
    fn set_property(&self, name: &str, value: Option<FieldValue>) -> CoreResult<()> {
        self.set(name, value)
    }
}

impl EntityRecord for Entity {
    fn instantiate(class: &'static EntityClass, fields: Option<Fields>) -> CoreResult<Self> {
        if class.form != ClassForm::Trait {
            return Err(CoreError::unsupported(format!(
                "dynamic entities require a trait class, {} is {:?}",
                class.name, class.form
            )));
        }
        Self::create(class, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::class::{Method, Primitive};
    use entidoc_codec::ObjectId;

    static ITEM: EntityClass = EntityClass::new("dynamic::Item", ClassForm::Trait)
        .table("")
        .methods(&[
            Method::getter("getTitle", ValueType::Text),
            Method::setter("setTitle", &[ValueType::Text]),
            Method::getter("getQuantity", ValueType::Primitive(Primitive::Long)),
            Method::setter("setQuantity", &[ValueType::Primitive(Primitive::Long)]),
            Method::getter("getRating", ValueType::Boxed(Primitive::Double)),
            Method::setter("setRating", &[ValueType::Boxed(Primitive::Double)]),
            Method::getter("getInitial", ValueType::Primitive(Primitive::Char)),
            Method::setter("setInitial", &[ValueType::Primitive(Primitive::Char)]),
            Method::getter("clone", ValueType::Any),
        ]);

    fn item() -> Entity {
        Entity::create(&ITEM, None).unwrap()
    }

    #[test]
    fn primitives_read_as_zero() {
        let e = item();
        assert_eq!(e.invoke("getQuantity", &[]).unwrap(), Some(FieldValue::Long(0)));
        assert_eq!(e.invoke("getInitial", &[]).unwrap(), Some(FieldValue::Char('\0')));
        assert_eq!(e.invoke("getRating", &[]).unwrap(), None);
        assert_eq!(e.invoke("getTitle", &[]).unwrap(), None);
    }

    #[test]
    fn seed_wins_over_defaults() {
        let mut seed = Fields::new();
        seed.insert("quantity".into(), FieldValue::Long(7));
        let e = Entity::create(&ITEM, Some(seed)).unwrap();
        assert_eq!(e.get("quantity"), Some(FieldValue::Long(7)));
    }

    #[test]
    fn write_then_unset() {
        let e = item();
        e.invoke("setRating", &[Some(FieldValue::Double(4.5))]).unwrap();
        assert_eq!(e.get("rating"), Some(FieldValue::Double(4.5)));
        e.invoke("setRating", &[None]).unwrap();
        assert!(e.get("rating").is_none());
    }

    #[test]
    fn primitive_cannot_be_unset() {
        let e = item();
        let err = e.invoke("setQuantity", &[None]).unwrap_err();
        assert!(matches!(err, CoreError::IllegalArgument { .. }));
        assert_eq!(e.get("quantity"), Some(FieldValue::Long(0)));
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let e = item();
        let err = e.invoke("setTitle", &[Some(FieldValue::Int(1))]).unwrap_err();
        assert!(matches!(err, CoreError::IllegalArgument { .. }));
        assert!(e.set("_id", FieldValue::from("not an id")).is_err());
        assert!(e.set("_id", FieldValue::ObjectId(ObjectId::new())).is_ok());
    }

    #[test]
    fn undeclared_values_are_kept_in_stored_form() {
        let e = item();
        e.set("rank", FieldValue::Int(3)).unwrap();
        e.set("ratio", FieldValue::Float(0.25)).unwrap();
        e.set("grade", FieldValue::Char('B')).unwrap();
        assert_eq!(e.get("rank"), Some(FieldValue::Long(3)));
        assert_eq!(e.get("ratio"), Some(FieldValue::Double(0.25)));
        assert_eq!(e.get("grade"), Some("B".into()));

        let nested = FieldValue::Entity(Box::new(item()));
        assert!(matches!(
            e.set("child", nested),
            Err(CoreError::IllegalArgument { .. })
        ));
        assert!(e.get("child").is_none());
    }

    #[test]
    fn nan_is_rejected() {
        let e = item();
        let err = e.invoke("setRating", &[Some(FieldValue::Double(f64::NAN))]).unwrap_err();
        assert!(matches!(err, CoreError::IllegalArgument { .. }));
        assert!(e.get("rating").is_none());
        assert!(e.set("spread", FieldValue::Float(f32::NAN)).is_err());
    }

    #[test]
    fn seeds_are_checked_and_normalized() {
        let mut seed = Fields::new();
        seed.insert("rank".into(), FieldValue::Short(4));
        let e = Entity::create(&ITEM, Some(seed)).unwrap();
        assert_eq!(e.get("rank"), Some(FieldValue::Long(4)));

        let mut bad = Fields::new();
        bad.insert("title".into(), FieldValue::Bool(true));
        assert!(Entity::create(&ITEM, Some(bad)).is_err());
    }

    #[test]
    fn unknown_method_is_unsupported() {
        let e = item();
        assert!(matches!(
            e.invoke("frobnicate", &[]),
            Err(CoreError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            e.invoke("getTitle", &[Some("x".into())]),
            Err(CoreError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn clone_is_equal_and_independent() {
        let e = item();
        e.invoke("setTitle", &[Some("first".into())]).unwrap();
        let Some(FieldValue::Entity(copy)) = e.invoke("clone", &[]).unwrap() else {
            panic!("clone returned no entity");
        };
        assert_eq!(*copy, e);
        copy.invoke("setTitle", &[Some("second".into())]).unwrap();
        assert_ne!(*copy, e);
        assert_eq!(e.get("title"), Some("first".into()));
    }

    #[test]
    fn base_accessors_exist() {
        let e = item();
        let id = ObjectId::new();
        e.set_id(Some(id)).unwrap();
        assert_eq!(e.invoke("getId", &[]).unwrap(), Some(FieldValue::ObjectId(id)));
        assert_eq!(e.id(), Some(id));
        assert!(e.date_created().is_none());
    }

    #[test]
    fn only_trait_classes_instantiate_dynamically() {
        static CONCRETE: EntityClass = EntityClass::new(
            "dynamic::Concrete",
            ClassForm::Concrete {
                public_constructor: true,
            },
        )
        .table("");
        assert!(Entity::instantiate(&ITEM, None).is_ok());
        assert!(Entity::instantiate(&CONCRETE, None).is_err());
    }

    #[test]
    fn display_lists_fields() {
        let e = item();
        e.invoke("setTitle", &[Some("pen".into())]).unwrap();
        let rendered = e.to_string();
        assert!(rendered.starts_with("Item{"));
        assert!(rendered.contains("\"title\": Text(\"pen\")"));
    }
}
