//! Entity construction.

use super::attributes::Fields;
use super::class::{ClassForm, EntityClass, ValueType};
use super::dynamic::Entity;
use super::record::{EntityObject, EntityRecord};
use crate::error::{CoreError, CoreResult};

/// Creates entity values and answers questions about entity classes.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityFactory;

impl EntityFactory {
    /// Whether `class` can be instantiated as an entity.
    ///
    /// Accepts trait classes carrying a table marker, and concrete classes
    /// with a public constructor carrying a table marker.
    pub fn is_entity_class(class: &EntityClass) -> bool {
        if class.table.is_none() {
            return false;
        }
        match class.form {
            ClassForm::Trait => true,
            ClassForm::Concrete { public_constructor } => public_constructor,
            ClassForm::Abstract => false,
        }
    }

    /// Creates a fresh instance of `class` with no identity or timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedOperation`] when `class` is not an
    /// entity class or instantiation fails.
    pub fn new_instance<E: EntityRecord>(class: &'static EntityClass) -> CoreResult<E> {
        Self::new_instance_with(class, None)
    }

    /// Creates an instance of `class` seeded with `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedOperation`] when `class` is not an
    /// entity class, or with the cause chained when instantiation fails.
    pub fn new_instance_with<E: EntityRecord>(
        class: &'static EntityClass,
        seed: Option<Fields>,
    ) -> CoreResult<E> {
        if !Self::is_entity_class(class) {
            return Err(CoreError::unsupported(format!(
                "Invalid EntityClass: {}",
                class.name
            )));
        }
        E::instantiate(class, seed).map_err(|cause| {
            CoreError::unsupported_with_cause(format!("Instantiation fails: {}", class.name), cause)
        })
    }

    /// Creates a dynamic entity of a trait class.
    ///
    /// # Errors
    ///
    /// Same as [`new_instance`](Self::new_instance).
    pub fn create(class: &'static EntityClass) -> CoreResult<Entity> {
        Self::new_instance(class)
    }

    /// The declared class behind an entity value.
    pub fn entity_class_of(record: &dyn EntityObject) -> &'static EntityClass {
        record.entity_class()
    }

    /// The entity class named by a value type, if it names one.
    pub fn entity_class_of_type(value_type: &ValueType) -> Option<&'static EntityClass> {
        match value_type {
            ValueType::Entity(class) => Some(*class),
            _ => None,
        }
    }

    /// An equal, independent copy of `record`.
    pub fn clone<E: EntityRecord>(record: &E) -> E {
        record.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::class::{Method, Primitive};
    use std::error::Error;

    static GADGET: EntityClass = EntityClass::new("factory::Gadget", ClassForm::Trait)
        .table("")
        .methods(&[
            Method::getter("getSize", ValueType::Primitive(Primitive::Int)),
            Method::setter("setSize", &[ValueType::Primitive(Primitive::Int)]),
        ]);

    static UNMARKED: EntityClass = EntityClass::new("factory::Unmarked", ClassForm::Trait);

    static ABSTRACT: EntityClass =
        EntityClass::new("factory::Abstract", ClassForm::Abstract).table("");

    static HIDDEN: EntityClass = EntityClass::new(
        "factory::Hidden",
        ClassForm::Concrete {
            public_constructor: false,
        },
    )
    .table("");

    static RECORD: EntityClass = EntityClass::new(
        "factory::Record",
        ClassForm::Concrete {
            public_constructor: true,
        },
    )
    .table("");

    #[test]
    fn entity_class_rules() {
        assert!(EntityFactory::is_entity_class(&GADGET));
        assert!(EntityFactory::is_entity_class(&RECORD));
        assert!(!EntityFactory::is_entity_class(&UNMARKED));
        assert!(!EntityFactory::is_entity_class(&ABSTRACT));
        assert!(!EntityFactory::is_entity_class(&HIDDEN));
    }

    #[test]
    fn invalid_class_is_rejected() {
        let err = EntityFactory::create(&UNMARKED).unwrap_err();
        assert!(err.to_string().contains("Invalid EntityClass: factory::Unmarked"));
    }

    #[test]
    fn failed_instantiation_chains_cause() {
        let err = EntityFactory::new_instance::<Entity>(&RECORD).unwrap_err();
        assert!(err.to_string().contains("Instantiation fails: factory::Record"));
        assert!(err.source().is_some());
    }

    #[test]
    fn seeded_instance() {
        let mut seed = Fields::new();
        seed.insert("size".into(), 3.into());
        let e: Entity = EntityFactory::new_instance_with(&GADGET, Some(seed)).unwrap();
        assert_eq!(e.invoke("getSize", &[]).unwrap(), Some(3.into()));

        let copy = EntityFactory::clone(&e);
        assert_eq!(copy, e);
        assert!(!std::ptr::eq(&copy, &e));
    }

    #[test]
    fn class_identity() {
        let e = EntityFactory::create(&GADGET).unwrap();
        assert_eq!(EntityFactory::entity_class_of(&e), &GADGET);
        assert_eq!(
            EntityFactory::entity_class_of_type(&ValueType::Entity(&GADGET)),
            Some(&GADGET)
        );
        assert_eq!(EntityFactory::entity_class_of_type(&ValueType::Text), None);
    }
}
