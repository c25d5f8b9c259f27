//! The entity model.
//!
//! Entity types are declared as static [`EntityClass`] values. Trait-form
//! classes are instantiated as dynamic [`Entity`] values whose accessors are
//! interpreted from a per-class [`EntityDescriptor`]; concrete classes are
//! backed by user types implementing [`EntityRecord`].

mod attributes;
mod capability;
mod class;
mod descriptor;
mod dynamic;
mod factory;
mod record;
mod value;

pub use attributes::{AttributeStore, Fields};
pub use capability::{
    Defunctable, Describable, Namable, DEFUNCTABLE, DEFUNCT_PROPERTY, DESCRIBABLE,
    DESCRIPTION_PROPERTY, NAMABLE, NAME_PROPERTY,
};
pub use class::{
    Capability, ClassForm, EntityClass, EnumClass, EnumValue, Method, Primitive, ValueType, ANY,
};
pub use descriptor::{
    descriptor_of, property_name, AccessShape, Accessor, EntityDescriptor, PropertyDescriptor,
};
pub use dynamic::Entity;
pub use factory::EntityFactory;
pub use record::{
    EntityModifier, EntityObject, EntityRecord, DATE_CREATED, ID_PROPERTY, LAST_MODIFIED,
};
pub use value::{FieldValue, Opaque};
