//! The seams between entity values and the rest of the crate.
//!
//! The collection layer and the pipeline work against these traits, so
//! dynamic [`Entity`](super::Entity) values and user-defined concrete records
//! are handled the same way.

use std::fmt::Debug;

use entidoc_codec::{DateTime, ObjectId};

use super::attributes::Fields;
use super::class::EntityClass;
use super::value::FieldValue;
use crate::error::CoreResult;

/// Stored name of the identity property.
pub const ID_PROPERTY: &str = "_id";
/// Stored name of the creation timestamp.
pub const DATE_CREATED: &str = "dateCreated";
/// Stored name of the modification timestamp.
pub const LAST_MODIFIED: &str = "lastModified";

/// Read access to an entity value.
///
/// Object safe; the codec registry encodes any `&dyn EntityObject`.
pub trait EntityObject: Debug + Send + Sync {
    /// The declared class of this value.
    fn entity_class(&self) -> &'static EntityClass;

    /// Reads one property by stored name.
    fn property(&self, name: &str) -> Option<FieldValue>;

    /// Every set property, including identity and timestamps.
    fn fields(&self) -> Fields;

    /// The identity, once assigned.
    fn id(&self) -> Option<ObjectId> {
        self.property(ID_PROPERTY).and_then(|v| v.as_object_id())
    }

    /// When the entity was first saved.
    fn date_created(&self) -> Option<DateTime> {
        self.property(DATE_CREATED).and_then(|v| v.as_date_time())
    }

    /// When the entity was last saved.
    fn last_modified(&self) -> Option<DateTime> {
        self.property(LAST_MODIFIED).and_then(|v| v.as_date_time())
    }

    /// Write access, when the value supports it.
    fn modifier(&self) -> Option<&dyn EntityModifier> {
        None
    }
}

/// Write access to an entity's attributes.
///
/// Methods take `&self`; implementors use interior mutability.
pub trait EntityModifier {
    /// Stores or removes one property.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalArgument`](crate::CoreError::IllegalArgument)
    /// when the value does not fit the property.
    fn set_property(&self, name: &str, value: Option<FieldValue>) -> CoreResult<()>;

    /// Assigns the identity.
    fn set_id(&self, id: Option<ObjectId>) -> CoreResult<()> {
        self.set_property(ID_PROPERTY, id.map(FieldValue::ObjectId))
    }

    /// Assigns the creation timestamp.
    fn set_date_created(&self, at: Option<DateTime>) -> CoreResult<()> {
        self.set_property(DATE_CREATED, at.map(FieldValue::DateTime))
    }

    /// Assigns the modification timestamp.
    fn set_last_modified(&self, at: Option<DateTime>) -> CoreResult<()> {
        self.set_property(LAST_MODIFIED, at.map(FieldValue::DateTime))
    }
}

/// An entity type the collection layer can store and rebuild.
pub trait EntityRecord: EntityObject + Clone + PartialEq + 'static {
    /// Builds a value of `class`, optionally from stored fields.
    ///
    /// # Errors
    ///
    /// Returns an error when this record type cannot represent `class` or the
    /// fields do not fit it.
    fn instantiate(class: &'static EntityClass, fields: Option<Fields>) -> CoreResult<Self>;
}
