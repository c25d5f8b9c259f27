//! Built-in capabilities and their typed accessors.

use super::class::{Capability, Method, Primitive, ValueType};
use super::dynamic::Entity;
use super::value::FieldValue;
use crate::error::{CoreError, CoreResult};

/// Stored name of the `Namable` property.
pub const NAME_PROPERTY: &str = "name";
/// Stored name of the `Describable` property.
pub const DESCRIPTION_PROPERTY: &str = "description";
/// Stored name of the `Defunctable` property.
pub const DEFUNCT_PROPERTY: &str = "defunct";

/// Entities with a name.
pub static NAMABLE: Capability = Capability::new(
    "Namable",
    &[
        Method::getter("getName", ValueType::Text),
        Method::setter("setName", &[ValueType::Text]),
    ],
);

/// Entities with a free-text description.
pub static DESCRIBABLE: Capability = Capability::new(
    "Describable",
    &[
        Method::getter("getDescription", ValueType::Text),
        Method::setter("setDescription", &[ValueType::Text]),
    ],
);

/// Entities that are soft-deleted instead of removed.
pub static DEFUNCTABLE: Capability = Capability::new(
    "Defunctable",
    &[
        Method::getter("isDefunct", ValueType::Primitive(Primitive::Bool)),
        Method::setter("setDefunct", &[ValueType::Primitive(Primitive::Bool)]),
    ],
);

fn text(value: Option<FieldValue>) -> CoreResult<Option<String>> {
    match value {
        None => Ok(None),
        Some(FieldValue::Text(s)) => Ok(Some(s)),
        Some(other) => Err(CoreError::illegal_argument(format!(
            "expected text, found {}",
            other.value_type()
        ))),
    }
}

/// Typed access to [`NAMABLE`].
pub trait Namable {
    /// The name, if set.
    ///
    /// # Errors
    ///
    /// Fails with `UnsupportedOperation` when the class is not namable.
    fn name(&self) -> CoreResult<Option<String>>;

    /// Sets or clears the name.
    ///
    /// # Errors
    ///
    /// Fails with `UnsupportedOperation` when the class is not namable.
    fn set_name(&self, name: Option<&str>) -> CoreResult<()>;
}

impl Namable for Entity {
    fn name(&self) -> CoreResult<Option<String>> {
        text(self.invoke("getName", &[])?)
    }

    fn set_name(&self, name: Option<&str>) -> CoreResult<()> {
        self.invoke("setName", &[name.map(FieldValue::from)])?;
        Ok(())
    }
}

/// Typed access to [`DESCRIBABLE`].
pub trait Describable {
    /// The description, if set.
    ///
    /// # Errors
    ///
    /// Fails with `UnsupportedOperation` when the class is not describable.
    fn description(&self) -> CoreResult<Option<String>>;

    /// Sets or clears the description.
    ///
    /// # Errors
    ///
    /// Fails with `UnsupportedOperation` when the class is not describable.
    fn set_description(&self, description: Option<&str>) -> CoreResult<()>;
}

impl Describable for Entity {
    fn description(&self) -> CoreResult<Option<String>> {
        text(self.invoke("getDescription", &[])?)
    }

    fn set_description(&self, description: Option<&str>) -> CoreResult<()> {
        self.invoke("setDescription", &[description.map(FieldValue::from)])?;
        Ok(())
    }
}

/// Typed access to [`DEFUNCTABLE`].
pub trait Defunctable {
    /// Whether the entity is soft-deleted.
    ///
    /// # Errors
    ///
    /// Fails with `UnsupportedOperation` when the class is not defunctable.
    fn is_defunct(&self) -> CoreResult<bool>;

    /// Marks or unmarks the entity as soft-deleted.
    ///
    /// # Errors
    ///
    /// Fails with `UnsupportedOperation` when the class is not defunctable.
    fn set_defunct(&self, defunct: bool) -> CoreResult<()>;
}

impl Defunctable for Entity {
    fn is_defunct(&self) -> CoreResult<bool> {
        Ok(self
            .invoke("isDefunct", &[])?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    fn set_defunct(&self, defunct: bool) -> CoreResult<()> {
        self.invoke("setDefunct", &[Some(FieldValue::Bool(defunct))])?;
        Ok(())
    }
}
