//! Built-in validation stages for the standard capabilities.

use tracing::debug;

use super::validate::Validate;
use super::validation::Validation;
use crate::entity::{
    Capability, EntityObject, DEFUNCTABLE, DEFUNCT_PROPERTY, DESCRIBABLE,
    DESCRIPTION_PROPERTY, NAMABLE, NAME_PROPERTY,
};
use crate::error::{CoreError, CoreResult};

fn text<E: EntityObject>(entity: &E, property: &str) -> Option<String> {
    entity
        .property(property)
        .and_then(|v| v.as_str().map(str::to_string))
}

fn flag<E: EntityObject>(entity: &E, property: &str) -> bool {
    entity
        .property(property)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn is_blank(s: Option<&str>) -> bool {
    s.is_none_or(|s| s.trim().is_empty())
}

/// Checks names of [`Namable`](crate::entity::Namable) entities.
///
/// Runs only when the name is new or changed. A name must be set, must not
/// start or end with whitespace, must not contain consecutive whitespace,
/// and must fit the length bounds (in characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameValidation {
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl NameValidation {
    /// Creates the stage. `None` leaves a side unbounded.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalArgument`] when `max_length < min_length`.
    pub fn new(min_length: Option<usize>, max_length: Option<usize>) -> CoreResult<Self> {
        if let (Some(min), Some(max)) = (min_length, max_length) {
            if max < min {
                return Err(CoreError::illegal_argument(format!(
                    "maxLength: {max} must be >= minLength: {min}"
                )));
            }
        }
        Ok(Self {
            min_length,
            max_length,
        })
    }

    fn check(&self, name: &str, validate: &mut dyn Validate) {
        let chars: Vec<char> = name.chars().collect();
        let last = chars.len() - 1;
        let mut after_whitespace = false;
        for (i, c) in chars.iter().enumerate() {
            if !c.is_whitespace() {
                after_whitespace = false;
            } else if i == 0 {
                validate.add_field_error(NAME_PROPERTY, "name must not start with whitespace".into());
            } else if i == last {
                validate.add_field_error(NAME_PROPERTY, "name must not end with whitespace".into());
            } else if after_whitespace {
                validate.add_field_error(
                    NAME_PROPERTY,
                    "name must not contain consecutive whitespace".into(),
                );
            } else {
                after_whitespace = true;
            }
        }

        let length = chars.len();
        if let Some(min) = self.min_length.filter(|min| length < *min) {
            validate.add_field_error(NAME_PROPERTY, format!("name must be at least {min} characters"));
        } else if let Some(max) = self.max_length.filter(|max| length > *max) {
            validate.add_field_error(NAME_PROPERTY, format!("name must be at most {max} characters"));
        }
    }
}

impl<E: EntityObject> Validation<E> for NameValidation {
    fn capability(&self) -> Option<&'static Capability> {
        Some(&NAMABLE)
    }

    fn validate(&self, entity: &E, original: Option<&E>, validate: &mut dyn Validate) -> CoreResult<()> {
        let name = text(entity, NAME_PROPERTY);
        if original.is_some_and(|o| text(o, NAME_PROPERTY) == name) {
            return Ok(());
        }
        match name.as_deref() {
            Some(name) if !is_blank(Some(name)) => self.check(name, validate),
            _ => validate.add_field_error(NAME_PROPERTY, "name is not set".into()),
        }
        Ok(())
    }
}

/// Checks descriptions of [`Describable`](crate::entity::Describable)
/// entities.
///
/// Runs when the description is set on a new entity or changed. A blank
/// description is cleared on the entity; a long one is a field error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptionValidation {
    max_length: Option<usize>,
}

impl DescriptionValidation {
    /// Creates the stage. `None` disables the length check.
    pub fn new(max_length: Option<usize>) -> Self {
        Self { max_length }
    }
}

impl<E: EntityObject> Validation<E> for DescriptionValidation {
    fn capability(&self) -> Option<&'static Capability> {
        Some(&DESCRIBABLE)
    }

    fn validate(&self, entity: &E, original: Option<&E>, validate: &mut dyn Validate) -> CoreResult<()> {
        let description = text(entity, DESCRIPTION_PROPERTY);
        let changed = match original {
            None => description.is_some(),
            Some(o) => text(o, DESCRIPTION_PROPERTY) != description,
        };
        if !changed {
            return Ok(());
        }
        match description {
            d if is_blank(d.as_deref()) => {
                let modifier = entity.modifier().ok_or_else(|| {
                    CoreError::illegal_argument(format!("unmodifiable entity: {}", entity.entity_class()))
                })?;
                modifier.set_property(DESCRIPTION_PROPERTY, None)?;
                debug!(class = entity.entity_class().name, "Blank description cleared");
            }
            Some(d) => {
                if let Some(max) = self.max_length.filter(|max| d.chars().count() > *max) {
                    validate.add_field_error(
                        DESCRIPTION_PROPERTY,
                        format!("description must be at most {max} characters"),
                    );
                }
            }
            None => {}
        }
        Ok(())
    }
}

/// Keeps the `defunct` flag out of ordinary saves.
///
/// New entities may not be saved defunct, and saves may not change the flag;
/// soft deletion goes through the collection's delete instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefunctValidation;

impl<E: EntityObject> Validation<E> for DefunctValidation {
    fn capability(&self) -> Option<&'static Capability> {
        Some(&DEFUNCTABLE)
    }

    fn validate(&self, entity: &E, original: Option<&E>, validate: &mut dyn Validate) -> CoreResult<()> {
        let defunct = flag(entity, DEFUNCT_PROPERTY);
        let rejected = match original {
            None => defunct,
            Some(o) => defunct != flag(o, DEFUNCT_PROPERTY),
        };
        if rejected {
            validate.add_field_error(DEFUNCT_PROPERTY, "defunct cannot be set by save".into());
        }
        Ok(())
    }
}
