//! Validation stages and their ordering.

use std::fmt;
use std::sync::Arc;

use super::validate::Validate;
use crate::entity::{Capability, EntityObject};
use crate::error::CoreResult;

/// One step of validating an entity before it is saved or deleted.
///
/// `original` is the stored version of the entity, absent for new entities
/// and for deletes. Problems are reported into `validate`; an `Err` means
/// the stage itself failed and aborts the operation.
pub trait Validation<E>: Send + Sync {
    /// The capability an entity's class must implement for this stage to
    /// run. `None` runs for every class.
    fn capability(&self) -> Option<&'static Capability> {
        None
    }

    /// Checks `entity`, reporting problems into `validate`.
    ///
    /// # Errors
    ///
    /// Returns an error when the check cannot be carried out.
    fn validate(&self, entity: &E, original: Option<&E>, validate: &mut dyn Validate) -> CoreResult<()>;
}

/// A [`Validation`] backed by a closure.
pub struct FnValidation<F> {
    capability: Option<&'static Capability>,
    check: F,
}

impl<F> FnValidation<F> {
    /// Wraps `check` as a stage that runs for every class.
    pub fn new(check: F) -> Self {
        Self {
            capability: None,
            check,
        }
    }

    /// Wraps `check` as a stage that runs only for classes implementing
    /// `capability`.
    pub fn scoped(capability: &'static Capability, check: F) -> Self {
        Self {
            capability: Some(capability),
            check,
        }
    }
}

impl<E, F> Validation<E> for FnValidation<F>
where
    F: Fn(&E, Option<&E>, &mut dyn Validate) -> CoreResult<()> + Send + Sync,
{
    fn capability(&self) -> Option<&'static Capability> {
        self.capability
    }

    fn validate(&self, entity: &E, original: Option<&E>, validate: &mut dyn Validate) -> CoreResult<()> {
        (self.check)(entity, original, validate)
    }
}

impl<F> fmt::Debug for FnValidation<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnValidation")
            .field("capability", &self.capability.map(|c| c.name))
            .finish_non_exhaustive()
    }
}

/// Where a service-wide stage runs relative to the caller's stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Position {
    /// Before everything else.
    First,
    /// Before the caller's stages.
    Pre,
    /// After the caller's stages.
    Post,
    /// After everything else.
    Last,
}

/// A service-wide stage with its position.
pub struct PositionValidation<E> {
    /// Where the stage runs.
    pub position: Position,
    /// The stage.
    pub validation: Arc<dyn Validation<E>>,
}

impl<E> PositionValidation<E> {
    /// Creates a positioned stage.
    pub fn new(position: Position, validation: Arc<dyn Validation<E>>) -> Self {
        Self {
            position,
            validation,
        }
    }
}

impl<E> Clone for PositionValidation<E> {
    fn clone(&self) -> Self {
        Self {
            position: self.position,
            validation: Arc::clone(&self.validation),
        }
    }
}

impl<E> fmt::Debug for PositionValidation<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionValidation")
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// The ordered stages applied to one save or delete.
///
/// Stages run `First`, `Pre`, the caller's stages in order, `Post`, `Last`.
/// Within a slot, stages run in the order they were added.
pub struct ValidationChain<'a, E> {
    first: Vec<&'a dyn Validation<E>>,
    pre: Vec<&'a dyn Validation<E>>,
    stages: Vec<&'a dyn Validation<E>>,
    post: Vec<&'a dyn Validation<E>>,
    last: Vec<&'a dyn Validation<E>>,
}

impl<'a, E: EntityObject> ValidationChain<'a, E> {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self {
            first: Vec::new(),
            pre: Vec::new(),
            stages: Vec::new(),
            post: Vec::new(),
            last: Vec::new(),
        }
    }

    /// Adds a service-wide stage to its slot.
    #[must_use]
    pub fn at(mut self, position: Position, validation: &'a dyn Validation<E>) -> Self {
        match position {
            Position::First => self.first.push(validation),
            Position::Pre => self.pre.push(validation),
            Position::Post => self.post.push(validation),
            Position::Last => self.last.push(validation),
        }
        self
    }

    /// Adds every positioned stage in `general`.
    #[must_use]
    pub fn general(self, general: &'a [PositionValidation<E>]) -> Self {
        general
            .iter()
            .fold(self, |chain, g| chain.at(g.position, g.validation.as_ref()))
    }

    /// Adds caller stages between `Pre` and `Post`.
    #[must_use]
    pub fn stages(mut self, stages: &[&'a dyn Validation<E>]) -> Self {
        self.stages.extend_from_slice(stages);
        self
    }

    /// Number of stages in the chain.
    pub fn len(&self) -> usize {
        self.first.len() + self.pre.len() + self.stages.len() + self.post.len() + self.last.len()
    }

    /// Whether the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stages in run order.
    pub fn iter(&self) -> impl Iterator<Item = &'a dyn Validation<E>> + '_ {
        self.first
            .iter()
            .chain(&self.pre)
            .chain(&self.stages)
            .chain(&self.post)
            .chain(&self.last)
            .copied()
    }

    /// Runs every applicable stage against `entity`.
    ///
    /// A stage scoped to a capability is skipped when the entity's class
    /// does not implement it.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a stage.
    pub fn validate(&self, entity: &E, original: Option<&E>, validate: &mut dyn Validate) -> CoreResult<()> {
        let class = entity.entity_class();
        for stage in self.iter() {
            if stage.capability().is_some_and(|cap| !class.implements(cap)) {
                continue;
            }
            stage.validate(entity, original, validate)?;
        }
        Ok(())
    }
}

impl<E: EntityObject> Default for ValidationChain<'_, E> {
    fn default() -> Self {
        Self::new()
    }
}
