//! Validation and persistence pipeline.
//!
//! [`EntityService`] runs an ordered [`ValidationChain`] before saving or
//! deleting through a [`Collection`](crate::collection::Collection).
//! Problems are reported into a [`Validate`] sink; without a sink, a
//! rejected operation fails with [`CoreError::Validation`](crate::CoreError::Validation).

mod builtin;
mod defunct;
mod listener;
mod pipeline;
mod validate;
mod validation;

pub use builtin::{DefunctValidation, DescriptionValidation, NameValidation};
pub use defunct::DefunctAttach;
pub use listener::{EntityListener, NotifyType};
pub use pipeline::{EntityService, ENTITY_NOT_FOUND, ENTITY_NOT_SET};
pub use validate::{Validate, ValidateErrors};
pub use validation::{FnValidation, Position, PositionValidation, Validation, ValidationChain};
