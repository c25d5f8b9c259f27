//! Validate-then-persist operations over a collection.

use std::fmt;
use std::sync::Arc;

use entidoc_codec::ObjectId;
use entidoc_store::Filter;
use tracing::{debug, error};

use super::builtin::{DefunctValidation, DescriptionValidation, NameValidation};
use super::listener::{EntityListener, NotifyType};
use super::validate::{Validate, ValidateErrors};
use super::validation::{Position, PositionValidation, Validation, ValidationChain};
use crate::collection::Collection;
use crate::config::Config;
use crate::entity::{EntityRecord, DEFUNCTABLE, DEFUNCT_PROPERTY};
use crate::error::{CoreError, CoreResult};

/// Action error recorded when no entity was supplied.
pub const ENTITY_NOT_SET: &str = "entity not set";
/// Action error recorded when an entity's stored version is missing.
pub const ENTITY_NOT_FOUND: &str = "entity not found";

/// Saves and deletes entities of one collection behind validation.
///
/// A service with general validations is *validation-aware*: its positioned
/// stages run around the stages each caller supplies.
///
/// # Example
///
/// ```rust,ignore
/// let service = EntityService::new(Arc::new(machines)).with_core_validations(&config)?;
///
/// let mut errors = ValidateErrors::new();
/// match service.validate_and_save(Some(&machine), None, Some(&mut errors), &[])? {
///     Some(saved) => println!("saved {:?}", saved.id()),
///     None if errors.has_errors() => println!("rejected: {errors}"),
///     None => println!("nothing changed"),
/// }
/// ```
pub struct EntityService<E: EntityRecord> {
    collection: Arc<Collection<E>>,
    general: Option<Vec<PositionValidation<E>>>,
    listener: Option<Arc<dyn EntityListener<E>>>,
}

impl<E: EntityRecord> EntityService<E> {
    /// Creates a service with no general validations and no listener.
    pub fn new(collection: Arc<Collection<E>>) -> Self {
        Self {
            collection,
            general: None,
            listener: None,
        }
    }

    /// Makes the service validation-aware with the given stages.
    #[must_use]
    pub fn with_general_validations(mut self, validations: Vec<PositionValidation<E>>) -> Self {
        self.general.get_or_insert_with(Vec::new).extend(validations);
        self
    }

    /// Adds one general stage at `position`.
    #[must_use]
    pub fn with_validation(self, position: Position, validation: Arc<dyn Validation<E>>) -> Self {
        self.with_general_validations(vec![PositionValidation::new(position, validation)])
    }

    /// Adds the name, description and defunct stages at [`Position::Pre`],
    /// bounded by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalArgument`] when the configured name
    /// bounds are inverted.
    pub fn with_core_validations(self, config: &Config) -> CoreResult<Self> {
        let name = NameValidation::new(config.name_min_length, config.name_max_length)?;
        let description = DescriptionValidation::new(config.description_max_length);
        Ok(self
            .with_validation(Position::Pre, Arc::new(name))
            .with_validation(Position::Pre, Arc::new(description))
            .with_validation(Position::Pre, Arc::new(DefunctValidation)))
    }

    /// Sets the listener notified after saves and deletes.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn EntityListener<E>>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Returns the collection.
    pub fn collection(&self) -> &Arc<Collection<E>> {
        &self.collection
    }

    /// Whether the service contributes general validations.
    pub fn is_validation_aware(&self) -> bool {
        self.general.is_some()
    }

    /// The chain run for `stages`: general stages in their slots around the
    /// caller's.
    pub fn validation_chain<'a>(&'a self, stages: &[&'a dyn Validation<E>]) -> ValidationChain<'a, E> {
        let chain = ValidationChain::new();
        let chain = match &self.general {
            Some(general) => chain.general(general),
            None => chain,
        };
        chain.stages(stages)
    }

    /// Validates and saves `entity`.
    ///
    /// New entities are validated against no original and always saved.
    /// Existing entities are validated against their stored version and
    /// saved only when they differ from it.
    ///
    /// Returns the saved entity, or `None` when nothing was written: the
    /// entity was unchanged, or it was rejected and the errors went to
    /// `sink`.
    ///
    /// # Errors
    ///
    /// Without a sink, a rejection (including any failure while validating
    /// or saving) is returned as [`CoreError::Validation`].
    pub fn validate_and_save(
        &self,
        entity: Option<&E>,
        new_id: Option<ObjectId>,
        sink: Option<&mut dyn Validate>,
        stages: &[&dyn Validation<E>],
    ) -> CoreResult<Option<E>> {
        self.run(sink, |validate| self.check_and_save(entity, new_id, validate, stages))
    }

    /// Validates and deletes the entity with `id`.
    ///
    /// With stages, the entity is fetched and validated first; a missing
    /// entity returns `None`. Returns the deleted entity.
    ///
    /// # Errors
    ///
    /// Same as [`validate_and_save`](Self::validate_and_save).
    pub fn validate_and_delete(
        &self,
        id: Option<ObjectId>,
        sink: Option<&mut dyn Validate>,
        stages: &[&dyn Validation<E>],
    ) -> CoreResult<Option<E>> {
        self.run(sink, |validate| self.check_and_delete(id, validate, stages))
    }

    /// Restricts an aggregation match filter to live records of defunctable
    /// classes.
    pub fn aggregate_match_filter(&self, filter: Option<Filter>) -> Option<Filter> {
        if !self.collection.entity_class().implements(&DEFUNCTABLE) {
            return filter;
        }
        let live = Filter::eq(DEFUNCT_PROPERTY, false);
        Some(match filter {
            Some(filter) => Filter::and([live, filter]),
            None => live,
        })
    }

    fn run(
        &self,
        sink: Option<&mut dyn Validate>,
        operation: impl FnOnce(&mut dyn Validate) -> CoreResult<Option<E>>,
    ) -> CoreResult<Option<E>> {
        let has_sink = sink.is_some();
        let mut own = ValidateErrors::new();
        let validate: &mut dyn Validate = match sink {
            Some(sink) => sink,
            None => &mut own,
        };

        let result = match operation(&mut *validate) {
            Ok(result) => result,
            Err(e) => {
                error!(collection = self.collection.name(), error = %e, "Entity operation failed");
                validate.add_action_error(e.to_string());
                None
            }
        };

        if validate.has_errors() {
            debug!(
                collection = self.collection.name(),
                action_errors = validate.has_action_errors(),
                field_errors = validate.has_field_errors(),
                "Entity operation rejected"
            );
            return if has_sink {
                Ok(None)
            } else {
                Err(CoreError::Validation(own))
            };
        }
        Ok(result)
    }

    fn check_and_save(
        &self,
        entity: Option<&E>,
        new_id: Option<ObjectId>,
        validate: &mut dyn Validate,
        stages: &[&dyn Validation<E>],
    ) -> CoreResult<Option<E>> {
        let Some(entity) = entity else {
            validate.add_action_error(ENTITY_NOT_SET.to_string());
            return Ok(None);
        };
        let chain = self.validation_chain(stages);

        let original = match entity.id() {
            None => {
                chain.validate(entity, None, validate)?;
                None
            }
            Some(id) => match self.collection.original().find_by_id(Some(id))? {
                Some(original) => {
                    chain.validate(entity, Some(&original), validate)?;
                    Some(original)
                }
                None => {
                    validate.add_action_error(ENTITY_NOT_FOUND.to_string());
                    return Ok(None);
                }
            },
        };
        if validate.has_errors() {
            return Ok(None);
        }
        if original.as_ref().is_some_and(|o| o == entity) {
            debug!(collection = self.collection.name(), id = ?entity.id(), "validateAndSave without change");
            return Ok(None);
        }

        let notify = if original.is_none() {
            NotifyType::Insert
        } else {
            NotifyType::Update
        };
        debug!(collection = self.collection.name(), ?notify, "validateAndSave with change");
        let Some(saved) = self.collection.save(Some(entity), new_id)? else {
            // Removed after the original was read.
            validate.add_action_error(ENTITY_NOT_FOUND.to_string());
            return Ok(None);
        };
        if let Some(listener) = &self.listener {
            listener.on_entity_saved(&saved, notify)?;
        }
        Ok(Some(saved))
    }

    fn check_and_delete(
        &self,
        id: Option<ObjectId>,
        validate: &mut dyn Validate,
        stages: &[&dyn Validation<E>],
    ) -> CoreResult<Option<E>> {
        if !stages.is_empty() {
            let Some(entity) = self.collection.find_by_id(id)? else {
                return Ok(None);
            };
            self.validation_chain(stages).validate(&entity, None, validate)?;
            if validate.has_errors() {
                return Ok(None);
            }
        }

        let deleted = self.collection.delete_by_id(id)?;
        if let (Some(listener), Some(deleted)) = (&self.listener, &deleted) {
            listener.on_entity_deleted(deleted)?;
        }
        Ok(deleted)
    }
}

impl<E: EntityRecord> fmt::Debug for EntityService<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityService")
            .field("collection", &self.collection)
            .field("general", &self.general.as_ref().map(Vec::len))
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
