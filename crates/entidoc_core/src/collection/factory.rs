//! Collection construction.

use std::sync::Arc;

use entidoc_store::DocumentStore;
use tracing::debug;

use super::name::collection_name;
use super::typed::{Collection, Scope};
use crate::codec::CodecRegistry;
use crate::entity::{EntityClass, EntityFactory, EntityRecord, DEFUNCTABLE};
use crate::error::{CoreError, CoreResult};

/// Creates typed collections over one store and codec registry.
#[derive(Clone)]
pub struct CollectionFactory {
    store: Arc<dyn DocumentStore>,
    registry: Arc<CodecRegistry>,
}

impl CollectionFactory {
    /// Creates a factory.
    pub fn new(store: Arc<dyn DocumentStore>, registry: Arc<CodecRegistry>) -> Self {
        Self { store, registry }
    }

    /// Returns the shared codec registry.
    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    /// Opens the collection of `class`.
    ///
    /// Defunctable classes get a defunct-scoped collection.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedOperation`] when `class` is not an
    /// entity class, and [`CoreError::CollectionInitialization`] when no
    /// collection name can be derived for it.
    pub fn new_instance<E: EntityRecord>(&self, class: &'static EntityClass) -> CoreResult<Collection<E>> {
        if !EntityFactory::is_entity_class(class) {
            return Err(CoreError::unsupported(format!(
                "Invalid EntityClass: {}",
                class.name
            )));
        }
        let name = collection_name(class)?;
        let scope = if class.implements(&DEFUNCTABLE) {
            Scope::Defunct
        } else {
            Scope::Plain
        };
        debug!(class = class.name, collection = %name, ?scope, "Collection opened");
        Ok(Collection::new(
            class,
            name,
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            scope,
        ))
    }
}

impl std::fmt::Debug for CollectionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionFactory")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
