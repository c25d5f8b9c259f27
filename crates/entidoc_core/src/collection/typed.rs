//! Typed collection over a document store.

use std::fmt;
use std::sync::Arc;

use entidoc_codec::{DateTime, Document, ObjectId, Value};
use entidoc_store::{
    DeleteResult, DocumentStore, Filter, FindOptions, ReturnDocument, Stage, Update, UpdateResult,
};
use tracing::{debug, warn};

use crate::codec::CodecRegistry;
use crate::entity::{EntityClass, EntityModifier, EntityRecord, DEFUNCT_PROPERTY};
use crate::error::{CoreError, CoreResult};

/// Which records a collection sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every stored record; deletes remove documents.
    Plain,
    /// Only records with `defunct == false`; deletes set `defunct = true`.
    Defunct,
}

/// A typed collection of entities of one class.
///
/// `Collection<E>` converts between `E` and stored documents through the
/// codec registry and forwards every operation to the [`DocumentStore`]
/// under the class's collection name. Collections are obtained from
/// [`CollectionFactory`](super::CollectionFactory).
///
/// # Scope
///
/// Collections of defunctable classes are *scoped*: reads, counts, updates
/// and aggregations only see records whose `defunct` field is `false`, and
/// deletes are soft (they set `defunct = true`). [`Collection::original`]
/// returns the unscoped view over the same records.
///
/// # Example
///
/// ```rust,ignore
/// let machines: Collection<Entity> = factory.new_instance(&MACHINE)?;
///
/// let machine = EntityFactory::create(&MACHINE)?;
/// machines.save(Some(&machine), None)?;
///
/// let found = machines.find_by_id(machine.id())?;
/// ```
pub struct Collection<E: EntityRecord> {
    class: &'static EntityClass,
    name: String,
    store: Arc<dyn DocumentStore>,
    registry: Arc<CodecRegistry>,
    scope: Scope,
    _marker: std::marker::PhantomData<fn() -> E>,
}

impl<E: EntityRecord> Collection<E> {
    /// Creates a collection.
    pub fn new(
        class: &'static EntityClass,
        name: String,
        store: Arc<dyn DocumentStore>,
        registry: Arc<CodecRegistry>,
        scope: Scope,
    ) -> Self {
        Self {
            class,
            name,
            store,
            registry,
            scope,
            _marker: std::marker::PhantomData,
        }
    }

    /// Returns the entity class.
    pub fn entity_class(&self) -> &'static EntityClass {
        self.class
    }

    /// Returns the collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the scope.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the codec registry.
    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    /// The same records without the defunct scope; deletes are hard.
    #[must_use]
    pub fn original(&self) -> Self {
        Self {
            scope: Scope::Plain,
            ..self.clone()
        }
    }

    /// Finds an entity by ID.
    ///
    /// `None` returns `None` without touching the store.
    pub fn find_by_id(&self, id: Option<ObjectId>) -> CoreResult<Option<E>> {
        match id {
            Some(id) => self.find_one_matching(Some(Filter::id(id))),
            None => Ok(None),
        }
    }

    /// Finds the entities whose IDs are listed, in store order.
    pub fn find_by_ids(&self, ids: impl IntoIterator<Item = ObjectId>) -> CoreResult<Vec<E>> {
        let ids: Vec<Value> = ids.into_iter().map(Value::from).collect();
        self.find(Some(Filter::in_values(entidoc_store::ID_FIELD, ids)))
    }

    /// Finds the first entity.
    pub fn find_one(&self) -> CoreResult<Option<E>> {
        self.find_one_matching(None)
    }

    /// Finds the first entity matching `filter`.
    pub fn find_one_matching(&self, filter: Option<Filter>) -> CoreResult<Option<E>> {
        let docs = self.store.find(
            &self.name,
            &self.scoped(filter),
            &FindOptions::new().limit(1),
        )?;
        docs.into_iter().next().map(|doc| self.inflate(doc)).transpose()
    }

    /// Finds every entity matching `filter`.
    pub fn find(&self, filter: Option<Filter>) -> CoreResult<Vec<E>> {
        self.find_with(filter, &FindOptions::new())
    }

    /// Finds entities matching `filter`, shaped by `options`.
    pub fn find_with(&self, filter: Option<Filter>, options: &FindOptions) -> CoreResult<Vec<E>> {
        self.store
            .find(&self.name, &self.scoped(filter), options)?
            .into_iter()
            .map(|doc| self.inflate(doc))
            .collect()
    }

    /// Counts entities matching `filter`.
    pub fn count(&self, filter: Option<Filter>) -> CoreResult<u64> {
        Ok(self.store.count(&self.name, &self.scoped(filter))?)
    }

    /// Counts the entity with `id` further restricted by `filter`.
    pub fn count_by_id(&self, id: ObjectId, filter: Option<Filter>) -> CoreResult<u64> {
        let filter = match filter {
            Some(f) => Filter::and([Filter::id(id), f]),
            None => Filter::id(id),
        };
        self.count(Some(filter))
    }

    /// Whether an entity with `id` exists in this view.
    pub fn contains(&self, id: ObjectId) -> CoreResult<bool> {
        Ok(self.count_by_id(id, None)? > 0)
    }

    /// Whether the entity with `id` exists and matches `filter`.
    pub fn contains_matching(&self, id: ObjectId, filter: Filter) -> CoreResult<bool> {
        Ok(self.count_by_id(id, Some(filter))? > 0)
    }

    /// Distinct values of `field` among matching entities.
    pub fn distinct(&self, field: &str, filter: Option<Filter>) -> CoreResult<Vec<Value>> {
        Ok(self.store.distinct(&self.name, field, &self.scoped(filter))?)
    }

    /// Saves an entity, inserting it when it has no identity yet.
    ///
    /// On insert the identity is `new_id` or a fresh one, and both timestamps
    /// are the identity's embedded timestamp. On update the modification
    /// time moves strictly forward. The entity is updated in place and a
    /// copy is returned. Returns `None` when an update matches no stored
    /// record.
    ///
    /// A failed write leaves the entity's identity and timestamps as they
    /// were before the call.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalArgument`] when the entity cannot be
    /// modified, and store or codec errors as they occur.
    pub fn save(&self, entity: Option<&E>, new_id: Option<ObjectId>) -> CoreResult<Option<E>> {
        let Some(entity) = entity else {
            return Ok(None);
        };
        let modifier = modifier_of(entity)?;
        let previous = Stamps::of(entity);

        let written = match entity.id() {
            None => {
                let id = new_id.unwrap_or_default();
                self.insert(entity, modifier, id).map(|()| {
                    debug!(collection = %self.name, %id, "Entity inserted");
                    true
                })
            }
            Some(id) => self.replace(entity, modifier, id).map(|matched| {
                debug!(collection = %self.name, %id, matched, "Entity replaced");
                matched
            }),
        };
        match written {
            Ok(true) => Ok(Some(entity.clone())),
            Ok(false) => {
                previous.restore(modifier);
                Ok(None)
            }
            Err(e) => {
                previous.restore(modifier);
                Err(e)
            }
        }
    }

    fn insert(&self, entity: &E, modifier: &dyn EntityModifier, id: ObjectId) -> CoreResult<()> {
        Stamps::new(id).apply(modifier)?;
        let doc = self.registry.encode_entity(entity)?;
        self.store.insert_one(&self.name, doc)?;
        Ok(())
    }

    fn replace(&self, entity: &E, modifier: &dyn EntityModifier, id: ObjectId) -> CoreResult<bool> {
        modifier.set_last_modified(Some(next_modified(entity.last_modified())))?;
        let doc = self.registry.encode_entity(entity)?;
        let result = self.store.replace_one(&self.name, &Filter::id(id), doc, false)?;
        Ok(result.matched_count > 0)
    }

    /// Inserts several new entities, assigning identities and timestamps.
    ///
    /// On failure no entity keeps the stamps assigned here.
    pub fn insert_many(&self, entities: &[E]) -> CoreResult<Vec<ObjectId>> {
        let mut stamped = Vec::with_capacity(entities.len());
        let result = self.stamp_and_insert(entities, &mut stamped);
        if result.is_err() {
            for (modifier, previous) in stamped {
                previous.restore(modifier);
            }
        }
        result
    }

    fn stamp_and_insert<'e>(
        &self,
        entities: &'e [E],
        stamped: &mut Vec<(&'e dyn EntityModifier, Stamps)>,
    ) -> CoreResult<Vec<ObjectId>> {
        let mut docs = Vec::with_capacity(entities.len());
        let mut ids = Vec::with_capacity(entities.len());
        for entity in entities {
            let modifier = modifier_of(entity)?;
            let id = entity.id().unwrap_or_default();
            stamped.push((modifier, Stamps::of(entity)));
            Stamps::new(id).apply(modifier)?;
            docs.push(self.registry.encode_entity(entity)?);
            ids.push(id);
        }
        self.store.insert_many(&self.name, docs)?;
        debug!(collection = %self.name, count = ids.len(), "Entities inserted");
        Ok(ids)
    }

    /// Deletes the entity with `id` and returns it.
    ///
    /// `None` returns `None` without touching the store. In a defunct-scoped
    /// collection the record is marked defunct instead and returned as it
    /// was before the change.
    pub fn delete_by_id(&self, id: Option<ObjectId>) -> CoreResult<Option<E>> {
        let Some(id) = id else {
            return Ok(None);
        };
        let deleted = match self.scope {
            Scope::Plain => self.store.find_one_and_delete(&self.name, &Filter::id(id))?,
            Scope::Defunct => self.store.find_one_and_update(
                &self.name,
                &self.scoped(Some(Filter::id(id))),
                &soft_delete(),
                ReturnDocument::Before,
            )?,
        };
        debug!(collection = %self.name, %id, found = deleted.is_some(), "Entity deleted");
        deleted.map(|doc| self.inflate(doc)).transpose()
    }

    /// Deletes the first entity matching `filter`.
    pub fn delete_one(&self, filter: Filter) -> CoreResult<DeleteResult> {
        match self.scope {
            Scope::Plain => Ok(self.store.delete_one(&self.name, &filter)?),
            Scope::Defunct => {
                let result = self.store.update_one(&self.name, &self.scoped(Some(filter)), &soft_delete())?;
                Ok(DeleteResult {
                    deleted_count: result.modified_count,
                })
            }
        }
    }

    /// Deletes every entity matching `filter`.
    pub fn delete_many(&self, filter: Filter) -> CoreResult<DeleteResult> {
        match self.scope {
            Scope::Plain => Ok(self.store.delete_many(&self.name, &filter)?),
            Scope::Defunct => {
                let result = self.store.update_many(&self.name, &self.scoped(Some(filter)), &soft_delete())?;
                Ok(DeleteResult {
                    deleted_count: result.modified_count,
                })
            }
        }
    }

    /// Applies `update` to the entity with `id` and returns the result.
    ///
    /// `None` returns `None` without touching the store.
    pub fn update_by_id(&self, id: Option<ObjectId>, update: &Update) -> CoreResult<Option<E>> {
        match id {
            Some(id) => self.find_one_and_update(Filter::id(id), update, ReturnDocument::After),
            None => Ok(None),
        }
    }

    /// Applies `update` to the first matching entity.
    pub fn update_one(&self, filter: Filter, update: &Update) -> CoreResult<UpdateResult> {
        Ok(self.store.update_one(&self.name, &self.scoped(Some(filter)), update)?)
    }

    /// Applies `update` to every matching entity.
    pub fn update_many(&self, filter: Filter, update: &Update) -> CoreResult<UpdateResult> {
        Ok(self.store.update_many(&self.name, &self.scoped(Some(filter)), update)?)
    }

    /// Atomically updates the first match.
    pub fn find_one_and_update(
        &self,
        filter: Filter,
        update: &Update,
        return_document: ReturnDocument,
    ) -> CoreResult<Option<E>> {
        self.store
            .find_one_and_update(&self.name, &self.scoped(Some(filter)), update, return_document)?
            .map(|doc| self.inflate(doc))
            .transpose()
    }

    /// Atomically replaces the first match with `replacement`.
    pub fn find_one_and_replace(
        &self,
        filter: Filter,
        replacement: &E,
        return_document: ReturnDocument,
    ) -> CoreResult<Option<E>> {
        let doc = self.registry.encode_entity(replacement)?;
        self.store
            .find_one_and_replace(&self.name, &self.scoped(Some(filter)), doc, return_document)?
            .map(|doc| self.inflate(doc))
            .transpose()
    }

    /// Atomically deletes the first match and returns it.
    pub fn find_one_and_delete(&self, filter: Filter) -> CoreResult<Option<E>> {
        let deleted = match self.scope {
            Scope::Plain => self.store.find_one_and_delete(&self.name, &filter)?,
            Scope::Defunct => self.store.find_one_and_update(
                &self.name,
                &self.scoped(Some(filter)),
                &soft_delete(),
                ReturnDocument::Before,
            )?,
        };
        deleted.map(|doc| self.inflate(doc)).transpose()
    }

    /// Runs an aggregation pipeline. A scoped collection matches live
    /// records before the first stage.
    pub fn aggregate(&self, pipeline: &[Stage]) -> CoreResult<Vec<Document>> {
        let docs = match self.scope_filter() {
            Some(live) => {
                let mut stages = Vec::with_capacity(pipeline.len() + 1);
                stages.push(Stage::Match(live));
                stages.extend_from_slice(pipeline);
                self.store.aggregate(&self.name, &stages)?
            }
            None => self.store.aggregate(&self.name, pipeline)?,
        };
        Ok(docs)
    }

    fn scope_filter(&self) -> Option<Filter> {
        match self.scope {
            Scope::Plain => None,
            Scope::Defunct => Some(Filter::eq(DEFUNCT_PROPERTY, false)),
        }
    }

    fn scoped(&self, filter: Option<Filter>) -> Filter {
        match (self.scope_filter(), filter) {
            (Some(live), Some(f)) => Filter::and([live, f]),
            (Some(live), None) => live,
            (None, Some(f)) => f,
            (None, None) => Filter::All,
        }
    }

    fn inflate(&self, doc: Document) -> CoreResult<E> {
        self.registry.inflate(self.class, doc)
    }
}

impl<E: EntityRecord> Clone for Collection<E> {
    fn clone(&self) -> Self {
        Self {
            class: self.class,
            name: self.name.clone(),
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            scope: self.scope,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<E: EntityRecord> fmt::Debug for Collection<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("class", &self.class.name)
            .field("name", &self.name)
            .field("scope", &self.scope)
            .finish()
    }
}

fn soft_delete() -> Update {
    Update::set(DEFUNCT_PROPERTY, true)
}

/// Now, or one millisecond past `previous` when the clock has not moved.
fn modifier_of<E: EntityRecord>(entity: &E) -> CoreResult<&dyn EntityModifier> {
    entity.modifier().ok_or_else(|| {
        CoreError::illegal_argument(format!("unmodifiable entity: {}", entity.entity_class()))
    })
}

/// Identity and timestamps of an entity, captured or about to be applied.
#[derive(Debug, Clone, Copy)]
struct Stamps {
    id: Option<ObjectId>,
    created: Option<DateTime>,
    modified: Option<DateTime>,
}

impl Stamps {
    /// The stamps of a new record: both timestamps are the id's own.
    fn new(id: ObjectId) -> Self {
        let created = Some(id.timestamp());
        Self {
            id: Some(id),
            created,
            modified: created,
        }
    }

    fn of<E: EntityRecord>(entity: &E) -> Self {
        Self {
            id: entity.id(),
            created: entity.date_created(),
            modified: entity.last_modified(),
        }
    }

    fn apply(&self, modifier: &dyn EntityModifier) -> CoreResult<()> {
        modifier.set_id(self.id)?;
        modifier.set_date_created(self.created)?;
        modifier.set_last_modified(self.modified)
    }

    fn restore(&self, modifier: &dyn EntityModifier) {
        if let Err(e) = self.apply(modifier) {
            warn!(error = %e, "Entity stamps not restored after failed write");
        }
    }
}

fn next_modified(previous: Option<DateTime>) -> DateTime {
    let now = DateTime::now();
    match previous.and_then(|p| p.checked_add_millis(1)) {
        Some(floor) if floor.timestamp_millis() > now.timestamp_millis() => floor,
        _ => now,
    }
}
