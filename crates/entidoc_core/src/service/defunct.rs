//! Reads across the defunct boundary.

use std::sync::Arc;

use entidoc_codec::ObjectId;
use entidoc_store::Filter;

use crate::collection::Collection;
use crate::entity::{EntityRecord, DEFUNCTABLE, DEFUNCT_PROPERTY};
use crate::error::{CoreError, CoreResult};

/// Queries a defunctable collection with an explicit defunct selector.
///
/// For every operation, `defunct` selects the view:
///
/// - `None`: every record, defunct or not
/// - `Some(true)`: only soft-deleted records
/// - `Some(false)`: only live records, like the collection itself
#[derive(Debug)]
pub struct DefunctAttach<E: EntityRecord> {
    collection: Arc<Collection<E>>,
}

impl<E: EntityRecord> DefunctAttach<E> {
    /// Attaches to `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalArgument`] when the collection's class is
    /// not defunctable.
    pub fn new(collection: Arc<Collection<E>>) -> CoreResult<Self> {
        let class = collection.entity_class();
        if !class.implements(&DEFUNCTABLE) {
            return Err(CoreError::illegal_argument(format!(
                "{} does not implement {}",
                class.name, DEFUNCTABLE.name
            )));
        }
        Ok(Self { collection })
    }

    /// Whether the entity with `id` exists in the selected view.
    pub fn contains(&self, id: ObjectId, defunct: Option<bool>) -> CoreResult<bool> {
        let (collection, base) = self.view(defunct);
        let filter = and(Some(Filter::id(id)), base);
        Ok(collection.count(filter)? > 0)
    }

    /// Entities matching `filter` in the selected view.
    pub fn find(&self, filter: Option<Filter>, defunct: Option<bool>) -> CoreResult<Vec<E>> {
        let (collection, base) = self.view(defunct);
        collection.find(and(base, filter))
    }

    /// The entity with `id` in the selected view.
    ///
    /// `None` returns `None` without touching the store.
    pub fn find_by_id(&self, id: Option<ObjectId>, defunct: Option<bool>) -> CoreResult<Option<E>> {
        let Some(id) = id else {
            return Ok(None);
        };
        let (collection, base) = self.view(defunct);
        collection.find_one_matching(and(Some(Filter::id(id)), base))
    }

    /// Counts entities matching `filter` in the selected view.
    pub fn count(&self, filter: Option<Filter>, defunct: Option<bool>) -> CoreResult<u64> {
        let (collection, base) = self.view(defunct);
        collection.count(and(base, filter))
    }

    fn view(&self, defunct: Option<bool>) -> (Collection<E>, Option<Filter>) {
        match defunct {
            None => (self.collection.original(), None),
            Some(true) => (
                self.collection.original(),
                Some(Filter::eq(DEFUNCT_PROPERTY, true)),
            ),
            Some(false) => (Collection::clone(&self.collection), None),
        }
    }
}

fn and(a: Option<Filter>, b: Option<Filter>) -> Option<Filter> {
    match (a, b) {
        (Some(a), Some(b)) => Some(Filter::and([a, b])),
        (a, b) => a.or(b),
    }
}
