//! Document store trait definition.

use entidoc_codec::{Document, Value};

use crate::error::StoreResult;
use crate::filter::Filter;
use crate::options::{DeleteResult, FindOptions, ReturnDocument, Stage, UpdateResult};
use crate::update::Update;

/// The driver interface of a schema-less document store.
///
/// A store holds named collections of [`Document`]s keyed by their `_id`
/// field. It knows nothing about entities or codecs; the collection layer
/// converts between the two.
///
/// # Invariants
///
/// - Every stored document has a unique `_id` within its collection
/// - Single-document operations (`find_one_and_*`, `replace_one`,
///   `update_one`, `delete_one`) are atomic
/// - Implementations must be `Send + Sync`; every method takes `&self`
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing and embedded use
pub trait DocumentStore: Send + Sync {
    /// Inserts one document, assigning an `_id` when absent.
    ///
    /// Returns the document's `_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if a document with the same `_id` exists.
    fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Value>;

    /// Inserts several documents in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing document; earlier ones stay inserted.
    fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<Vec<Value>>;

    /// Returns the documents matching `filter`, shaped by `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if stored data cannot be decoded.
    fn find(&self, collection: &str, filter: &Filter, options: &FindOptions)
        -> StoreResult<Vec<Document>>;

    /// Counts the documents matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if stored data cannot be decoded.
    fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Replaces the first document matching `filter`.
    ///
    /// The replacement keeps the matched document's `_id`. With `upsert`, a
    /// missing match inserts the replacement instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the replacement carries a different `_id`.
    fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        replacement: Document,
        upsert: bool,
    ) -> StoreResult<UpdateResult>;

    /// Applies `update` to the first document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the update cannot be applied.
    fn update_one(&self, collection: &str, filter: &Filter, update: &Update)
        -> StoreResult<UpdateResult>;

    /// Applies `update` to every document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the update cannot be applied.
    fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateResult>;

    /// Deletes the first document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if stored data cannot be decoded.
    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<DeleteResult>;

    /// Deletes every document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if stored data cannot be decoded.
    fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<DeleteResult>;

    /// Atomically updates the first match and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the update cannot be applied.
    fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        return_document: ReturnDocument,
    ) -> StoreResult<Option<Document>>;

    /// Atomically replaces the first match and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the replacement carries a different `_id`.
    fn find_one_and_replace(
        &self,
        collection: &str,
        filter: &Filter,
        replacement: Document,
        return_document: ReturnDocument,
    ) -> StoreResult<Option<Document>>;

    /// Atomically deletes the first match and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if stored data cannot be decoded.
    fn find_one_and_delete(&self, collection: &str, filter: &Filter)
        -> StoreResult<Option<Document>>;

    /// Distinct values of `field` among matching documents.
    ///
    /// Array fields contribute their elements.
    ///
    /// # Errors
    ///
    /// Returns an error if stored data cannot be decoded.
    fn distinct(&self, collection: &str, field: &str, filter: &Filter) -> StoreResult<Vec<Value>>;

    /// Runs an aggregation pipeline over the collection.
    ///
    /// # Errors
    ///
    /// Returns an error if stored data cannot be decoded.
    fn aggregate(&self, collection: &str, pipeline: &[Stage]) -> StoreResult<Vec<Document>>;
}
