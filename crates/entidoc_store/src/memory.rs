//! In-memory document store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use entidoc_codec::{decode_document, encode_document, Document, ObjectId, Value};
use parking_lot::RwLock;

use crate::backend::DocumentStore;
use crate::error::{StoreError, StoreResult};
use crate::filter::{Filter, ID_FIELD};
use crate::options::{DeleteResult, FindOptions, ReturnDocument, Stage, UpdateResult};
use crate::update::Update;

#[derive(Debug, Clone)]
struct StoredDocument {
    id: Value,
    bytes: Vec<u8>,
}

impl StoredDocument {
    fn encode(doc: &Document) -> StoreResult<Self> {
        let id = doc
            .get(ID_FIELD)
            .cloned()
            .ok_or_else(|| StoreError::InvalidDocument(format!("missing '{ID_FIELD}'")))?;
        Ok(Self {
            id,
            bytes: encode_document(doc)?,
        })
    }

    fn decode(&self) -> StoreResult<Document> {
        Ok(decode_document(&self.bytes)?)
    }
}

/// Kinds of store call, counted per store instance.
#[derive(Debug, Clone, Copy)]
enum Op {
    Insert,
    Find,
    Count,
    Replace,
    Update,
    Delete,
    FindAndModify,
    Distinct,
    Aggregate,
}

#[derive(Debug, Default)]
struct Counters {
    insert: AtomicU64,
    find: AtomicU64,
    count: AtomicU64,
    replace: AtomicU64,
    update: AtomicU64,
    delete: AtomicU64,
    find_and_modify: AtomicU64,
    distinct: AtomicU64,
    aggregate: AtomicU64,
}

impl Counters {
    fn counter(&self, op: Op) -> &AtomicU64 {
        match op {
            Op::Insert => &self.insert,
            Op::Find => &self.find,
            Op::Count => &self.count,
            Op::Replace => &self.replace,
            Op::Update => &self.update,
            Op::Delete => &self.delete,
            Op::FindAndModify => &self.find_and_modify,
            Op::Distinct => &self.distinct,
            Op::Aggregate => &self.aggregate,
        }
    }
}

/// Snapshot of how many calls of each kind a store has served.
///
/// Insert-many counts once; find-and-modify covers the three atomic
/// `find_one_and_*` calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    /// `insert_one` and `insert_many` calls.
    pub insert: u64,
    /// `find` calls.
    pub find: u64,
    /// `count` calls.
    pub count: u64,
    /// `replace_one` calls.
    pub replace: u64,
    /// `update_one` and `update_many` calls.
    pub update: u64,
    /// `delete_one` and `delete_many` calls.
    pub delete: u64,
    /// `find_one_and_update`, `find_one_and_replace` and `find_one_and_delete` calls.
    pub find_and_modify: u64,
    /// `distinct` calls.
    pub distinct: u64,
    /// `aggregate` calls.
    pub aggregate: u64,
}

impl StoreCalls {
    /// Calls that can modify data.
    pub fn writes(&self) -> u64 {
        self.insert + self.replace + self.update + self.delete + self.find_and_modify
    }

    /// All calls.
    pub fn total(&self) -> u64 {
        self.writes() + self.find + self.count + self.distinct + self.aggregate
    }
}

/// An in-memory document store.
///
/// Documents are kept as canonical CBOR, one list per collection in insertion
/// order, so every read goes through the same encode/decode path a remote
/// store would.
///
/// # Thread Safety
///
/// Collections are guarded by a single `RwLock`; modifying operations hold
/// the write lock for their whole duration, which makes them atomic.
///
/// # Example
///
/// ```rust
/// use entidoc_codec::Document;
/// use entidoc_store::{DocumentStore, Filter, FindOptions, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// store.insert_one("widgets", Document::new().with("name", "gear")).unwrap();
///
/// let found = store
///     .find("widgets", &Filter::eq("name", "gear"), &FindOptions::new())
///     .unwrap();
/// assert_eq!(found.len(), 1);
/// assert!(found[0].contains_key("_id"));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
    counters: Counters,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the call counts served so far.
    #[must_use]
    pub fn calls(&self) -> StoreCalls {
        let c = &self.counters;
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StoreCalls {
            insert: load(&c.insert),
            find: load(&c.find),
            count: load(&c.count),
            replace: load(&c.replace),
            update: load(&c.update),
            delete: load(&c.delete),
            find_and_modify: load(&c.find_and_modify),
            distinct: load(&c.distinct),
            aggregate: load(&c.aggregate),
        }
    }

    /// Resets all call counters to zero.
    pub fn reset_calls(&self) {
        for op in [
            Op::Insert,
            Op::Find,
            Op::Count,
            Op::Replace,
            Op::Update,
            Op::Delete,
            Op::FindAndModify,
            Op::Distinct,
            Op::Aggregate,
        ] {
            self.counters.counter(op).store(0, Ordering::Relaxed);
        }
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Returns the stored documents of a collection without counting a call.
    ///
    /// # Errors
    ///
    /// Returns an error if stored data cannot be decoded.
    pub fn documents(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read();
        decode_all(collections.get(collection).map_or(&[][..], Vec::as_slice))
    }

    /// Names of collections that hold at least one document.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .read()
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn begin(&self, op: Op, collection: &str) -> StoreResult<()> {
        self.counters.counter(op).fetch_add(1, Ordering::Relaxed);
        tracing::trace!(?op, collection, "store call");
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable(format!(
                "collection '{collection}' cannot be reached"
            )));
        }
        Ok(())
    }
}

fn decode_all(stored: &[StoredDocument]) -> StoreResult<Vec<Document>> {
    stored.iter().map(StoredDocument::decode).collect()
}

fn matching(stored: &[StoredDocument], filter: &Filter) -> StoreResult<Vec<(usize, Document)>> {
    let mut out = Vec::new();
    for (index, entry) in stored.iter().enumerate() {
        let doc = entry.decode()?;
        if filter.matches(&doc) {
            out.push((index, doc));
        }
    }
    Ok(out)
}

fn first_match(stored: &[StoredDocument], filter: &Filter) -> StoreResult<Option<(usize, Document)>> {
    for (index, entry) in stored.iter().enumerate() {
        let doc = entry.decode()?;
        if filter.matches(&doc) {
            return Ok(Some((index, doc)));
        }
    }
    Ok(None)
}

/// Puts `_id` first, generating one when absent.
fn with_id(doc: Document, id: Option<Value>) -> Document {
    let id = id
        .or_else(|| doc.get(ID_FIELD).cloned())
        .unwrap_or_else(|| Value::ObjectId(ObjectId::new()));
    let mut out = Document::with_capacity(doc.len() + 1);
    out.insert(ID_FIELD, id);
    for (key, value) in doc {
        if key != ID_FIELD {
            out.insert(key, value);
        }
    }
    out
}

fn insert_into(
    collection: &str,
    stored: &mut Vec<StoredDocument>,
    doc: Document,
) -> StoreResult<Value> {
    let doc = with_id(doc, None);
    let entry = StoredDocument::encode(&doc)?;
    if stored.iter().any(|existing| existing.id == entry.id) {
        return Err(StoreError::DuplicateKey {
            collection: collection.to_string(),
            id: format!("{:?}", entry.id),
        });
    }
    let id = entry.id.clone();
    stored.push(entry);
    Ok(id)
}

fn replacement_for(existing: &Document, replacement: Document) -> StoreResult<Document> {
    let existing_id = existing.get(ID_FIELD).cloned();
    if let (Some(new_id), Some(old_id)) = (replacement.get(ID_FIELD), &existing_id) {
        if new_id != old_id {
            return Err(StoreError::InvalidUpdate(format!(
                "replacement would change '{ID_FIELD}'"
            )));
        }
    }
    Ok(with_id(replacement, existing_id))
}

impl DocumentStore for InMemoryStore {
    fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Value> {
        self.begin(Op::Insert, collection)?;
        let mut collections = self.collections.write();
        let stored = collections.entry(collection.to_string()).or_default();
        insert_into(collection, stored, document)
    }

    fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<Vec<Value>> {
        self.begin(Op::Insert, collection)?;
        let mut collections = self.collections.write();
        let stored = collections.entry(collection.to_string()).or_default();
        documents
            .into_iter()
            .map(|doc| insert_into(collection, stored, doc))
            .collect()
    }

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        self.begin(Op::Find, collection)?;
        let collections = self.collections.read();
        let Some(stored) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let docs = matching(stored, filter)?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect();
        Ok(options.apply(docs))
    }

    fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.begin(Op::Count, collection)?;
        let collections = self.collections.read();
        let Some(stored) = collections.get(collection) else {
            return Ok(0);
        };
        Ok(matching(stored, filter)?.len() as u64)
    }

    fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        replacement: Document,
        upsert: bool,
    ) -> StoreResult<UpdateResult> {
        self.begin(Op::Replace, collection)?;
        let mut collections = self.collections.write();
        let stored = collections.entry(collection.to_string()).or_default();
        match first_match(stored, filter)? {
            Some((index, existing)) => {
                let doc = replacement_for(&existing, replacement)?;
                let modified = u64::from(doc != existing);
                stored[index] = StoredDocument::encode(&doc)?;
                Ok(UpdateResult {
                    matched_count: 1,
                    modified_count: modified,
                    upserted_id: None,
                })
            }
            None if upsert => {
                let id = insert_into(collection, stored, replacement)?;
                Ok(UpdateResult {
                    upserted_id: Some(id),
                    ..UpdateResult::default()
                })
            }
            None => Ok(UpdateResult::default()),
        }
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateResult> {
        self.begin(Op::Update, collection)?;
        let mut collections = self.collections.write();
        let Some(stored) = collections.get_mut(collection) else {
            return Ok(UpdateResult::default());
        };
        let Some((index, mut doc)) = first_match(stored, filter)? else {
            return Ok(UpdateResult::default());
        };
        let before = doc.clone();
        update.apply(&mut doc)?;
        let modified = u64::from(doc != before);
        stored[index] = StoredDocument::encode(&doc)?;
        Ok(UpdateResult {
            matched_count: 1,
            modified_count: modified,
            upserted_id: None,
        })
    }

    fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateResult> {
        self.begin(Op::Update, collection)?;
        let mut collections = self.collections.write();
        let Some(stored) = collections.get_mut(collection) else {
            return Ok(UpdateResult::default());
        };
        let mut result = UpdateResult::default();
        for (index, mut doc) in matching(stored, filter)? {
            let before = doc.clone();
            update.apply(&mut doc)?;
            result.matched_count += 1;
            result.modified_count += u64::from(doc != before);
            stored[index] = StoredDocument::encode(&doc)?;
        }
        Ok(result)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<DeleteResult> {
        self.begin(Op::Delete, collection)?;
        let mut collections = self.collections.write();
        let Some(stored) = collections.get_mut(collection) else {
            return Ok(DeleteResult::default());
        };
        match first_match(stored, filter)? {
            Some((index, _)) => {
                stored.remove(index);
                Ok(DeleteResult { deleted_count: 1 })
            }
            None => Ok(DeleteResult::default()),
        }
    }

    fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<DeleteResult> {
        self.begin(Op::Delete, collection)?;
        let mut collections = self.collections.write();
        let Some(stored) = collections.get_mut(collection) else {
            return Ok(DeleteResult::default());
        };
        let indexes: Vec<usize> = matching(stored, filter)?
            .into_iter()
            .map(|(index, _)| index)
            .collect();
        for index in indexes.iter().rev() {
            stored.remove(*index);
        }
        Ok(DeleteResult {
            deleted_count: indexes.len() as u64,
        })
    }

    fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        return_document: ReturnDocument,
    ) -> StoreResult<Option<Document>> {
        self.begin(Op::FindAndModify, collection)?;
        let mut collections = self.collections.write();
        let Some(stored) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some((index, before)) = first_match(stored, filter)? else {
            return Ok(None);
        };
        let mut after = before.clone();
        update.apply(&mut after)?;
        stored[index] = StoredDocument::encode(&after)?;
        Ok(Some(match return_document {
            ReturnDocument::Before => before,
            ReturnDocument::After => after,
        }))
    }

    fn find_one_and_replace(
        &self,
        collection: &str,
        filter: &Filter,
        replacement: Document,
        return_document: ReturnDocument,
    ) -> StoreResult<Option<Document>> {
        self.begin(Op::FindAndModify, collection)?;
        let mut collections = self.collections.write();
        let Some(stored) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some((index, before)) = first_match(stored, filter)? else {
            return Ok(None);
        };
        let after = replacement_for(&before, replacement)?;
        stored[index] = StoredDocument::encode(&after)?;
        Ok(Some(match return_document {
            ReturnDocument::Before => before,
            ReturnDocument::After => after,
        }))
    }

    fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> StoreResult<Option<Document>> {
        self.begin(Op::FindAndModify, collection)?;
        let mut collections = self.collections.write();
        let Some(stored) = collections.get_mut(collection) else {
            return Ok(None);
        };
        match first_match(stored, filter)? {
            Some((index, doc)) => {
                stored.remove(index);
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    fn distinct(&self, collection: &str, field: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        self.begin(Op::Distinct, collection)?;
        let collections = self.collections.read();
        let Some(stored) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut values: Vec<Value> = Vec::new();
        for (_, doc) in matching(stored, filter)? {
            let candidates = match doc.get_path(field) {
                Some(Value::Array(items)) => items.clone(),
                Some(value) => vec![value.clone()],
                None => continue,
            };
            for candidate in candidates {
                if !values.contains(&candidate) {
                    values.push(candidate);
                }
            }
        }
        Ok(values)
    }

    fn aggregate(&self, collection: &str, pipeline: &[Stage]) -> StoreResult<Vec<Document>> {
        self.begin(Op::Aggregate, collection)?;
        let collections = self.collections.read();
        let mut docs = decode_all(collections.get(collection).map_or(&[][..], Vec::as_slice))?;
        for stage in pipeline {
            docs = stage.apply(docs);
        }
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SortOrder;

    fn widget(name: &str, count: i64) -> Document {
        Document::new().with("name", name).with("count", count)
    }

    fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_many(
                "widgets",
                vec![widget("gear", 1), widget("cog", 2), widget("gear", 3)],
            )
            .unwrap();
        store.reset_calls();
        store
    }

    #[test]
    fn insert_assigns_id_first() {
        let store = InMemoryStore::new();
        let id = store.insert_one("w", widget("gear", 1)).unwrap();
        assert!(matches!(id, Value::ObjectId(_)));
        let docs = store.documents("w").unwrap();
        assert_eq!(docs[0].get(ID_FIELD), Some(&id));
        assert_eq!(store.calls().insert, 1);
    }

    #[test]
    fn duplicate_id_rejected() {
        let store = InMemoryStore::new();
        let id = ObjectId::new();
        store
            .insert_one("w", Document::new().with(ID_FIELD, id))
            .unwrap();
        let err = store
            .insert_one("w", Document::new().with(ID_FIELD, id))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[test]
    fn find_count_and_options() {
        let store = seeded();
        let gears = store
            .find("widgets", &Filter::eq("name", "gear"), &FindOptions::new())
            .unwrap();
        assert_eq!(gears.len(), 2);
        assert_eq!(store.count("widgets", &Filter::All).unwrap(), 3);
        let top = store
            .find(
                "widgets",
                &Filter::All,
                &FindOptions::new().sort("count", SortOrder::Descending).limit(1),
            )
            .unwrap();
        assert_eq!(top[0].get_i64("count"), Some(3));
        assert_eq!(store.calls().find, 2);
        assert_eq!(store.calls().count, 1);
    }

    #[test]
    fn missing_collection_is_empty() {
        let store = InMemoryStore::new();
        assert!(store
            .find("none", &Filter::All, &FindOptions::new())
            .unwrap()
            .is_empty());
        assert_eq!(store.count("none", &Filter::All).unwrap(), 0);
        assert_eq!(store.find_one_and_delete("none", &Filter::All).unwrap(), None);
    }

    #[test]
    fn replace_keeps_id() {
        let store = seeded();
        let before = store
            .find("widgets", &Filter::eq("name", "cog"), &FindOptions::new())
            .unwrap()
            .remove(0);
        let result = store
            .replace_one("widgets", &Filter::eq("name", "cog"), widget("sprocket", 9), false)
            .unwrap();
        assert_eq!(result.matched_count, 1);
        assert_eq!(result.modified_count, 1);
        let after = store
            .find("widgets", &Filter::eq("name", "sprocket"), &FindOptions::new())
            .unwrap()
            .remove(0);
        assert_eq!(after.get(ID_FIELD), before.get(ID_FIELD));
    }

    #[test]
    fn replace_rejects_changed_id() {
        let store = seeded();
        let replacement = widget("x", 0).with(ID_FIELD, ObjectId::new());
        assert!(store
            .replace_one("widgets", &Filter::eq("name", "cog"), replacement, false)
            .is_err());
    }

    #[test]
    fn replace_upserts() {
        let store = InMemoryStore::new();
        let result = store
            .replace_one("w", &Filter::eq("name", "x"), widget("x", 1), true)
            .unwrap();
        assert!(result.upserted_id.is_some());
        assert_eq!(store.documents("w").unwrap().len(), 1);
    }

    #[test]
    fn update_one_and_many() {
        let store = seeded();
        let one = store
            .update_one("widgets", &Filter::eq("name", "gear"), &Update::set("count", 0))
            .unwrap();
        assert_eq!(one.modified_count, 1);
        let many = store
            .update_many("widgets", &Filter::eq("name", "gear"), &Update::inc("count", 10))
            .unwrap();
        assert_eq!(many.matched_count, 2);
        let counts: Vec<i64> = store
            .documents("widgets")
            .unwrap()
            .iter()
            .filter_map(|d| d.get_i64("count"))
            .collect();
        assert_eq!(counts, vec![10, 2, 13]);
    }

    #[test]
    fn delete_one_and_many() {
        let store = seeded();
        assert_eq!(
            store.delete_one("widgets", &Filter::eq("name", "gear")).unwrap().deleted_count,
            1
        );
        assert_eq!(
            store.delete_many("widgets", &Filter::All).unwrap().deleted_count,
            2
        );
        assert!(store.documents("widgets").unwrap().is_empty());
        assert_eq!(store.calls().delete, 2);
    }

    #[test]
    fn find_and_modify_variants() {
        let store = seeded();
        let before = store
            .find_one_and_update(
                "widgets",
                &Filter::eq("name", "cog"),
                &Update::set("count", 5),
                ReturnDocument::Before,
            )
            .unwrap()
            .unwrap();
        assert_eq!(before.get_i64("count"), Some(2));

        let after = store
            .find_one_and_replace(
                "widgets",
                &Filter::eq("name", "cog"),
                widget("cog", 7),
                ReturnDocument::After,
            )
            .unwrap()
            .unwrap();
        assert_eq!(after.get_i64("count"), Some(7));

        let deleted = store
            .find_one_and_delete("widgets", &Filter::eq("name", "cog"))
            .unwrap()
            .unwrap();
        assert_eq!(deleted.get_i64("count"), Some(7));
        assert_eq!(store.calls().find_and_modify, 3);
    }

    #[test]
    fn distinct_values() {
        let store = seeded();
        let names = store.distinct("widgets", "name", &Filter::All).unwrap();
        assert_eq!(names, vec![Value::from("gear"), Value::from("cog")]);
    }

    #[test]
    fn aggregate_pipeline() {
        let store = seeded();
        let out = store
            .aggregate(
                "widgets",
                &[
                    Stage::Match(Filter::eq("name", "gear")),
                    Stage::Sort("count".to_string(), SortOrder::Descending),
                    Stage::Limit(1),
                ],
            )
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get_i64("count"), Some(3));
    }

    #[test]
    fn unavailable_store_fails_every_call() {
        let store = seeded();
        store.set_unavailable(true);
        assert!(matches!(
            store.count("widgets", &Filter::All),
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.insert_one("widgets", widget("x", 1)).is_err());
        store.set_unavailable(false);
        assert_eq!(store.count("widgets", &Filter::All).unwrap(), 3);
    }

    #[test]
    fn collection_names_sorted() {
        let store = InMemoryStore::new();
        store.insert_one("b", Document::new()).unwrap();
        store.insert_one("a", Document::new()).unwrap();
        assert_eq!(store.collection_names(), vec!["a", "b"]);
    }
}
