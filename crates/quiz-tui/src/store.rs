//! Document store abstraction
//!
//! Collections of JSON documents keyed by id. Two backends:
//! - Local: one JSON file per collection under the data directory
//! - Memory: in-process maps for tests

use crate::error::{StoreError, StoreResult};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// A stored document: top-level JSON fields
pub type Document = Map<String, Value>;

type Collection = BTreeMap<String, Document>;

/// A document returned by a query
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub id: String,
    pub data: Document,
}

/// Sort key of a query, highest value first. `field` may be a dotted path
/// into nested objects.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
}

impl OrderBy {
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

/// Keep only documents whose `field` is greater than `value`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn greater_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    fn matches(&self, doc: &Document) -> bool {
        lookup(doc, &self.field)
            .and_then(|actual| compare_values(actual, &self.value))
            .is_some_and(|ordering| ordering == Ordering::Greater)
    }
}

/// Filters, ordering and limit of a collection query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Trait for document store backends
pub trait DocumentStore: Send + Sync {
    /// Fetch one document, `None` if it does not exist
    fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Create or replace a document
    fn set_document(&self, collection: &str, id: &str, data: Document) -> StoreResult<()>;

    /// Overwrite the given top-level fields of an existing document
    fn update_document(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()>;

    /// Run a query and return an ordered snapshot
    fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Snapshot>>;

    /// Check if backend is available
    fn is_available(&self) -> bool;

    /// Get backend name for display
    fn backend_name(&self) -> &'static str;
}

/// Resolve a dotted path such as `stats.byDifficulty.easy.avgScore`
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Order two JSON scalars of the same kind; mixed kinds do not compare
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Apply a query to a collection.
///
/// Documents missing the order field are left out of an ordered query.
/// Ties keep id order.
fn run_query(collection: &Collection, query: &Query) -> Vec<Snapshot> {
    let mut matched: Vec<(&String, &Document)> = collection
        .iter()
        .filter(|(_, doc)| query.filters.iter().all(|f| f.matches(doc)))
        .collect();

    if let Some(order) = &query.order_by {
        matched.retain(|(_, doc)| lookup(doc, &order.field).is_some());
        matched.sort_by(|(_, a), (_, b)| {
            let ordering = match (lookup(a, &order.field), lookup(b, &order.field)) {
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            };
            ordering.reverse()
        });
    }

    let limit = query.limit.unwrap_or(usize::MAX);
    matched
        .into_iter()
        .take(limit)
        .map(|(id, data)| Snapshot {
            id: id.clone(),
            data: data.clone(),
        })
        .collect()
}

fn merge_fields(collection: &mut Collection, name: &str, id: &str, fields: Document) -> StoreResult<()> {
    let doc = collection.get_mut(id).ok_or_else(|| StoreError::NotFound {
        collection: name.to_string(),
        id: id.to_string(),
    })?;
    for (key, value) in fields {
        doc.insert(key, value);
    }
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ==================== Local File Backend ====================

/// File-based store: `<dir>/<collection>.json`
pub struct LocalStore {
    dir: PathBuf,
    cache: Mutex<HashMap<String, Collection>>,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{}.json", collection))
    }

    fn load(&self, cache: &mut HashMap<String, Collection>, collection: &str) -> StoreResult<Collection> {
        if let Some(data) = cache.get(collection) {
            return Ok(data.clone());
        }

        let path = self.collection_path(collection);
        let data = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collection::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(collection, path = %path.display(), documents = data.len(), "loaded collection");
        cache.insert(collection.to_string(), data.clone());
        Ok(data)
    }

    fn save(
        &self,
        cache: &mut HashMap<String, Collection>,
        collection: &str,
        data: Collection,
    ) -> StoreResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(&data)?;

        // Replace the file atomically
        let path = self.collection_path(collection);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;

        cache.insert(collection.to_string(), data);
        Ok(())
    }
}

impl DocumentStore for LocalStore {
    fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let mut cache = lock(&self.cache);
        let data = self.load(&mut cache, collection)?;
        Ok(data.get(id).cloned())
    }

    fn set_document(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()> {
        let mut cache = lock(&self.cache);
        let mut data = self.load(&mut cache, collection)?;
        data.insert(id.to_string(), doc);
        self.save(&mut cache, collection, data)
    }

    fn update_document(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()> {
        let mut cache = lock(&self.cache);
        let mut data = self.load(&mut cache, collection)?;
        merge_fields(&mut data, collection, id, fields)?;
        self.save(&mut cache, collection, data)
    }

    fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Snapshot>> {
        let mut cache = lock(&self.cache);
        let data = self.load(&mut cache, collection)?;
        Ok(run_query(&data, query))
    }

    fn is_available(&self) -> bool {
        match std::fs::create_dir_all(&self.dir) {
            Ok(()) => true,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "data directory not usable");
                false
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "Local"
    }
}

// ==================== In-Memory Backend ====================

/// In-memory store for guest games and tests
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Collection>>,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the backend going away
    #[cfg(test)]
    pub fn set_available(&self, available: bool) {
        self.available.store(available, AtomicOrdering::SeqCst);
    }

    /// Number of documents in a collection
    #[cfg(test)]
    pub fn count(&self, collection: &str) -> usize {
        lock(&self.collections)
            .get(collection)
            .map_or(0, |c| c.len())
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(AtomicOrdering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.check_available()?;
        Ok(lock(&self.collections)
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned())
    }

    fn set_document(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()> {
        self.check_available()?;
        lock(&self.collections)
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    fn update_document(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()> {
        self.check_available()?;
        let mut collections = lock(&self.collections);
        let data = collections.entry(collection.to_string()).or_default();
        merge_fields(data, collection, id, fields)
    }

    fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Snapshot>> {
        self.check_available()?;
        let collections = lock(&self.collections);
        Ok(collections
            .get(collection)
            .map(|data| run_query(data, query))
            .unwrap_or_default())
    }

    fn is_available(&self) -> bool {
        self.available.load(AtomicOrdering::SeqCst)
    }

    fn backend_name(&self) -> &'static str {
        "Memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn seed(store: &dyn DocumentStore) {
        for (id, name, high, easy) in [
            ("u1", "Ada", 12, 9),
            ("u2", "Bo", 30, 4),
            ("u3", "Cy", 21, 15),
        ] {
            store
                .set_document(
                    "users",
                    id,
                    doc(json!({
                        "name": name,
                        "stats": {
                            "highestScore": high,
                            "byDifficulty": { "easy": { "avgScore": easy } }
                        }
                    })),
                )
                .unwrap();
        }
        store
            .set_document("users", "u4", doc(json!({ "name": "Di" })))
            .unwrap();
    }

    fn ids(snapshots: &[Snapshot]) -> Vec<&str> {
        snapshots.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_memory_get_set() {
        let store = MemoryStore::new();
        assert!(store.get_document("users", "nobody").unwrap().is_none());

        store
            .set_document("users", "u1", doc(json!({ "name": "Ada" })))
            .unwrap();
        let fetched = store.get_document("users", "u1").unwrap().unwrap();
        assert_eq!(fetched["name"], "Ada");
        assert_eq!(store.count("users"), 1);
    }

    #[test]
    fn test_update_merges_top_level_fields() {
        let store = MemoryStore::new();
        store
            .set_document("users", "u1", doc(json!({ "name": "Ada", "email": "a@x.io" })))
            .unwrap();
        store
            .update_document("users", "u1", doc(json!({ "name": "Ada L" })))
            .unwrap();

        let fetched = store.get_document("users", "u1").unwrap().unwrap();
        assert_eq!(fetched["name"], "Ada L");
        assert_eq!(fetched["email"], "a@x.io");
    }

    #[test]
    fn test_update_missing_document_fails() {
        let store = MemoryStore::new();
        let err = store
            .update_document("users", "ghost", doc(json!({ "name": "x" })))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_query_orders_by_nested_field() {
        let store = MemoryStore::new();
        seed(&store);

        let query = Query::new().order_by(OrderBy::desc("stats.highestScore"));
        let result = store.query("users", &query).unwrap();
        // u4 has no stats and is left out
        assert_eq!(ids(&result), vec!["u2", "u3", "u1"]);

        let query = Query::new().order_by(OrderBy::desc("stats.byDifficulty.easy.avgScore"));
        let result = store.query("users", &query).unwrap();
        assert_eq!(ids(&result), vec!["u3", "u1", "u2"]);
    }

    #[test]
    fn test_query_filters_and_limit() {
        let store = MemoryStore::new();
        seed(&store);

        let query = Query::new()
            .filter(FieldFilter::greater_than("stats.highestScore", 20))
            .order_by(OrderBy::desc("stats.highestScore"))
            .limit(1);
        let result = store.query("users", &query).unwrap();
        assert_eq!(ids(&result), vec!["u2"]);

        // Missing fields and mixed kinds never match
        let query = Query::new().filter(FieldFilter::greater_than("stats.highestScore", 0));
        let result = store.query("users", &query).unwrap();
        assert_eq!(ids(&result), vec!["u1", "u2", "u3"]);
        let query = Query::new().filter(FieldFilter::greater_than("name", 0));
        assert!(store.query("users", &query).unwrap().is_empty());
    }

    #[test]
    fn test_memory_unavailable() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(!store.is_available());
        assert!(matches!(
            store.get_document("users", "u1"),
            Err(StoreError::Unavailable)
        ));
        assert!(store.query("users", &Query::new()).is_err());
    }

    #[test]
    fn test_local_store_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LocalStore::new(dir.path());
            assert!(store.is_available());
            assert_eq!(store.backend_name(), "Local");
            seed(&store);
            store
                .update_document("users", "u1", doc(json!({ "name": "Ada L" })))
                .unwrap();
        }

        assert!(dir.path().join("users.json").exists());

        let reopened = LocalStore::new(dir.path());
        let fetched = reopened.get_document("users", "u1").unwrap().unwrap();
        assert_eq!(fetched["name"], "Ada L");

        let query = Query::new().order_by(OrderBy::desc("stats.highestScore")).limit(2);
        let result = reopened.query("users", &query).unwrap();
        assert_eq!(ids(&result), vec!["u2", "u3"]);
    }

    #[test]
    fn test_local_store_missing_collection_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("nested"));
        assert!(store.query("users", &Query::new()).unwrap().is_empty());
        assert!(store.get_document("users", "u1").unwrap().is_none());
    }

    #[test]
    fn test_lookup_dotted_path() {
        let d = doc(json!({ "a": { "b": { "c": 3 } }, "x": 1 }));
        assert_eq!(lookup(&d, "a.b.c"), Some(&json!(3)));
        assert_eq!(lookup(&d, "x"), Some(&json!(1)));
        assert_eq!(lookup(&d, "a.z"), None);
        assert_eq!(lookup(&d, "x.y"), None);
    }
}
