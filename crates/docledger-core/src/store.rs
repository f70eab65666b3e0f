//! The document store: direct CRUD and closure-scoped write transactions.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{DocumentError, Error, Result, StorageError};
use crate::filter::Filter;
use crate::transaction::Transaction;
use crate::types::{DocumentId, StoreState};

/// Handle to a document store.
///
/// Cloning is cheap; all clones share the same committed state. Direct
/// operations ([`Store::insert_one`], [`Store::update_many`], ...) each
/// commit immediately and independently. Multi-document atomicity requires
/// [`Store::transact`].
#[derive(Clone, Debug)]
pub struct Store {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    /// Committed state. Readers take the read lock briefly; commits swap in
    /// the new state under the write lock.
    state: RwLock<StoreState>,
    /// Serializes writers: one write transaction (or direct mutation) at a time.
    writer_lock: Mutex<()>,
    /// Snapshot file for file-backed stores; `None` keeps everything in memory.
    path: Option<PathBuf>,
}

impl Store {
    /// Create an ephemeral store with no backing file.
    pub fn in_memory() -> Store {
        Store {
            inner: Arc::new(StoreInner {
                state: RwLock::new(StoreState::default()),
                writer_lock: Mutex::new(()),
                path: None,
            }),
        }
    }

    /// Open a file-backed store, loading the snapshot at `path` if it exists.
    ///
    /// The snapshot is rewritten on every commit. There is no durability
    /// guarantee beyond the rewrite itself.
    pub fn open(path: impl AsRef<Path>) -> Result<Store> {
        let path = path.as_ref().to_path_buf();
        let state = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::Corrupted(format!("failed to parse snapshot: {e}"))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => return Err(StorageError::from(e).into()),
        };
        info!(path = %path.display(), "store opened");
        Ok(Store {
            inner: Arc::new(StoreInner {
                state: RwLock::new(state),
                writer_lock: Mutex::new(()),
                path: Some(path),
            }),
        })
    }

    /// Create an empty collection if it does not already exist.
    pub fn create_collection(&self, name: &str) -> Result<()> {
        self.mutate(|state| {
            state.create_collection(name);
            Ok(())
        })?;
        info!(collection = %name, "collection created");
        Ok(())
    }

    /// Names of all collections, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        self.inner.state.read().collections.keys().cloned().collect()
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.inner.state.read().collections.contains_key(name)
    }

    /// Insert one document, returning its assigned id.
    ///
    /// The collection is created on first insert. Non-object documents are
    /// rejected.
    pub fn insert_one(&self, collection: &str, doc: Value) -> Result<DocumentId> {
        self.mutate(|state| state.insert_one(collection, doc))
    }

    /// Insert a batch of documents, returning their assigned ids.
    ///
    /// The batch is validated up front; either all documents are inserted or
    /// none are.
    pub fn insert_many(&self, collection: &str, docs: Vec<Value>) -> Result<Vec<DocumentId>> {
        self.mutate(|state| state.insert_many(collection, docs))
    }

    /// All matching documents in creation (id) order.
    ///
    /// An unknown collection yields an empty result, not an error.
    pub fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<(DocumentId, Value)>> {
        Ok(self.inner.state.read().find(collection, filter))
    }

    /// The first matching document in creation order, if any.
    pub fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<(DocumentId, Value)>> {
        Ok(self.inner.state.read().find_one(collection, filter))
    }

    /// Set `field` to `value` on every matching document; returns the
    /// modified count.
    pub fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        field: &str,
        value: Value,
    ) -> Result<usize> {
        self.mutate(|state| Ok(state.update_many(collection, filter, field, value)))
    }

    /// Delete every matching document; returns the deleted count.
    pub fn delete_many(&self, collection: &str, filter: &Filter) -> Result<usize> {
        self.mutate(|state| Ok(state.delete_many(collection, filter)))
    }

    /// Total document count in a collection (0 for unknown collections).
    pub fn count(&self, collection: &str) -> Result<u64> {
        Ok(self.inner.state.read().count(collection))
    }

    /// Execute a write transaction.
    ///
    /// The closure receives a [`Transaction`] holding a private copy of the
    /// committed state. If the closure returns `Ok`, that copy replaces the
    /// committed state atomically (and is persisted for file-backed stores).
    /// If it returns `Err`, the copy is dropped and nothing changes
    /// (auto-abort). The writer lock is released on every exit path,
    /// including panics.
    pub fn transact<F, R, E>(&self, f: F) -> std::result::Result<R, E>
    where
        E: From<Error>,
        F: FnOnce(&mut Transaction) -> std::result::Result<R, E>,
    {
        // Serialize writers — only one write transaction at a time.
        let _writer_guard = self.inner.writer_lock.lock();

        let mut txn = Transaction {
            state: self.inner.state.read().clone(),
        };

        let val = f(&mut txn)?;

        self.persist(&txn.state).map_err(E::from)?;
        *self.inner.state.write() = txn.state;
        debug!("transaction committed");
        Ok(val)
    }

    /// Direct single-operation commit: clone, mutate, persist, swap.
    ///
    /// Same commit discipline as [`Store::transact`] so a failed persist
    /// never leaves the committed state half-applied.
    fn mutate<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut StoreState) -> Result<R>,
    {
        let _writer_guard = self.inner.writer_lock.lock();

        let mut state = self.inner.state.read().clone();
        let val = f(&mut state)?;

        self.persist(&state)?;
        *self.inner.state.write() = state;
        Ok(val)
    }

    fn persist(&self, state: &StoreState) -> Result<()> {
        let Some(path) = &self.inner.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(state).map_err(|e| {
            StorageError::Corrupted(format!("failed to serialize snapshot: {e}"))
        })?;
        fs::write(path, bytes).map_err(StorageError::from)?;
        Ok(())
    }
}

impl StoreState {
    pub(crate) fn create_collection(&mut self, name: &str) {
        self.collections.entry(name.to_string()).or_default();
    }

    pub(crate) fn insert_one(&mut self, collection: &str, doc: Value) -> Result<DocumentId> {
        if !doc.is_object() {
            return Err(DocumentError::NotAnObject.into());
        }
        let id = self.next_doc_id;
        self.next_doc_id += 1;
        self.collections
            .entry(collection.to_string())
            .or_default()
            .docs
            .insert(id, doc);
        Ok(id)
    }

    pub(crate) fn insert_many(
        &mut self,
        collection: &str,
        docs: Vec<Value>,
    ) -> Result<Vec<DocumentId>> {
        // Validate the whole batch before assigning any ids.
        if docs.iter().any(|doc| !doc.is_object()) {
            return Err(DocumentError::NotAnObject.into());
        }
        docs.into_iter()
            .map(|doc| self.insert_one(collection, doc))
            .collect()
    }

    pub(crate) fn find(&self, collection: &str, filter: &Filter) -> Vec<(DocumentId, Value)> {
        match self.collections.get(collection) {
            Some(coll) => coll
                .docs
                .iter()
                .filter(|(_, doc)| filter.matches(doc))
                .map(|(id, doc)| (*id, doc.clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Option<(DocumentId, Value)> {
        let coll = self.collections.get(collection)?;
        coll.docs
            .iter()
            .find(|(_, doc)| filter.matches(doc))
            .map(|(id, doc)| (*id, doc.clone()))
    }

    pub(crate) fn update_many(
        &mut self,
        collection: &str,
        filter: &Filter,
        field: &str,
        value: Value,
    ) -> usize {
        let Some(coll) = self.collections.get_mut(collection) else {
            return 0;
        };
        let mut modified = 0;
        for doc in coll.docs.values_mut() {
            if filter.matches(doc)
                && let Some(obj) = doc.as_object_mut()
            {
                obj.insert(field.to_string(), value.clone());
                modified += 1;
            }
        }
        modified
    }

    pub(crate) fn delete_many(&mut self, collection: &str, filter: &Filter) -> usize {
        let Some(coll) = self.collections.get_mut(collection) else {
            return 0;
        };
        let before = coll.docs.len();
        coll.docs.retain(|_, doc| !filter.matches(doc));
        before - coll.docs.len()
    }

    pub(crate) fn count(&self, collection: &str) -> u64 {
        self.collections
            .get(collection)
            .map_or(0, |coll| coll.docs.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_find_roundtrip() {
        let store = Store::in_memory();
        let id = store
            .insert_one("users", json!({"name": "Alice", "city": "Lima"}))
            .unwrap();

        let results = store.find("users", &Filter::eq("name", "Alice")).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, id);
        assert_eq!(results[0].1["city"], "Lima");
    }

    #[test]
    fn test_empty_collection_find_and_count() {
        let store = Store::in_memory();
        store.create_collection("fresh").unwrap();

        assert!(store.find("fresh", &Filter::All).unwrap().is_empty());
        assert_eq!(store.count("fresh").unwrap(), 0);
    }

    #[test]
    fn test_unknown_collection_is_empty_not_error() {
        let store = Store::in_memory();
        assert!(store.find("nowhere", &Filter::All).unwrap().is_empty());
        assert_eq!(store.count("nowhere").unwrap(), 0);
        assert_eq!(store.delete_many("nowhere", &Filter::All).unwrap(), 0);
        assert_eq!(
            store
                .update_many("nowhere", &Filter::All, "x", json!(1))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_insert_many_assigns_increasing_ids() {
        let store = Store::in_memory();
        let ids = store
            .insert_many(
                "items",
                vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})],
            )
            .unwrap();
        assert_eq!(ids.len(), 3);
        assert!(ids[0] < ids[1] && ids[1] < ids[2]);
        assert_eq!(store.count("items").unwrap(), 3);
    }

    #[test]
    fn test_insert_rejects_non_object() {
        let store = Store::in_memory();
        assert!(store.insert_one("items", json!("just a string")).is_err());
        assert!(
            store
                .insert_many("items", vec![json!({"ok": true}), json!(42)])
                .is_err()
        );
        // The failed batch inserted nothing.
        assert_eq!(store.count("items").unwrap(), 0);
    }

    #[test]
    fn test_find_preserves_creation_order() {
        let store = Store::in_memory();
        for n in 0..5 {
            store.insert_one("seq", json!({"n": n})).unwrap();
        }
        let results = store.find("seq", &Filter::All).unwrap();
        let ns: Vec<i64> = results.iter().map(|(_, d)| d["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_update_many_with_filter() {
        let store = Store::in_memory();
        store
            .insert_many(
                "users",
                vec![
                    json!({"name": "Alice", "active": "yes"}),
                    json!({"name": "Bob", "active": "yes"}),
                    json!({"name": "Alice", "active": "no"}),
                ],
            )
            .unwrap();

        let modified = store
            .update_many("users", &Filter::eq("name", "Alice"), "active", json!("no"))
            .unwrap();
        assert_eq!(modified, 2);

        let still_yes = store.find("users", &Filter::eq("active", "yes")).unwrap();
        assert_eq!(still_yes.len(), 1);
        assert_eq!(still_yes[0].1["name"], "Bob");
    }

    #[test]
    fn test_update_many_empty_filter_touches_all() {
        let store = Store::in_memory();
        store
            .insert_many("users", vec![json!({"a": 1}), json!({"a": 2})])
            .unwrap();
        let modified = store
            .update_many("users", &Filter::All, "seen", json!("yes"))
            .unwrap();
        assert_eq!(modified, 2);
    }

    #[test]
    fn test_update_many_can_add_new_field() {
        let store = Store::in_memory();
        store.insert_one("users", json!({"name": "Alice"})).unwrap();
        let modified = store
            .update_many("users", &Filter::All, "city", json!("Lima"))
            .unwrap();
        assert_eq!(modified, 1);
        let (_, doc) = store.find_one("users", &Filter::All).unwrap().unwrap();
        assert_eq!(doc["city"], "Lima");
    }

    #[test]
    fn test_delete_many_with_filter() {
        let store = Store::in_memory();
        store
            .insert_many(
                "users",
                vec![
                    json!({"name": "Alice"}),
                    json!({"name": "Bob"}),
                    json!({"name": "Alice"}),
                ],
            )
            .unwrap();

        let deleted = store
            .delete_many("users", &Filter::eq("name", "Alice"))
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count("users").unwrap(), 1);
    }

    #[test]
    fn test_delete_many_empty_filter_clears_collection() {
        let store = Store::in_memory();
        store
            .insert_many("users", vec![json!({"a": 1}), json!({"a": 2})])
            .unwrap();
        assert_eq!(store.delete_many("users", &Filter::All).unwrap(), 2);
        assert_eq!(store.count("users").unwrap(), 0);
    }

    #[test]
    fn test_find_one_returns_first_by_creation() {
        let store = Store::in_memory();
        let first = store.insert_one("users", json!({"name": "Alice"})).unwrap();
        store.insert_one("users", json!({"name": "Alice"})).unwrap();

        let (id, _) = store
            .find_one("users", &Filter::eq("name", "Alice"))
            .unwrap()
            .unwrap();
        assert_eq!(id, first);
    }

    #[test]
    fn test_collection_names_sorted() {
        let store = Store::in_memory();
        store.create_collection("zeta").unwrap();
        store.create_collection("alpha").unwrap();
        assert_eq!(store.collection_names(), vec!["alpha", "zeta"]);
        assert!(store.has_collection("alpha"));
        assert!(!store.has_collection("beta"));
    }

    #[test]
    fn test_file_backed_store_reloads_committed_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = Store::open(&path).unwrap();
            store.insert_one("users", json!({"name": "Alice"})).unwrap();
        }

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.count("users").unwrap(), 1);
        let (_, doc) = reopened.find_one("users", &Filter::All).unwrap().unwrap();
        assert_eq!(doc["name"], "Alice");
    }

    #[test]
    fn test_corrupted_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"not json at all").unwrap();

        let err = Store::open(&path).unwrap_err();
        assert!(err.to_string().contains("corrupted snapshot"));
    }

    #[test]
    fn test_document_ids_unique_across_collections() {
        let store = Store::in_memory();
        let a = store.insert_one("one", json!({})).unwrap();
        let b = store.insert_one("two", json!({})).unwrap();
        assert_ne!(a, b);
    }
}
