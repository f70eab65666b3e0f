//! Write transactions: session-scoped CRUD over a private state copy.
//!
//! A [`Transaction`] is only reachable inside [`Store::transact`]. The
//! closure's result decides commit vs abort, and the single-writer lock is
//! released on every exit path, so the session lifecycle (acquire, use,
//! commit-or-abort, release) cannot be left half-finished.
//!
//! [`Store::transact`]: crate::store::Store::transact

use serde_json::Value;

use crate::error::Result;
use crate::filter::Filter;
use crate::types::{DocumentId, StoreState};

/// A write transaction over a private copy of the committed state.
///
/// Reads observe the transaction's own uncommitted writes. Nothing becomes
/// visible to other readers until the transaction commits.
pub struct Transaction {
    pub(crate) state: StoreState,
}

impl Transaction {
    /// Insert one document, returning its assigned id.
    pub fn insert_one(&mut self, collection: &str, doc: Value) -> Result<DocumentId> {
        self.state.insert_one(collection, doc)
    }

    /// Insert a batch of documents, returning their assigned ids.
    pub fn insert_many(&mut self, collection: &str, docs: Vec<Value>) -> Result<Vec<DocumentId>> {
        self.state.insert_many(collection, docs)
    }

    /// All matching documents in creation (id) order.
    pub fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<(DocumentId, Value)>> {
        Ok(self.state.find(collection, filter))
    }

    /// The first matching document in creation order, if any.
    pub fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<(DocumentId, Value)>> {
        Ok(self.state.find_one(collection, filter))
    }

    /// Set `field` to `value` on every matching document; returns the
    /// modified count.
    pub fn update_many(
        &mut self,
        collection: &str,
        filter: &Filter,
        field: &str,
        value: Value,
    ) -> Result<usize> {
        Ok(self.state.update_many(collection, filter, field, value))
    }

    /// Delete every matching document; returns the deleted count.
    pub fn delete_many(&mut self, collection: &str, filter: &Filter) -> Result<usize> {
        Ok(self.state.delete_many(collection, filter))
    }

    /// Total document count in a collection (0 for unknown collections).
    pub fn count(&self, collection: &str) -> Result<u64> {
        Ok(self.state.count(collection))
    }
}
