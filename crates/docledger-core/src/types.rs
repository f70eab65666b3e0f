//! Core types: document identifiers, collections, and the committed state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Store-assigned document identifier.
///
/// Monotonically increasing across the whole store, so id order is creation
/// order. Recency queries (e.g. "last five ledger entries") rely on this.
pub type DocumentId = u64;

/// A named group of documents, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Collection {
    pub(crate) docs: BTreeMap<DocumentId, Value>,
}

/// The committed state of the store: every collection plus the id counter.
///
/// Cloned wholesale when a write transaction begins; the clone becomes the
/// new committed state on commit and is dropped on abort.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StoreState {
    pub(crate) collections: BTreeMap<String, Collection>,
    pub(crate) next_doc_id: DocumentId,
}
