//! # docledger-core
//!
//! An embedded, schema-less document store: named collections of JSON
//! documents keyed by store-assigned identifiers, with direct CRUD and
//! closure-scoped write transactions that auto-abort on error.
//!
//! The committed state can optionally be persisted as a JSON snapshot file
//! that is rewritten on each commit.
//!
//! ## Quick Start
//!
//! ```
//! use docledger_core::filter::Filter;
//! use docledger_core::store::Store;
//! use serde_json::json;
//!
//! let store = Store::in_memory();
//!
//! // Direct (non-transactional) operations commit immediately.
//! let id = store.insert_one("users", json!({"name": "Alice"})).unwrap();
//!
//! // Transactions commit on Ok and discard everything on Err.
//! store
//!     .transact(|txn| {
//!         txn.insert_one("users", json!({"name": "Bob"}))?;
//!         txn.update_many("users", &Filter::eq("name", "Alice"), "name", json!("Alicia"))?;
//!         Ok::<_, docledger_core::error::Error>(())
//!     })
//!     .unwrap();
//!
//! let (found_id, doc) = store
//!     .find_one("users", &Filter::eq("name", "Alicia"))
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(found_id, id);
//! assert_eq!(doc["name"], "Alicia");
//! ```

pub mod error;
pub mod filter;
pub mod store;
pub mod transaction;
pub mod types;
