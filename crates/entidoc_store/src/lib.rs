//! # EntiDoc Store
//!
//! The document-store seam of EntiDoc.
//!
//! This crate defines the driver interface the collection layer talks to and
//! a reference in-memory implementation. Stores are **schema-less**: they
//! hold [`Document`](entidoc_codec::Document)s and know nothing about
//! entities, codecs or validation.
//!
//! ## Design Principles
//!
//! - One trait, [`DocumentStore`], covering the operations a collection needs
//! - A deliberately small [`Filter`] / [`Update`] / [`Stage`] vocabulary
//! - Must be `Send + Sync`; all operations take `&self`
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and embedded use, with call counters
//!
//! ## Example
//!
//! ```rust
//! use entidoc_codec::Document;
//! use entidoc_store::{DocumentStore, Filter, InMemoryStore, Update};
//!
//! let store = InMemoryStore::new();
//! store.insert_one("widgets", Document::new().with("name", "gear")).unwrap();
//! store
//!     .update_one("widgets", &Filter::eq("name", "gear"), &Update::set("count", 2))
//!     .unwrap();
//! assert_eq!(store.count("widgets", &Filter::eq("count", 2)).unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod filter;
mod memory;
mod options;
mod update;

pub use backend::DocumentStore;
pub use error::{StoreError, StoreResult};
pub use filter::{Filter, ID_FIELD};
pub use memory::{InMemoryStore, StoreCalls};
pub use options::{DeleteResult, FindOptions, ReturnDocument, SortOrder, Stage, UpdateResult};
pub use update::Update;
