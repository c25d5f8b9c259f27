//! # EntiDoc Core
//!
//! Object-document mapping for EntiDoc.
//!
//! This crate provides:
//! - The entity model: static entity classes, dynamic [`Entity`](entity::Entity)
//!   values and the [`EntityRecord`](entity::EntityRecord) seam for concrete types
//! - Collection naming from table and namespace markers
//! - A codec registry converting entities to and from stored documents
//! - Typed collections over any [`DocumentStore`](entidoc_store::DocumentStore)
//! - A validate-then-persist pipeline with ordered, capability-scoped stages
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use entidoc_core::collection::CollectionFactory;
//! use entidoc_core::entity::{ClassForm, Entity, EntityClass, EntityFactory, Namable, NAMABLE};
//! use entidoc_core::service::{EntityService, Validate, ValidateErrors};
//! use entidoc_core::{CodecRegistry, Config};
//! use entidoc_store::InMemoryStore;
//!
//! static MACHINE: EntityClass = EntityClass::new("plant::Machine", ClassForm::Trait)
//!     .table("")
//!     .capabilities(&[&NAMABLE]);
//!
//! # fn main() -> entidoc_core::CoreResult<()> {
//! let config = Config::default();
//! let factory = CollectionFactory::new(
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(CodecRegistry::new(&config)),
//! );
//! let machines = factory.new_instance::<Entity>(&MACHINE)?;
//! assert_eq!(machines.name(), "machine");
//! let service = EntityService::new(Arc::new(machines)).with_core_validations(&config)?;
//!
//! let machine = EntityFactory::create(&MACHINE)?;
//! machine.set_name(Some("lathe"))?;
//! assert!(service.validate_and_save(Some(&machine), None, None, &[])?.is_some());
//!
//! let mut errors = ValidateErrors::new();
//! machine.set_name(Some(" lathe"))?;
//! assert!(service
//!     .validate_and_save(Some(&machine), None, Some(&mut errors), &[])?
//!     .is_none());
//! assert!(errors.has_field_errors());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod collection;
mod config;
mod crypto;
pub mod entity;
mod error;
pub mod service;

pub use codec::CodecRegistry;
pub use config::{
    Config, DEFAULT_DESCRIPTION_MAX_LENGTH, DEFAULT_NAME_MAX_LENGTH, DEFAULT_NAME_MIN_LENGTH,
};
pub use crypto::{CryptoManager, EncryptionKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::{BoxedCause, CoreError, CoreResult};

// Re-export the wire types callers need alongside entities.
pub use entidoc_codec::{DateTime, Document, ObjectId, Value};
