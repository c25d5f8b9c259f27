//! Typed collections and collection naming.
//!
//! A [`CollectionFactory`] opens a [`Collection`] per entity class. The
//! collection's name comes from the class's table and namespace markers
//! (see [`CollectionNameResolver`]); defunctable classes get a view that
//! hides soft-deleted records.

mod factory;
mod name;
mod typed;

pub use factory::CollectionFactory;
pub use name::{collection_name, snake_case, CollectionNameResolver};
pub use typed::{Collection, Scope};
