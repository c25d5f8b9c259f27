//! Error types for store operations.

use entidoc_codec::CodecError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// A stored or supplied document could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A document with the same `_id` already exists.
    #[error("duplicate key in collection '{collection}': {id}")]
    DuplicateKey {
        /// Collection the insert targeted.
        collection: String,
        /// Rendered identifier.
        id: String,
    },

    /// A document is malformed for the requested operation.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// An update cannot be applied.
    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    /// The store cannot serve requests.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
