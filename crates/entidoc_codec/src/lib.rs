//! # EntiDoc Codec
//!
//! Wire-level document model for EntiDoc.
//!
//! This crate provides:
//! - [`Value`] and [`Document`], the schema-less data stored by a document store
//! - [`ObjectId`] and [`DateTime`], identity and time stamps
//! - [`DocumentWriter`] / [`DocumentReader`], the streaming interface codecs use
//! - canonical CBOR encoding of documents
//!
//! ## Canonical CBOR Rules
//!
//! - Document keys are text, sorted length-first then bytewise
//! - Integers use shortest encoding
//! - Floats are 64-bit, NaN is rejected
//! - Object ids and timestamps are tagged (1050, 1051)
//! - No indefinite-length items
//!
//! ## Usage
//!
//! ```
//! use entidoc_codec::{decode_document, encode_document, Document, ObjectId};
//!
//! let doc = Document::new()
//!     .with("_id", ObjectId::new())
//!     .with("name", "widget");
//! let bytes = encode_document(&doc).unwrap();
//!
//! let decoded = decode_document(&bytes).unwrap();
//! assert_eq!(decoded.get_str("name"), Some("widget"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod document;
mod encoder;
mod error;
mod oid;
mod reader;
mod value;
mod writer;

pub use decoder::{decode_document, decode_value, CborDecoder};
pub use document::Document;
pub use encoder::{encode_document, encode_value, CborEncoder};
pub use error::{CodecError, CodecResult};
pub use oid::{DateTime, ObjectId};
pub use reader::DocumentReader;
pub use value::Value;
pub use writer::DocumentWriter;

/// Types with a canonical byte form.
pub trait Encode {
    /// The canonical bytes of `self`.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Types readable from their canonical byte form.
pub trait Decode: Sized {
    /// Reads `Self` from `bytes`, which must hold nothing else.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl Encode for Value {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        encode_value(self)
    }
}

impl Decode for Value {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        decode_value(bytes)
    }
}

impl Encode for Document {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        encode_document(self)
    }
}

impl Decode for Document {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        decode_document(bytes)
    }
}
