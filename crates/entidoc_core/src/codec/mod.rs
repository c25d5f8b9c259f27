//! Per-type codecs between entity values and stored documents.
//!
//! A [`CodecRegistry`] resolves a [`Codec`] for each [`ValueType`]: by the
//! runtime type of a value when encoding, and by the declared property type
//! when decoding. Codecs write through a [`DocumentWriter`] and read through
//! a [`DocumentReader`], recursing into the registry via their context for
//! nested values.
//!
//! ## Built-in codecs
//!
//! | Type | Codec | Notes |
//! |------|-------|-------|
//! | entity classes | [`EntityCodec`] | encode only |
//! | enumerations | [`EnumCodec`] | unknown symbols decode to `None` |
//! | `Bytes` | [`ImageCodec`] | optional reversible image transform |
//! | everything else | value codecs | primitives are range-checked |

mod entity;
mod enumeration;
mod image;
mod registry;
mod value;

use std::fmt;
use std::sync::Arc;

use entidoc_codec::{DocumentReader, DocumentWriter};

use crate::entity::{FieldValue, ValueType};
use crate::error::CoreResult;

pub use entity::{EntityCodec, EntityCodecProvider};
pub use enumeration::{EnumCodec, EnumCodecProvider};
pub use image::{image_format, ImageCodec, ImageCodecProvider, ImageFormat, TRANSFORM_MARKER};
pub use registry::CodecRegistry;
pub use value::ValueCodecProvider;

/// Encodes and decodes values of one type.
pub trait Codec: Send + Sync + fmt::Debug {
    /// The type this codec writes.
    fn encoder_type(&self) -> ValueType;

    /// Writes `value` at the writer's current position.
    ///
    /// # Errors
    ///
    /// Returns an error when `value` is not of the codec's type or a nested
    /// value has no codec.
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &FieldValue,
        ctx: &EncoderContext<'_>,
    ) -> CoreResult<()>;

    /// Reads the next value. `None` means the stored value is null or has no
    /// in-memory counterpart.
    ///
    /// # Errors
    ///
    /// Returns an error when the stored value cannot be read as this type.
    fn decode(
        &self,
        reader: &mut DocumentReader,
        ctx: &DecoderContext<'_>,
    ) -> CoreResult<Option<FieldValue>>;
}

/// Supplies codecs for the types it knows.
pub trait CodecProvider: Send + Sync {
    /// A codec for `value_type`, or `None` to defer to later providers.
    fn get(&self, value_type: &ValueType) -> Option<Arc<dyn Codec>>;
}

/// State available to a codec while encoding.
#[derive(Clone, Copy)]
pub struct EncoderContext<'a> {
    registry: &'a CodecRegistry,
}

impl<'a> EncoderContext<'a> {
    pub(crate) fn new(registry: &'a CodecRegistry) -> Self {
        Self { registry }
    }

    /// The registry driving this encode.
    pub fn registry(&self) -> &'a CodecRegistry {
        self.registry
    }

    /// Encodes a nested value with the codec for its runtime type.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CodecConfiguration`](crate::CoreError::CodecConfiguration)
    /// when no codec is registered for the value's type.
    pub fn encode_value(&self, writer: &mut DocumentWriter, value: &FieldValue) -> CoreResult<()> {
        let codec = self.registry.get(&value.value_type())?;
        codec.encode(writer, value, self)
    }
}

/// State available to a codec while decoding.
#[derive(Clone, Copy)]
pub struct DecoderContext<'a> {
    registry: &'a CodecRegistry,
}

impl<'a> DecoderContext<'a> {
    pub(crate) fn new(registry: &'a CodecRegistry) -> Self {
        Self { registry }
    }

    /// The registry driving this decode.
    pub fn registry(&self) -> &'a CodecRegistry {
        self.registry
    }

    /// Decodes the next value as `declared`.
    ///
    /// Nested entity classes are inflated rather than decoded through their
    /// codec.
    ///
    /// # Errors
    ///
    /// Returns an error when no codec is registered for `declared` or the
    /// stored value does not fit it.
    pub fn decode_value(
        &self,
        reader: &mut DocumentReader,
        declared: &ValueType,
    ) -> CoreResult<Option<FieldValue>> {
        match declared {
            ValueType::Entity(class) => self.registry.inflate_nested(reader, class),
            _ => self.registry.get(declared)?.decode(reader, self),
        }
    }
}

impl fmt::Debug for EncoderContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderContext").finish_non_exhaustive()
    }
}

impl fmt::Debug for DecoderContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderContext").finish_non_exhaustive()
    }
}
