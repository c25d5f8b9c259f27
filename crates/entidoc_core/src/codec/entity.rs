//! Encode-only codec for nested entities.

use std::sync::Arc;

use entidoc_codec::{DocumentReader, DocumentWriter};

use super::{Codec, CodecProvider, DecoderContext, EncoderContext};
use crate::entity::{EntityClass, FieldValue, ValueType};
use crate::error::{CoreError, CoreResult};

/// Writes an entity as a nested document. Decoding is not supported;
/// entities are rebuilt by [`CodecRegistry::inflate`](super::CodecRegistry::inflate).
#[derive(Debug)]
pub struct EntityCodec {
    class: &'static EntityClass,
}

impl EntityCodec {
    /// Creates the codec for values whose runtime class is `class`.
    pub fn new(class: &'static EntityClass) -> Self {
        Self { class }
    }
}

impl Codec for EntityCodec {
    fn encoder_type(&self) -> ValueType {
        ValueType::Entity(self.class)
    }

    fn encode(&self, writer: &mut DocumentWriter, value: &FieldValue, ctx: &EncoderContext<'_>) -> CoreResult<()> {
        match value {
            FieldValue::Entity(entity) => ctx.registry().write_entity(writer, entity.as_ref()),
            other => Err(CoreError::illegal_argument(format!(
                "codec for {} cannot encode a {}",
                self.class.name,
                other.value_type()
            ))),
        }
    }

    fn decode(&self, _: &mut DocumentReader, _: &DecoderContext<'_>) -> CoreResult<Option<FieldValue>> {
        Err(CoreError::unsupported(format!(
            "decoding {} through its codec",
            self.class.name
        )))
    }
}

/// Provides an [`EntityCodec`] per runtime entity class.
#[derive(Debug, Default)]
pub struct EntityCodecProvider;

impl CodecProvider for EntityCodecProvider {
    fn get(&self, value_type: &ValueType) -> Option<Arc<dyn Codec>> {
        match value_type {
            ValueType::Entity(class) => Some(Arc::new(EntityCodec::new(*class))),
            _ => None,
        }
    }
}
