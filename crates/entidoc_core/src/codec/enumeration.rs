//! Enumeration symbols stored by name.

use std::sync::Arc;

use entidoc_codec::{CodecError, DocumentReader, DocumentWriter, Value};
use tracing::debug;

use super::{Codec, CodecProvider, DecoderContext, EncoderContext};
use crate::entity::{EnumClass, FieldValue, ValueType};
use crate::error::{CoreError, CoreResult};

/// Writes a symbol's name; reads unknown names back as `None`.
#[derive(Debug)]
pub struct EnumCodec {
    class: &'static EnumClass,
}

impl EnumCodec {
    /// Creates the codec for `class`.
    pub fn new(class: &'static EnumClass) -> Self {
        Self { class }
    }
}

impl Codec for EnumCodec {
    fn encoder_type(&self) -> ValueType {
        ValueType::Enum(self.class)
    }

    fn encode(&self, writer: &mut DocumentWriter, value: &FieldValue, _: &EncoderContext<'_>) -> CoreResult<()> {
        match value {
            FieldValue::Enum(symbol) if symbol.class() == self.class => {
                writer.write_string(symbol.name())?;
                Ok(())
            }
            other => Err(CoreError::illegal_argument(format!(
                "codec for {} cannot encode a {}",
                self.class.name,
                other.value_type()
            ))),
        }
    }

    fn decode(&self, reader: &mut DocumentReader, _: &DecoderContext<'_>) -> CoreResult<Option<FieldValue>> {
        match reader.read_value()? {
            Value::Null => Ok(None),
            Value::Text(name) => {
                let symbol = self.class.value_of(&name);
                if symbol.is_none() {
                    debug!(enum_class = self.class.name, symbol = %name, "Unknown enum symbol read as unset");
                }
                Ok(symbol.map(FieldValue::Enum))
            }
            other => Err(CodecError::UnexpectedType {
                expected: "text",
                actual: other.type_name(),
            }
            .into()),
        }
    }
}

/// Provides an [`EnumCodec`] for every enumeration type.
#[derive(Debug, Default)]
pub struct EnumCodecProvider;

impl CodecProvider for EnumCodecProvider {
    fn get(&self, value_type: &ValueType) -> Option<Arc<dyn Codec>> {
        match value_type {
            ValueType::Enum(class) => Some(Arc::new(EnumCodec::new(*class))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecRegistry;
    use crate::config::Config;
    use entidoc_codec::Document;

    static SIZE: EnumClass = EnumClass::new("enumeration::Size", &["SMALL", "LARGE"]);

    fn decode(stored: Value) -> CoreResult<Option<FieldValue>> {
        let registry = CodecRegistry::new(&Config::default());
        let mut reader = DocumentReader::new(Document::new().with("size", stored));
        reader.read_start_document()?;
        reader.read_name()?;
        DecoderContext::new(&registry).decode_value(&mut reader, &ValueType::Enum(&SIZE))
    }

    #[test]
    fn symbol_round_trip() {
        let registry = CodecRegistry::new(&Config::default());
        let large = SIZE.value_of("LARGE").unwrap();
        let mut writer = DocumentWriter::new();
        writer.write_start_document().unwrap();
        writer.write_name("size").unwrap();
        EncoderContext::new(&registry)
            .encode_value(&mut writer, &FieldValue::Enum(large))
            .unwrap();
        writer.write_end_document().unwrap();
        let doc = writer.into_document().unwrap();
        assert_eq!(doc.get_str("size"), Some("LARGE"));

        let stored = doc.get("size").cloned().unwrap();
        assert_eq!(decode(stored).unwrap(), Some(FieldValue::Enum(large)));
    }

    #[test]
    fn unknown_symbol_is_none() {
        assert_eq!(decode(Value::from("MEDIUM")).unwrap(), None);
        assert_eq!(decode(Value::Null).unwrap(), None);
    }

    #[test]
    fn non_text_is_an_error() {
        assert!(decode(Value::from(3)).is_err());
    }
}
