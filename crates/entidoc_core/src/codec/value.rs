//! Codecs for plain values.

use std::sync::Arc;

use entidoc_codec::{CodecError, DocumentReader, DocumentWriter, Value};

use super::{Codec, CodecProvider, DecoderContext, EncoderContext};
use crate::entity::{FieldValue, Primitive, ValueType, ANY};
use crate::error::{CoreError, CoreResult};

fn mismatch(codec: &ValueType, value: &FieldValue) -> CoreError {
    CoreError::illegal_argument(format!(
        "codec for {codec} cannot encode a {}",
        value.value_type()
    ))
}

fn unexpected(expected: &'static str, found: &Value) -> CoreError {
    CodecError::UnexpectedType {
        expected,
        actual: found.type_name(),
    }
    .into()
}

/// Maps a wire value to its natural in-memory form.
pub(crate) fn natural(value: Value) -> Option<FieldValue> {
    Some(match value {
        Value::Null => return None,
        Value::Bool(b) => FieldValue::Bool(b),
        Value::Integer(i) => FieldValue::Long(i),
        Value::Double(d) => FieldValue::Double(d),
        Value::Text(s) => FieldValue::Text(s),
        Value::Bytes(b) => FieldValue::Bytes(b),
        Value::ObjectId(id) => FieldValue::ObjectId(id),
        Value::DateTime(dt) => FieldValue::DateTime(dt),
        Value::Array(items) => FieldValue::List(items.into_iter().filter_map(natural).collect()),
        Value::Document(doc) => FieldValue::Document(doc),
    })
}

#[derive(Debug)]
struct PrimitiveCodec {
    value_type: ValueType,
    primitive: Primitive,
}

impl Codec for PrimitiveCodec {
    fn encoder_type(&self) -> ValueType {
        self.value_type
    }

    fn encode(&self, writer: &mut DocumentWriter, value: &FieldValue, _: &EncoderContext<'_>) -> CoreResult<()> {
        match (self.primitive, value) {
            (Primitive::Bool, FieldValue::Bool(b)) => writer.write_bool(*b)?,
            (Primitive::Byte, FieldValue::Byte(v)) => writer.write_int32(i32::from(*v))?,
            (Primitive::Short, FieldValue::Short(v)) => writer.write_int32(i32::from(*v))?,
            (Primitive::Int, FieldValue::Int(v)) => writer.write_int32(*v)?,
            (Primitive::Long, FieldValue::Long(v)) => writer.write_int64(*v)?,
            (Primitive::Float, FieldValue::Float(v)) => writer.write_double(f64::from(*v))?,
            (Primitive::Double, FieldValue::Double(v)) => writer.write_double(*v)?,
            (Primitive::Char, FieldValue::Char(c)) => writer.write_string(c.encode_utf8(&mut [0; 4]))?,
            _ => return Err(mismatch(&self.value_type, value)),
        }
        Ok(())
    }

    fn decode(&self, reader: &mut DocumentReader, _: &DecoderContext<'_>) -> CoreResult<Option<FieldValue>> {
        let overflow = |_| CoreError::from(CodecError::IntegerOverflow);
        let decoded = match (self.primitive, reader.read_value()?) {
            (_, Value::Null) => return Ok(None),
            (Primitive::Bool, Value::Bool(b)) => FieldValue::Bool(b),
            (Primitive::Byte, Value::Integer(i)) => FieldValue::Byte(i8::try_from(i).map_err(overflow)?),
            (Primitive::Short, Value::Integer(i)) => FieldValue::Short(i16::try_from(i).map_err(overflow)?),
            (Primitive::Int, Value::Integer(i)) => FieldValue::Int(i32::try_from(i).map_err(overflow)?),
            (Primitive::Long, Value::Integer(i)) => FieldValue::Long(i),
            #[allow(clippy::cast_possible_truncation)]
            (Primitive::Float, Value::Double(d)) => FieldValue::Float(d as f32),
            #[allow(clippy::cast_precision_loss)]
            (Primitive::Float, Value::Integer(i)) => FieldValue::Float(i as f32),
            (Primitive::Double, Value::Double(d)) => FieldValue::Double(d),
            #[allow(clippy::cast_precision_loss)]
            (Primitive::Double, Value::Integer(i)) => FieldValue::Double(i as f64),
            (Primitive::Char, Value::Text(s)) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => FieldValue::Char(c),
                    _ => {
                        return Err(CodecError::decoding_failed(format!(
                            "expected a single character, found {} characters",
                            s.chars().count()
                        ))
                        .into())
                    }
                }
            }
            (p, other) => return Err(unexpected(p.name(), &other)),
        };
        Ok(Some(decoded))
    }
}

/// Codec for one simple wire-mapped type.
#[derive(Debug)]
struct SimpleCodec {
    value_type: ValueType,
}

impl Codec for SimpleCodec {
    fn encoder_type(&self) -> ValueType {
        self.value_type
    }

    fn encode(&self, writer: &mut DocumentWriter, value: &FieldValue, _: &EncoderContext<'_>) -> CoreResult<()> {
        match (&self.value_type, value) {
            (ValueType::Text, FieldValue::Text(s)) => writer.write_string(s)?,
            (ValueType::ObjectId, FieldValue::ObjectId(id)) => writer.write_object_id(*id)?,
            (ValueType::DateTime, FieldValue::DateTime(dt)) => writer.write_date_time(*dt)?,
            (ValueType::Document, FieldValue::Document(doc)) => {
                writer.write_value(Value::Document(doc.clone()))?;
            }
            _ => return Err(mismatch(&self.value_type, value)),
        }
        Ok(())
    }

    fn decode(&self, reader: &mut DocumentReader, _: &DecoderContext<'_>) -> CoreResult<Option<FieldValue>> {
        let decoded = match (&self.value_type, reader.read_value()?) {
            (_, Value::Null) => return Ok(None),
            (ValueType::Text, Value::Text(s)) => FieldValue::Text(s),
            (ValueType::ObjectId, Value::ObjectId(id)) => FieldValue::ObjectId(id),
            (ValueType::DateTime, Value::DateTime(dt)) => FieldValue::DateTime(dt),
            (ValueType::Document, Value::Document(doc)) => FieldValue::Document(doc),
            (_, other) => {
                return Err(CoreError::from(CodecError::UnexpectedType {
                    expected: wire_name(&self.value_type),
                    actual: other.type_name(),
                }))
            }
        };
        Ok(Some(decoded))
    }
}

fn wire_name(value_type: &ValueType) -> &'static str {
    match value_type {
        ValueType::Text => "text",
        ValueType::ObjectId => "objectId",
        ValueType::DateTime => "dateTime",
        ValueType::Document => "document",
        _ => "value",
    }
}

/// Lists: elements by runtime type on encode, by declared element type on decode.
#[derive(Debug)]
struct ListCodec {
    element: &'static ValueType,
}

impl Codec for ListCodec {
    fn encoder_type(&self) -> ValueType {
        ValueType::List(self.element)
    }

    fn encode(&self, writer: &mut DocumentWriter, value: &FieldValue, ctx: &EncoderContext<'_>) -> CoreResult<()> {
        let FieldValue::List(items) = value else {
            return Err(mismatch(&self.encoder_type(), value));
        };
        writer.write_start_array()?;
        for item in items {
            ctx.encode_value(writer, item)?;
        }
        writer.write_end_array()?;
        Ok(())
    }

    fn decode(&self, reader: &mut DocumentReader, ctx: &DecoderContext<'_>) -> CoreResult<Option<FieldValue>> {
        if reader.peek_type() == Some("null") {
            reader.read_null()?;
            return Ok(None);
        }
        reader.read_start_array()?;
        let mut items = Vec::new();
        while reader.has_next() {
            // Elements without an in-memory form are dropped.
            if let Some(item) = ctx.decode_value(reader, self.element)? {
                items.push(item);
            }
        }
        reader.read_end_array()?;
        Ok(Some(FieldValue::List(items)))
    }
}

/// Untyped values: natural wire mapping, with binary and list payloads
/// routed through their registered codecs.
#[derive(Debug)]
struct AnyCodec;

impl Codec for AnyCodec {
    fn encoder_type(&self) -> ValueType {
        ValueType::Any
    }

    fn encode(&self, writer: &mut DocumentWriter, value: &FieldValue, ctx: &EncoderContext<'_>) -> CoreResult<()> {
        ctx.encode_value(writer, value)
    }

    fn decode(&self, reader: &mut DocumentReader, ctx: &DecoderContext<'_>) -> CoreResult<Option<FieldValue>> {
        match reader.peek_type() {
            Some("bytes") => ctx.decode_value(reader, &ValueType::Bytes),
            Some("array") => ctx.decode_value(reader, &ValueType::List(&ANY)),
            _ => Ok(natural(reader.read_value()?)),
        }
    }
}

/// Provides the codecs for primitives, text, identifiers, timestamps,
/// documents, lists and untyped values. Binary payloads are left to
/// [`ImageCodecProvider`](super::ImageCodecProvider).
#[derive(Debug, Default)]
pub struct ValueCodecProvider;

impl CodecProvider for ValueCodecProvider {
    fn get(&self, value_type: &ValueType) -> Option<Arc<dyn Codec>> {
        let codec: Arc<dyn Codec> = match value_type {
            ValueType::Primitive(p) | ValueType::Boxed(p) => Arc::new(PrimitiveCodec {
                value_type: *value_type,
                primitive: *p,
            }),
            ValueType::Text
            | ValueType::ObjectId
            | ValueType::DateTime
            | ValueType::Document => Arc::new(SimpleCodec {
                value_type: *value_type,
            }),
            ValueType::List(element) => Arc::new(ListCodec { element: *element }),
            ValueType::Any => Arc::new(AnyCodec),
            // Bytes belong to the image codec, registered ahead of this provider.
            ValueType::Bytes
            | ValueType::Enum(_)
            | ValueType::Entity(_)
            | ValueType::Opaque(_) => return None,
        };
        Some(codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecRegistry;
    use crate::config::Config;
    use entidoc_codec::{DateTime, Document, ObjectId};

    fn round_trip(declared: ValueType, value: FieldValue) -> Option<FieldValue> {
        let registry = CodecRegistry::new(&Config::default());
        let mut writer = DocumentWriter::new();
        writer.write_start_document().unwrap();
        writer.write_name("v").unwrap();
        EncoderContext::new(&registry)
            .encode_value(&mut writer, &value)
            .unwrap();
        writer.write_end_document().unwrap();

        let mut reader = DocumentReader::new(writer.into_document().unwrap());
        reader.read_start_document().unwrap();
        reader.read_name().unwrap();
        DecoderContext::new(&registry)
            .decode_value(&mut reader, &declared)
            .unwrap()
    }

    #[test]
    fn primitives_round_trip() {
        let cases = [
            (Primitive::Bool, FieldValue::Bool(true)),
            (Primitive::Byte, FieldValue::Byte(-8)),
            (Primitive::Short, FieldValue::Short(300)),
            (Primitive::Int, FieldValue::Int(-70_000)),
            (Primitive::Long, FieldValue::Long(1 << 40)),
            (Primitive::Float, FieldValue::Float(1.5)),
            (Primitive::Double, FieldValue::Double(-2.25)),
            (Primitive::Char, FieldValue::Char('é')),
        ];
        for (p, value) in cases {
            assert_eq!(round_trip(ValueType::Primitive(p), value.clone()), Some(value));
        }
    }

    #[test]
    fn out_of_range_integer_fails() {
        let registry = CodecRegistry::new(&Config::default());
        let doc = Document::new().with("v", 1000);
        let mut reader = DocumentReader::new(doc);
        reader.read_start_document().unwrap();
        reader.read_name().unwrap();
        let err = DecoderContext::new(&registry)
            .decode_value(&mut reader, &ValueType::Primitive(Primitive::Byte))
            .unwrap_err();
        assert!(matches!(err, CoreError::Codec(CodecError::IntegerOverflow)));
    }

    #[test]
    fn simple_values_round_trip() {
        let id = ObjectId::new();
        assert_eq!(round_trip(ValueType::ObjectId, id.into()), Some(id.into()));
        let at = DateTime::from_millis(1_700_000_000_123);
        assert_eq!(round_trip(ValueType::DateTime, at.into()), Some(at.into()));
        let doc = Document::new().with("x", 1);
        assert_eq!(
            round_trip(ValueType::Document, doc.clone().into()),
            Some(doc.into())
        );
    }

    #[test]
    fn bytes_are_left_to_the_image_codec() {
        assert!(ValueCodecProvider.get(&ValueType::Bytes).is_none());
        let payload = FieldValue::Bytes(vec![0, 1, 2]);
        assert_eq!(round_trip(ValueType::Bytes, payload.clone()), Some(payload.clone()));
        assert_eq!(round_trip(ValueType::Any, payload.clone()), Some(payload));
    }

    #[test]
    fn typed_list_round_trip() {
        static INTS: ValueType = ValueType::List(&ValueType::Primitive(Primitive::Int));
        let list = FieldValue::List(vec![1.into(), 2.into()]);
        assert_eq!(round_trip(INTS, list.clone()), Some(list));
    }

    #[test]
    fn any_uses_natural_mapping() {
        assert_eq!(round_trip(ValueType::Any, FieldValue::Int(4)), Some(FieldValue::Long(4)));
        assert_eq!(
            round_trip(ValueType::Any, FieldValue::List(vec!["a".into()])),
            Some(FieldValue::List(vec!["a".into()]))
        );
    }

    #[test]
    fn wrong_wire_type_fails() {
        let registry = CodecRegistry::new(&Config::default());
        let doc = Document::new().with("v", "text");
        let mut reader = DocumentReader::new(doc);
        reader.read_start_document().unwrap();
        reader.read_name().unwrap();
        assert!(DecoderContext::new(&registry)
            .decode_value(&mut reader, &ValueType::ObjectId)
            .is_err());
    }
}
