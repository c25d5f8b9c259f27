//! Codec lookup and entity (de)serialization.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use entidoc_codec::{Document, DocumentReader, DocumentWriter};
use parking_lot::RwLock;
use tracing::debug;

use super::entity::EntityCodecProvider;
use super::enumeration::EnumCodecProvider;
use super::image::ImageCodecProvider;
use super::value::ValueCodecProvider;
use super::{Codec, CodecProvider, DecoderContext, EncoderContext};
use crate::config::Config;
use crate::entity::{
    descriptor_of, Entity, EntityClass, EntityFactory, EntityObject, EntityRecord, FieldValue,
    Fields, ValueType, ID_PROPERTY,
};
use crate::error::{CoreError, CoreResult};

/// Resolves codecs by value type and converts entities to and from documents.
///
/// Providers are consulted in order: caller-supplied providers first, then
/// the built-in entity, enum, image and value providers. Resolved codecs are
/// cached for the life of the registry.
pub struct CodecRegistry {
    providers: Vec<Arc<dyn CodecProvider>>,
    cache: RwLock<HashMap<ValueType, Arc<dyn Codec>>>,
}

impl CodecRegistry {
    /// Creates a registry with the built-in providers.
    pub fn new(config: &Config) -> Self {
        Self::with_providers(config, Vec::new())
    }

    /// Creates a registry consulting `providers` before the built-in ones.
    pub fn with_providers(config: &Config, providers: Vec<Arc<dyn CodecProvider>>) -> Self {
        let mut all = providers;
        all.push(Arc::new(EntityCodecProvider));
        all.push(Arc::new(EnumCodecProvider));
        all.push(Arc::new(ImageCodecProvider::new(config.image_key.as_ref())));
        all.push(Arc::new(ValueCodecProvider));
        Self {
            providers: all,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The codec for `value_type`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CodecConfiguration`] when no provider knows the
    /// type.
    pub fn get(&self, value_type: &ValueType) -> CoreResult<Arc<dyn Codec>> {
        if let Some(codec) = self.cache.read().get(value_type) {
            return Ok(Arc::clone(codec));
        }
        let codec = self
            .providers
            .iter()
            .find_map(|provider| provider.get(value_type))
            .ok_or_else(|| CoreError::codec_configuration(value_type.to_string()))?;
        debug!(value_type = %value_type, codec = ?codec, "Codec resolved");
        let mut cache = self.cache.write();
        Ok(Arc::clone(cache.entry(*value_type).or_insert(codec)))
    }

    /// The codec for values of entity class `class`.
    ///
    /// # Errors
    ///
    /// Returns an error when no provider knows the class.
    pub fn entity_codec(&self, class: &'static EntityClass) -> CoreResult<Arc<dyn Codec>> {
        self.get(&ValueType::Entity(class))
    }

    /// Encodes an entity as a document: `_id` first, then every other set
    /// property by name.
    ///
    /// # Errors
    ///
    /// Returns an error when a property value has no codec.
    pub fn encode_entity(&self, record: &dyn EntityObject) -> CoreResult<Document> {
        let mut writer = DocumentWriter::new();
        self.write_entity(&mut writer, record)?;
        Ok(writer.into_document()?)
    }

    pub(crate) fn write_entity(
        &self,
        writer: &mut DocumentWriter,
        record: &dyn EntityObject,
    ) -> CoreResult<()> {
        let ctx = EncoderContext::new(self);
        let mut fields = record.fields();
        writer.write_start_document()?;
        if let Some(id) = fields.remove(ID_PROPERTY) {
            writer.write_name(ID_PROPERTY)?;
            ctx.encode_value(writer, &id)?;
        }
        for (name, value) in &fields {
            writer.write_name(name)?;
            ctx.encode_value(writer, value)?;
        }
        writer.write_end_document()?;
        Ok(())
    }

    /// Rebuilds a record of `class` from a stored document.
    ///
    /// Fields are decoded as the class declares them; undeclared fields are
    /// decoded as `Any`.
    ///
    /// # Errors
    ///
    /// Returns an error when a field cannot be decoded as its declared type,
    /// or the record cannot be instantiated.
    pub fn inflate<E: EntityRecord>(&self, class: &'static EntityClass, document: Document) -> CoreResult<E> {
        let mut reader = DocumentReader::new(document);
        let fields = self.read_fields(&mut reader, class)?;
        EntityFactory::new_instance_with(class, Some(fields))
    }

    pub(crate) fn inflate_nested(
        &self,
        reader: &mut DocumentReader,
        class: &'static EntityClass,
    ) -> CoreResult<Option<FieldValue>> {
        if reader.peek_type() == Some("null") {
            reader.read_null()?;
            return Ok(None);
        }
        // Embedded classes need no table marker of their own.
        let fields = self.read_fields(reader, class)?;
        let entity = Entity::instantiate(class, Some(fields))?;
        Ok(Some(FieldValue::Entity(Box::new(entity))))
    }

    fn read_fields(&self, reader: &mut DocumentReader, class: &'static EntityClass) -> CoreResult<Fields> {
        let descriptor = descriptor_of(class);
        let ctx = DecoderContext::new(self);
        let mut fields = Fields::new();
        reader.read_start_document()?;
        while reader.has_next() {
            let name = reader.read_name()?;
            let declared = descriptor
                .property(&name)
                .map_or(ValueType::Any, |p| p.value_type);
            if let Some(value) = ctx.decode_value(reader, &declared)? {
                fields.insert(name, value);
            }
        }
        reader.read_end_document()?;
        Ok(fields)
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("providers", &self.providers.len())
            .field("cached", &self.cache.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{
        ClassForm, EnumClass, Method, Opaque, Primitive, DATE_CREATED, NAMABLE,
    };
    use entidoc_codec::{DateTime, ObjectId, Value};
    use std::error::Error;

    static STATUS: EnumClass = EnumClass::new("registry::Status", &["OPEN", "CLOSED"]);

    static PART: EntityClass = EntityClass::new("registry::Part", ClassForm::Trait)
        .table("")
        .methods(&[
            Method::getter("getSerial", ValueType::Primitive(Primitive::Long)),
            Method::setter("setSerial", &[ValueType::Primitive(Primitive::Long)]),
        ]);

    static MACHINE: EntityClass = EntityClass::new("registry::Machine", ClassForm::Trait)
        .table("")
        .capabilities(&[&NAMABLE])
        .methods(&[
            Method::getter("getStatus", ValueType::Enum(&STATUS)),
            Method::setter("setStatus", &[ValueType::Enum(&STATUS)]),
            Method::getter("getPart", ValueType::Entity(&PART)),
            Method::setter("setPart", &[ValueType::Entity(&PART)]),
            Method::getter("getLocation", ValueType::Opaque("geo::Point")),
            Method::setter("setLocation", &[ValueType::Opaque("geo::Point")]),
        ]);

    fn machine() -> Entity {
        let m = EntityFactory::create(&MACHINE).unwrap();
        m.set("_id", FieldValue::ObjectId(ObjectId::new())).unwrap();
        m.set(DATE_CREATED, FieldValue::DateTime(DateTime::from_millis(5_000))).unwrap();
        m.invoke("setName", &[Some("lathe".into())]).unwrap();
        m.invoke("setStatus", &[Some(STATUS.value_of("OPEN").unwrap().into())]).unwrap();
        let part = EntityFactory::create(&PART).unwrap();
        part.invoke("setSerial", &[Some(FieldValue::Long(42))]).unwrap();
        m.invoke("setPart", &[Some(part.into())]).unwrap();
        m
    }

    #[test]
    fn entity_document_layout() {
        let registry = CodecRegistry::new(&Config::default());
        let m = machine();
        let doc = registry.encode_entity(&m).unwrap();
        assert_eq!(doc.keys().next(), Some("_id"));
        assert_eq!(doc.get_str("name"), Some("lathe"));
        assert_eq!(doc.get_str("status"), Some("OPEN"));
        assert_eq!(doc.get_path("part.serial").and_then(Value::as_integer), Some(42));
        assert_eq!(doc.get_date_time(DATE_CREATED), Some(DateTime::from_millis(5_000)));
    }

    #[test]
    fn inflation_restores_the_entity() {
        let registry = CodecRegistry::new(&Config::default());
        let m = machine();
        let doc = registry.encode_entity(&m).unwrap();
        let back: Entity = registry.inflate(&MACHINE, doc).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn undeclared_fields_decode_as_any() {
        let registry = CodecRegistry::new(&Config::default());
        let doc = Document::new().with("_id", ObjectId::new()).with("extra", 7);
        let back: Entity = registry.inflate(&PART, doc).unwrap();
        assert_eq!(back.get("extra"), Some(FieldValue::Long(7)));
        assert_eq!(back.get("serial"), Some(FieldValue::Long(0)));
    }

    #[test]
    fn entity_codec_is_encode_only() {
        let registry = CodecRegistry::new(&Config::default());
        let codec = registry.entity_codec(&MACHINE).unwrap();
        assert_eq!(codec.encoder_type(), ValueType::Entity(&MACHINE));

        let mut reader = DocumentReader::new(Document::new());
        let err = codec
            .decode(&mut reader, &DecoderContext::new(&registry))
            .unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedOperation { .. }));
    }

    #[test]
    fn missing_codec_names_the_type() {
        let registry = CodecRegistry::new(&Config::default());
        let m = machine();
        m.invoke(
            "setLocation",
            &[Some(FieldValue::Opaque(Opaque::new("geo::Point", (1.0, 2.0))))],
        )
        .unwrap();
        let err = registry.encode_entity(&m).unwrap_err();
        assert_eq!(err.to_string(), "Can't find a codec for geo::Point");
        assert!(err.source().is_none());
    }

    #[derive(Debug)]
    struct PointCodec;

    impl Codec for PointCodec {
        fn encoder_type(&self) -> ValueType {
            ValueType::Opaque("geo::Point")
        }

        fn encode(&self, writer: &mut DocumentWriter, value: &FieldValue, _: &EncoderContext<'_>) -> CoreResult<()> {
            let FieldValue::Opaque(o) = value else {
                return Err(CoreError::illegal_argument("not a point"));
            };
            let (x, y) = o.downcast_ref::<(f64, f64)>().copied().unwrap_or_default();
            writer.write_value(Value::Array(vec![x.into(), y.into()]))?;
            Ok(())
        }

        fn decode(&self, reader: &mut DocumentReader, _: &DecoderContext<'_>) -> CoreResult<Option<FieldValue>> {
            let value = reader.read_value()?;
            let coords: Vec<f64> = value.as_array().unwrap_or(&[]).iter().filter_map(Value::as_f64).collect();
            Ok(match coords[..] {
                [x, y] => Some(FieldValue::Opaque(Opaque::new("geo::Point", (x, y)))),
                _ => None,
            })
        }
    }

    struct PointProvider;

    impl CodecProvider for PointProvider {
        fn get(&self, value_type: &ValueType) -> Option<Arc<dyn Codec>> {
            (*value_type == ValueType::Opaque("geo::Point")).then(|| Arc::new(PointCodec) as Arc<dyn Codec>)
        }
    }

    #[test]
    fn custom_providers_extend_the_registry() {
        let registry = CodecRegistry::with_providers(&Config::default(), vec![Arc::new(PointProvider) as Arc<dyn CodecProvider>]);
        let m = machine();
        m.invoke(
            "setLocation",
            &[Some(FieldValue::Opaque(Opaque::new("geo::Point", (1.5, -2.0))))],
        )
        .unwrap();
        let doc = registry.encode_entity(&m).unwrap();
        let back: Entity = registry.inflate(&MACHINE, doc).unwrap();
        let location = back.get("location").unwrap();
        let FieldValue::Opaque(point) = location else {
            panic!("location not opaque");
        };
        assert_eq!(point.downcast_ref::<(f64, f64)>(), Some(&(1.5, -2.0)));
    }

    #[test]
    fn resolved_codecs_are_cached() {
        let registry = CodecRegistry::new(&Config::default());
        let a = registry.get(&ValueType::Text).unwrap();
        let b = registry.get(&ValueType::Text).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
