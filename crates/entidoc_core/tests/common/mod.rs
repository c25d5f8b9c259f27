//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use entidoc_core::collection::CollectionFactory;
use entidoc_core::entity::{
    ClassForm, EntityClass, EntityModifier, EntityObject, EntityRecord, EnumClass, FieldValue,
    Fields, Method, Primitive, ValueType, DATE_CREATED, DEFUNCTABLE, DESCRIBABLE, ID_PROPERTY,
    LAST_MODIFIED, NAMABLE,
};
use entidoc_core::{CodecRegistry, Config, CoreError, CoreResult, DateTime, ObjectId};
use entidoc_store::InMemoryStore;
use parking_lot::RwLock;

// Naming hierarchy.

pub static ONE: EntityClass = EntityClass::new("naming::One", ClassForm::Trait).table("");

pub static TWO_TWO: EntityClass = EntityClass::new("naming::TwoTwo", ClassForm::Trait).table("");

pub static NO_TABLE: EntityClass =
    EntityClass::new("naming::NoTable", ClassForm::Trait).namespace("t1");

pub static THREE: EntityClass = EntityClass::new("naming::Three", ClassForm::Trait)
    .table("abc")
    .parents(&[&NO_TABLE]);

pub static FOUR: EntityClass = EntityClass::new("naming::Four", ClassForm::Trait)
    .table("")
    .namespace("t2_")
    .parents(&[&NO_TABLE]);

pub static CLASS_ENTITY: EntityClass = EntityClass::new(
    "naming::ClassEntity",
    ClassForm::Concrete {
        public_constructor: true,
    },
)
.namespace("t3_");

pub static FIVE: EntityClass = EntityClass::new(
    "naming::Five",
    ClassForm::Concrete {
        public_constructor: true,
    },
)
.table("")
.parents(&[&CLASS_ENTITY]);

pub static SIX: EntityClass = EntityClass::new("naming::Six", ClassForm::Trait)
    .table("")
    .namespace("");

// A trait class with every standard capability.

pub static STATUS: EnumClass = EnumClass::new("fleet::Status", &["ACTIVE", "IDLE", "BROKEN"]);

pub static DEVICE: EntityClass = EntityClass::new("fleet::Device", ClassForm::Trait)
    .table("")
    .namespace("fleet")
    .capabilities(&[&NAMABLE, &DESCRIBABLE, &DEFUNCTABLE])
    .methods(&[
        Method::getter("getStatus", ValueType::Enum(&STATUS)),
        Method::setter("setStatus", &[ValueType::Enum(&STATUS)]),
        Method::getter("getPhoto", ValueType::Bytes),
        Method::setter("setPhoto", &[ValueType::Bytes]),
        Method::getter("getHours", ValueType::Primitive(Primitive::Int)),
        Method::setter("setHours", &[ValueType::Primitive(Primitive::Int)]),
    ]);

// A concrete record type.

pub static INVOICE: EntityClass = EntityClass::new(
    "billing::Invoice",
    ClassForm::Concrete {
        public_constructor: true,
    },
)
.table("")
.methods(&[
    Method::getter("getNumber", ValueType::Primitive(Primitive::Long)),
    Method::setter("setNumber", &[ValueType::Primitive(Primitive::Long)]),
    Method::getter("getTitle", ValueType::Text),
    Method::setter("setTitle", &[ValueType::Text]),
]);

#[derive(Debug, Clone, Default, PartialEq)]
struct InvoiceState {
    id: Option<ObjectId>,
    date_created: Option<DateTime>,
    last_modified: Option<DateTime>,
    number: i64,
    title: Option<String>,
}

/// A hand-written entity record with interior mutability.
#[derive(Debug, Default)]
pub struct Invoice {
    state: RwLock<InvoiceState>,
}

impl Invoice {
    pub fn new(number: i64, title: &str) -> Self {
        let invoice = Self::default();
        {
            let mut state = invoice.state.write();
            state.number = number;
            state.title = Some(title.to_string());
        }
        invoice
    }

    pub fn number(&self) -> i64 {
        self.state.read().number
    }

    pub fn title(&self) -> Option<String> {
        self.state.read().title.clone()
    }

    pub fn set_title(&self, title: &str) {
        self.state.write().title = Some(title.to_string());
    }
}

impl Clone for Invoice {
    fn clone(&self) -> Self {
        Self {
            state: RwLock::new(self.state.read().clone()),
        }
    }
}

impl PartialEq for Invoice {
    fn eq(&self, other: &Self) -> bool {
        *self.state.read() == *other.state.read()
    }
}

impl EntityObject for Invoice {
    fn entity_class(&self) -> &'static EntityClass {
        &INVOICE
    }

    fn property(&self, name: &str) -> Option<FieldValue> {
        let state = self.state.read();
        match name {
            ID_PROPERTY => state.id.map(FieldValue::ObjectId),
            DATE_CREATED => state.date_created.map(FieldValue::DateTime),
            LAST_MODIFIED => state.last_modified.map(FieldValue::DateTime),
            "number" => Some(FieldValue::Long(state.number)),
            "title" => state.title.clone().map(FieldValue::Text),
            _ => None,
        }
    }

    fn fields(&self) -> Fields {
        [ID_PROPERTY, DATE_CREATED, LAST_MODIFIED, "number", "title"]
            .into_iter()
            .filter_map(|name| self.property(name).map(|v| (name.to_string(), v)))
            .collect()
    }

    fn modifier(&self) -> Option<&dyn EntityModifier> {
        Some(self)
    }
}

impl EntityModifier for Invoice {
    fn set_property(&self, name: &str, value: Option<FieldValue>) -> CoreResult<()> {
        let mut state = self.state.write();
        match name {
            ID_PROPERTY => state.id = value.and_then(|v| v.as_object_id()),
            DATE_CREATED => state.date_created = value.and_then(|v| v.as_date_time()),
            LAST_MODIFIED => state.last_modified = value.and_then(|v| v.as_date_time()),
            "number" => {
                state.number = value
                    .and_then(|v| v.as_i64())
                    .ok_or_else(|| CoreError::illegal_argument("number must be a long"))?;
            }
            "title" => state.title = value.and_then(|v| v.as_str().map(str::to_string)),
            other => {
                return Err(CoreError::illegal_argument(format!(
                    "no property {other} on {}",
                    INVOICE.name
                )))
            }
        }
        Ok(())
    }
}

impl EntityRecord for Invoice {
    fn instantiate(class: &'static EntityClass, fields: Option<Fields>) -> CoreResult<Self> {
        if class != &INVOICE {
            return Err(CoreError::unsupported(format!("Invoice cannot represent {class}")));
        }
        let invoice = Self::default();
        for (name, value) in fields.unwrap_or_default() {
            invoice.set_property(&name, Some(value))?;
        }
        Ok(invoice)
    }
}

/// A record that exposes no write access.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub id: Option<ObjectId>,
}

impl EntityObject for Receipt {
    fn entity_class(&self) -> &'static EntityClass {
        &INVOICE
    }

    fn property(&self, name: &str) -> Option<FieldValue> {
        match name {
            ID_PROPERTY => self.id.map(FieldValue::ObjectId),
            _ => None,
        }
    }

    fn fields(&self) -> Fields {
        self.id
            .map(|id| (ID_PROPERTY.to_string(), FieldValue::ObjectId(id)))
            .into_iter()
            .collect()
    }
}

impl EntityRecord for Receipt {
    fn instantiate(_: &'static EntityClass, fields: Option<Fields>) -> CoreResult<Self> {
        let id = fields
            .and_then(|mut f| f.remove(ID_PROPERTY))
            .and_then(|v| v.as_object_id());
        Ok(Self { id })
    }
}

/// A store and a collection factory over it.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub factory: CollectionFactory,
    pub config: Config,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let registry = Arc::new(CodecRegistry::new(&config));
        let factory = CollectionFactory::new(store.clone(), registry);
        Self {
            store,
            factory,
            config,
        }
    }
}

/// Installs a test subscriber once so `RUST_LOG` works in integration tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
