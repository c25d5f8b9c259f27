//! Entity values through codecs and the store.

mod common;

use common::*;
use entidoc_core::codec::TRANSFORM_MARKER;
use entidoc_core::collection::Collection;
use entidoc_core::entity::{Entity, EntityFactory, EntityObject, FieldValue, Namable};
use entidoc_core::{Config, Document, EncryptionKey, ObjectId};
use entidoc_store::DocumentStore;

fn png() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(b"\0\0\0\rIHDR");
    bytes
}

fn devices(harness: &Harness) -> Collection<Entity> {
    harness.factory.new_instance(&DEVICE).unwrap()
}

#[test]
fn primitive_properties_start_at_zero() {
    let device = EntityFactory::create(&DEVICE).unwrap();
    assert_eq!(device.get("hours"), Some(FieldValue::Int(0)));
    assert_eq!(device.get("defunct"), Some(FieldValue::Bool(false)));
    assert_eq!(device.get("status"), None);
}

#[test]
fn clones_are_independent() {
    let seed = [("name".to_string(), FieldValue::from("drill"))].into_iter().collect();
    let device: Entity = EntityFactory::new_instance_with(&DEVICE, Some(seed)).unwrap();
    let copy = device.clone();
    assert_eq!(copy, device);

    copy.set_name(Some("saw")).unwrap();
    assert_eq!(device.name().unwrap().as_deref(), Some("drill"));
    assert_ne!(copy, device);
}

#[test]
fn enum_properties_round_trip() {
    let harness = Harness::new();
    let collection = devices(&harness);
    let device = EntityFactory::create(&DEVICE).unwrap();
    let idle = STATUS.value_of("IDLE").unwrap();
    device.set("status", FieldValue::Enum(idle)).unwrap();
    collection.save(Some(&device), None).unwrap();

    let stored = &harness.store.documents("fleet_device").unwrap()[0];
    assert_eq!(stored.get_str("status"), Some("IDLE"));

    let loaded = collection.find_by_id(device.id()).unwrap().unwrap();
    assert_eq!(loaded.get("status"), Some(FieldValue::Enum(idle)));
    assert_eq!(loaded, device);
}

#[test]
fn unknown_enum_symbols_read_as_absent() {
    let harness = Harness::new();
    let collection = devices(&harness);
    let id = ObjectId::new();
    harness
        .store
        .insert_one(
            "fleet_device",
            Document::new()
                .with("_id", id)
                .with("defunct", false)
                .with("status", "MELTED"),
        )
        .unwrap();

    let loaded = collection.find_by_id(Some(id)).unwrap().unwrap();
    assert_eq!(loaded.get("status"), None);
    assert_eq!(loaded.id(), Some(id));
}

#[test]
fn binary_payloads_round_trip_without_a_key() {
    let harness = Harness::new();
    let collection = devices(&harness);
    let device = EntityFactory::create(&DEVICE).unwrap();
    device.set("photo", FieldValue::Bytes(png())).unwrap();
    collection.save(Some(&device), None).unwrap();

    let stored = &harness.store.documents("fleet_device").unwrap()[0];
    assert_eq!(stored.get_bytes("photo"), Some(png().as_slice()));
    let loaded = collection.find_by_id(device.id()).unwrap().unwrap();
    assert_eq!(loaded.get("photo"), Some(FieldValue::Bytes(png())));
}

#[test]
fn binary_payloads_round_trip_with_the_transform() {
    let harness = Harness::with_config(Config::default().with_image_key(EncryptionKey::generate()));
    let collection = devices(&harness);

    let image = EntityFactory::create(&DEVICE).unwrap();
    image.set("photo", FieldValue::Bytes(png())).unwrap();
    let plain = EntityFactory::create(&DEVICE).unwrap();
    plain.set("photo", FieldValue::Bytes(b"not an image".to_vec())).unwrap();
    collection.save(Some(&image), None).unwrap();
    collection.save(Some(&plain), None).unwrap();

    let stored = harness.store.documents("fleet_device").unwrap();
    assert!(stored[0].get_bytes("photo").unwrap().starts_with(&TRANSFORM_MARKER));
    assert_eq!(stored[1].get_bytes("photo"), Some(&b"not an image"[..]));

    let loaded = collection.find_by_id(image.id()).unwrap().unwrap();
    assert_eq!(loaded.get("photo"), Some(FieldValue::Bytes(png())));
    let loaded = collection.find_by_id(plain.id()).unwrap().unwrap();
    assert_eq!(loaded.get("photo"), Some(FieldValue::Bytes(b"not an image".to_vec())));
}

#[test]
fn concrete_records_decode_declared_types() {
    let harness = Harness::new();
    let invoices: Collection<Invoice> = harness.factory.new_instance(&INVOICE).unwrap();
    let invoice = Invoice::new(i64::from(i32::MAX) + 1, "large");
    invoices.save(Some(&invoice), None).unwrap();

    let loaded = invoices.find_by_id(invoice.id()).unwrap().unwrap();
    assert_eq!(loaded.number(), i64::from(i32::MAX) + 1);
    assert_eq!(loaded, invoice);
}
