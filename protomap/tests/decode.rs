mod common;

use std::sync::Arc;

use prost::Message;
use prost_reflect::{DynamicMessage, MapKey, Value};
use protomap::prelude::*;

fn response_schema() -> Arc<RecordSchema> {
    RecordSchema::builder("BarStream")
        .attribute("stringValue", AttributeType::String)
        .attribute("intValue", AttributeType::Int32)
        .build()
        .unwrap()
}

fn response(registry: &protomap::proto::ProtoRegistry, text: &str, n: i32) -> DynamicMessage {
    let mut message = common::new_message(registry, "sample.Response");
    message.set_field_by_name("string_value", Value::String(text.into()));
    message.set_field_by_name("int_value", Value::I32(n));
    message
}

#[test]
fn test_decode_response_of_method() {
    let registry = common::registry();
    let decoder = Decoder::builder(&registry, response_schema())
        .url(common::PROCESS_URL)
        .role(Role::Response)
        .build()
        .unwrap();
    assert_eq!(decoder.origin(), "raw");

    let bytes = response(&registry, "Hello", 10).encode_to_vec();
    let record = decoder.decode_bytes(&bytes).unwrap();

    assert_eq!(record.len(), 2);
    assert_eq!(record.get(0), Some(&AttributeValue::String("Hello".into())));
    assert_eq!(record.get(1), Some(&AttributeValue::Int32(10)));
}

#[test]
fn test_decode_parsed_message() {
    let registry = common::registry();
    let decoder = Decoder::builder(&registry, response_schema())
        .type_name("sample.Response")
        .build()
        .unwrap();

    let message = response(&registry, "direct", 3);
    let record = decoder.decode_one(DecodeInput::Message(&message)).unwrap();
    assert_eq!(record.values()[0].as_str(), Some("direct"));

    let other = common::new_message(&registry, "sample.Request");
    match decoder.decode_message(&other).unwrap_err() {
        MapError::TypeMismatch {
            expected, found, ..
        } => {
            assert_eq!(expected, "sample.Response");
            assert_eq!(found, "sample.Request");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_decode_message_from_another_registry() {
    let registry = common::registry();
    let foreign = common::registry();
    let decoder = Decoder::builder(&registry, common::request_schema())
        .type_name("sample.Request")
        .build()
        .unwrap();

    let mut message = common::new_message(&foreign, "sample.Request");
    message.set_field_by_name("string_value", Value::String("elsewhere".into()));
    message.set_field_by_name("long_value", Value::I64(-5));

    let record = decoder.decode_message(&message).unwrap();
    assert_eq!(record.get(0), Some(&AttributeValue::String("elsewhere".into())));
    assert_eq!(record.get(2), Some(&AttributeValue::Int64(-5)));

    // Identity is the type name, not the registry
    let reply = response(&foreign, "nope", 1);
    match decoder.decode_message(&reply).unwrap_err() {
        MapError::TypeMismatch {
            expected, found, ..
        } => {
            assert_eq!(expected, "sample.Request");
            assert_eq!(found, "sample.Response");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_input_names_expected_type() {
    let registry = common::registry();
    let decoder = Decoder::builder(&registry, response_schema())
        .type_name("sample.Response")
        .build()
        .unwrap();

    // Length-delimited field 1 claims 5 bytes but only 1 follows
    let err = decoder
        .decode_one(DecodeInput::Bytes(&[0x0a, 0x05, b'a']))
        .unwrap_err();
    match &err {
        MapError::MalformedInput {
            type_name, origin, ..
        } => {
            assert_eq!(type_name, "sample.Response");
            assert_eq!(origin, "raw");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_setup());

    let decoder = Decoder::builder(&registry, response_schema())
        .type_name("sample.Response")
        .source_name("inbox")
        .build()
        .unwrap();
    let err = decoder.decode_bytes(&[0x0a, 0x05, b'a']).unwrap_err();
    assert!(err.to_string().contains("'inbox'"), "{err}");
    assert!(err.to_string().contains("sample.Response"), "{err}");
}

#[test]
fn test_decode_mapping_assembles_in_schema_order() {
    let registry = common::registry();
    let schema = RecordSchema::builder("BarStream")
        .attribute("name", AttributeType::String)
        .attribute("count", AttributeType::Int32)
        .build()
        .unwrap();
    let decoder = Decoder::builder(&registry, schema)
        .type_name("sample.Response")
        .mapping(vec![
            MappingEntry::attribute("count", "intValue"),
            MappingEntry::attribute("name", "stringValue"),
        ])
        .build()
        .unwrap();

    let bytes = response(&registry, "mapped", 9).encode_to_vec();
    let record = decoder.decode_bytes(&bytes).unwrap();
    assert_eq!(
        record.into_values(),
        vec![AttributeValue::String("mapped".into()), AttributeValue::Int32(9)]
    );
}

#[test]
fn test_decode_one_field_into_two_attributes() {
    let registry = common::registry();
    let schema = RecordSchema::builder("BarStream")
        .attribute("a", AttributeType::String)
        .attribute("b", AttributeType::String)
        .build()
        .unwrap();
    let decoder = Decoder::builder(&registry, schema)
        .type_name("sample.Response")
        .mapping(vec![
            MappingEntry::attribute("a", "string_value"),
            MappingEntry::attribute("b", "string_value"),
        ])
        .build()
        .unwrap();

    let bytes = response(&registry, "twice", 0).encode_to_vec();
    let record = decoder.decode_bytes(&bytes).unwrap();
    assert_eq!(record.get(0), record.get(1));
}

#[test]
fn test_decode_mapping_must_cover_every_attribute() {
    let registry = common::registry();
    let schema = RecordSchema::builder("BarStream")
        .attribute("name", AttributeType::String)
        .attribute("count", AttributeType::Int32)
        .build()
        .unwrap();

    let err = Decoder::builder(&registry, schema.clone())
        .type_name("sample.Response")
        .mapping(vec![MappingEntry::attribute("name", "string_value")])
        .build()
        .unwrap_err();
    assert!(matches!(err, MapError::MissingConfiguration(_)));
    assert!(err.to_string().contains("count"));

    let err = Decoder::builder(&registry, schema.clone())
        .type_name("sample.Response")
        .mapping(vec![
            MappingEntry::position(0, "string_value"),
            MappingEntry::position(0, "string_value"),
            MappingEntry::position(1, "int_value"),
        ])
        .build()
        .unwrap_err();
    assert!(matches!(err, MapError::InvalidMapping(_)));

    let err = Decoder::builder(&registry, schema)
        .type_name("sample.Response")
        .mapping(vec![MappingEntry::position(5, "string_value")])
        .build()
        .unwrap_err();
    assert!(matches!(err, MapError::InvalidMapping(_)));
}

#[test]
fn test_templates_cannot_be_decoded() {
    let registry = common::registry();
    let template = FnTemplate::new(
        AttributeType::String,
        |_: &Record| -> protomap::Result<AttributeValue> { Ok("x".into()) },
    );
    let err = Decoder::builder(&registry, response_schema())
        .type_name("sample.Response")
        .mapping(vec![
            MappingEntry::template(template, "string_value"),
            MappingEntry::position(1, "int_value"),
        ])
        .build()
        .unwrap_err();
    assert!(matches!(err, MapError::InvalidMapping(_)));
}

#[test]
fn test_decode_lists_and_maps() {
    let registry = common::registry();

    let schema = RecordSchema::builder("ListStream")
        .attribute("stringList", AttributeType::Object)
        .attribute("intList", AttributeType::Object)
        .build()
        .unwrap();
    let decoder = Decoder::builder(&registry, schema)
        .type_name("sample.RequestWithList")
        .build()
        .unwrap();
    let mut message = common::new_message(&registry, "sample.RequestWithList");
    message.set_field_by_name(
        "string_list",
        Value::List(vec![Value::String("x".into()), Value::String("y".into())]),
    );
    let record = decoder.decode_message(&message).unwrap();
    assert_eq!(record.get(0), Some(&AttributeValue::list(["x", "y"])));
    assert_eq!(record.get(1), Some(&AttributeValue::List(vec![])));

    let schema = RecordSchema::builder("MapStream")
        .attribute("map", AttributeType::Object)
        .build()
        .unwrap();
    let decoder = Decoder::builder(&registry, schema)
        .type_name("sample.RequestWithMap")
        .build()
        .unwrap();
    let mut message = common::new_message(&registry, "sample.RequestWithMap");
    message.set_field_by_name(
        "map",
        Value::Map(
            [
                (MapKey::String("zeta".into()), Value::I32(26)),
                (MapKey::String("alpha".into()), Value::I32(1)),
                (MapKey::String("mu".into()), Value::I32(12)),
            ]
            .into_iter()
            .collect(),
        ),
    );
    let record = decoder.decode_bytes(&message.encode_to_vec()).unwrap();
    assert_eq!(
        record.get(0),
        Some(&AttributeValue::map([("alpha", 1i32), ("mu", 12), ("zeta", 26)]))
    );
}

#[test]
fn test_decode_enum_and_unsigned_fields() {
    let registry = common::registry();
    let schema = RecordSchema::builder("EnvelopeStream")
        .attribute("id", AttributeType::String)
        .attribute("priority", AttributeType::Int32)
        .attribute("size", AttributeType::Int32)
        .build()
        .unwrap();
    let decoder = Decoder::builder(&registry, schema)
        .url("grpc://localhost:8888/sample.EnvelopeService/Send")
        .build()
        .unwrap();

    let mut message = common::new_message(&registry, "sample.Envelope");
    message.set_field_by_name("id", Value::String("env".into()));
    message.set_field_by_name("priority", Value::EnumNumber(1));
    message.set_field_by_name("size", Value::U32(4096));

    let record = decoder.decode_message(&message).unwrap();
    assert_eq!(record.get(1), Some(&AttributeValue::Int32(1)));
    assert_eq!(record.get(2), Some(&AttributeValue::Int32(4096)));
}

#[test]
fn test_decode_batch_and_send() {
    let registry = common::registry();
    let decoder = Decoder::builder(&registry, response_schema())
        .type_name("sample.Response")
        .build()
        .unwrap();

    let good = response(&registry, "ok", 1).encode_to_vec();
    let bad = vec![0x0a, 0x05, b'a'];
    let results = decoder.decode_batch([
        DecodeInput::Bytes(&good),
        DecodeInput::Bytes(&bad),
        DecodeInput::Bytes(&good),
    ]);
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(MapError::MalformedInput { .. })));
    assert!(results[2].is_ok());

    let (tx, rx) = flume::unbounded();
    decoder
        .decode_and_send(DecodeInput::Bytes(&good), &tx)
        .unwrap();
    assert!(decoder.decode_and_send(DecodeInput::Bytes(&bad), &tx).is_err());

    let received: Vec<Record> = rx.try_iter().collect();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].get(0), Some(&AttributeValue::String("ok".into())));
}

#[test]
fn test_decode_with_closure_sink() {
    let registry = common::registry();
    let decoder = Decoder::builder(&registry, response_schema())
        .type_name("sample.Response")
        .build()
        .unwrap();

    let seen = std::sync::Mutex::new(Vec::new());
    let sink = sink_fn(|record: Record| {
        seen.lock().unwrap().push(record);
        Ok(())
    });
    let bytes = response(&registry, "via closure", 2).encode_to_vec();
    decoder
        .decode_and_send(DecodeInput::Bytes(&bytes), &sink)
        .unwrap();

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].get(1), Some(&AttributeValue::Int32(2)));
}
