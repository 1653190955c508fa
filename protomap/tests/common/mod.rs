//! Shared descriptor fixture for integration tests.
//!
//! Builds the `sample` protobuf package in memory:
//!
//! ```text
//! enum Priority { LOW = 0; HIGH = 1; }
//! message Request         { string string_value = 1; int32 int_value = 2; int64 long_value = 3;
//!                           bool bool_value = 4; float float_value = 5; double double_value = 6; }
//! message Response        { string string_value = 1; int32 int_value = 2; }
//! message RequestWithList { string string_value = 1; int32 int_value = 2;
//!                           repeated string string_list = 3; repeated int32 int_list = 4; }
//! message RequestWithMap  { string string_value = 1; int32 int_value = 2; map<string, int32> map = 3; }
//! message Envelope        { string id = 1; Request request = 2; Priority priority = 3; uint32 size = 4; }
//!
//! service MyService {
//!   rpc Process(Request) returns (Response);
//!   rpc ProcessWithList(RequestWithList) returns (Response);
//!   rpc ProcessWithMap(RequestWithMap) returns (Response);
//! }
//! service EnvelopeService { rpc Send(Envelope) returns (Response); }
//! ```

#![allow(dead_code)]

use std::sync::Arc;

use prost_reflect::{DescriptorPool, DynamicMessage, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MessageOptions, MethodDescriptorProto,
    ServiceDescriptorProto,
};
use protomap::proto::ProtoRegistry;
use protomap::{AttributeType, RecordSchema};

fn json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.into()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        json_name: Some(json_name(name)),
        ..Default::default()
    }
}

fn repeated(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..field(name, number, ty)
    }
}

fn typed(name: &str, number: i32, ty: Type, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.into()),
        ..field(name, number, ty)
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.into()),
        field: fields,
        ..Default::default()
    }
}

fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.into()),
        input_type: Some(format!(".sample.{}", input)),
        output_type: Some(format!(".sample.{}", output)),
        ..Default::default()
    }
}

pub fn file_descriptor_set() -> FileDescriptorSet {
    let map_entry = DescriptorProto {
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..message(
            "MapEntry",
            vec![field("key", 1, Type::String), field("value", 2, Type::Int32)],
        )
    };
    let request_with_map = DescriptorProto {
        nested_type: vec![map_entry],
        ..message(
            "RequestWithMap",
            vec![
                field("string_value", 1, Type::String),
                field("int_value", 2, Type::Int32),
                FieldDescriptorProto {
                    label: Some(Label::Repeated as i32),
                    ..typed("map", 3, Type::Message, ".sample.RequestWithMap.MapEntry")
                },
            ],
        )
    };

    let file = FileDescriptorProto {
        name: Some("sample.proto".into()),
        package: Some("sample".into()),
        syntax: Some("proto3".into()),
        enum_type: vec![EnumDescriptorProto {
            name: Some("Priority".into()),
            value: vec![
                EnumValueDescriptorProto {
                    name: Some("LOW".into()),
                    number: Some(0),
                    ..Default::default()
                },
                EnumValueDescriptorProto {
                    name: Some("HIGH".into()),
                    number: Some(1),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
        message_type: vec![
            message(
                "Request",
                vec![
                    field("string_value", 1, Type::String),
                    field("int_value", 2, Type::Int32),
                    field("long_value", 3, Type::Int64),
                    field("bool_value", 4, Type::Bool),
                    field("float_value", 5, Type::Float),
                    field("double_value", 6, Type::Double),
                ],
            ),
            message(
                "Response",
                vec![
                    field("string_value", 1, Type::String),
                    field("int_value", 2, Type::Int32),
                ],
            ),
            message(
                "RequestWithList",
                vec![
                    field("string_value", 1, Type::String),
                    field("int_value", 2, Type::Int32),
                    repeated("string_list", 3, Type::String),
                    repeated("int_list", 4, Type::Int32),
                ],
            ),
            request_with_map,
            message(
                "Envelope",
                vec![
                    field("id", 1, Type::String),
                    typed("request", 2, Type::Message, ".sample.Request"),
                    typed("priority", 3, Type::Enum, ".sample.Priority"),
                    field("size", 4, Type::Uint32),
                ],
            ),
        ],
        service: vec![
            ServiceDescriptorProto {
                name: Some("MyService".into()),
                method: vec![
                    method("Process", "Request", "Response"),
                    method("ProcessWithList", "RequestWithList", "Response"),
                    method("ProcessWithMap", "RequestWithMap", "Response"),
                ],
                ..Default::default()
            },
            ServiceDescriptorProto {
                name: Some("EnvelopeService".into()),
                method: vec![method("Send", "Envelope", "Response")],
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    FileDescriptorSet { file: vec![file] }
}

/// An unrelated `extra` package: `message Note { string text = 1; }`.
pub fn extra_file_descriptor_set() -> FileDescriptorSet {
    let file = FileDescriptorProto {
        name: Some("extra.proto".into()),
        package: Some("extra".into()),
        syntax: Some("proto3".into()),
        message_type: vec![message("Note", vec![field("text", 1, Type::String)])],
        ..Default::default()
    };
    FileDescriptorSet { file: vec![file] }
}

pub fn registry() -> ProtoRegistry {
    let pool = DescriptorPool::from_file_descriptor_set(file_descriptor_set())
        .expect("sample descriptors should be valid");
    ProtoRegistry::from_pool(pool)
}

pub const PROCESS_URL: &str = "grpc://localhost:8888/sample.MyService/process";

/// Six scalar attributes named after `sample.Request` json names.
pub fn request_schema() -> Arc<RecordSchema> {
    RecordSchema::builder("FooStream")
        .attribute("stringValue", AttributeType::String)
        .attribute("intValue", AttributeType::Int32)
        .attribute("longValue", AttributeType::Int64)
        .attribute("boolValue", AttributeType::Bool)
        .attribute("floatValue", AttributeType::Float32)
        .attribute("doubleValue", AttributeType::Float64)
        .build()
        .unwrap()
}

/// Parse `bytes` as `type_name` directly with `prost-reflect`.
pub fn parse(registry: &ProtoRegistry, type_name: &str, bytes: &[u8]) -> DynamicMessage {
    let desc = registry
        .pool()
        .get_message_by_name(type_name)
        .expect("type should be registered");
    DynamicMessage::decode(desc, bytes).expect("bytes should be a valid message")
}

/// Read a field of `message` by its declared name.
pub fn value(message: &DynamicMessage, field: &str) -> Value {
    message
        .get_field_by_name(field)
        .expect("field should exist")
        .into_owned()
}

/// Create an empty message of `type_name`.
pub fn new_message(registry: &ProtoRegistry, type_name: &str) -> DynamicMessage {
    let desc = registry
        .pool()
        .get_message_by_name(type_name)
        .expect("type should be registered");
    DynamicMessage::new(desc)
}
