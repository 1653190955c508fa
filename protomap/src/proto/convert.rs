//! Conversions between attribute values and `prost-reflect` values.

use std::cmp::Ordering;

use prost::bytes::Bytes;
use prost::Message as _;
use prost_reflect::{
    DynamicMessage, FieldDescriptor, Kind, MapKey, MessageDescriptor, ReflectMessage, Value,
};

use crate::access::ScalarType;
use crate::error::{MapError, Result};
use crate::value::AttributeValue;

pub(crate) type ProtoValue = AttributeValue<DynamicMessage>;

/// Primitive type of a non-message kind.
pub(crate) fn scalar_type(kind: &Kind) -> Option<ScalarType> {
    let scalar = match kind {
        Kind::Bool => ScalarType::Bool,
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => ScalarType::Int32,
        Kind::Uint32 | Kind::Fixed32 => ScalarType::Uint32,
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => ScalarType::Int64,
        Kind::Uint64 | Kind::Fixed64 => ScalarType::Uint64,
        Kind::Float => ScalarType::Float32,
        Kind::Double => ScalarType::Float64,
        Kind::String => ScalarType::String,
        Kind::Bytes => ScalarType::Bytes,
        Kind::Enum(_) => ScalarType::Enum,
        Kind::Message(_) => return None,
    };
    Some(scalar)
}

/// Declared type of a kind as written in a `.proto` file.
pub(crate) fn kind_name(kind: &Kind) -> String {
    match kind {
        Kind::Bool => "bool".into(),
        Kind::Int32 => "int32".into(),
        Kind::Sint32 => "sint32".into(),
        Kind::Sfixed32 => "sfixed32".into(),
        Kind::Uint32 => "uint32".into(),
        Kind::Fixed32 => "fixed32".into(),
        Kind::Int64 => "int64".into(),
        Kind::Sint64 => "sint64".into(),
        Kind::Sfixed64 => "sfixed64".into(),
        Kind::Uint64 => "uint64".into(),
        Kind::Fixed64 => "fixed64".into(),
        Kind::Float => "float".into(),
        Kind::Double => "double".into(),
        Kind::String => "string".into(),
        Kind::Bytes => "bytes".into(),
        Kind::Enum(e) => e.full_name().to_string(),
        Kind::Message(m) => m.full_name().to_string(),
    }
}

/// Declared type of a field, including its cardinality.
pub(crate) fn field_type_name(field: &FieldDescriptor) -> String {
    if field.is_map() {
        if let Kind::Message(entry) = field.kind() {
            let key = entry.map_entry_key_field();
            let value = entry.map_entry_value_field();
            return format!("map<{}, {}>", kind_name(&key.kind()), kind_name(&value.kind()));
        }
    }
    if field.is_list() {
        return format!("repeated {}", kind_name(&field.kind()));
    }
    kind_name(&field.kind())
}

/// Convert a single (non-repeated) attribute value for a field of `kind`.
///
/// `target` names the field in mismatch errors.
pub(crate) fn to_proto(target: &str, kind: &Kind, value: ProtoValue) -> Result<Value> {
    let converted = match (kind, value) {
        (Kind::Bool, AttributeValue::Bool(v)) => Value::Bool(v),
        (Kind::Int32 | Kind::Sint32 | Kind::Sfixed32, AttributeValue::Int32(v)) => Value::I32(v),
        (Kind::Uint32 | Kind::Fixed32, AttributeValue::Int32(v)) => Value::U32(v as u32),
        (Kind::Int64 | Kind::Sint64 | Kind::Sfixed64, AttributeValue::Int64(v)) => Value::I64(v),
        (Kind::Uint64 | Kind::Fixed64, AttributeValue::Int64(v)) => Value::U64(v as u64),
        (Kind::Float, AttributeValue::Float32(v)) => Value::F32(v),
        (Kind::Double, AttributeValue::Float64(v)) => Value::F64(v),
        (Kind::String, AttributeValue::String(v)) => Value::String(v),
        (Kind::Bytes, AttributeValue::Bytes(v)) => Value::Bytes(Bytes::from(v)),
        (Kind::Enum(_), AttributeValue::Int32(v)) => Value::EnumNumber(v),
        (Kind::Enum(e), AttributeValue::String(name)) => match e.get_value_by_name(&name) {
            Some(v) => Value::EnumNumber(v.number()),
            None => {
                let known: Vec<String> = e.values().map(|v| v.name().to_string()).collect();
                return Err(MapError::type_mismatch(
                    target,
                    format!("one of {} values [{}]", e.full_name(), known.join(", ")),
                    format!("'{}'", name),
                ));
            }
        },
        (Kind::Message(desc), AttributeValue::Message(msg)) => {
            let found = msg.descriptor();
            if found.full_name() != desc.full_name() {
                return Err(MapError::type_mismatch(
                    target,
                    desc.full_name(),
                    found.full_name(),
                ));
            }
            if found == *desc {
                Value::Message(msg)
            } else {
                Value::Message(transcode(target, desc, &msg)?)
            }
        }
        (kind, other) => {
            return Err(MapError::type_mismatch(
                target,
                kind_name(kind),
                other.type_name(),
            ));
        }
    };
    Ok(converted)
}

/// Re-express `message` against `desc`, a descriptor of the same name from
/// another pool.
///
/// Field handles and `try_set_field` only accept messages of their own pool,
/// so the message is round-tripped through its wire form.
pub(crate) fn transcode(
    target: &str,
    desc: &MessageDescriptor,
    message: &DynamicMessage,
) -> Result<DynamicMessage> {
    DynamicMessage::decode(desc.clone(), message.encode_to_vec().as_slice()).map_err(|e| {
        MapError::type_mismatch(
            target,
            desc.full_name(),
            format!("incompatible definition of {} ({})", message.descriptor().full_name(), e),
        )
    })
}

/// Convert an attribute value to a map key of `kind`.
pub(crate) fn to_map_key(target: &str, kind: &Kind, value: ProtoValue) -> Result<MapKey> {
    let key = match (kind, value) {
        (Kind::Bool, AttributeValue::Bool(v)) => MapKey::Bool(v),
        (Kind::Int32 | Kind::Sint32 | Kind::Sfixed32, AttributeValue::Int32(v)) => MapKey::I32(v),
        (Kind::Uint32 | Kind::Fixed32, AttributeValue::Int32(v)) => MapKey::U32(v as u32),
        (Kind::Int64 | Kind::Sint64 | Kind::Sfixed64, AttributeValue::Int64(v)) => MapKey::I64(v),
        (Kind::Uint64 | Kind::Fixed64, AttributeValue::Int64(v)) => MapKey::U64(v as u64),
        (Kind::String, AttributeValue::String(v)) => MapKey::String(v),
        (kind, other) => {
            return Err(MapError::type_mismatch(
                format!("{} key", target),
                kind_name(kind),
                other.type_name(),
            ));
        }
    };
    Ok(key)
}

/// Convert a `prost-reflect` value into an attribute value.
pub(crate) fn from_proto(value: &Value) -> ProtoValue {
    match value {
        Value::Bool(v) => AttributeValue::Bool(*v),
        Value::I32(v) => AttributeValue::Int32(*v),
        Value::U32(v) => AttributeValue::Int32(*v as i32),
        Value::I64(v) => AttributeValue::Int64(*v),
        Value::U64(v) => AttributeValue::Int64(*v as i64),
        Value::F32(v) => AttributeValue::Float32(*v),
        Value::F64(v) => AttributeValue::Float64(*v),
        Value::String(v) => AttributeValue::String(v.clone()),
        Value::Bytes(v) => AttributeValue::Bytes(v.to_vec()),
        Value::EnumNumber(v) => AttributeValue::Int32(*v),
        Value::Message(v) => AttributeValue::Message(v.clone()),
        Value::List(items) => AttributeValue::List(items.iter().map(from_proto).collect()),
        Value::Map(entries) => {
            let mut pairs: Vec<(&MapKey, &Value)> = entries.iter().collect();
            pairs.sort_by(|a, b| compare_keys(a.0, b.0));
            AttributeValue::Map(
                pairs
                    .into_iter()
                    .map(|(k, v)| (from_map_key(k), from_proto(v)))
                    .collect(),
            )
        }
    }
}

fn from_map_key(key: &MapKey) -> ProtoValue {
    match key {
        MapKey::Bool(v) => AttributeValue::Bool(*v),
        MapKey::I32(v) => AttributeValue::Int32(*v),
        MapKey::U32(v) => AttributeValue::Int32(*v as i32),
        MapKey::I64(v) => AttributeValue::Int64(*v),
        MapKey::U64(v) => AttributeValue::Int64(*v as i64),
        MapKey::String(v) => AttributeValue::String(v.clone()),
    }
}

// All keys of one map share a kind; mixed kinds only need a stable order.
fn compare_keys(a: &MapKey, b: &MapKey) -> Ordering {
    match (a, b) {
        (MapKey::Bool(x), MapKey::Bool(y)) => x.cmp(y),
        (MapKey::I32(x), MapKey::I32(y)) => x.cmp(y),
        (MapKey::U32(x), MapKey::U32(y)) => x.cmp(y),
        (MapKey::I64(x), MapKey::I64(y)) => x.cmp(y),
        (MapKey::U64(x), MapKey::U64(y)) => x.cmp(y),
        (MapKey::String(x), MapKey::String(y)) => x.cmp(y),
        _ => key_rank(a).cmp(&key_rank(b)),
    }
}

fn key_rank(key: &MapKey) -> u8 {
    match key {
        MapKey::Bool(_) => 0,
        MapKey::I32(_) => 1,
        MapKey::U32(_) => 2,
        MapKey::I64(_) => 3,
        MapKey::U64(_) => 4,
        MapKey::String(_) => 5,
    }
}
