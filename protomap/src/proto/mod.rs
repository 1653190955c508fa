//! Protobuf backend built on `prost-reflect`.
//!
//! [`ProtoType`] implements [`MessageType`] over a `MessageDescriptor`, so any
//! message known to a `DescriptorPool` can be mapped without generated code.
//! [`ProtoRegistry`] resolves type names and service methods against a pool.
//!
//! # Example
//!
//! ```rust,ignore
//! use protomap::proto::ProtoRegistry;
//! use protomap::{Builder, Encoder, RecordSchema, AttributeType};
//!
//! let registry = ProtoRegistry::decode(include_bytes!("sample.bin").as_slice())?;
//! let schema = RecordSchema::builder("BarStream")
//!     .attribute("stringValue", AttributeType::String)
//!     .attribute("intValue", AttributeType::Int32)
//!     .build()?;
//!
//! let encoder = Encoder::builder(&registry, schema)
//!     .type_name("sample.Request")
//!     .build()?;
//! ```

mod convert;
mod registry;

pub use registry::{ProtoRegistry, global_registry, has_type, register_file_descriptor_set};

use std::borrow::Cow;

use prost::Message as _;
use prost_reflect::{
    DynamicMessage, FieldDescriptor, Kind, MapKey, MessageDescriptor, ReflectMessage, Value,
};

use crate::access::{FieldInfo, FieldShape, MessageType};
use crate::error::{MapError, Result};
use crate::value::AttributeValue;

use convert::{
    ProtoValue, field_type_name, from_proto, scalar_type, to_map_key, to_proto, transcode,
};

/// A protobuf message type resolved from a descriptor pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtoType {
    descriptor: MessageDescriptor,
}

impl ProtoType {
    pub fn new(descriptor: MessageDescriptor) -> Self {
        Self { descriptor }
    }

    /// Get the underlying descriptor.
    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }
}

impl From<MessageDescriptor> for ProtoType {
    fn from(descriptor: MessageDescriptor) -> Self {
        Self::new(descriptor)
    }
}

impl MessageType for ProtoType {
    type Message = DynamicMessage;
    type Field = FieldDescriptor;
    type DecodeError = prost::DecodeError;

    fn full_name(&self) -> &str {
        self.descriptor.full_name()
    }

    fn field(&self, name: &str) -> Option<FieldDescriptor> {
        self.descriptor
            .get_field_by_name(name)
            .or_else(|| self.descriptor.get_field_by_json_name(name))
    }

    fn field_name(&self, field: &FieldDescriptor) -> String {
        field.name().to_string()
    }

    fn shape(&self, field: &FieldDescriptor) -> FieldShape {
        if field.is_map() {
            return FieldShape::Map;
        }
        if field.is_list() {
            return FieldShape::List;
        }
        match scalar_type(&field.kind()) {
            Some(scalar) => FieldShape::Scalar(scalar),
            None => FieldShape::Message,
        }
    }

    fn fields(&self) -> Vec<FieldInfo> {
        self.descriptor
            .fields()
            .map(|f| FieldInfo::new(f.name(), self.shape(&f).kind(), field_type_name(&f)))
            .collect()
    }

    fn new_message(&self) -> DynamicMessage {
        DynamicMessage::new(self.descriptor.clone())
    }

    fn is_instance(&self, message: &DynamicMessage) -> bool {
        message.descriptor().full_name() == self.descriptor.full_name()
    }

    fn adopt<'m>(&self, message: &'m DynamicMessage) -> Result<Cow<'m, DynamicMessage>> {
        if message.descriptor() == self.descriptor {
            return Ok(Cow::Borrowed(message));
        }
        transcode(self.full_name(), &self.descriptor, message).map(Cow::Owned)
    }

    fn type_name_of(&self, message: &DynamicMessage) -> String {
        message.descriptor().full_name().to_string()
    }

    fn clear(&self, message: &mut DynamicMessage) {
        message.clear();
    }

    fn get(&self, message: &DynamicMessage, field: &FieldDescriptor) -> Result<ProtoValue> {
        Ok(from_proto(&message.get_field(field)))
    }

    fn set(
        &self,
        message: &mut DynamicMessage,
        field: &FieldDescriptor,
        value: ProtoValue,
    ) -> Result<()> {
        let converted = to_proto(field.name(), &field.kind(), value)?;
        message
            .try_set_field(field, converted)
            .map_err(|e| MapError::type_mismatch(field.name(), field_type_name(field), e.to_string()))
    }

    fn extend(
        &self,
        message: &mut DynamicMessage,
        field: &FieldDescriptor,
        value: ProtoValue,
    ) -> Result<()> {
        let items = match value {
            AttributeValue::List(items) => items,
            other => {
                return Err(MapError::type_mismatch(
                    field.name(),
                    field_type_name(field),
                    other.type_name(),
                ));
            }
        };
        let kind = field.kind();
        let converted = items
            .into_iter()
            .map(|item| to_proto(field.name(), &kind, item))
            .collect::<Result<Vec<_>>>()?;

        match message.get_field_mut(field) {
            Value::List(existing) => {
                existing.extend(converted);
                Ok(())
            }
            _ => Err(MapError::type_mismatch(
                field.name(),
                field_type_name(field),
                "non-repeated field",
            )),
        }
    }

    fn merge(
        &self,
        message: &mut DynamicMessage,
        field: &FieldDescriptor,
        value: ProtoValue,
    ) -> Result<()> {
        let entries = match value {
            AttributeValue::Map(entries) => entries,
            other => {
                return Err(MapError::type_mismatch(
                    field.name(),
                    field_type_name(field),
                    other.type_name(),
                ));
            }
        };
        let entry = match field.kind() {
            Kind::Message(entry) if entry.is_map_entry() => entry,
            _ => {
                return Err(MapError::type_mismatch(
                    field.name(),
                    field_type_name(field),
                    "non-map field",
                ));
            }
        };
        let key_kind = entry.map_entry_key_field().kind();
        let value_kind = entry.map_entry_value_field().kind();
        let converted = entries
            .into_iter()
            .map(|(k, v)| -> Result<(MapKey, Value)> {
                Ok((
                    to_map_key(field.name(), &key_kind, k)?,
                    to_proto(field.name(), &value_kind, v)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        match message.get_field_mut(field) {
            Value::Map(existing) => {
                existing.extend(converted);
                Ok(())
            }
            _ => Err(MapError::type_mismatch(
                field.name(),
                field_type_name(field),
                "non-map field",
            )),
        }
    }

    fn encode(&self, message: &DynamicMessage) -> Vec<u8> {
        message.encode_to_vec()
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicMessage, prost::DecodeError> {
        DynamicMessage::decode(self.descriptor.clone(), bytes)
    }
}
