//! Runtime values of record attributes.
//!
//! [`AttributeValue`] is generic over the message type of the backend so that
//! nested-message attributes can carry the backend's own message object. The
//! default is the protobuf backend's `DynamicMessage`.

use prost_reflect::DynamicMessage;

use crate::schema::AttributeType;

/// Runtime value of one record attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue<M = DynamicMessage> {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),

    /// Values of a repeated field.
    List(Vec<AttributeValue<M>>),
    /// Key/value pairs of a map field.
    Map(Vec<(AttributeValue<M>, AttributeValue<M>)>),
    /// Nested message.
    Message(M),

    Null,
}

macro_rules! impl_primitive_accessors {
    ($($method:ident -> $variant:ident : $ty:ty),* $(,)?) => {
        impl<M> AttributeValue<M> {
            $(
                #[doc = concat!("Try to extract as ", stringify!($ty), ".")]
                pub fn $method(&self) -> Option<$ty> {
                    match self {
                        AttributeValue::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            )*
        }
    };
}

impl_primitive_accessors! {
    as_bool -> Bool: bool,
    as_i32 -> Int32: i32,
    as_i64 -> Int64: i64,
    as_f32 -> Float32: f32,
    as_f64 -> Float64: f64,
}

impl<M> AttributeValue<M> {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttributeValue<M>]> {
        match self {
            AttributeValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(AttributeValue<M>, AttributeValue<M>)]> {
        match self {
            AttributeValue::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&M> {
        match self {
            AttributeValue::Message(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Name of the runtime type, as reported in type mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Bool(_) => "bool",
            AttributeValue::Int32(_) => "int32",
            AttributeValue::Int64(_) => "int64",
            AttributeValue::Float32(_) => "float32",
            AttributeValue::Float64(_) => "float64",
            AttributeValue::String(_) => "string",
            AttributeValue::Bytes(_) => "bytes",
            AttributeValue::List(_) => "list",
            AttributeValue::Map(_) => "map",
            AttributeValue::Message(_) => "message",
            AttributeValue::Null => "null",
        }
    }

    /// Check whether this value can be held by an attribute of `attr_type`.
    pub fn conforms_to(&self, attr_type: AttributeType) -> bool {
        match (self, attr_type) {
            (AttributeValue::Null, _) => true,
            (AttributeValue::Bool(_), AttributeType::Bool)
            | (AttributeValue::Int32(_), AttributeType::Int32)
            | (AttributeValue::Int64(_), AttributeType::Int64)
            | (AttributeValue::Float32(_), AttributeType::Float32)
            | (AttributeValue::Float64(_), AttributeType::Float64)
            | (AttributeValue::String(_), AttributeType::String)
            | (AttributeValue::Bytes(_), AttributeType::Bytes) => true,
            (
                AttributeValue::List(_) | AttributeValue::Map(_) | AttributeValue::Message(_),
                AttributeType::Object,
            ) => true,
            _ => false,
        }
    }
}

macro_rules! impl_from_primitives {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl<M> From<$ty> for AttributeValue<M> {
                fn from(v: $ty) -> Self {
                    AttributeValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_primitives! {
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    Vec<u8> => Bytes,
}

impl<M> From<&str> for AttributeValue<M> {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl<M> AttributeValue<M> {
    /// Build a list value from anything convertible into attribute values.
    pub fn list<T: Into<AttributeValue<M>>>(items: impl IntoIterator<Item = T>) -> Self {
        AttributeValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a map value from key/value pairs.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<AttributeValue<M>>,
        V: Into<AttributeValue<M>>,
    {
        AttributeValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One flat, ordered tuple of attribute values.
#[derive(Clone, Debug, PartialEq)]
pub struct Record<M = DynamicMessage> {
    values: Vec<AttributeValue<M>>,
}

impl<M> Record<M> {
    pub fn new(values: Vec<AttributeValue<M>>) -> Self {
        Self { values }
    }

    /// Get the value at a record position.
    pub fn get(&self, position: usize) -> Option<&AttributeValue<M>> {
        self.values.get(position)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[AttributeValue<M>] {
        &self.values
    }

    pub fn into_values(self) -> Vec<AttributeValue<M>> {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeValue<M>> {
        self.values.iter()
    }
}

impl<M> From<Vec<AttributeValue<M>>> for Record<M> {
    fn from(values: Vec<AttributeValue<M>>) -> Self {
        Self::new(values)
    }
}
