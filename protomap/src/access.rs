//! Capability interface between the mapping engine and a message technology.
//!
//! The resolver, encoder and decoder only ever talk to messages through
//! [`MessageType`]. A backend implements it once (see [`crate::proto`] for
//! protobuf via `prost-reflect`); everything above it is independent of how
//! message types are described or serialized.

use std::borrow::Cow;
use std::fmt;

use strum::{Display, EnumString};

use crate::error::Result;
use crate::value::AttributeValue;

/// Structural kind of a message field, which decides the accessor used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FieldKind {
    /// Direct set/get of a single primitive value.
    Scalar,
    /// Repeated field: bulk append on encode, list read on decode.
    List,
    /// Map field: bulk merge on encode, map read on decode.
    Map,
    /// Nested message: direct set/get of the sub-message.
    Message,
}

/// Primitive type of a scalar field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScalarType {
    Bool,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
    String,
    Bytes,
    Enum,
}

/// Declared shape of a field as reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldShape {
    Scalar(ScalarType),
    List,
    Map,
    Message,
}

impl FieldShape {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldShape::Scalar(_) => FieldKind::Scalar,
            FieldShape::List => FieldKind::List,
            FieldShape::Map => FieldKind::Map,
            FieldShape::Message => FieldKind::Message,
        }
    }
}

/// Name, kind and declared type of one field, used for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub kind: FieldKind,
    /// Human readable declared type, e.g. `int32`, `repeated string`,
    /// `map<string, int32>` or a nested message's full name.
    pub type_name: String,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, kind: FieldKind, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            type_name: type_name.into(),
        }
    }
}

impl fmt::Display for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.type_name)
    }
}

/// A resolved message type: descriptor, accessor provider and builder factory.
///
/// Field handles returned by [`MessageType::field`] are opaque to the engine
/// and are resolved once at setup; per-record calls only pass them back.
pub trait MessageType: Clone + Send + Sync + 'static {
    /// Mutable message instance of this type (also used as the builder).
    type Message: Clone + fmt::Debug + PartialEq + Send + Sync + 'static;
    /// Resolved accessor handle for one field.
    type Field: Clone + fmt::Debug + Send + Sync + 'static;
    /// Error produced when parsing bytes.
    type DecodeError: std::error::Error + Send + Sync + 'static;

    /// Fully-qualified type name.
    fn full_name(&self) -> &str;

    /// Look up a field by its name as declared on the type.
    fn field(&self, name: &str) -> Option<Self::Field>;

    /// Declared name of a resolved field.
    fn field_name(&self, field: &Self::Field) -> String;

    /// Declared shape of a resolved field.
    fn shape(&self, field: &Self::Field) -> FieldShape;

    /// All fields of the type in declaration order.
    fn fields(&self) -> Vec<FieldInfo>;

    /// Create an empty message of this type.
    fn new_message(&self) -> Self::Message;

    /// Check whether `message` is an instance of this type, by full type name.
    fn is_instance(&self, message: &Self::Message) -> bool;

    /// View `message`, already known to be an instance by name, as a message
    /// whose fields can be read with this type's field handles.
    ///
    /// Backends whose handles are tied to one descriptor set re-express
    /// messages built from another set; otherwise the message is borrowed.
    fn adopt<'m>(&self, message: &'m Self::Message) -> Result<Cow<'m, Self::Message>>;

    /// Full type name of an arbitrary message.
    fn type_name_of(&self, message: &Self::Message) -> String;

    /// Reset every field of `message` to its default.
    fn clear(&self, message: &mut Self::Message);

    /// Read a field.
    fn get(
        &self,
        message: &Self::Message,
        field: &Self::Field,
    ) -> Result<AttributeValue<Self::Message>>;

    /// Overwrite a scalar or message field.
    fn set(
        &self,
        message: &mut Self::Message,
        field: &Self::Field,
        value: AttributeValue<Self::Message>,
    ) -> Result<()>;

    /// Append every element of a list value to a repeated field.
    fn extend(
        &self,
        message: &mut Self::Message,
        field: &Self::Field,
        value: AttributeValue<Self::Message>,
    ) -> Result<()>;

    /// Insert every entry of a map value into a map field.
    fn merge(
        &self,
        message: &mut Self::Message,
        field: &Self::Field,
        value: AttributeValue<Self::Message>,
    ) -> Result<()>;

    /// Canonical serialized form of a message.
    fn encode(&self, message: &Self::Message) -> Vec<u8>;

    /// Parse bytes as a message of this type.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Message, Self::DecodeError>;
}
