//! # protomap: schema-driven record/message mapping
//!
//! `protomap` converts flat, ordered records of named, typed attributes into
//! structured messages and back. A record schema is bound to a message type
//! once, at setup; afterwards every record or message only follows the
//! resolved bindings, with no further type introspection.
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌─────────────────┐
//! │  TypeQuery   │────▶│  TypeLocator  │────▶│  MessageType    │
//! │ (name / url) │     │  (registry)   │     │  (descriptor)   │
//! └──────────────┘     └───────────────┘     └────────┬────────┘
//!                                                     │
//! ┌──────────────┐     ┌───────────────┐              │
//! │ RecordSchema │────▶│ FieldResolver │◀─────────────┘
//! │  + mapping   │     └───────┬───────┘
//! └──────────────┘             │ bindings
//!                     ┌────────┴────────┐
//!                     ▼                 ▼
//!               ┌──────────┐      ┌──────────┐
//!               │ Encoder  │      │ Decoder  │
//!               └──────────┘      └──────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use protomap::prelude::*;
//! use protomap::proto::ProtoRegistry;
//!
//! let registry = ProtoRegistry::decode(descriptor_set_bytes)?;
//! let schema = RecordSchema::builder("FooStream")
//!     .attribute("stringValue", AttributeType::String)
//!     .attribute("intValue", AttributeType::Int32)
//!     .build()?;
//!
//! let encoder = Encoder::builder(&registry, schema.clone())
//!     .url("grpc://localhost:8888/sample.MyService/process")
//!     .build()?;
//! let bytes = encoder.encode_one(&Record::new(vec!["hello".into(), 7i32.into()]))?;
//!
//! let decoder = Decoder::builder(&registry, schema)
//!     .type_name("sample.Request")
//!     .build()?;
//! let record = decoder.decode_one(DecodeInput::Bytes(bytes.as_bytes().unwrap_or_default()))?;
//! ```

pub mod access;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod locator;
pub mod mapping;
pub mod prelude;
pub mod proto;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod sink;
pub mod value;

pub use access::{FieldInfo, FieldKind, FieldShape, MessageType, ScalarType};
pub use config::{MapperConfig, OutputMode};
pub use decoder::{DecodeInput, Decoder, DecoderBuilder};
pub use encoder::{BatchReport, Encoded, Encoder, EncoderBuilder};
pub use error::{MapError, Result};
pub use locator::{MethodRef, TypeLocator, TypeQuery};
pub use mapping::{Direction, DuplicatePolicy, FnTemplate, MappingEntry, ValueTemplate};
pub use registry::{MethodTypes, Role, TypeRegistry};
pub use resolver::{FieldBinding, FieldResolver};
pub use schema::{Attribute, AttributeType, RecordSchema};
pub use value::{AttributeValue, Record};

pub use prost_reflect;

/// Builds a configured object, consuming the builder.
///
/// Bring it into scope to call `.build()`:
///
/// ```rust,ignore
/// use protomap::Builder;
/// let decoder = Decoder::builder(&registry, schema).type_name("sample.Request").build()?;
/// ```
pub trait Builder {
    /// The type produced by this builder.
    type Output;
    /// Consume the builder and construct the configured object.
    ///
    /// # Errors
    ///
    /// Returns a setup-time [`MapError`] if the target type cannot be located
    /// or the record schema cannot be bound to it.
    fn build(self) -> Result<Self::Output>;
}
