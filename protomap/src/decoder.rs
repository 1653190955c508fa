//! Message to record decoding.

use std::fmt;
use std::sync::Arc;

use crate::Builder;
use crate::access::MessageType;
use crate::config::MapperConfig;
use crate::error::{MapError, Result};
use crate::locator::{TypeLocator, TypeQuery, parse_method_url};
use crate::mapping::{Direction, MappingEntry};
use crate::registry::{MessageOf, Role, TypeRegistry};
use crate::resolver::{FieldBinding, FieldResolver};
use crate::schema::RecordSchema;
use crate::sink::EventSink;
use crate::value::{AttributeValue, Record};

/// Origin label used when none is configured.
pub const DEFAULT_ORIGIN: &str = "raw";

/// A message to decode, either serialized or already parsed.
#[derive(Debug)]
pub enum DecodeInput<'a, M> {
    Bytes(&'a [u8]),
    Message(&'a M),
}

impl<M> Clone for DecodeInput<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for DecodeInput<'_, M> {}

impl<'a, M> From<&'a [u8]> for DecodeInput<'a, M> {
    fn from(bytes: &'a [u8]) -> Self {
        DecodeInput::Bytes(bytes)
    }
}

/// Converts messages of one type into records of one schema.
pub struct Decoder<T: MessageType> {
    ty: T,
    schema: Arc<RecordSchema>,
    bindings: Vec<FieldBinding<T>>,
    origin: String,
}

impl<T: MessageType> Decoder<T> {
    /// Start configuring a decoder for `schema` against `registry`.
    pub fn builder<R>(registry: &R, schema: Arc<RecordSchema>) -> DecoderBuilder<'_, R>
    where
        R: TypeRegistry<Type = T>,
    {
        DecoderBuilder::new(registry, schema)
    }

    pub fn message_type(&self) -> &T {
        &self.ty
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn bindings(&self) -> &[FieldBinding<T>] {
        &self.bindings
    }

    /// Label reported for malformed input.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Decode one serialized or parsed message.
    pub fn decode_one(&self, input: DecodeInput<'_, T::Message>) -> Result<Record<T::Message>> {
        match input {
            DecodeInput::Bytes(bytes) => self.decode_bytes(bytes),
            DecodeInput::Message(message) => self.decode_message(message),
        }
    }

    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<Record<T::Message>> {
        let message = self.ty.decode(bytes).map_err(|e| MapError::MalformedInput {
            type_name: self.ty.full_name().to_string(),
            origin: self.origin.clone(),
            reason: e.to_string(),
        })?;
        self.read(&message)
    }

    /// Decode an already parsed message.
    ///
    /// The message must be of the resolved type by name; it may come from a
    /// different registry than the one this decoder was built from.
    pub fn decode_message(&self, message: &T::Message) -> Result<Record<T::Message>> {
        if !self.ty.is_instance(message) {
            return Err(MapError::type_mismatch(
                format!("input from '{}'", self.origin),
                self.ty.full_name(),
                self.ty.type_name_of(message),
            ));
        }
        let message = self.ty.adopt(message)?;
        self.read(&message)
    }

    /// Decode every input, keeping one result per input in order.
    pub fn decode_batch<'a, I>(&self, inputs: I) -> Vec<Result<Record<T::Message>>>
    where
        I: IntoIterator<Item = DecodeInput<'a, T::Message>>,
    {
        inputs
            .into_iter()
            .enumerate()
            .map(|(idx, input)| {
                let result = self.decode_one(input);
                if let Err(e) = &result {
                    tracing::warn!("[DEC] dropping input {} from '{}': {}", idx, self.origin, e);
                }
                result
            })
            .collect()
    }

    /// Decode one input and deliver the record to `sink`.
    pub fn decode_and_send<S>(&self, input: DecodeInput<'_, T::Message>, sink: &S) -> Result<()>
    where
        S: EventSink<Record<T::Message>>,
    {
        let record = self.decode_one(input)?;
        sink.publish(record)
    }

    fn read(&self, message: &T::Message) -> Result<Record<T::Message>> {
        let mut slots: Vec<Option<AttributeValue<T::Message>>> =
            (0..self.schema.len()).map(|_| None).collect();

        for binding in &self.bindings {
            if let Some(pos) = binding.position() {
                slots[pos] = Some(self.ty.get(message, binding.field())?);
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(pos, slot)| match slot {
                Some(value) if !value.is_null() => Ok(value),
                _ => Err(MapError::MissingValue {
                    attribute: self.schema.attributes[pos].name.clone(),
                    position: pos,
                }),
            })
            .collect::<Result<Vec<_>>>()
            .map(Record::new)
    }
}

impl<T: MessageType> fmt::Debug for Decoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("type", &self.ty.full_name())
            .field("schema", &self.schema.name)
            .field("bindings", &self.bindings)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Builder for [`Decoder`].
pub struct DecoderBuilder<'r, R: TypeRegistry> {
    registry: &'r R,
    schema: Arc<RecordSchema>,
    type_name: Option<String>,
    url: Option<String>,
    scheme: Option<String>,
    role: Role,
    mapping: Option<Vec<MappingEntry<MessageOf<R>>>>,
    require_mapping: bool,
    origin: Option<String>,
}

impl<'r, R: TypeRegistry> DecoderBuilder<'r, R> {
    pub fn new(registry: &'r R, schema: Arc<RecordSchema>) -> Self {
        Self {
            registry,
            schema,
            type_name: None,
            url: None,
            scheme: None,
            role: Role::default(),
            mapping: None,
            require_mapping: false,
            origin: None,
        }
    }

    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Require the method URL to use `scheme`, e.g. `grpc`.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn mapping(mut self, entries: Vec<MappingEntry<MessageOf<R>>>) -> Self {
        self.mapping = Some(entries);
        self
    }

    pub fn require_mapping(mut self, required: bool) -> Self {
        self.require_mapping = required;
        self
    }

    /// Name of the input source, reported in malformed input errors.
    pub fn source_name(mut self, name: impl Into<String>) -> Self {
        self.origin = Some(name.into());
        self
    }

    /// Apply every option set in `config`; unset options keep their value.
    pub fn with_config(mut self, config: &MapperConfig) -> Self {
        if let Some(type_name) = &config.type_name {
            self.type_name = Some(type_name.clone());
        }
        if let Some(url) = &config.url {
            self.url = Some(url.clone());
        }
        if let Some(scheme) = &config.scheme {
            self.scheme = Some(scheme.clone());
        }
        if let Some(entries) = config.mapping_entries() {
            self.mapping = Some(entries);
        }
        if let Some(source) = &config.source {
            self.origin = Some(source.clone());
        }
        if let Some(role) = config.role {
            self.role = role;
        }
        if let Some(required) = config.require_mapping {
            self.require_mapping = required;
        }
        self
    }
}

impl<R: TypeRegistry> Builder for DecoderBuilder<'_, R> {
    type Output = Decoder<R::Type>;

    fn build(self) -> Result<Self::Output> {
        let method = self
            .url
            .as_deref()
            .map(|url| parse_method_url(url, self.scheme.as_deref()))
            .transpose()?;
        let query = TypeQuery {
            type_name: self.type_name,
            method,
            role: self.role,
            mapping_required: self.require_mapping,
            mapping_supplied: self.mapping.is_some(),
        };
        let ty = TypeLocator::new(self.registry).locate(&query)?;
        let bindings =
            FieldResolver::new(&ty, Direction::Decode).bind(&self.schema, self.mapping.as_deref())?;
        let origin = self.origin.unwrap_or_else(|| DEFAULT_ORIGIN.to_string());

        tracing::debug!(
            "[DEC] {} from '{}' -> {} ready ({} bindings)",
            ty.full_name(),
            origin,
            self.schema.name,
            bindings.len()
        );
        Ok(Decoder {
            ty,
            schema: self.schema,
            bindings,
            origin,
        })
    }
}
