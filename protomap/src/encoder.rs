//! Record to message encoding.
//!
//! An [`Encoder`] is set up once through [`EncoderBuilder`]: the target type
//! is located, the record schema is bound to it, and from then on every
//! record only walks the binding list.
//!
//! In [`OutputMode::Bytes`] a single message builder is reused for every
//! record and cleared after each one, whether or not encoding succeeded. In
//! [`OutputMode::Native`] each record gets a fresh message, since the caller
//! keeps it.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::Builder;
use crate::access::{FieldKind, MessageType};
use crate::config::MapperConfig;
pub use crate::config::OutputMode;
use crate::error::{MapError, Result};
use crate::locator::{TypeLocator, TypeQuery, parse_method_url};
use crate::mapping::{Direction, DuplicatePolicy, MappingEntry};
use crate::registry::{MessageOf, Role, TypeRegistry};
use crate::resolver::{FieldBinding, FieldResolver};
use crate::schema::RecordSchema;
use crate::sink::EventSink;
use crate::value::Record;

/// Output of encoding one record.
#[derive(Clone, Debug, PartialEq)]
pub enum Encoded<M> {
    Bytes(Vec<u8>),
    Message(M),
}

impl<M> Encoded<M> {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Encoded::Bytes(bytes) => Some(bytes),
            Encoded::Message(_) => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Encoded::Bytes(bytes) => Some(bytes),
            Encoded::Message(_) => None,
        }
    }

    pub fn into_message(self) -> Option<M> {
        match self {
            Encoded::Message(message) => Some(message),
            Encoded::Bytes(_) => None,
        }
    }
}

/// Outcome of [`Encoder::publish_batch`].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Number of items delivered to the sink.
    pub published: usize,
    /// Input index and error of every record that was not delivered.
    pub failures: Vec<(usize, MapError)>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

enum BuilderSlot<M> {
    Shared(Mutex<M>),
    PerRecord,
}

/// Converts records of one schema into messages of one type.
pub struct Encoder<T: MessageType> {
    ty: T,
    schema: Arc<RecordSchema>,
    bindings: Vec<FieldBinding<T>>,
    output: OutputMode,
    builder: BuilderSlot<T::Message>,
}

impl<T: MessageType> Encoder<T> {
    /// Start configuring an encoder for `schema` against `registry`.
    pub fn builder<R>(registry: &R, schema: Arc<RecordSchema>) -> EncoderBuilder<'_, R>
    where
        R: TypeRegistry<Type = T>,
    {
        EncoderBuilder::new(registry, schema)
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

    pub fn output(&self) -> OutputMode {
        self.output
    }

    /// Encode a single record.
    pub fn encode_one(&self, record: &Record<T::Message>) -> Result<Encoded<T::Message>> {
        if record.len() != self.schema.len() {
            return Err(MapError::RecordArity {
                expected: self.schema.len(),
                found: record.len(),
            });
        }

        match &self.builder {
            BuilderSlot::Shared(builder) => {
                let mut message = builder.lock();
                let result = self
                    .apply(&mut message, record)
                    .map(|()| self.ty.encode(&message));
                self.ty.clear(&mut message);
                result.map(Encoded::Bytes)
            }
            BuilderSlot::PerRecord => {
                let mut message = self.ty.new_message();
                self.apply(&mut message, record)?;
                Ok(Encoded::Message(message))
            }
        }
    }

    /// Encode every record, keeping one result per record in input order.
    ///
    /// A failing record is logged and reported in its slot; the rest of the
    /// batch is still encoded.
    pub fn encode_batch(&self, records: &[Record<T::Message>]) -> Vec<Result<Encoded<T::Message>>> {
        records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                let result = self.encode_one(record);
                if let Err(e) = &result {
                    tracing::warn!(
                        "[ENC] dropping record {} of {}: {}",
                        idx,
                        self.schema.name,
                        e
                    );
                }
                result
            })
            .collect()
    }

    /// Encode every record and deliver the successes to `sink` in input order.
    pub fn publish_batch<S>(&self, records: &[Record<T::Message>], sink: &S) -> BatchReport
    where
        S: EventSink<Encoded<T::Message>>,
    {
        let mut report = BatchReport::default();
        for (idx, result) in self.encode_batch(records).into_iter().enumerate() {
            match result.and_then(|encoded| sink.publish(encoded)) {
                Ok(()) => report.published += 1,
                Err(e) => report.failures.push((idx, e)),
            }
        }
        tracing::debug!(
            "[ENC] published {}/{} records of {}",
            report.published,
            records.len(),
            self.schema.name
        );
        report
    }

    fn apply(&self, message: &mut T::Message, record: &Record<T::Message>) -> Result<()> {
        for binding in &self.bindings {
            let value = binding.value_of(record)?;
            match binding.kind() {
                FieldKind::Scalar | FieldKind::Message => {
                    self.ty.set(message, binding.field(), value)?
                }
                FieldKind::List => self.ty.extend(message, binding.field(), value)?,
                FieldKind::Map => self.ty.merge(message, binding.field(), value)?,
            }
        }
        Ok(())
    }
}

impl<T: MessageType> fmt::Debug for Encoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("type", &self.ty.full_name())
            .field("schema", &self.schema.name)
            .field("bindings", &self.bindings)
            .field("output", &self.output)
            .finish()
    }
}

/// Builder for [`Encoder`].
pub struct EncoderBuilder<'r, R: TypeRegistry> {
    registry: &'r R,
    schema: Arc<RecordSchema>,
    type_name: Option<String>,
    url: Option<String>,
    scheme: Option<String>,
    role: Role,
    mapping: Option<Vec<MappingEntry<MessageOf<R>>>>,
    require_mapping: bool,
    output: OutputMode,
    duplicates: DuplicatePolicy,
}

impl<'r, R: TypeRegistry> EncoderBuilder<'r, R> {
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
            output: OutputMode::default(),
            duplicates: DuplicatePolicy::default(),
        }
    }

    /// Target an explicitly named message type.
    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Target one half of the method named by `url`.
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

    /// Refuse to build without an explicit mapping.
    pub fn require_mapping(mut self, required: bool) -> Self {
        self.require_mapping = required;
        self
    }

    pub fn output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Let several entries write the same field; the last one wins.
    pub fn allow_duplicate_targets(mut self, allow: bool) -> Self {
        self.duplicates = if allow {
            DuplicatePolicy::LastWriteWins
        } else {
            DuplicatePolicy::Reject
        };
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
        if let Some(role) = config.role {
            self.role = role;
        }
        if let Some(output) = config.output {
            self.output = output;
        }
        if let Some(required) = config.require_mapping {
            self.require_mapping = required;
        }
        match config.allow_duplicate_targets {
            Some(allow) => self.allow_duplicate_targets(allow),
            None => self,
        }
    }
}

impl<R: TypeRegistry> Builder for EncoderBuilder<'_, R> {
    type Output = Encoder<R::Type>;

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
        let bindings = FieldResolver::new(&ty, Direction::Encode)
            .duplicates(self.duplicates)
            .bind(&self.schema, self.mapping.as_deref())?;

        let builder = match self.output {
            OutputMode::Bytes => BuilderSlot::Shared(Mutex::new(ty.new_message())),
            OutputMode::Native => BuilderSlot::PerRecord,
        };

        tracing::debug!(
            "[ENC] {} -> {} ready ({} bindings, {} output)",
            self.schema.name,
            ty.full_name(),
            bindings.len(),
            self.output
        );
        Ok(Encoder {
            ty,
            schema: self.schema,
            bindings,
            output: self.output,
            builder,
        })
    }
}
