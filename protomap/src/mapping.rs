//! Explicit attribute-to-field mappings.
//!
//! Without a mapping, attribute names are used directly as target field
//! names. A mapping overrides that, entry by entry, and may also supply
//! computed values through a [`ValueTemplate`] on the encode side.

use std::fmt;
use std::sync::Arc;

use prost_reflect::DynamicMessage;
use strum::{Display, EnumString};

use crate::error::Result;
use crate::schema::AttributeType;
use crate::value::{AttributeValue, Record};

/// Direction a mapper converts in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Record to message.
    Encode,
    /// Message to record.
    Decode,
}

/// What to do when two encode-side entries target the same field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail resolution with `DuplicateTarget`.
    #[default]
    Reject,
    /// Keep every binding; the last one applied wins at run time.
    LastWriteWins,
}

/// Computes an encode-side value from a whole record.
pub trait ValueTemplate<M = DynamicMessage>: Send + Sync {
    /// Declared type of the produced value, checked against the target field.
    fn value_type(&self) -> AttributeType;

    /// Produce the value for one record.
    fn render(&self, record: &Record<M>) -> Result<AttributeValue<M>>;
}

/// A [`ValueTemplate`] backed by a closure.
pub struct FnTemplate<F> {
    value_type: AttributeType,
    render: F,
}

impl<F> FnTemplate<F> {
    pub fn new(value_type: AttributeType, render: F) -> Self {
        Self { value_type, render }
    }
}

impl<M, F> ValueTemplate<M> for FnTemplate<F>
where
    F: Fn(&Record<M>) -> Result<AttributeValue<M>> + Send + Sync,
{
    fn value_type(&self) -> AttributeType {
        self.value_type
    }

    fn render(&self, record: &Record<M>) -> Result<AttributeValue<M>> {
        (self.render)(record)
    }
}

/// Where the value of a mapping entry comes from.
pub enum MappingSource<M = DynamicMessage> {
    /// Record attribute by name.
    Attribute(String),
    /// Record attribute by position.
    Position(usize),
    /// Computed value (encode only).
    Template(Arc<dyn ValueTemplate<M>>),
}

impl<M> Clone for MappingSource<M> {
    fn clone(&self) -> Self {
        match self {
            MappingSource::Attribute(name) => MappingSource::Attribute(name.clone()),
            MappingSource::Position(pos) => MappingSource::Position(*pos),
            MappingSource::Template(t) => MappingSource::Template(Arc::clone(t)),
        }
    }
}

impl<M> fmt::Debug for MappingSource<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingSource::Attribute(name) => f.debug_tuple("Attribute").field(name).finish(),
            MappingSource::Position(pos) => f.debug_tuple("Position").field(pos).finish(),
            MappingSource::Template(t) => write!(f, "Template({})", t.value_type()),
        }
    }
}

/// One explicit correspondence between a record value and a message field.
#[derive(Clone, Debug)]
pub struct MappingEntry<M = DynamicMessage> {
    pub source: MappingSource<M>,
    /// Target field name on the message type.
    pub field: String,
}

impl<M> MappingEntry<M> {
    /// Map the attribute named `attribute` to `field`.
    pub fn attribute(attribute: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            source: MappingSource::Attribute(attribute.into()),
            field: field.into(),
        }
    }

    /// Map the attribute at `position` to `field`.
    pub fn position(position: usize, field: impl Into<String>) -> Self {
        Self {
            source: MappingSource::Position(position),
            field: field.into(),
        }
    }

    /// Fill `field` with the output of `template`.
    pub fn template(template: impl ValueTemplate<M> + 'static, field: impl Into<String>) -> Self {
        Self {
            source: MappingSource::Template(Arc::new(template)),
            field: field.into(),
        }
    }

    /// Short description of the source for diagnostics.
    pub(crate) fn source_label(&self) -> String {
        match &self.source {
            MappingSource::Attribute(name) => name.clone(),
            MappingSource::Position(pos) => format!("#{}", pos),
            MappingSource::Template(t) => format!("<{} template>", t.value_type()),
        }
    }
}
