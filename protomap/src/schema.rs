//! Record schemas: the flat, ordered side of a mapping.
//!
//! A [`RecordSchema`] is an ordered list of named, typed attributes. The
//! position of an attribute is significant: when no explicit mapping is
//! supplied, record values are bound to message fields in declaration order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{MapError, Result};

/// Declared type of a record attribute.
///
/// `Object` is the escape hatch for list, map and nested-message fields; the
/// target message type decides which of those shapes it actually is.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum AttributeType {
    #[strum(to_string = "bool", serialize = "boolean")]
    #[serde(rename = "bool", alias = "boolean")]
    Bool,
    #[strum(to_string = "int32", serialize = "int")]
    #[serde(rename = "int32", alias = "int")]
    Int32,
    #[strum(to_string = "int64", serialize = "long")]
    #[serde(rename = "int64", alias = "long")]
    Int64,
    #[strum(to_string = "float32", serialize = "float")]
    #[serde(rename = "float32", alias = "float")]
    Float32,
    #[strum(to_string = "float64", serialize = "double")]
    #[serde(rename = "float64", alias = "double")]
    Float64,
    #[strum(to_string = "string")]
    #[serde(rename = "string")]
    String,
    #[strum(to_string = "bytes")]
    #[serde(rename = "bytes")]
    Bytes,
    #[strum(to_string = "object")]
    #[serde(rename = "object")]
    Object,
}

impl AttributeType {
    /// Check if this is a scalar (non-object) type.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, AttributeType::Object)
    }
}

/// One named, typed attribute of a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
        }
    }
}

/// Ordered attribute list of a record stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordSchema {
    /// Stream or table name, used in diagnostics only.
    pub name: String,
    /// Attributes in declaration order.
    pub attributes: Vec<Attribute>,
}

impl RecordSchema {
    /// Create a builder for programmatic schema construction.
    pub fn builder(name: &str) -> RecordSchemaBuilder {
        RecordSchemaBuilder::new(name)
    }

    /// Get attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Get attribute position by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// Number of attributes, i.e. the arity of every record of this schema.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterate over attribute names.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }
}

/// Builder for [`RecordSchema`].
pub struct RecordSchemaBuilder {
    name: String,
    attributes: Vec<Attribute>,
}

impl RecordSchemaBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
        }
    }

    /// Append an attribute.
    pub fn attribute(mut self, name: &str, attr_type: AttributeType) -> Self {
        self.attributes.push(Attribute::new(name, attr_type));
        self
    }

    /// Append several attributes at once.
    pub fn attributes(mut self, attributes: impl IntoIterator<Item = Attribute>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Build the schema, rejecting empty or repeated attribute names.
    pub fn build(self) -> Result<Arc<RecordSchema>> {
        for (idx, attr) in self.attributes.iter().enumerate() {
            if attr.name.is_empty() {
                return Err(MapError::InvalidSchema(format!(
                    "attribute at position {} of '{}' has an empty name",
                    idx, self.name
                )));
            }
            if self.attributes[..idx].iter().any(|a| a.name == attr.name) {
                return Err(MapError::InvalidSchema(format!(
                    "attribute '{}' is declared more than once in '{}'",
                    attr.name, self.name
                )));
            }
        }

        Ok(Arc::new(RecordSchema {
            name: self.name,
            attributes: self.attributes,
        }))
    }
}
