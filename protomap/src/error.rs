//! Error types for record/message mapping.

use crate::access::FieldInfo;

pub type Result<T, E = MapError> = std::result::Result<T, E>;

/// Errors raised while configuring or running a mapper.
///
/// Setup-time kinds (see [`MapError::is_setup`]) abort mapper construction and
/// are only fixed by changing configuration. Every other kind is scoped to the
/// single record or message that triggered it.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    #[error(
        "invalid method url '{url}': {reason}; expected format is \
         `scheme://host:port/<serviceName>/<methodName>`"
    )]
    InvalidUrl { url: String, reason: String },

    #[error("invalid record schema: {0}")]
    InvalidSchema(String),

    #[error("unknown message type '{name}', known types: [{}]", .available.join(", "))]
    UnknownType { name: String, available: Vec<String> },

    #[error("unknown service '{service}', known services: [{}]", .available.join(", "))]
    UnknownService {
        service: String,
        available: Vec<String>,
    },

    #[error(
        "unknown method '{method}' on service '{service}', expected one of: [{}]",
        .available.join(", ")
    )]
    UnknownMethod {
        service: String,
        method: String,
        available: Vec<String>,
    },

    #[error(
        "attribute '{attribute}' does not match any field of '{type_name}' (looked for '{field}'), \
         expected one of: [{}]",
        join_fields(.available)
    )]
    UnknownField {
        attribute: String,
        field: String,
        type_name: String,
        available: Vec<FieldInfo>,
    },

    #[error("unknown attribute '{attribute}', record attributes: [{}]", .available.join(", "))]
    UnknownAttribute {
        attribute: String,
        available: Vec<String>,
    },

    #[error("data type does not match for '{target}': expected '{expected}', found '{found}'")]
    TypeMismatch {
        target: String,
        expected: String,
        found: String,
    },

    #[error(
        "attribute '{attribute}' is declared as object but field '{field}' is {shape}; \
         object attributes must map to a list, map or message field"
    )]
    UnsupportedFieldShape {
        attribute: String,
        field: String,
        shape: String,
    },

    #[error("field '{field}' is targeted by both '{first}' and '{second}'")]
    DuplicateTarget {
        field: String,
        first: String,
        second: String,
    },

    #[error("invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("record has {found} values but the schema declares {expected} attributes")]
    RecordArity { expected: usize, found: usize },

    #[error("input from '{origin}' is not a valid '{type_name}' message: {reason}")]
    MalformedInput {
        type_name: String,
        origin: String,
        reason: String,
    },

    #[error("no value for attribute '{attribute}' at position {position}")]
    MissingValue { attribute: String, position: usize },

    #[error("type registry error: {0}")]
    Registry(String),

    #[error("failed to publish: {0}")]
    Publish(String),
}

impl MapError {
    /// Whether this error can only be raised while a mapper is being set up.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            MapError::MissingConfiguration(_)
                | MapError::InvalidUrl { .. }
                | MapError::InvalidSchema(_)
                | MapError::UnknownType { .. }
                | MapError::UnknownService { .. }
                | MapError::UnknownMethod { .. }
                | MapError::UnknownField { .. }
                | MapError::UnknownAttribute { .. }
                | MapError::UnsupportedFieldShape { .. }
                | MapError::DuplicateTarget { .. }
                | MapError::InvalidMapping(_)
                | MapError::Registry(_)
        )
    }

    pub(crate) fn type_mismatch(
        target: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        MapError::TypeMismatch {
            target: target.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

fn join_fields(fields: &[FieldInfo]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
