//! Convenience re-exports for common protomap types.
//!
//! Import everything with `use protomap::prelude::*;`.

/// The builder trait, required to call `.build()` on encoder and decoder builders.
pub use crate::Builder;

/// Mappers and their inputs/outputs.
pub use crate::decoder::{DecodeInput, Decoder};
pub use crate::encoder::{Encoded, Encoder, OutputMode};

/// Record side of a mapping.
pub use crate::schema::{AttributeType, RecordSchema};
pub use crate::value::{AttributeValue, Record};

/// Explicit mappings.
pub use crate::mapping::{FnTemplate, MappingEntry};

/// Type resolution.
pub use crate::registry::{Role, TypeRegistry};

pub use crate::error::{MapError, Result};
pub use crate::sink::{EventSink, sink_fn};
