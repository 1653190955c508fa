//! Binding of a record schema to a message type.
//!
//! Resolution runs once per mapper. Every lookup, shape check and type check
//! happens here, so the per-record paths of the encoder and decoder only
//! follow the resulting [`FieldBinding`] list.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::access::{FieldInfo, FieldKind, FieldShape, MessageType, ScalarType};
use crate::error::{MapError, Result};
use crate::mapping::{Direction, DuplicatePolicy, MappingEntry, MappingSource, ValueTemplate};
use crate::schema::{AttributeType, RecordSchema};
use crate::value::{AttributeValue, Record};

/// Where a binding takes its value from.
pub enum BindingSource<M> {
    /// Record position.
    Position(usize),
    /// Computed from the whole record (encode only).
    Template(Arc<dyn ValueTemplate<M>>),
}

impl<M> Clone for BindingSource<M> {
    fn clone(&self) -> Self {
        match self {
            BindingSource::Position(pos) => BindingSource::Position(*pos),
            BindingSource::Template(t) => BindingSource::Template(Arc::clone(t)),
        }
    }
}

impl<M> fmt::Debug for BindingSource<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingSource::Position(pos) => f.debug_tuple("Position").field(pos).finish(),
            BindingSource::Template(t) => write!(f, "Template({})", t.value_type()),
        }
    }
}

/// One resolved correspondence between a record value and a message field.
pub struct FieldBinding<T: MessageType> {
    source: BindingSource<T::Message>,
    field: T::Field,
    kind: FieldKind,
    attribute: String,
    field_name: String,
}

impl<T: MessageType> FieldBinding<T> {
    pub fn source(&self) -> &BindingSource<T::Message> {
        &self.source
    }

    /// Record position, if the binding is not a template.
    pub fn position(&self) -> Option<usize> {
        match self.source {
            BindingSource::Position(pos) => Some(pos),
            BindingSource::Template(_) => None,
        }
    }

    /// Resolved accessor handle.
    pub fn field(&self) -> &T::Field {
        &self.field
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Attribute name, or a label for template bindings.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Declared name of the target field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Produce the value this binding writes for `record`.
    pub(crate) fn value_of(&self, record: &Record<T::Message>) -> Result<AttributeValue<T::Message>> {
        match &self.source {
            BindingSource::Position(pos) => {
                record.get(*pos).cloned().ok_or_else(|| MapError::MissingValue {
                    attribute: self.attribute.clone(),
                    position: *pos,
                })
            }
            BindingSource::Template(template) => {
                let value = template.render(record)?;
                if !value.conforms_to(template.value_type()) {
                    return Err(MapError::type_mismatch(
                        format!("{} -> {}", self.attribute, self.field_name),
                        template.value_type().to_string(),
                        value.type_name(),
                    ));
                }
                Ok(value)
            }
        }
    }
}

impl<T: MessageType> Clone for FieldBinding<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            field: self.field.clone(),
            kind: self.kind,
            attribute: self.attribute.clone(),
            field_name: self.field_name.clone(),
        }
    }
}

impl<T: MessageType> fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("source", &self.source)
            .field("attribute", &self.attribute)
            .field("field_name", &self.field_name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// An entry awaiting field resolution.
struct Pending<M> {
    source: BindingSource<M>,
    label: String,
    attr_type: AttributeType,
    target: String,
}

/// Binds record schemas to one message type.
pub struct FieldResolver<'t, T> {
    ty: &'t T,
    direction: Direction,
    duplicates: DuplicatePolicy,
}

impl<'t, T: MessageType> FieldResolver<'t, T> {
    pub fn new(ty: &'t T, direction: Direction) -> Self {
        Self {
            ty,
            direction,
            duplicates: DuplicatePolicy::default(),
        }
    }

    /// Set how repeated encode targets are treated.
    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    /// Produce the ordered binding list for `schema`.
    ///
    /// Without a mapping, every attribute binds to the field of the same name
    /// at its declaration position. With a mapping, entries bind in the order
    /// given.
    pub fn bind(
        &self,
        schema: &RecordSchema,
        mapping: Option<&[MappingEntry<T::Message>]>,
    ) -> Result<Vec<FieldBinding<T>>> {
        let pending = match mapping {
            Some(entries) => self.pending_from_mapping(schema, entries)?,
            None => schema
                .attributes
                .iter()
                .enumerate()
                .map(|(pos, attr)| Pending {
                    source: BindingSource::Position(pos),
                    label: attr.name.clone(),
                    attr_type: attr.attr_type,
                    target: attr.name.clone(),
                })
                .collect(),
        };

        let fields = self.ty.fields();
        let mut targets: HashMap<String, String> = HashMap::new();
        let mut bindings = Vec::with_capacity(pending.len());

        for entry in pending {
            let binding = self.resolve(entry, &fields)?;

            if let Some(first) = targets.get(&binding.field_name) {
                if self.direction == Direction::Encode {
                    match self.duplicates {
                        DuplicatePolicy::Reject => {
                            return Err(MapError::DuplicateTarget {
                                field: binding.field_name.clone(),
                                first: first.clone(),
                                second: binding.attribute.clone(),
                            });
                        }
                        DuplicatePolicy::LastWriteWins => tracing::warn!(
                            "[RES] field '{}' is written by both '{}' and '{}', last write wins",
                            binding.field_name,
                            first,
                            binding.attribute
                        ),
                    }
                }
            } else {
                targets.insert(binding.field_name.clone(), binding.attribute.clone());
            }

            tracing::debug!(
                "[RES] {} {:?} -> {}.{} ({})",
                self.direction,
                binding.source,
                self.ty.full_name(),
                binding.field_name,
                binding.kind
            );
            bindings.push(binding);
        }

        if self.direction == Direction::Decode {
            check_decode_coverage(schema, &bindings)?;
        }

        tracing::debug!(
            "[RES] {} bound {} attribute(s) of {} to {}",
            self.direction,
            bindings.len(),
            schema.name,
            self.ty.full_name()
        );
        Ok(bindings)
    }

    fn pending_from_mapping(
        &self,
        schema: &RecordSchema,
        entries: &[MappingEntry<T::Message>],
    ) -> Result<Vec<Pending<T::Message>>> {
        let mut pending = Vec::with_capacity(entries.len());
        for entry in entries {
            let (source, label, attr_type) = match &entry.source {
                MappingSource::Attribute(name) => {
                    let pos = schema.position(name).ok_or_else(|| MapError::UnknownAttribute {
                        attribute: name.clone(),
                        available: schema.attribute_names().map(String::from).collect(),
                    })?;
                    (
                        BindingSource::Position(pos),
                        name.clone(),
                        schema.attributes[pos].attr_type,
                    )
                }
                MappingSource::Position(pos) => {
                    let attr = schema.attributes.get(*pos).ok_or_else(|| {
                        MapError::InvalidMapping(format!(
                            "position {} is out of range, '{}' has {} attributes",
                            pos,
                            schema.name,
                            schema.len()
                        ))
                    })?;
                    (BindingSource::Position(*pos), attr.name.clone(), attr.attr_type)
                }
                MappingSource::Template(template) => {
                    if self.direction == Direction::Decode {
                        return Err(MapError::InvalidMapping(format!(
                            "field '{}' is mapped from a template, templates can only be encoded",
                            entry.field
                        )));
                    }
                    (
                        BindingSource::Template(Arc::clone(template)),
                        entry.source_label(),
                        template.value_type(),
                    )
                }
            };
            pending.push(Pending {
                source,
                label,
                attr_type,
                target: entry.field.clone(),
            });
        }

        if self.direction == Direction::Encode {
            let unmapped: Vec<&str> = schema
                .attributes
                .iter()
                .enumerate()
                .filter(|(pos, _)| {
                    !pending
                        .iter()
                        .any(|p| matches!(p.source, BindingSource::Position(x) if x == *pos))
                })
                .map(|(_, attr)| attr.name.as_str())
                .collect();
            if !unmapped.is_empty() {
                tracing::warn!(
                    "[RES] attributes [{}] of {} are not mapped and will not be encoded",
                    unmapped.join(", "),
                    schema.name
                );
            }
        }
        Ok(pending)
    }

    fn resolve(&self, entry: Pending<T::Message>, fields: &[FieldInfo]) -> Result<FieldBinding<T>> {
        let field = self.find_field(&entry, fields)?;
        let field_name = self.ty.field_name(&field);
        let shape = self.ty.shape(&field);
        let declared = fields
            .iter()
            .find(|f| f.name == field_name)
            .map(|f| f.type_name.clone())
            .unwrap_or_else(|| shape.kind().to_string());

        match shape {
            FieldShape::Scalar(scalar) => {
                if entry.attr_type == AttributeType::Object {
                    return Err(MapError::UnsupportedFieldShape {
                        attribute: entry.label,
                        field: field_name,
                        shape: format!("a scalar of type {}", declared),
                    });
                }
                if !scalar_compatible(entry.attr_type, scalar, self.direction) {
                    return Err(MapError::type_mismatch(
                        field_name,
                        declared,
                        entry.attr_type.to_string(),
                    ));
                }
            }
            FieldShape::List | FieldShape::Map | FieldShape::Message => {
                if entry.attr_type != AttributeType::Object {
                    return Err(MapError::type_mismatch(
                        field_name,
                        format!("{} for {}", AttributeType::Object, declared),
                        entry.attr_type.to_string(),
                    ));
                }
            }
        }

        Ok(FieldBinding {
            source: entry.source,
            field,
            kind: shape.kind(),
            attribute: entry.label,
            field_name,
        })
    }

    fn find_field(&self, entry: &Pending<T::Message>, fields: &[FieldInfo]) -> Result<T::Field> {
        if let Some(field) = self.ty.field(&entry.target) {
            return Ok(field);
        }

        let wanted = canonical_name(&entry.target);
        let candidates: Vec<&FieldInfo> = fields
            .iter()
            .filter(|f| canonical_name(&f.name) == wanted)
            .collect();

        match candidates.as_slice() {
            [only] => self.ty.field(&only.name).ok_or_else(|| self.unknown_field(entry, fields)),
            [] => Err(self.unknown_field(entry, fields)),
            several => Err(MapError::InvalidMapping(format!(
                "'{}' matches several fields of '{}': [{}]",
                entry.target,
                self.ty.full_name(),
                several
                    .iter()
                    .map(|f| f.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    fn unknown_field(&self, entry: &Pending<T::Message>, fields: &[FieldInfo]) -> MapError {
        MapError::UnknownField {
            attribute: entry.label.clone(),
            field: entry.target.clone(),
            type_name: self.ty.full_name().to_string(),
            available: fields.to_vec(),
        }
    }
}

/// Every record position must be filled exactly once when decoding.
fn check_decode_coverage<T: MessageType>(
    schema: &RecordSchema,
    bindings: &[FieldBinding<T>],
) -> Result<()> {
    let mut bound = vec![false; schema.len()];
    for binding in bindings {
        if let Some(pos) = binding.position() {
            if bound[pos] {
                return Err(MapError::InvalidMapping(format!(
                    "attribute '{}' (position {}) is decoded from more than one field",
                    binding.attribute, pos
                )));
            }
            bound[pos] = true;
        }
    }

    let unbound: Vec<&str> = schema
        .attributes
        .iter()
        .zip(&bound)
        .filter(|(_, bound)| !**bound)
        .map(|(attr, _)| attr.name.as_str())
        .collect();
    if !unbound.is_empty() {
        return Err(MapError::MissingConfiguration(format!(
            "no field is mapped to attributes [{}] of '{}'",
            unbound.join(", "),
            schema.name
        )));
    }
    Ok(())
}

/// Name with underscores removed, lower-cased.
fn canonical_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn scalar_compatible(attr: AttributeType, field: ScalarType, direction: Direction) -> bool {
    match (attr, field) {
        (AttributeType::Bool, ScalarType::Bool)
        | (AttributeType::Int32, ScalarType::Int32 | ScalarType::Uint32 | ScalarType::Enum)
        | (AttributeType::Int64, ScalarType::Int64 | ScalarType::Uint64)
        | (AttributeType::Float32, ScalarType::Float32)
        | (AttributeType::Float64, ScalarType::Float64)
        | (AttributeType::String, ScalarType::String)
        | (AttributeType::Bytes, ScalarType::Bytes) => true,
        // Enum names are only understood on the way in
        (AttributeType::String, ScalarType::Enum) => direction == Direction::Encode,
        _ => false,
    }
}
