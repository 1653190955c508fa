//! Declarative mapper configuration.
//!
//! [`MapperConfig`] holds everything needed to set up an encoder or decoder
//! apart from the record schema and the registry, and deserializes from any
//! serde format. The stream-processor option names `class`, `publisher.url`
//! and `receiver.url` are accepted as aliases.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::mapping::MappingEntry;
use crate::registry::Role;

/// Form in which an encoder emits messages.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Canonical serialized bytes.
    #[default]
    Bytes,
    /// The message object itself.
    Native,
}

/// Reference to a record attribute, by position or by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeRef {
    Position(usize),
    Name(String),
}

/// One configured mapping entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    pub attribute: AttributeRef,
    pub field: String,
}

impl MappingConfig {
    pub fn to_entry<M>(&self) -> MappingEntry<M> {
        match &self.attribute {
            AttributeRef::Position(pos) => MappingEntry::position(*pos, self.field.clone()),
            AttributeRef::Name(name) => MappingEntry::attribute(name.clone(), self.field.clone()),
        }
    }
}

/// Mapper options read from configuration.
///
/// Every option is optional. A builder given a config through `with_config`
/// only takes the options that are set, so it keeps its own value for the
/// rest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Fully-qualified message type name.
    #[serde(alias = "class")]
    pub type_name: Option<String>,
    /// Method URL `scheme://host:port/<service>/<method>`.
    #[serde(alias = "publisher.url", alias = "receiver.url")]
    pub url: Option<String>,
    /// Required method URL scheme, e.g. `grpc`.
    pub scheme: Option<String>,
    pub role: Option<Role>,
    pub output: Option<OutputMode>,
    pub require_mapping: Option<bool>,
    pub allow_duplicate_targets: Option<bool>,
    pub mapping: Option<Vec<MappingConfig>>,
    /// Origin label reported in malformed input errors.
    pub source: Option<String>,
}

impl MapperConfig {
    /// Mapping entries, if any were configured.
    pub fn mapping_entries<M>(&self) -> Option<Vec<MappingEntry<M>>> {
        self.mapping
            .as_ref()
            .map(|entries| entries.iter().map(MappingConfig::to_entry).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingSource;

    #[test]
    fn test_defaults() {
        let config: MapperConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MapperConfig::default());
        assert_eq!(config.role, None);
        assert_eq!(config.output, None);
        assert_eq!(config.require_mapping, None);
        assert!(config.mapping_entries::<()>().is_none());
    }

    #[test]
    fn test_aliases_and_mapping() {
        let config: MapperConfig = serde_json::from_str(
            r#"{
                "class": "sample.Request",
                "publisher.url": "grpc://localhost:8888/sample.MyService/process",
                "scheme": "grpc",
                "role": "response",
                "output": "native",
                "require_mapping": true,
                "mapping": [
                    { "attribute": "a", "field": "stringValue" },
                    { "attribute": 1, "field": "intValue" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.type_name.as_deref(), Some("sample.Request"));
        assert!(config.url.as_deref().unwrap().starts_with("grpc://"));
        assert_eq!(config.scheme.as_deref(), Some("grpc"));
        assert_eq!(config.role, Some(Role::Response));
        assert_eq!(config.output, Some(OutputMode::Native));
        assert_eq!(config.require_mapping, Some(true));
        assert_eq!(config.allow_duplicate_targets, None);

        let entries = config.mapping_entries::<()>().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(matches!(&entries[0].source, MappingSource::Attribute(name) if name == "a"));
        assert!(matches!(entries[1].source, MappingSource::Position(1)));
        assert_eq!(entries[1].field, "intValue");
    }

    #[test]
    fn test_receiver_alias() {
        let config: MapperConfig =
            serde_json::from_str(r#"{ "receiver.url": "grpc://h:1/s/m" }"#).unwrap();
        assert_eq!(config.url.as_deref(), Some("grpc://h:1/s/m"));
    }
}
