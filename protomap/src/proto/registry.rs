//! Descriptor-pool backed type registry.
//!
//! Provides a process-wide registry with lazy initialization, so file
//! descriptor sets can be registered once at startup and shared by every
//! mapper.

use std::sync::OnceLock;

use parking_lot::RwLock;
use prost::bytes::Buf;
use prost_reflect::{DescriptorPool, MethodDescriptor, ServiceDescriptor};

use crate::error::{MapError, Result};
use crate::registry::{MethodTypes, TypeRegistry};

use super::ProtoType;

/// Resolves protobuf message types and service methods from a descriptor pool.
#[derive(Clone, Debug, Default)]
pub struct ProtoRegistry {
    pool: DescriptorPool,
}

impl ProtoRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: DescriptorPool) -> Self {
        Self { pool }
    }

    /// Create a registry from an encoded `FileDescriptorSet`.
    pub fn decode<B: Buf>(bytes: B) -> Result<Self> {
        let pool = DescriptorPool::decode(bytes).map_err(|e| MapError::Registry(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Get the process-wide registry (lazy initialized).
    pub fn global() -> &'static RwLock<ProtoRegistry> {
        static REGISTRY: OnceLock<RwLock<ProtoRegistry>> = OnceLock::new();
        REGISTRY.get_or_init(|| RwLock::new(ProtoRegistry::new()))
    }

    /// Add the files of an encoded `FileDescriptorSet`.
    pub fn add_file_descriptor_set<B: Buf>(&mut self, bytes: B) -> Result<()> {
        self.pool
            .decode_file_descriptor_set(bytes)
            .map_err(|e| MapError::Registry(e.to_string()))
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Check if a message type is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.lookup(type_name).is_some()
    }

    fn service(&self, service: &str) -> Result<ServiceDescriptor> {
        self.pool
            .get_service_by_name(trim_leading_dot(service))
            .ok_or_else(|| MapError::UnknownService {
                service: service.to_string(),
                available: self
                    .pool
                    .services()
                    .map(|s| s.full_name().to_string())
                    .collect(),
            })
    }
}

impl TypeRegistry for ProtoRegistry {
    type Type = ProtoType;

    fn lookup(&self, type_name: &str) -> Option<ProtoType> {
        self.pool
            .get_message_by_name(trim_leading_dot(type_name))
            .filter(|m| !m.is_map_entry())
            .map(ProtoType::new)
    }

    fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .pool
            .all_messages()
            .filter(|m| !m.is_map_entry())
            .map(|m| m.full_name().to_string())
            .collect();
        names.sort();
        names
    }

    fn method_types(&self, service: &str, method: &str) -> Result<MethodTypes<ProtoType>> {
        let svc = self.service(service)?;
        let found = find_method(&svc, method).ok_or_else(|| MapError::UnknownMethod {
            service: svc.full_name().to_string(),
            method: method.to_string(),
            available: svc.methods().map(|m| m.name().to_string()).collect(),
        })?;

        tracing::debug!(
            "[REG] {}/{} -> ({}, {})",
            svc.full_name(),
            found.name(),
            found.input().full_name(),
            found.output().full_name()
        );
        Ok(MethodTypes {
            request: ProtoType::new(found.input()),
            response: ProtoType::new(found.output()),
        })
    }
}

/// Find a method by exact name, or with its first letter upper-cased
/// (`process` in a URL names the `Process` rpc).
fn find_method(service: &ServiceDescriptor, method: &str) -> Option<MethodDescriptor> {
    let capitalized = capitalize_first(method);
    service
        .methods()
        .find(|m| m.name() == method)
        .or_else(|| service.methods().find(|m| m.name() == capitalized))
}

fn capitalize_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn trim_leading_dot(name: &str) -> &str {
    name.strip_prefix('.').unwrap_or(name)
}

// Convenience functions for working with the global registry

/// Register an encoded `FileDescriptorSet` in the global registry.
pub fn register_file_descriptor_set<B: Buf>(bytes: B) -> Result<()> {
    ProtoRegistry::global().write().add_file_descriptor_set(bytes)
}

/// Snapshot of the global registry.
///
/// Pools are reference counted, so the snapshot is cheap and stays valid if
/// more files are registered later.
pub fn global_registry() -> ProtoRegistry {
    ProtoRegistry::global().read().clone()
}

/// Check if a message type is registered globally.
pub fn has_type(type_name: &str) -> bool {
    ProtoRegistry::global().read().contains(type_name)
}
