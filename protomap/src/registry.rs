//! Type registry capability.
//!
//! Replaces loading message classes by name: whoever sets up a mapper injects
//! a [`TypeRegistry`] that can resolve type names and RPC methods to message
//! types.

use strum::{Display, EnumString};

use serde::{Deserialize, Serialize};

use crate::access::MessageType;
use crate::error::Result;

/// Which half of a remote call's message pair a mapper targets.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Request,
    Response,
}

/// Request and response types of one RPC method.
#[derive(Clone, Debug)]
pub struct MethodTypes<T> {
    pub request: T,
    pub response: T,
}

impl<T> MethodTypes<T> {
    /// Select the type for `role`.
    pub fn for_role(self, role: Role) -> T {
        match role {
            Role::Request => self.request,
            Role::Response => self.response,
        }
    }
}

/// Message type produced by a registry's types.
pub type MessageOf<R> = <<R as TypeRegistry>::Type as MessageType>::Message;

/// Resolves message types by name and RPC methods to their message pair.
pub trait TypeRegistry {
    type Type: MessageType;

    /// Look up a message type by its fully-qualified name.
    fn lookup(&self, type_name: &str) -> Option<Self::Type>;

    /// All resolvable type names, used in diagnostics.
    fn type_names(&self) -> Vec<String>;

    /// Resolve the request/response pair of `service`/`method`.
    ///
    /// Failures must list the valid alternatives (`UnknownService` with the
    /// known services, `UnknownMethod` with the service's methods).
    fn method_types(&self, service: &str, method: &str) -> Result<MethodTypes<Self::Type>>;
}

impl<R: TypeRegistry + ?Sized> TypeRegistry for &R {
    type Type = R::Type;

    fn lookup(&self, type_name: &str) -> Option<Self::Type> {
        (**self).lookup(type_name)
    }

    fn type_names(&self) -> Vec<String> {
        (**self).type_names()
    }

    fn method_types(&self, service: &str, method: &str) -> Result<MethodTypes<Self::Type>> {
        (**self).method_types(service, method)
    }
}
