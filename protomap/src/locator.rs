//! Message type location.
//!
//! A mapper targets either an explicitly named message type, or one half of
//! an RPC method's request/response pair identified by a method URL of the
//! form `scheme://host:port/<service>/<method>`.

use std::fmt;

use crate::access::MessageType;
use crate::error::{MapError, Result};
use crate::registry::{Role, TypeRegistry};

/// A `<service>/<method>` reference parsed from a method URL.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub service: String,
    pub method: String,
}

impl MethodRef {
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
        }
    }

    /// Parse `scheme://host:port/<service>/<method>`.
    ///
    /// The path must hold exactly two non-empty segments. A trailing slash is
    /// tolerated, query strings and fragments are not.
    pub fn parse(url: &str) -> Result<Self> {
        let (_, rest) = url
            .split_once("://")
            .ok_or_else(|| invalid_url(url, "missing scheme"))?;
        Self::parse_authority_and_path(url, rest)
    }

    /// Like [`MethodRef::parse`], but the URL scheme must equal `scheme`.
    pub fn parse_with_scheme(url: &str, scheme: &str) -> Result<Self> {
        let (found, rest) = url
            .split_once("://")
            .ok_or_else(|| invalid_url(url, "missing scheme"))?;
        if !found.eq_ignore_ascii_case(scheme) {
            return Err(invalid_url(
                url,
                format!("scheme must be '{}', found '{}'", scheme, found),
            ));
        }
        Self::parse_authority_and_path(url, rest)
    }

    fn parse_authority_and_path(url: &str, rest: &str) -> Result<Self> {
        if rest.contains(['?', '#']) {
            return Err(invalid_url(url, "query and fragment are not allowed"));
        }
        let (authority, path) = rest
            .split_once('/')
            .ok_or_else(|| invalid_url(url, "missing service and method"))?;
        if authority.is_empty() {
            return Err(invalid_url(url, "missing host"));
        }

        let path = path.strip_suffix('/').unwrap_or(path);
        let segments: Vec<&str> = path.split('/').collect();
        match segments.as_slice() {
            [service, method] if !service.is_empty() && !method.is_empty() => {
                Ok(Self::new(*service, *method))
            }
            [_, _] => Err(invalid_url(url, "service and method must not be empty")),
            other => Err(invalid_url(
                url,
                format!("expected 2 path segments, found {}", other.len()),
            )),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.method)
    }
}

/// Parse a configured method URL, enforcing `scheme` when one is configured.
pub(crate) fn parse_method_url(url: &str, scheme: Option<&str>) -> Result<MethodRef> {
    match scheme {
        Some(scheme) => MethodRef::parse_with_scheme(url, scheme),
        None => MethodRef::parse(url),
    }
}

fn invalid_url(url: &str, reason: impl Into<String>) -> MapError {
    MapError::InvalidUrl {
        url: url.to_string(),
        reason: reason.into(),
    }
}

/// What a mapper was configured to target.
#[derive(Clone, Debug, Default)]
pub struct TypeQuery {
    pub type_name: Option<String>,
    pub method: Option<MethodRef>,
    pub role: Role,
    /// Fail unless an explicit mapping was supplied.
    pub mapping_required: bool,
    pub mapping_supplied: bool,
}

impl TypeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn method(mut self, method: MethodRef) -> Self {
        self.method = Some(method);
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn mapping(mut self, required: bool, supplied: bool) -> Self {
        self.mapping_required = required;
        self.mapping_supplied = supplied;
        self
    }
}

/// Resolves a [`TypeQuery`] against a registry.
pub struct TypeLocator<'r, R> {
    registry: &'r R,
}

impl<'r, R: TypeRegistry> TypeLocator<'r, R> {
    pub fn new(registry: &'r R) -> Self {
        Self { registry }
    }

    /// Resolve the message type a mapper should target.
    pub fn locate(&self, query: &TypeQuery) -> Result<R::Type> {
        if query.mapping_required && !query.mapping_supplied {
            return Err(MapError::MissingConfiguration(
                "an explicit mapping is required for this mapper but none was supplied".into(),
            ));
        }

        match (&query.method, &query.type_name) {
            (Some(method), provided) => {
                let selected = self
                    .registry
                    .method_types(&method.service, &method.method)?
                    .for_role(query.role);

                if let Some(provided) = provided {
                    let provided = provided.strip_prefix('.').unwrap_or(provided);
                    if provided != selected.full_name() {
                        return Err(MapError::type_mismatch(
                            format!("{} of {}", query.role, method),
                            selected.full_name(),
                            provided,
                        ));
                    }
                }

                tracing::debug!(
                    "[LOC] {} of {} resolved to {}",
                    query.role,
                    method,
                    selected.full_name()
                );
                Ok(selected)
            }
            (None, Some(name)) => {
                let ty = self
                    .registry
                    .lookup(name)
                    .ok_or_else(|| MapError::UnknownType {
                        name: name.clone(),
                        available: self.registry.type_names(),
                    })?;
                tracing::debug!("[LOC] type {} resolved", ty.full_name());
                Ok(ty)
            }
            (None, None) => Err(MapError::MissingConfiguration(
                "either a message type name or a method url must be configured".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_url() {
        let method = MethodRef::parse("grpc://localhost:8888/sample.MyService/process").unwrap();
        assert_eq!(method.service, "sample.MyService");
        assert_eq!(method.method, "process");
        assert_eq!(method.to_string(), "sample.MyService/process");

        let method = MethodRef::parse("grpc://localhost:8888/sample.MyService/process/").unwrap();
        assert_eq!(method.method, "process");
    }

    #[test]
    fn test_parse_rejects_bad_urls() {
        for url in [
            "localhost:8888/sample.MyService/process",
            "grpc://localhost:8888",
            "grpc://localhost:8888/sample.MyService",
            "grpc://localhost:8888/a/b/c",
            "grpc://localhost:8888//process",
            "grpc:///sample.MyService/process",
            "grpc://localhost:8888/sample.MyService/process?x=1",
        ] {
            let err = MethodRef::parse(url).unwrap_err();
            assert!(
                matches!(err, MapError::InvalidUrl { .. }),
                "{url} should be rejected"
            );
            assert!(err.to_string().contains("<serviceName>/<methodName>"));
        }
    }

    #[test]
    fn test_parse_with_scheme() {
        assert!(MethodRef::parse_with_scheme("GRPC://h:1/s/m", "grpc").is_ok());
        let err = MethodRef::parse_with_scheme("http://h:1/s/m", "grpc").unwrap_err();
        assert!(err.to_string().contains("scheme must be 'grpc'"));
    }

    #[test]
    fn test_configured_scheme_is_optional() {
        assert!(parse_method_url("http://h:1/s/m", None).is_ok());
        assert!(parse_method_url("http://h:1/s/m", Some("grpc")).is_err());
        assert_eq!(
            parse_method_url("grpc://h:1/s/m", Some("grpc")).unwrap(),
            MethodRef::new("s", "m")
        );
    }
}
