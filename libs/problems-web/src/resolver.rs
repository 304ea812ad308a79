//! Startup-built rule tables and the per-request entry point
//!
//! [`ExceptionResolver`] owns the handler mappings and class-level declared statuses. It is
//! built from code, from a [`ResolverConfig`], or both, then shared behind an `Arc`.

use http::{Method, StatusCode};
use problems::ProblemType;

use crate::class::{ErrorClass, ErrorClassRegistry};
use crate::classify::{Classification, RequestInfo, classify};
use crate::config::{ConfigError, ResolverConfig};
use crate::error::HandlerError;
use crate::mapping::{
    DeclaredStatus, DeclaredStatuses, ExceptionMapping, HandlerKey, HandlerMappings,
    HandlerMetadata,
};

/// Immutable rule tables plus the classifier entry point.
///
/// Built once at startup (in code, from [`ResolverConfig`], or both) and shared between
/// requests.
#[derive(Debug, Clone, Default)]
pub struct ExceptionResolver {
    handlers: HandlerMappings,
    declared: DeclaredStatuses,
}

impl ExceptionResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the mappings of `metadata` to the rules of the handler at `key`.
    #[must_use]
    pub fn with_handler(mut self, key: HandlerKey, metadata: HandlerMetadata) -> Self {
        self.handlers.declare_all(key, metadata);
        self
    }

    /// Appends a single mapping to the rules of the handler at `key`.
    #[must_use]
    pub fn with_mapping(mut self, key: HandlerKey, mapping: ExceptionMapping) -> Self {
        self.handlers.declare(key, mapping);
        self
    }

    #[must_use]
    pub fn with_declared_status(
        mut self,
        class: &'static ErrorClass,
        declared: DeclaredStatus,
    ) -> Self {
        self.declared.declare(class, declared);
        self
    }

    /// Builds a resolver from configuration, resolving class names through `registry`.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] describing the first invalid entry.
    pub fn from_config(
        config: &ResolverConfig,
        registry: &ErrorClassRegistry,
    ) -> Result<Self, ConfigError> {
        let mut resolver = Self::new();

        for handler in &config.handlers {
            let method = parse_method(&handler.method).ok_or_else(|| ConfigError::InvalidMethod {
                method: handler.method.clone(),
                path: handler.path.clone(),
            })?;
            let key = HandlerKey::new(method, handler.path.clone());
            for entry in &handler.mappings {
                let class = registry.resolve(&entry.exception)?;
                let status = error_status(&entry.exception, entry.status)?;
                let problem_type = ProblemType::new(entry.problem_type.clone()).map_err(|source| {
                    ConfigError::InvalidProblemType {
                        exception: entry.exception.clone(),
                        source,
                    }
                })?;
                let mut mapping = ExceptionMapping::new(class)
                    .with_status(status)
                    .with_type(problem_type);
                if let Some(context) = &entry.context {
                    mapping = mapping.with_context(context.clone());
                }
                resolver.handlers.declare(key.clone(), mapping);
            }
        }

        for entry in &config.declared_statuses {
            let class = registry.resolve(&entry.exception)?;
            let mut declared = DeclaredStatus::new(error_status(&entry.exception, entry.status)?);
            if let Some(reason) = &entry.reason {
                declared = declared.with_reason(reason.clone());
            }
            resolver.declared.declare(class, declared);
        }

        tracing::debug!(
            handlers = resolver.handlers.len(),
            declared_statuses = config.declared_statuses.len(),
            "problem mappings loaded"
        );
        Ok(resolver)
    }

    #[must_use]
    pub fn handler(&self, key: &HandlerKey) -> Option<&HandlerMetadata> {
        self.handlers.get(key)
    }

    #[must_use]
    pub fn declared_statuses(&self) -> &DeclaredStatuses {
        &self.declared
    }

    /// Classifies an error raised by the handler at `key` (if the handler is known).
    pub fn resolve(
        &self,
        request: &RequestInfo,
        key: Option<&HandlerKey>,
        error: &HandlerError,
    ) -> Classification {
        let handler = key.and_then(|key| self.handler(key));
        classify(request, handler, &self.declared, error)
    }
}

fn parse_method(method: &str) -> Option<Method> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes()).ok()
}

fn error_status(exception: &str, status: u16) -> Result<StatusCode, ConfigError> {
    StatusCode::from_u16(status)
        .ok()
        .filter(|status| status.is_client_error() || status.is_server_error())
        .ok_or_else(|| ConfigError::InvalidStatus {
            exception: exception.to_owned(),
            status,
        })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::class::classes;
    use crate::error::OtherError;
    use http::Uri;

    static USERNAME_TAKEN: ErrorClass = ErrorClass::extends("UsernameTaken", &classes::ERROR);

    fn registry() -> ErrorClassRegistry {
        let mut registry = ErrorClassRegistry::with_builtins();
        registry.register(&USERNAME_TAKEN).unwrap();
        registry
    }

    fn config(yaml: &str) -> ResolverConfig {
        ResolverConfig::from_yaml(yaml).unwrap()
    }

    #[test]
    fn resolves_handler_mapping_from_config() {
        let resolver = ExceptionResolver::from_config(
            &config(
                r"
handlers:
  - method: post
    path: /users
    mappings:
      - exception: UsernameTaken
        status: 409
        type: USERNAME_TAKEN
        context: username
",
            ),
            &registry(),
        )
        .unwrap();

        let key = HandlerKey::new(Method::POST, "/users");
        let request = RequestInfo::new(Method::POST, Uri::from_static("/users"));
        let error = OtherError::new(&USERNAME_TAKEN)
            .with_message("alice is taken")
            .into();

        let mapped = resolver.resolve(&request, Some(&key), &error);
        assert_eq!(mapped.status, StatusCode::CONFLICT);
        assert_eq!(mapped.problems[0].problem_type().as_str(), "USERNAME_TAKEN");
        assert_eq!(mapped.problems[0].context(), Some("username"));

        let unmapped = resolver.resolve(&request, None, &error);
        assert_eq!(unmapped.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn declared_status_from_config_extends_failure_kinds() {
        let resolver = ExceptionResolver::from_config(
            &config(
                r"
declared_statuses:
  - exception: UsernameTaken
    status: 409
    reason: username taken
",
            ),
            &registry(),
        )
        .unwrap();

        let declared = resolver.declared_statuses();
        assert_eq!(
            declared.find(&USERNAME_TAKEN).map(DeclaredStatus::reason),
            Some(Some("username taken"))
        );
        assert_eq!(
            declared.find(&classes::RESOURCE_NOT_FOUND).map(DeclaredStatus::status),
            Some(StatusCode::NOT_FOUND)
        );
    }

    #[test]
    fn code_and_config_mappings_accumulate() {
        let key = HandlerKey::new(Method::POST, "/users");
        let resolver = ExceptionResolver::new()
            .with_mapping(key.clone(), ExceptionMapping::new(&classes::FORBIDDEN))
            .with_handler(
                key.clone(),
                HandlerMetadata::new().with_mapping(ExceptionMapping::new(&USERNAME_TAKEN)),
            );
        assert_eq!(resolver.handler(&key).unwrap().mappings().len(), 2);
    }

    #[test]
    fn rejects_unknown_class() {
        let err = ExceptionResolver::from_config(
            &config("declared_statuses: [{exception: Nope, status: 400}]"),
            &registry(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownClass { name } if name == "Nope"));
    }

    #[test]
    fn rejects_non_error_status() {
        let err = ExceptionResolver::from_config(
            &config("declared_statuses: [{exception: UsernameTaken, status: 302}]"),
            &registry(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidStatus { status: 302, .. }));
    }

    #[test]
    fn rejects_invalid_method() {
        let err = ExceptionResolver::from_config(
            &config("handlers: [{method: 'GE T', path: /users}]"),
            &registry(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMethod { .. }));
    }

    #[test]
    fn rejects_empty_problem_type() {
        let err = ExceptionResolver::from_config(
            &config(
                "handlers: [{method: GET, path: /users, mappings: [{exception: Forbidden, type: ''}]}]",
            ),
            &registry(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProblemType { .. }));
    }
}
