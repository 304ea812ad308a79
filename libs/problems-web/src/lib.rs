//! Error translation for axum services
//!
//! Turns any error raised while handling a request into an HTTP status plus an ordered
//! list of [`Problem`] records, rendered as a bare JSON array:
//!
//! ```text
//! [
//!   {"type": "OBJECT_ERROR", "context": null, "reason": "a global error", "details": null},
//!   {"type": "FIELD_ERROR", "context": "email", "reason": "a field validation error", "details": null}
//! ]
//! ```
//!
//! The decision procedure lives in [`classify`]; handler-level and class-level rules are
//! plain tables ([`HandlerMappings`], [`DeclaredStatuses`]) built at startup, either in code
//! or from a [`ResolverConfig`]. The [`adapter`] module wires everything into an axum router.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapter;
pub mod binding;
pub mod body;
pub mod class;
pub mod classify;
pub mod config;
pub mod error;
pub mod fallback;
pub mod mapping;
pub mod resolver;

pub use problems::{Failure, FailureError, FailureKind, Problem, ProblemError, ProblemType};

pub use adapter::{
    JsonBody, PROBLEMS_CONTENT_TYPE, PathParam, ProblemsRouterExt, RaisedError, ValidatedJson,
    ValidatedQuery,
};
pub use binding::{BindingFailure, BindingKind, BindingResult, FieldError, ObjectError};
pub use body::{BodyCause, CauseKind, PathSegment, UnreadableBody};
pub use class::{ErrorClass, ErrorClassRegistry, classes};
pub use classify::{Classification, RequestInfo, classify};
pub use config::{ConfigError, ResolverConfig};
pub use error::{
    AccessDenied, HandlerError, OtherError, StandardError, StandardErrorKind, StatusError,
};
pub use mapping::{
    DeclaredStatus, DeclaredStatuses, ExceptionMapping, HandlerKey, HandlerMappings,
    HandlerMetadata,
};
pub use resolver::ExceptionResolver;
