//! `axum` integration
//!
//! Handlers return `Result<_, HandlerError>`. The error travels up as a placeholder 500
//! response carrying a [`RaisedError`] extension; the [`resolve_problems`] middleware,
//! installed by [`ProblemsRouterExt::with_problems`], classifies it and renders the
//! problem list. Error statuses produced by axum's own extractors are classified as well;
//! [`PathParam`], [`JsonBody`], [`ValidatedJson`] and [`ValidatedQuery`] keep more detail.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use axum::{Router, routing::get};
//! use problems::{Failure, Problem, ProblemType};
//! use problems_web::{ExceptionResolver, HandlerError, ProblemsRouterExt};
//!
//! async fn find_user() -> Result<String, HandlerError> {
//!     Err(Failure::not_found(
//!         Problem::new(ProblemType::from_static("USER_NOT_FOUND")).with_reason("no such user"),
//!     )
//!     .into())
//! }
//!
//! let app: Router = Router::new()
//!     .route("/users/{id}", get(find_user))
//!     .with_problems(Arc::new(ExceptionResolver::new()));
//! ```

mod extract;
mod layer;
mod response;

pub use extract::{JsonBody, PathParam, ValidatedJson, ValidatedQuery};
pub use layer::{ProblemsRouterExt, record_handler, resolve_problems};
pub use response::{PROBLEMS_CONTENT_TYPE, RaisedError};
