//! Core error types for JSON problem responses
//!
//! This crate provides pure data types, with no dependencies on HTTP frameworks:
//! - `Problem`: one discrete issue reported to the client
//! - `Failure`: an application error carrying one or more problems
//!
//! Deciding which status and problems a raised error turns into lives in `problems-web`.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod failure;
pub mod problem;

pub use failure::{Failure, FailureError, FailureKind};
pub use problem::{Problem, ProblemError, ProblemType};
