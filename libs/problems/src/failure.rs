//! Classified application failures carrying one or more problems

use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;

use crate::problem::Problem;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureError {
    #[error("a failure must carry at least one problem")]
    NoProblems,
}

/// Named failure kinds, each bound to a fixed HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Plain failure with no status of its own.
    Generic,
    BadRequest,
    Forbidden,
    ResourceNotFound,
    /// The upstream service answered with an error.
    RemoteFailure,
    /// The upstream service could not be reached.
    CannotConnect,
}

impl FailureKind {
    pub const ALL: [Self; 6] = [
        Self::Generic,
        Self::BadRequest,
        Self::Forbidden,
        Self::ResourceNotFound,
        Self::RemoteFailure,
        Self::CannotConnect,
    ];

    /// Status bound to this kind; `None` for a generic failure.
    #[must_use]
    pub const fn status(self) -> Option<StatusCode> {
        match self {
            Self::Generic => None,
            Self::BadRequest => Some(StatusCode::BAD_REQUEST),
            Self::Forbidden => Some(StatusCode::FORBIDDEN),
            Self::ResourceNotFound => Some(StatusCode::NOT_FOUND),
            Self::RemoteFailure => Some(StatusCode::BAD_GATEWAY),
            Self::CannotConnect => Some(StatusCode::GATEWAY_TIMEOUT),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Generic => "Failure",
            Self::BadRequest => "BadRequest",
            Self::Forbidden => "Forbidden",
            Self::ResourceNotFound => "ResourceNotFound",
            Self::RemoteFailure => "RemoteFailure",
            Self::CannotConnect => "CannotConnect",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An application error carrying a non-empty, ordered list of problems.
///
/// The optional source is kept for diagnostics only and never reaches the client.
#[derive(Debug)]
pub struct Failure {
    kind: FailureKind,
    problems: Vec<Problem>,
    reason: Option<String>,
    source: Option<BoxError>,
}

impl Failure {
    #[must_use]
    pub fn new(kind: FailureKind, problem: Problem) -> Self {
        Self {
            kind,
            problems: vec![problem],
            reason: None,
            source: None,
        }
    }

    /// Builds a failure from a list of problems, keeping their order.
    ///
    /// # Errors
    /// Returns `FailureError::NoProblems` if `problems` is empty.
    pub fn from_problems(
        kind: FailureKind,
        problems: impl IntoIterator<Item = Problem>,
    ) -> Result<Self, FailureError> {
        let problems: Vec<Problem> = problems.into_iter().collect();
        if problems.is_empty() {
            return Err(FailureError::NoProblems);
        }
        Ok(Self {
            kind,
            problems,
            reason: None,
            source: None,
        })
    }

    #[must_use]
    pub fn generic(problem: Problem) -> Self {
        Self::new(FailureKind::Generic, problem)
    }

    #[must_use]
    pub fn bad_request(problem: Problem) -> Self {
        Self::new(FailureKind::BadRequest, problem)
    }

    #[must_use]
    pub fn forbidden(problem: Problem) -> Self {
        Self::new(FailureKind::Forbidden, problem)
    }

    #[must_use]
    pub fn not_found(problem: Problem) -> Self {
        Self::new(FailureKind::ResourceNotFound, problem)
    }

    #[must_use]
    pub fn remote_failure(problem: Problem) -> Self {
        Self::new(FailureKind::RemoteFailure, problem)
    }

    #[must_use]
    pub fn cannot_connect(problem: Problem) -> Self {
        Self::new(FailureKind::CannotConnect, problem)
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Problems in insertion order; never empty.
    #[must_use]
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// The reason if given, otherwise the first problem's reason.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.reason
            .as_deref()
            .or_else(|| self.problems.first().and_then(Problem::reason))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{}: {message}", self.kind),
            None => write!(f, "{} ({} problem(s))", self.kind, self.problems.len()),
        }
    }
}

impl StdError for Failure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}
