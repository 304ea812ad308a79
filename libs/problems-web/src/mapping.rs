//! Rule tables: handler-level exception mappings and class-level declared statuses
//!
//! Both tables are built once at startup and only read afterwards.

use std::collections::HashMap;
use std::fmt;

use http::{Method, StatusCode};
use problems::{FailureKind, Problem, ProblemType};

use crate::class::{ErrorClass, failure_class};

/// Status a mapping uses unless told otherwise.
pub const DEFAULT_MAPPING_STATUS: StatusCode = StatusCode::BAD_REQUEST;

/// Maps errors of one class, raised by one handler, to a status and default problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionMapping {
    exception: &'static ErrorClass,
    status: StatusCode,
    problem_type: ProblemType,
    context: Option<String>,
}

impl ExceptionMapping {
    /// Mapping with status 400, type `GENERIC_PROBLEM` and no context.
    #[must_use]
    pub fn new(exception: &'static ErrorClass) -> Self {
        Self {
            exception,
            status: DEFAULT_MAPPING_STATUS,
            problem_type: ProblemType::GENERIC_PROBLEM,
            context: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_type(mut self, problem_type: ProblemType) -> Self {
        self.problem_type = problem_type;
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[must_use]
    pub fn exception(&self) -> &'static ErrorClass {
        self.exception
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn problem_type(&self) -> &ProblemType {
        &self.problem_type
    }

    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// `true` if errors of `class` fall under this mapping.
    #[must_use]
    pub fn matches(&self, class: &ErrorClass) -> bool {
        self.exception.is_assignable_from(class)
    }

    /// Problem reported for a matched error that carries no problems of its own.
    pub fn problem_for(&self, reason: Option<String>) -> Problem {
        Problem::of(self.problem_type.clone(), self.context.clone(), reason, None)
    }
}

/// Identifies a handler: HTTP method plus route pattern, e.g. `POST /users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerKey {
    method: Method,
    path: String,
}

impl HandlerKey {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Mapping rules declared for one handler, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerMetadata {
    mappings: Vec<ExceptionMapping>,
}

impl HandlerMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_mapping(mut self, mapping: ExceptionMapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    pub fn push(&mut self, mapping: ExceptionMapping) {
        self.mappings.push(mapping);
    }

    #[must_use]
    pub fn mappings(&self) -> &[ExceptionMapping] {
        &self.mappings
    }

    /// First mapping matching `class`.
    #[must_use]
    pub fn find(&self, class: &ErrorClass) -> Option<&ExceptionMapping> {
        self.mappings.iter().find(|mapping| mapping.matches(class))
    }
}

impl FromIterator<ExceptionMapping> for HandlerMetadata {
    fn from_iter<I: IntoIterator<Item = ExceptionMapping>>(iter: I) -> Self {
        Self {
            mappings: iter.into_iter().collect(),
        }
    }
}

/// Handler key → declared mappings.
#[derive(Debug, Clone, Default)]
pub struct HandlerMappings {
    by_handler: HashMap<HandlerKey, HandlerMetadata>,
}

impl HandlerMappings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a mapping to the handler's rules.
    pub fn declare(&mut self, key: HandlerKey, mapping: ExceptionMapping) {
        self.by_handler.entry(key).or_default().push(mapping);
    }

    /// Appends every mapping of `metadata` to the handler's rules.
    pub fn declare_all(&mut self, key: HandlerKey, metadata: HandlerMetadata) {
        let entry = self.by_handler.entry(key).or_default();
        for mapping in metadata.mappings {
            entry.push(mapping);
        }
    }

    #[must_use]
    pub fn get(&self, key: &HandlerKey) -> Option<&HandlerMetadata> {
        self.by_handler.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_handler.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_handler.is_empty()
    }
}

/// Status (and optional fixed reason) declared for a whole error class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredStatus {
    status: StatusCode,
    reason: Option<String>,
}

impl DeclaredStatus {
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: None,
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// Error class name → declared status.
///
/// Lookups walk the class's ancestors, so a declaration covers every class extending the
/// declared one unless a nearer declaration exists.
#[derive(Debug, Clone)]
pub struct DeclaredStatuses {
    by_class: HashMap<&'static str, DeclaredStatus>,
}

impl Default for DeclaredStatuses {
    fn default() -> Self {
        Self::with_failure_kinds()
    }
}

impl DeclaredStatuses {
    /// Table without any declaration.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_class: HashMap::new(),
        }
    }

    /// Table declaring the fixed status of every failure kind that has one.
    #[must_use]
    pub fn with_failure_kinds() -> Self {
        let mut table = Self::empty();
        for kind in FailureKind::ALL {
            if let Some(status) = kind.status() {
                table.declare(failure_class(kind), DeclaredStatus::new(status));
            }
        }
        table
    }

    /// Declares (or replaces) the status of `class`.
    pub fn declare(&mut self, class: &'static ErrorClass, declared: DeclaredStatus) {
        self.by_class.insert(class.name(), declared);
    }

    #[must_use]
    pub fn find(&self, class: &ErrorClass) -> Option<&DeclaredStatus> {
        class
            .ancestors()
            .find_map(|ancestor| self.by_class.get(ancestor.name()))
    }
}
