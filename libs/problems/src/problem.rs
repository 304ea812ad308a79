//! Problem records (pure data model, no HTTP framework dependencies)

use std::borrow::Cow;
use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProblemError {
    #[error("problem type must not be empty")]
    EmptyType,
}

/// Short machine-readable category code of a problem, e.g. `FIELD_ERROR`.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProblemType(Cow<'static, str>);

// Status constants whose names are not derived from the reason phrase.
const STATUS_NAME_OVERRIDES: &[(u16, &str)] = &[
    (416, "REQUESTED_RANGE_NOT_SATISFIABLE"),
    (418, "I_AM_A_TEAPOT"),
];

impl ProblemType {
    pub const GENERIC_PROBLEM: Self = Self::from_static("GENERIC_PROBLEM");
    pub const UNRECOGNIZED_PROPERTY: Self = Self::from_static("UNRECOGNIZED_PROPERTY");
    pub const INVALID_FORMAT: Self = Self::from_static("INVALID_FORMAT");
    pub const MESSAGE_NOT_READABLE: Self = Self::from_static("MESSAGE_NOT_READABLE");
    pub const OBJECT_ERROR: Self = Self::from_static("OBJECT_ERROR");
    pub const FIELD_ERROR: Self = Self::from_static("FIELD_ERROR");
    pub const FORBIDDEN: Self = Self::from_static("FORBIDDEN");
    pub const INTERNAL_ERROR: Self = Self::from_static("INTERNAL_ERROR");
    pub const UNEXPECTED_PROBLEM: Self = Self::from_static("UNEXPECTED_PROBLEM");

    /// Builds a problem type from a static code.
    ///
    /// # Panics
    /// Panics if `code` is empty; when used in a `const` this fails the build instead.
    #[must_use]
    pub const fn from_static(code: &'static str) -> Self {
        assert!(!code.is_empty(), "problem type must not be empty");
        Self(Cow::Borrowed(code))
    }

    /// Builds a problem type from a runtime code.
    ///
    /// # Errors
    /// Returns `ProblemError::EmptyType` if `code` is empty.
    pub fn new(code: impl Into<String>) -> Result<Self, ProblemError> {
        let code = code.into();
        if code.is_empty() {
            return Err(ProblemError::EmptyType);
        }
        Ok(Self(Cow::Owned(code)))
    }

    /// Constant-style name of an HTTP status, e.g. `NOT_FOUND` for 404.
    ///
    /// Names follow the conventional status constants where they differ from the reason
    /// phrase (`I_AM_A_TEAPOT` for 418). Statuses without a canonical reason phrase become
    /// `STATUS_<code>`.
    #[must_use]
    pub fn for_status(status: StatusCode) -> Self {
        if let Some((_, name)) = STATUS_NAME_OVERRIDES
            .iter()
            .find(|(code, _)| *code == status.as_u16())
        {
            return Self::from_static(name);
        }
        let name: String = status
            .canonical_reason()
            .map(|phrase| {
                phrase
                    .chars()
                    .filter_map(|c| match c {
                        ' ' | '-' => Some('_'),
                        c if c.is_ascii_alphanumeric() => Some(c.to_ascii_uppercase()),
                        _ => None,
                    })
                    .collect()
            })
            .filter(|name: &String| !name.is_empty())
            .unwrap_or_else(|| format!("STATUS_{}", status.as_u16()));
        Self(Cow::Owned(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProblemType {
    type Error = ProblemError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::new(code)
    }
}

impl From<ProblemType> for String {
    fn from(value: ProblemType) -> Self {
        value.0.into_owned()
    }
}

/// One discrete issue reported in an error response body.
///
/// Serialized form:
/// `{"type": "FIELD_ERROR", "context": "email", "reason": "must be an email", "details": null}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct Problem {
    /// Machine-readable category code.
    #[serde(rename = "type")]
    problem_type: ProblemType,
    /// Where the problem occurred (field name, property path); absent for global problems.
    context: Option<String>,
    /// Human-readable explanation.
    reason: Option<String>,
    /// Free-form diagnostic metadata.
    details: Option<Map<String, Value>>,
}

impl Problem {
    pub fn new(problem_type: ProblemType) -> Self {
        Self {
            problem_type,
            context: None,
            reason: None,
            details: None,
        }
    }

    /// Builds a problem with every field given at once.
    pub fn of(
        problem_type: ProblemType,
        context: Option<String>,
        reason: Option<String>,
        details: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            problem_type,
            context,
            reason,
            details,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = Some(details);
        self
    }

    /// Adds a single entry to the details map, creating it if needed.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn problem_type(&self) -> &ProblemType {
        &self.problem_type
    }

    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    #[must_use]
    pub fn details(&self) -> Option<&Map<String, Value>> {
        self.details.as_ref()
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.problem_type)?;
        if let Some(context) = &self.context {
            write!(f, " at '{context}'")?;
        }
        if let Some(reason) = &self.reason {
            write!(f, ": {reason}")?;
        }
        Ok(())
    }
}
