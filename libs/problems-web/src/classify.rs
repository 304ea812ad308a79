//! Turns a handler error into a status and an ordered list of problems
//!
//! Rules are tried top to bottom and the first one that applies decides the outcome, so an
//! error fitting several categories (say a not-found failure that a handler also maps) is
//! resolved by the earliest rule. Classification never fails: anything no rule recognizes
//! becomes a 500 `UNEXPECTED_PROBLEM`.

use http::{Method, StatusCode, Uri};
use problems::{Problem, ProblemType};
use tracing::{debug, error, warn};

use crate::body::{BodyCause, CauseKind, UnreadableBody, dotted_path};
use crate::error::HandlerError;
use crate::fallback::framework_default_status;
use crate::mapping::{DeclaredStatuses, HandlerMetadata};

/// What the classifier needs to know about the failed request.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    method: Method,
    uri: Uri,
    uncaught: bool,
}

impl RequestInfo {
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            uncaught: false,
        }
    }

    /// Flags the error as having escaped the handler (e.g. a panic) rather than being returned.
    #[must_use]
    pub fn with_uncaught(mut self, uncaught: bool) -> Self {
        self.uncaught = uncaught;
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[must_use]
    pub fn is_uncaught(&self) -> bool {
        self.uncaught
    }
}

/// Outcome of classification: response status plus the problems to render.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Classification {
    pub status: StatusCode,
    pub problems: Vec<Problem>,
}

impl Classification {
    pub fn new(status: StatusCode, problems: Vec<Problem>) -> Self {
        Self { status, problems }
    }

    fn single(status: StatusCode, problem: Problem) -> Self {
        Self::new(status, vec![problem])
    }
}

struct Inputs<'a> {
    request: &'a RequestInfo,
    handler: Option<&'a HandlerMetadata>,
    declared: &'a DeclaredStatuses,
    error: &'a HandlerError,
}

type Rule = fn(&Inputs<'_>) -> Option<Classification>;

const RULES: &[(&str, Rule)] = &[
    ("unreadable_body", unreadable_body),
    ("binding_failure", binding_failure),
    ("explicit_status", explicit_status),
    ("handler_mapping", handler_mapping),
    ("declared_status", declared_status),
    ("bare_failure", bare_failure),
    ("access_denied", access_denied),
    ("framework_default", framework_default),
];

/// Classifies `error` raised while handling `request`.
///
/// `handler` carries the mapping rules declared for the handler that raised the error, if
/// any; `declared` holds the class-level status declarations.
pub fn classify(
    request: &RequestInfo,
    handler: Option<&HandlerMetadata>,
    declared: &DeclaredStatuses,
    error: &HandlerError,
) -> Classification {
    let inputs = Inputs {
        request,
        handler,
        declared,
        error,
    };
    for (rule, apply) in RULES {
        if let Some(classification) = apply(&inputs) {
            tracing::trace!(
                rule,
                status = %classification.status,
                problems = classification.problems.len(),
                "handler error classified"
            );
            return classification;
        }
    }
    unexpected(&inputs)
}

fn unreadable_body(inputs: &Inputs<'_>) -> Option<Classification> {
    let HandlerError::Unreadable(body) = inputs.error else {
        return None;
    };
    debug!(uri = %inputs.request.uri, error = %body, "request body not readable");

    let problem = match body.nearest_known_cause() {
        Some(cause) => match cause.kind() {
            CauseKind::UnrecognizedProperty {
                property,
                known,
                referring_type,
            } => Problem::new(ProblemType::UNRECOGNIZED_PROPERTY)
                .with_context(property.clone())
                .with_reason("unrecognized field")
                .with_detail("known", known.clone())
                .with_detail("in", referring_type.clone()),
            CauseKind::InvalidFormat { path } | CauseKind::Mapping { path } => Problem::of(
                ProblemType::INVALID_FORMAT,
                Some(dotted_path(path)),
                Some(cause.message().to_owned()),
                None,
            ),
            CauseKind::Syntax | CauseKind::Io | CauseKind::Other => not_readable(body),
        },
        None => not_readable(body),
    };
    Some(Classification::single(StatusCode::BAD_REQUEST, problem))
}

fn not_readable(body: &UnreadableBody) -> Problem {
    let reason = body.cause().map_or(body.message(), BodyCause::message);
    Problem::new(ProblemType::MESSAGE_NOT_READABLE).with_reason(reason)
}

fn binding_failure(inputs: &Inputs<'_>) -> Option<Classification> {
    let HandlerError::Binding(failure) = inputs.error else {
        return None;
    };
    debug!(uri = %inputs.request.uri, error = %failure, "request data failed validation");

    let result = failure.result();
    let global = result.global_errors().iter().map(|error| {
        Problem::of(
            ProblemType::OBJECT_ERROR,
            None,
            error.message().map(ToOwned::to_owned),
            None,
        )
    });
    let fields = result.field_errors().iter().map(|error| {
        Problem::of(
            ProblemType::FIELD_ERROR,
            Some(error.field().to_owned()),
            error.message().map(ToOwned::to_owned),
            None,
        )
    });
    Some(Classification::new(
        StatusCode::BAD_REQUEST,
        global.chain(fields).collect(),
    ))
}

fn explicit_status(inputs: &Inputs<'_>) -> Option<Classification> {
    let HandlerError::Status(status_error) = inputs.error else {
        return None;
    };
    debug!(uri = %inputs.request.uri, error = %status_error, "handler requested explicit status");

    let problem = Problem::of(
        ProblemType::for_status(status_error.status()),
        None,
        status_error.reason().map(ToOwned::to_owned),
        None,
    );
    Some(Classification::single(status_error.status(), problem))
}

fn handler_mapping(inputs: &Inputs<'_>) -> Option<Classification> {
    let mapping = inputs.handler?.find(inputs.error.class())?;
    debug!(
        uri = %inputs.request.uri,
        class = %inputs.error.class(),
        mapped = %mapping.exception(),
        status = %mapping.status(),
        "handler mapping matched"
    );

    let problems = match inputs.error {
        HandlerError::Failure(failure) => failure.problems().to_vec(),
        other => vec![mapping.problem_for(other.message())],
    };
    Some(Classification::new(mapping.status(), problems))
}

fn declared_status(inputs: &Inputs<'_>) -> Option<Classification> {
    let declared = inputs.declared.find(inputs.error.class())?;
    debug!(
        uri = %inputs.request.uri,
        class = %inputs.error.class(),
        status = %declared.status(),
        "declared status applied"
    );

    let problems = match inputs.error {
        HandlerError::Failure(failure) => failure.problems().to_vec(),
        other => {
            let reason = declared
                .reason()
                .map(ToOwned::to_owned)
                .or_else(|| other.message());
            vec![Problem::of(ProblemType::GENERIC_PROBLEM, None, reason, None)]
        }
    };
    Some(Classification::new(declared.status(), problems))
}

fn bare_failure(inputs: &Inputs<'_>) -> Option<Classification> {
    let HandlerError::Failure(failure) = inputs.error else {
        return None;
    };
    debug!(uri = %inputs.request.uri, error = %failure, "failure without declared status");

    Some(Classification::new(
        StatusCode::BAD_REQUEST,
        failure.problems().to_vec(),
    ))
}

fn access_denied(inputs: &Inputs<'_>) -> Option<Classification> {
    let HandlerError::AccessDenied(denied) = inputs.error else {
        return None;
    };
    debug!(uri = %inputs.request.uri, error = %denied, "access denied");

    let problem = Problem::new(ProblemType::FORBIDDEN).with_reason(denied.message());
    Some(Classification::single(StatusCode::FORBIDDEN, problem))
}

fn framework_default(inputs: &Inputs<'_>) -> Option<Classification> {
    let status = framework_default_status(inputs.error)?;
    warn!(
        method = %inputs.request.method,
        uri = %inputs.request.uri,
        status = %status,
        error = %inputs.error,
        "request failed with framework error"
    );
    if inputs.request.uncaught {
        warn!(
            uri = %inputs.request.uri,
            "uncaught error escaped the request handler"
        );
    }

    let problem = Problem::of(
        ProblemType::INTERNAL_ERROR,
        None,
        inputs.error.message(),
        None,
    );
    Some(Classification::single(status, problem))
}

fn unexpected(inputs: &Inputs<'_>) -> Classification {
    error!(
        method = %inputs.request.method,
        uri = %inputs.request.uri,
        class = %inputs.error.class(),
        error = %inputs.error,
        "unexpected error while handling request"
    );

    let problem = Problem::of(
        ProblemType::UNEXPECTED_PROBLEM,
        None,
        inputs.error.message(),
        None,
    );
    Classification::single(StatusCode::INTERNAL_SERVER_ERROR, problem)
}
