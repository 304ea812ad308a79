//! Errors raised while handling a request
//!
//! [`HandlerError`] is the closed set of shapes the classifier understands. Handlers return
//! it (usually through `?` on one of the wrapped types) and the adapter hands it to the
//! classifier together with request and handler information.

use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;
use problems::Failure;

use crate::binding::{BindingFailure, BindingKind};
use crate::body::UnreadableBody;
use crate::class::{ErrorClass, classes, failure_class};

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    /// The request body could not be read or parsed.
    #[error(transparent)]
    Unreadable(#[from] UnreadableBody),
    /// Request data failed binding or validation.
    #[error(transparent)]
    Binding(#[from] BindingFailure),
    /// The handler asked for a specific status.
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error(transparent)]
    Failure(#[from] Failure),
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),
    /// Raised by the web framework itself (routing, content negotiation, extraction).
    #[error(transparent)]
    Standard(#[from] StandardError),
    #[error(transparent)]
    Other(#[from] OtherError),
}

impl HandlerError {
    /// Class rules are matched against.
    #[must_use]
    pub fn class(&self) -> &'static ErrorClass {
        match self {
            Self::Unreadable(_) => &classes::MESSAGE_NOT_READABLE,
            Self::Binding(failure) => match failure.kind() {
                BindingKind::Bind => &classes::BIND_ERROR,
                BindingKind::MethodArgument => &classes::METHOD_ARGUMENT_NOT_VALID,
            },
            Self::Status(_) => &classes::RESPONSE_STATUS,
            Self::Failure(failure) => failure_class(failure.kind()),
            Self::AccessDenied(_) => &classes::ACCESS_DENIED,
            Self::Standard(error) => error.kind().class(),
            Self::Other(error) => error.class(),
        }
    }

    /// Message used as problem reason when no better one is available.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Failure(failure) => failure.message().map(ToOwned::to_owned),
            Self::Other(error) => error.message().map(ToOwned::to_owned),
            other => Some(other.to_string()),
        }
    }

    /// Wraps any error as an unclassified one.
    #[must_use]
    pub fn unclassified<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Other(OtherError::unclassified(error))
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(error: anyhow::Error) -> Self {
        Self::Other(OtherError::from(error))
    }
}

/// An error that declares the HTTP status it should produce.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{status}{}", quoted_reason(.reason.as_deref()))]
pub struct StatusError {
    status: StatusCode,
    reason: Option<String>,
}

impl StatusError {
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

fn quoted_reason(reason: Option<&str>) -> String {
    reason.map_or_else(String::new, |reason| format!(" \"{reason}\""))
}

/// The caller is not allowed to perform the operation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AccessDenied {
    message: String,
}

impl AccessDenied {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Well-known errors raised by the web framework rather than by handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardErrorKind {
    MethodNotSupported,
    MediaTypeNotSupported,
    MediaTypeNotAcceptable,
    MissingPathVariable,
    MissingRequestParameter,
    RequestBinding,
    TypeMismatch,
    ConversionNotSupported,
    MessageNotWritable,
    MissingRequestPart,
    NoHandlerFound,
    AsyncRequestTimeout,
    HandlerPanicked,
}

impl StandardErrorKind {
    pub const ALL: [Self; 13] = [
        Self::MethodNotSupported,
        Self::MediaTypeNotSupported,
        Self::MediaTypeNotAcceptable,
        Self::MissingPathVariable,
        Self::MissingRequestParameter,
        Self::RequestBinding,
        Self::TypeMismatch,
        Self::ConversionNotSupported,
        Self::MessageNotWritable,
        Self::MissingRequestPart,
        Self::NoHandlerFound,
        Self::AsyncRequestTimeout,
        Self::HandlerPanicked,
    ];

    #[must_use]
    pub fn class(self) -> &'static ErrorClass {
        match self {
            Self::MethodNotSupported => &classes::METHOD_NOT_SUPPORTED,
            Self::MediaTypeNotSupported => &classes::MEDIA_TYPE_NOT_SUPPORTED,
            Self::MediaTypeNotAcceptable => &classes::MEDIA_TYPE_NOT_ACCEPTABLE,
            Self::MissingPathVariable => &classes::MISSING_PATH_VARIABLE,
            Self::MissingRequestParameter => &classes::MISSING_REQUEST_PARAMETER,
            Self::RequestBinding => &classes::REQUEST_BINDING,
            Self::TypeMismatch => &classes::TYPE_MISMATCH,
            Self::ConversionNotSupported => &classes::CONVERSION_NOT_SUPPORTED,
            Self::MessageNotWritable => &classes::MESSAGE_NOT_WRITABLE,
            Self::MissingRequestPart => &classes::MISSING_REQUEST_PART,
            Self::NoHandlerFound => &classes::NO_HANDLER_FOUND,
            Self::AsyncRequestTimeout => &classes::ASYNC_REQUEST_TIMEOUT,
            Self::HandlerPanicked => &classes::HANDLER_PANICKED,
        }
    }

    /// Kind behind a bare error status produced by an extractor or handler.
    ///
    /// Only statuses that identify a framework error are mapped.
    #[must_use]
    pub fn for_status(status: StatusCode) -> Option<Self> {
        match status {
            StatusCode::BAD_REQUEST => Some(Self::RequestBinding),
            StatusCode::METHOD_NOT_ALLOWED => Some(Self::MethodNotSupported),
            StatusCode::NOT_ACCEPTABLE => Some(Self::MediaTypeNotAcceptable),
            StatusCode::UNSUPPORTED_MEDIA_TYPE => Some(Self::MediaTypeNotSupported),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StandardError {
    kind: StandardErrorKind,
    message: String,
}

impl StandardError {
    #[must_use]
    pub fn new(kind: StandardErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> StandardErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Any other error, tagged with a class so rules can match it.
#[derive(Debug)]
pub struct OtherError {
    class: &'static ErrorClass,
    message: Option<String>,
    source: Option<BoxError>,
}

impl OtherError {
    #[must_use]
    pub fn new(class: &'static ErrorClass) -> Self {
        Self {
            class,
            message: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Unclassified error whose message is the wrapped error's message.
    #[must_use]
    pub fn unclassified<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::new(&classes::UNCLASSIFIED)
            .with_message(error.to_string())
            .with_source(error)
    }

    #[must_use]
    pub fn class(&self) -> &'static ErrorClass {
        self.class
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl From<anyhow::Error> for OtherError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(&classes::UNCLASSIFIED)
            .with_message(error.to_string())
            .with_source(error)
    }
}

impl fmt::Display for OtherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.class),
            None => write!(f, "{}", self.class),
        }
    }
}

impl StdError for OtherError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}
