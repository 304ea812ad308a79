//! Default statuses for errors raised by the web framework itself

use http::StatusCode;

use crate::error::{HandlerError, StandardErrorKind};

pub const DEFAULT_STATUSES: &[(StandardErrorKind, StatusCode)] = &[
    (StandardErrorKind::MethodNotSupported, StatusCode::METHOD_NOT_ALLOWED),
    (
        StandardErrorKind::MediaTypeNotSupported,
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
    ),
    (StandardErrorKind::MediaTypeNotAcceptable, StatusCode::NOT_ACCEPTABLE),
    (
        StandardErrorKind::MissingPathVariable,
        StatusCode::INTERNAL_SERVER_ERROR,
    ),
    (StandardErrorKind::MissingRequestParameter, StatusCode::BAD_REQUEST),
    (StandardErrorKind::RequestBinding, StatusCode::BAD_REQUEST),
    (StandardErrorKind::TypeMismatch, StatusCode::BAD_REQUEST),
    (
        StandardErrorKind::ConversionNotSupported,
        StatusCode::INTERNAL_SERVER_ERROR,
    ),
    (
        StandardErrorKind::MessageNotWritable,
        StatusCode::INTERNAL_SERVER_ERROR,
    ),
    (StandardErrorKind::MissingRequestPart, StatusCode::BAD_REQUEST),
    (StandardErrorKind::NoHandlerFound, StatusCode::NOT_FOUND),
    (
        StandardErrorKind::AsyncRequestTimeout,
        StatusCode::SERVICE_UNAVAILABLE,
    ),
    (
        StandardErrorKind::HandlerPanicked,
        StatusCode::INTERNAL_SERVER_ERROR,
    ),
];

#[must_use]
pub fn default_status(kind: StandardErrorKind) -> Option<StatusCode> {
    DEFAULT_STATUSES
        .iter()
        .find(|(known, _)| *known == kind)
        .map(|(_, status)| *status)
}

/// Status the framework would answer with on its own, if it knows the error.
#[must_use]
pub fn framework_default_status(error: &HandlerError) -> Option<StatusCode> {
    let HandlerError::Standard(standard) = error else {
        return None;
    };
    default_status(standard.kind())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::error::StandardError;

    #[test]
    fn every_standard_kind_has_a_status() {
        for kind in StandardErrorKind::ALL {
            let status = default_status(kind).unwrap();
            assert!(status.is_client_error() || status.is_server_error());
        }
    }

    #[test]
    fn well_known_statuses() {
        assert_eq!(
            default_status(StandardErrorKind::MethodNotSupported),
            Some(StatusCode::METHOD_NOT_ALLOWED)
        );
        assert_eq!(
            default_status(StandardErrorKind::AsyncRequestTimeout),
            Some(StatusCode::SERVICE_UNAVAILABLE)
        );
    }

    #[test]
    fn only_framework_errors_have_defaults() {
        let standard = HandlerError::from(StandardError::new(
            StandardErrorKind::MediaTypeNotSupported,
            "text/plain",
        ));
        assert_eq!(
            framework_default_status(&standard),
            Some(StatusCode::UNSUPPORTED_MEDIA_TYPE)
        );
        assert_eq!(
            framework_default_status(&HandlerError::from(anyhow::anyhow!("x"))),
            None
        );
    }
}
