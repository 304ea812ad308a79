use std::sync::Arc;

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::{HeaderValue, StatusCode, header};

use crate::classify::Classification;
use crate::error::HandlerError;

/// Content type of problem responses.
pub const PROBLEMS_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// A handler error waiting in the response extensions to be classified.
#[derive(Debug, Clone)]
pub struct RaisedError {
    error: Arc<HandlerError>,
    uncaught: bool,
}

impl RaisedError {
    #[must_use]
    pub fn new(error: HandlerError) -> Self {
        Self {
            error: Arc::new(error),
            uncaught: false,
        }
    }

    /// Error that escaped the handler instead of being returned by it.
    #[must_use]
    pub fn uncaught(error: HandlerError) -> Self {
        Self {
            error: Arc::new(error),
            uncaught: true,
        }
    }

    #[must_use]
    pub fn error(&self) -> &HandlerError {
        &self.error
    }

    #[must_use]
    pub fn is_uncaught(&self) -> bool {
        self.uncaught
    }
}

impl IntoResponse for RaisedError {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        RaisedError::new(self).into_response()
    }
}

/// Renders the problems as a bare JSON array.
impl IntoResponse for Classification {
    fn into_response(self) -> Response {
        (
            self.status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(PROBLEMS_CONTENT_TYPE),
            )],
            Json(self.problems),
        )
            .into_response()
    }
}
