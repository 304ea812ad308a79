use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::{Next, from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use http::{Method, Uri};
use tower_http::catch_panic::CatchPanicLayer;

use super::extract::json_content_type;
use super::response::RaisedError;
use crate::classify::RequestInfo;
use crate::error::{HandlerError, StandardError, StandardErrorKind, StatusError};
use crate::mapping::HandlerKey;
use crate::resolver::ExceptionResolver;

/// Largest bare error body read back as the problem reason.
const BARE_BODY_LIMIT: usize = 64 * 1024;

/// Classifies raised handler errors and replaces the response with the problem list.
///
/// Error statuses a matched route answered without raising a [`HandlerError`] (rejections of
/// axum's own extractors, bare status codes) are classified too, unless the body is already
/// JSON. Everything else passes through untouched.
pub async fn resolve_problems(
    State(resolver): State<Arc<ExceptionResolver>>,
    request: Request,
    next: Next,
) -> Response {
    let info = RequestInfo::new(request.method().clone(), request.uri().clone());
    let mut response = next.run(request).await;

    let Some(raised) = response.extensions_mut().remove::<RaisedError>() else {
        if !is_bare_error(&response) {
            return response;
        }
        let key = response.extensions().get::<HandlerKey>().cloned();
        let error = bare_error(response).await;
        return resolver.resolve(&info, key.as_ref(), &error).into_response();
    };
    let info = info.with_uncaught(raised.is_uncaught());
    let key = response.extensions().get::<HandlerKey>();
    resolver.resolve(&info, key, raised.error()).into_response()
}

fn is_bare_error(response: &Response) -> bool {
    let status = response.status();
    (status.is_client_error() || status.is_server_error())
        && response.extensions().get::<HandlerKey>().is_some()
        && !json_content_type(response.headers())
}

async fn bare_error(response: Response) -> HandlerError {
    let status = response.status();
    let text = axum::body::to_bytes(response.into_body(), BARE_BODY_LIMIT)
        .await
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_owned())
        .filter(|text| !text.is_empty());
    tracing::debug!(%status, "route answered with a bare error status");

    match StandardErrorKind::for_status(status) {
        Some(kind) => {
            let message = text.unwrap_or_else(|| status.to_string());
            StandardError::new(kind, message).into()
        }
        None => match text {
            Some(reason) => StatusError::new(status).with_reason(reason).into(),
            None => StatusError::new(status).into(),
        },
    }
}

/// Records which handler served the request, as a [`HandlerKey`] response extension.
///
/// Install with `route_layer` so the matched route pattern is known.
pub async fn record_handler(request: Request, next: Next) -> Response {
    let key = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| HandlerKey::new(request.method().clone(), path.as_str()));

    let mut response = next.run(request).await;
    if let Some(key) = key {
        response.extensions_mut().insert(key);
    }
    response
}

#[allow(clippy::needless_pass_by_value)]
async fn no_handler_found(method: Method, uri: Uri) -> HandlerError {
    StandardError::new(
        StandardErrorKind::NoHandlerFound,
        format!("No handler found for {method} {}", uri.path()),
    )
    .into()
}

#[allow(clippy::needless_pass_by_value)]
async fn method_not_supported(method: Method) -> HandlerError {
    StandardError::new(
        StandardErrorKind::MethodNotSupported,
        format!("Request method '{method}' is not supported"),
    )
    .into()
}

#[allow(clippy::needless_pass_by_value)]
fn panic_to_problem(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>");
    tracing::error!(panic = detail, "request handler panicked");

    let error = StandardError::new(
        StandardErrorKind::HandlerPanicked,
        "request handler panicked",
    );
    RaisedError::uncaught(error.into()).into_response()
}

/// Installs problem responses on a router.
pub trait ProblemsRouterExt<S> {
    /// Adds the layers and fallbacks turning handler errors into problem responses:
    /// handler recording, 404/405 fallbacks, panic catching and the resolver itself.
    ///
    /// Call after every route has been added.
    #[must_use]
    fn with_problems(self, resolver: Arc<ExceptionResolver>) -> Self;
}

impl<S> ProblemsRouterExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_problems(self, resolver: Arc<ExceptionResolver>) -> Self {
        self.route_layer(from_fn(record_handler))
            .fallback(no_handler_found)
            .method_not_allowed_fallback(method_not_supported)
            .layer(CatchPanicLayer::custom(panic_to_problem))
            .layer(from_fn_with_state(resolver, resolve_problems))
    }
}
