use axum::body::Bytes;
use axum::extract::path::ErrorKind;
use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use http::request::Parts;
use http::{HeaderMap, header};
use serde::de::DeserializeOwned;
use url::form_urlencoded;
use validator::Validate;

use crate::binding::{BindingFailure, BindingKind, BindingResult};
use crate::body::{
    BodyCause, CauseKind, UnreadableBody, dotted_path, short_type_name, to_segments,
};
use crate::error::{HandlerError, StandardError, StandardErrorKind};

/// JSON request body whose failures classify as unreadable-body problems.
///
/// Unlike `axum::Json`, unknown properties, type mismatches and syntax errors keep the
/// structure the classifier needs (property names, value paths).
#[derive(Debug, Clone, Copy, Default)]
#[must_use]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HandlerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !json_content_type(req.headers()) {
            let content_type = req
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("<none>");
            return Err(StandardError::new(
                StandardErrorKind::MediaTypeNotSupported,
                format!("Content type '{content_type}' not supported"),
            )
            .into());
        }

        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            let cause = BodyCause::new(CauseKind::Io, rejection.body_text());
            UnreadableBody::new("I/O error while reading input message").with_cause(cause)
        })?;
        parse_json(&bytes).map(Self)
    }
}

/// JSON request body validated with `validator`; failures are method-argument binding errors.
#[derive(Debug, Clone, Copy, Default)]
#[must_use]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = HandlerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
        validate(&value, BindingKind::MethodArgument)?;
        Ok(Self(value))
    }
}

/// Query string bound to `T` and validated; failures are binding errors.
///
/// A parameter that cannot be converted becomes a field error named after the parameter.
#[derive(Debug, Clone, Copy, Default)]
#[must_use]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = HandlerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parse_query::<T>(parts.uri.query().unwrap_or_default())?;
        validate(&value, BindingKind::Bind)?;
        Ok(Self(value))
    }
}

/// Path parameters deserialized into `T`.
///
/// Unparsable segments are type mismatches; a route without the expected parameters is a
/// missing path variable.
#[derive(Debug, Clone, Copy, Default)]
#[must_use]
pub struct PathParam<T>(pub T);

impl<T, S> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = HandlerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| path_error(&rejection))?;
        Ok(Self(value))
    }
}

fn path_error(rejection: &PathRejection) -> StandardError {
    let kind = match rejection {
        PathRejection::FailedToDeserializePathParams(error)
            if !matches!(error.kind(), ErrorKind::WrongNumberOfParameters { .. }) =>
        {
            StandardErrorKind::TypeMismatch
        }
        _ => StandardErrorKind::MissingPathVariable,
    };
    StandardError::new(kind, rejection.body_text())
}

fn parse_query<T: DeserializeOwned>(query: &str) -> Result<T, HandlerError> {
    let de = serde_urlencoded::Deserializer::new(form_urlencoded::parse(query.as_bytes()));
    serde_path_to_error::deserialize(de).map_err(|error| {
        let field = dotted_path(&to_segments(error.path()));
        let message = error.into_inner().to_string();
        if field.is_empty() {
            return StandardError::new(
                StandardErrorKind::TypeMismatch,
                format!("Failed to deserialize query string: {message}"),
            )
            .into();
        }
        BindingFailure::new(
            BindingKind::Bind,
            BindingResult::new(short_type_name::<T>()).reject_field(field, message),
        )
        .into()
    })
}

pub(super) fn json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(header::CONTENT_TYPE) else {
        return false;
    };
    let Ok(content_type) = content_type.to_str() else {
        return false;
    };
    let Ok(mime) = content_type.parse::<mime::Mime>() else {
        return false;
    };
    mime.type_() == "application"
        && (mime.subtype() == "json" || mime.suffix().is_some_and(|name| name == "json"))
}

fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, HandlerError> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let value: T = serde_path_to_error::deserialize(&mut de)
        .map_err(UnreadableBody::from_json_error::<T>)?;
    // trailing characters after the document
    de.end().map_err(|error| {
        UnreadableBody::new(format!("JSON parse error: {error}"))
            .with_cause(BodyCause::new(CauseKind::Syntax, error.to_string()))
    })?;
    Ok(value)
}

fn validate<T: Validate>(value: &T, kind: BindingKind) -> Result<(), BindingFailure> {
    value.validate().map_err(|errors| {
        BindingFailure::new(
            kind,
            BindingResult::from_validation(short_type_name::<T>(), &errors),
        )
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::body::dotted_path;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(deny_unknown_fields)]
    struct NewUser {
        #[validate(length(min = 3, message = "too short"))]
        name: String,
        age: u8,
    }

    fn json_request(content_type: &str, body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/users")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Paging {
        #[validate(range(max = 50, message = "limit too large"))]
        limit: u32,
    }

    fn parts(uri: &str) -> Parts {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn json_content_types() {
        let mut headers = HeaderMap::new();
        assert!(!json_content_type(&headers));
        for (value, expected) in [
            ("application/json", true),
            ("application/json; charset=utf-8", true),
            ("application/problem+json", true),
            ("text/json", false),
            ("text/plain", false),
        ] {
            headers.insert(header::CONTENT_TYPE, value.parse().unwrap());
            assert_eq!(json_content_type(&headers), expected, "{value}");
        }
    }

    #[tokio::test]
    async fn json_body_parses_valid_document() {
        let JsonBody(user) = JsonBody::<NewUser>::from_request(
            json_request("application/json", r#"{"name": "alice", "age": 30}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(user.name, "alice");
        assert_eq!(user.age, 30);
    }

    #[tokio::test]
    async fn wrong_content_type_is_rejected() {
        let err = JsonBody::<NewUser>::from_request(json_request("text/plain", "{}"), &())
            .await
            .unwrap_err();
        let HandlerError::Standard(standard) = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(standard.kind(), StandardErrorKind::MediaTypeNotSupported);
    }

    #[tokio::test]
    async fn type_mismatch_keeps_path() {
        let err = JsonBody::<NewUser>::from_request(
            json_request("application/json", r#"{"name": "alice", "age": "old"}"#),
            &(),
        )
        .await
        .unwrap_err();
        let HandlerError::Unreadable(body) = &err else {
            panic!("unexpected error: {err}");
        };
        let CauseKind::InvalidFormat { path } = body.nearest_known_cause().unwrap().kind() else {
            panic!("unexpected cause for: {body}");
        };
        assert_eq!(dotted_path(path), "age");
    }

    #[tokio::test]
    async fn trailing_characters_are_a_syntax_error() {
        let err = JsonBody::<NewUser>::from_request(
            json_request("application/json", r#"{"name": "alice", "age": 3} x"#),
            &(),
        )
        .await
        .unwrap_err();
        let HandlerError::Unreadable(body) = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(body.cause().map(BodyCause::kind), Some(&CauseKind::Syntax));
    }

    #[tokio::test]
    async fn validated_json_reports_argument_errors() {
        let err = ValidatedJson::<NewUser>::from_request(
            json_request("application/json", r#"{"name": "al", "age": 3}"#),
            &(),
        )
        .await
        .unwrap_err();
        let HandlerError::Binding(failure) = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(failure.kind(), BindingKind::MethodArgument);
        assert_eq!(failure.result().object(), "NewUser");
        assert_eq!(failure.result().field_errors()[0].field(), "name");
        assert_eq!(failure.result().field_errors()[0].message(), Some("too short"));
    }

    #[tokio::test]
    async fn unconvertible_query_parameter_is_a_field_error() {
        let err = ValidatedQuery::<Paging>::from_request_parts(&mut parts("/users?limit=lots"), &())
            .await
            .unwrap_err();
        let HandlerError::Binding(failure) = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(failure.kind(), BindingKind::Bind);
        assert_eq!(failure.result().object(), "Paging");
        assert_eq!(failure.result().field_errors()[0].field(), "limit");
    }

    #[tokio::test]
    async fn missing_query_parameter_is_a_type_mismatch() {
        let err = ValidatedQuery::<Paging>::from_request_parts(&mut parts("/users"), &())
            .await
            .unwrap_err();
        let HandlerError::Standard(standard) = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(standard.kind(), StandardErrorKind::TypeMismatch);
        assert!(standard.message().contains("limit"), "{standard}");
    }

    #[tokio::test]
    async fn valid_query_is_validated() {
        let ValidatedQuery(paging) =
            ValidatedQuery::<Paging>::from_request_parts(&mut parts("/users?limit=10"), &())
                .await
                .unwrap();
        assert_eq!(paging.limit, 10);

        let err = ValidatedQuery::<Paging>::from_request_parts(&mut parts("/users?limit=99"), &())
            .await
            .unwrap_err();
        let HandlerError::Binding(failure) = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(failure.result().field_errors()[0].message(), Some("limit too large"));
    }
}
