//! In-memory user directory whose handlers exercise every kind of failure

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use http::{Method, StatusCode};
use parking_lot::RwLock;
use problems::{Failure, Problem, ProblemType};
use problems_web::{
    AccessDenied, ConfigError, ErrorClass, ErrorClassRegistry, ExceptionMapping,
    ExceptionResolver, HandlerError, HandlerKey, OtherError, PathParam, ProblemsRouterExt,
    StatusError, ValidatedJson, ValidatedQuery, classes,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub static USERNAME_TAKEN: ErrorClass = ErrorClass::extends("UsernameTaken", &classes::ERROR);
pub static QUOTA_EXCEEDED: ErrorClass =
    ErrorClass::extends("QuotaExceeded", &classes::BAD_REQUEST);

const DEFAULT_MAX_USERS: usize = 1000;

/// Makes the application classes available to configuration.
///
/// # Errors
/// Fails when a class name is already registered.
pub fn register_classes(registry: &mut ErrorClassRegistry) -> Result<(), ConfigError> {
    registry.register(&USERNAME_TAKEN)?;
    registry.register(&QUOTA_EXCEEDED)
}

/// Mappings declared next to the handlers rather than in configuration.
#[must_use]
pub fn declare_mappings(resolver: ExceptionResolver) -> ExceptionResolver {
    resolver.with_mapping(
        HandlerKey::new(Method::POST, "/users"),
        ExceptionMapping::new(&USERNAME_TAKEN)
            .with_status(StatusCode::CONFLICT)
            .with_type(ProblemType::from_static("USERNAME_TAKEN"))
            .with_context("name"),
    )
}

#[derive(Clone)]
pub struct AppState {
    users: Arc<RwLock<BTreeMap<u32, User>>>,
    max_users: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_max_users(DEFAULT_MAX_USERS)
    }
}

impl AppState {
    #[must_use]
    pub fn with_max_users(max_users: usize) -> Self {
        Self {
            users: Arc::new(RwLock::new(BTreeMap::new())),
            max_users,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    id: u32,
    name: String,
    email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewUser {
    #[validate(length(min = 3, max = 32, message = "name must be 3 to 32 characters long"))]
    name: String,
    #[validate(email(message = "email is not valid"))]
    email: String,
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Deserialize, Validate)]
pub struct Paging {
    #[serde(default)]
    offset: usize,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    limit: usize,
}

#[must_use]
pub fn router(resolver: Arc<ExceptionResolver>, state: AppState) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/admin", get(admin))
        .route("/billing", get(billing))
        .route("/teapot", get(teapot))
        .route("/report", get(report))
        .with_state(state)
        .with_problems(resolver)
}

async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(new_user): ValidatedJson<NewUser>,
) -> Result<(StatusCode, Json<User>), HandlerError> {
    let mut users = state.users.write();
    if users.values().any(|user| user.name == new_user.name) {
        return Err(OtherError::new(&USERNAME_TAKEN)
            .with_message(format!("user name '{}' is already taken", new_user.name))
            .into());
    }
    if users.len() >= state.max_users {
        return Err(OtherError::new(&QUOTA_EXCEEDED)
            .with_message(format!("at most {} users allowed", state.max_users))
            .into());
    }

    let id = users.keys().next_back().map_or(1, |last| last + 1);
    let user = User {
        id,
        name: new_user.name,
        email: new_user.email,
    };
    users.insert(id, user.clone());
    tracing::info!(id, name = %user.name, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    PathParam(id): PathParam<u32>,
) -> Result<Json<User>, HandlerError> {
    let users = state.users.read();
    let user = users.get(&id).cloned().ok_or_else(|| {
        Failure::not_found(
            Problem::new(ProblemType::from_static("USER_NOT_FOUND"))
                .with_context("id")
                .with_reason(format!("no user with id {id}")),
        )
    })?;
    Ok(Json(user))
}

async fn list_users(
    State(state): State<AppState>,
    ValidatedQuery(paging): ValidatedQuery<Paging>,
) -> Json<Vec<User>> {
    let users = state.users.read();
    Json(
        users
            .values()
            .skip(paging.offset)
            .take(paging.limit)
            .cloned()
            .collect(),
    )
}

async fn admin() -> Result<(), HandlerError> {
    Err(AccessDenied::new("administrator role required").into())
}

async fn billing() -> Result<(), HandlerError> {
    Err(Failure::cannot_connect(
        Problem::new(ProblemType::from_static("UPSTREAM_UNAVAILABLE"))
            .with_context("billing")
            .with_reason("billing service did not answer"),
    )
    .into())
}

async fn teapot() -> Result<(), HandlerError> {
    Err(StatusError::new(StatusCode::IM_A_TEAPOT)
        .with_reason("this server brews tea only")
        .into())
}

async fn report() -> Result<String, HandlerError> {
    let template = std::env::var("PROBLEMS_DEMO_REPORT")
        .map_err(|e| anyhow::anyhow!("report template is not configured: {e}"))?;
    Ok(template)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::{Request, header};
    use http_body_util::BodyExt;
    use problems_web::ResolverConfig;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn resolver(yaml: Option<&str>) -> Arc<ExceptionResolver> {
        let mut registry = ErrorClassRegistry::with_builtins();
        register_classes(&mut registry).unwrap();
        let config = yaml
            .map(|yaml| ResolverConfig::from_yaml(yaml).unwrap())
            .unwrap_or_default();
        let resolver = ExceptionResolver::from_config(&config, &registry).unwrap();
        Arc::new(declare_mappings(resolver))
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn post_user(name: &str) -> Request<Body> {
        let body = json!({"name": name, "email": format!("{name}@example.com")});
        Request::builder()
            .method(Method::POST)
            .uri("/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn duplicate_name_is_a_conflict() {
        let app = router(resolver(None), AppState::default());

        let (status, created) = call(app.clone(), post_user("alice")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], 1);

        let (status, body) = call(app, post_user("alice")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body,
            json!([{
                "type": "USERNAME_TAKEN",
                "context": "name",
                "reason": "user name 'alice' is already taken",
                "details": null
            }])
        );
    }

    #[tokio::test]
    async fn quota_status_comes_from_configuration() {
        let state = AppState::with_max_users(1);
        let yaml = "declared_statuses: [{exception: QuotaExceeded, status: 429, reason: quota}]";

        let inherited = router(resolver(None), state.clone());
        call(inherited.clone(), post_user("alice")).await;
        let (status, body) = call(inherited, post_user("bob")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body[0]["reason"], "at most 1 users allowed");

        let configured = router(resolver(Some(yaml)), state);
        let (status, body) = call(configured, post_user("carol")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body[0]["type"], "GENERIC_PROBLEM");
        assert_eq!(body[0]["reason"], "quota");
    }

    #[tokio::test]
    async fn invalid_user_is_reported_per_field() {
        let app = router(resolver(None), AppState::default());
        let (status, body) = call(app, post_user("x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body[0]["type"], "FIELD_ERROR");
        assert_eq!(body[0]["context"], "name");
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let app = router(resolver(None), AppState::default());
        let (status, body) = call(app, get_request("/users/42")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body[0]["type"], "USER_NOT_FOUND");
        assert_eq!(body[0]["reason"], "no user with id 42");
    }

    #[tokio::test]
    async fn malformed_id_uses_configured_mapping() {
        let plain = router(resolver(None), AppState::default());
        let (status, body) = call(plain, get_request("/users/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body[0]["type"], "INTERNAL_ERROR");

        let yaml = r"
handlers:
  - method: GET
    path: /users/{id}
    mappings:
      - exception: TypeMismatch
        type: INVALID_USER_ID
        context: id
";
        let mapped = router(resolver(Some(yaml)), AppState::default());
        let (status, body) = call(mapped, get_request("/users/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!([{
                "type": "INVALID_USER_ID",
                "context": "id",
                "reason": "Invalid URL: Cannot parse `abc` to a `u32`",
                "details": null
            }])
        );
    }

    #[tokio::test]
    async fn paging_is_validated() {
        let app = router(resolver(None), AppState::default());
        let (status, body) = call(app.clone(), get_request("/users?limit=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body[0]["context"], "limit");

        let (status, body) = call(app, get_request("/users?offset=5")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn failure_branches() {
        let app = router(resolver(None), AppState::default());

        let (status, body) = call(app.clone(), get_request("/admin")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body[0]["type"], "FORBIDDEN");

        let (status, body) = call(app.clone(), get_request("/billing")).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body[0]["context"], "billing");

        let (status, body) = call(app, get_request("/teapot")).await;
        assert_eq!(status, StatusCode::IM_A_TEAPOT);
        assert_eq!(body[0]["type"], "I_AM_A_TEAPOT");
    }
}
