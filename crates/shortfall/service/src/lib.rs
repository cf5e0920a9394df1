#![deny(unsafe_code)]

pub mod app;
pub mod csv;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use app::ShortfallApp;
use shortfall_engine::{
    matches_search, view_for, DashboardMetrics, Decision, RequestEvent, RoleView, ShortageReport,
};
use shortfall_storage::memory::InMemoryShortfallStorage;
#[cfg(feature = "postgres")]
use shortfall_storage::postgres::PostgresShortfallStorage;
use shortfall_storage::{ShortfallStorage, StorageError};
use shortfall_types::{Product, RequestId, Role, ShortageRequest, ShortfallError, User};

/// Storage backend selection for the service
#[derive(Debug, Clone, Default)]
pub enum StorageConfig {
    #[default]
    Memory,
    #[cfg(feature = "postgres")]
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self::Memory
    }

    #[cfg(feature = "postgres")]
    pub fn postgres(database_url: impl Into<String>, max_connections: u32) -> Self {
        Self::Postgres {
            database_url: database_url.into(),
            max_connections,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            #[cfg(feature = "postgres")]
            Self::Postgres { .. } => "postgres",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub storage: StorageConfig,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("domain error: {0}")]
    Domain(#[from] ShortfallError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Shared state behind every handler
#[derive(Clone)]
pub struct ServiceState {
    pub app: Arc<ShortfallApp>,
    pub storage_label: &'static str,
}

impl ServiceState {
    pub async fn bootstrap(config: ServiceConfig) -> Result<Self, ServiceError> {
        let storage_label = config.storage.label();
        let store: Arc<dyn ShortfallStorage> = match config.storage {
            StorageConfig::Memory => Arc::new(InMemoryShortfallStorage::new()),
            #[cfg(feature = "postgres")]
            StorageConfig::Postgres {
                database_url,
                max_connections,
            } => Arc::new(
                PostgresShortfallStorage::connect_with_options(&database_url, max_connections, 5)
                    .await?,
            ),
        };
        let app = ShortfallApp::bootstrap(store).await?;
        Ok(Self {
            app: Arc::new(app),
            storage_label,
        })
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error(transparent)]
    Domain(#[from] ShortfallError),
}

impl ApiError {
    fn unauthorized(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Http { status, message } => (status, message),
            ApiError::Domain(err) => {
                let status = match &err {
                    ShortfallError::InvalidTransition { .. } => StatusCode::CONFLICT,
                    ShortfallError::NotFound(_) => StatusCode::NOT_FOUND,
                    ShortfallError::UnknownProduct(_) | ShortfallError::InvalidInput(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    ShortfallError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn build_router(state: ServiceState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/login", post(login))
        .route("/v1/requests", get(list_requests).post(report_request))
        .route("/v1/requests/:id", get(get_request).delete(delete_request))
        .route("/v1/requests/:id/approve", post(approve_request))
        .route("/v1/requests/:id/decide", post(decide_request))
        .route("/v1/requests/:id/start", post(start_request))
        .route("/v1/requests/:id/finish", post(finish_request))
        .route("/v1/requests/:id/collect", post(collect_request))
        .route("/v1/views/:role", get(role_view))
        .route("/v1/metrics", get(metrics))
        .route("/v1/exports/requests.csv", get(export_requests))
        .route("/v1/exports/products.csv", get(export_products))
        .route("/v1/users", get(list_users).post(create_user))
        .route("/v1/users/:username", put(update_user).delete(delete_user))
        .route(
            "/v1/products",
            get(list_products).post(upsert_product).delete(clear_products),
        )
        .route("/v1/products/import", post(import_products))
        .route("/v1/products/:code", delete(delete_product))
        .with_state(state)
}

/// Resolve the acting account named in a request body
async fn resolve_actor(state: &ServiceState, username: &str) -> Result<User, ApiError> {
    state
        .app
        .user_by_username(username)
        .await?
        .ok_or_else(|| ApiError::bad_request(format!("unknown actor '{username}'")))
}

/// Accept RFC 3339 or the datetime-local shapes screens submit, reading
/// the latter as UTC
fn parse_eta(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(eta) = DateTime::parse_from_rfc3339(raw) {
        return Ok(eta.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(ApiError::bad_request(format!(
        "invalid eta '{raw}'; expected an ISO-8601 timestamp"
    )))
}

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    let token = raw.to_uppercase();
    Role::all()
        .into_iter()
        .find(|role| role.name() == token)
        .ok_or_else(|| {
            ApiError::bad_request(format!(
                "invalid role '{raw}'; expected one of: LOGISTICS, PLANNING, CUSTOMER_SERVICE, PRODUCTION, ADMIN"
            ))
        })
}

async fn apply_event(
    state: &ServiceState,
    id: String,
    event: RequestEvent,
    actor: &str,
) -> Result<Json<ShortageRequest>, ApiError> {
    let actor = resolve_actor(state, actor).await?;
    Ok(Json(
        state
            .app
            .engine()
            .transition(&RequestId::new(id), event, &actor)
            .await?,
    ))
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    storage_backend: &'static str,
}

async fn health(State(state): State<ServiceState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "shortfall-service",
        storage_backend: state.storage_label,
    })
}

#[derive(Debug, Clone, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

/// The account snapshot a successful login returns. The password never
/// goes back over the wire.
#[derive(Debug, Clone, Serialize)]
struct SessionUser {
    id: String,
    username: String,
    name: String,
    roles: Vec<Role>,
}

impl From<User> for SessionUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            roles: user.roles,
        }
    }
}

async fn login(
    State(state): State<ServiceState>,
    Json(credentials): Json<LoginRequest>,
) -> Result<Json<SessionUser>, ApiError> {
    match state
        .app
        .login(&credentials.username, &credentials.password)
        .await
    {
        Ok(user) => Ok(Json(user.into())),
        Err(ShortfallError::InvalidInput(_)) => {
            Err(ApiError::unauthorized("invalid credentials"))
        }
        Err(other) => Err(ApiError::Domain(other)),
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ListRequestsQuery {
    search: Option<String>,
}

async fn list_requests(
    State(state): State<ServiceState>,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<ShortageRequest>>, ApiError> {
    let mut requests = state.app.engine().collection().await?;
    if let Some(search) = query.search.as_deref() {
        requests.retain(|request| matches_search(request, search));
    }
    Ok(Json(requests))
}

#[derive(Debug, Clone, Deserialize)]
struct ReportRequestBody {
    #[serde(flatten)]
    report: ShortageReport,
    actor: String,
}

async fn report_request(
    State(state): State<ServiceState>,
    Json(body): Json<ReportRequestBody>,
) -> Result<(StatusCode, Json<ShortageRequest>), ApiError> {
    let actor = resolve_actor(&state, &body.actor).await?;
    let request = state.app.engine().report(body.report, &actor).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn get_request(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Json<ShortageRequest>, ApiError> {
    Ok(Json(state.app.engine().get(&RequestId::new(id)).await?))
}

async fn delete_request(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.app.delete_request(&RequestId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Clone, Deserialize)]
struct ApproveBody {
    eta: String,
    directive: String,
    actor: String,
}

async fn approve_request(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Json(body): Json<ApproveBody>,
) -> Result<Json<ShortageRequest>, ApiError> {
    let eta = parse_eta(&body.eta)?;
    let event = RequestEvent::Approve {
        eta,
        directive: body.directive,
    };
    apply_event(&state, id, event, &body.actor).await
}

#[derive(Debug, Clone, Deserialize)]
struct DecideBody {
    outcome: Decision,
    actor: String,
}

async fn decide_request(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Json(body): Json<DecideBody>,
) -> Result<Json<ShortageRequest>, ApiError> {
    apply_event(&state, id, RequestEvent::Decide(body.outcome), &body.actor).await
}

#[derive(Debug, Clone, Deserialize)]
struct ActorBody {
    actor: String,
}

async fn start_request(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<ShortageRequest>, ApiError> {
    apply_event(&state, id, RequestEvent::Start, &body.actor).await
}

async fn finish_request(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<ShortageRequest>, ApiError> {
    apply_event(&state, id, RequestEvent::Finish, &body.actor).await
}

async fn collect_request(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<ShortageRequest>, ApiError> {
    apply_event(&state, id, RequestEvent::Collect, &body.actor).await
}

async fn role_view(
    State(state): State<ServiceState>,
    Path(role): Path<String>,
) -> Result<Json<RoleView>, ApiError> {
    let role = parse_role(&role)?;
    let requests = state.app.engine().collection().await?;
    Ok(Json(view_for(role, &requests)))
}

async fn metrics(State(state): State<ServiceState>) -> Result<Json<DashboardMetrics>, ApiError> {
    let requests = state.app.engine().collection().await?;
    Ok(Json(DashboardMetrics::compute(&requests, Utc::now())))
}

fn csv_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body).into_response()
}

async fn export_requests(State(state): State<ServiceState>) -> Result<Response, ApiError> {
    Ok(csv_response(state.app.export_requests_csv().await?))
}

async fn export_products(State(state): State<ServiceState>) -> Result<Response, ApiError> {
    Ok(csv_response(state.app.export_products_csv().await?))
}

async fn list_users(State(state): State<ServiceState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.app.users().await?))
}

async fn create_user(
    State(state): State<ServiceState>,
    Json(user): Json<User>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    Ok((StatusCode::CREATED, Json(state.app.create_user(user).await?)))
}

async fn update_user(
    State(state): State<ServiceState>,
    Path(username): Path<String>,
    Json(user): Json<User>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.app.update_user(&username, user).await?))
}

async fn delete_user(
    State(state): State<ServiceState>,
    Path(username): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.app.delete_user(&username).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_products(State(state): State<ServiceState>) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.app.products().await?))
}

async fn upsert_product(
    State(state): State<ServiceState>,
    Json(product): Json<Product>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.app.upsert_product(product).await?))
}

async fn delete_product(
    State(state): State<ServiceState>,
    Path(code): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.app.delete_product(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_products(State(state): State<ServiceState>) -> Result<StatusCode, ApiError> {
    state.app.clear_products().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Clone, Serialize)]
struct ImportOutcome {
    imported: usize,
}

async fn import_products(
    State(state): State<ServiceState>,
    body: String,
) -> Result<Json<ImportOutcome>, ApiError> {
    let imported = state.app.import_products_csv(&body).await?;
    Ok(Json(ImportOutcome { imported }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let state = ServiceState::bootstrap(ServiceConfig::default())
            .await
            .unwrap();
        state
            .app
            .upsert_product(Product::new("PA-250", "Gear housing", 0.250))
            .await
            .unwrap();
        build_router(state)
    }

    async fn request(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn report_fixture(app: &Router) -> String {
        let (status, created) = request(
            app,
            "POST",
            "/v1/requests",
            Some(serde_json::json!({
                "code": "PA-250",
                "quantity": 3,
                "criticality": "MEDIUM",
                "load_number": "L-2209",
                "actor": "admin"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        created["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_the_backend() {
        let app = test_app().await;
        let (status, body) = request(&app, "GET", "/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["storage_backend"], "memory");
    }

    #[tokio::test]
    async fn report_then_approve_over_http() {
        let app = test_app().await;

        let (status, created) = request(
            &app,
            "POST",
            "/v1/requests",
            Some(serde_json::json!({
                "code": "PA-250",
                "quantity": 3,
                "criticality": "MEDIUM",
                "load_number": "L-2209",
                "actor": "admin"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "PENDING_PCP");
        assert_eq!(created["total_weight"], 0.75);

        let id = created["id"].as_str().unwrap();
        let (status, approved) = request(
            &app,
            "POST",
            &format!("/v1/requests/{id}/approve"),
            Some(serde_json::json!({
                "eta": "2026-03-14T12:00",
                "directive": "run on line 2",
                "actor": "admin"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["status"], "PENDING_CS");
        assert_eq!(
            approved["timestamps"]["requested_by_pcp"]["user"],
            "Master Administrator"
        );
    }

    #[tokio::test]
    async fn premature_collect_maps_to_conflict() {
        let app = test_app().await;
        let id = report_fixture(&app).await;

        let (status, body) = request(
            &app,
            "POST",
            &format!("/v1/requests/{id}/collect"),
            Some(serde_json::json!({ "actor": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("invalid transition"));
    }

    #[tokio::test]
    async fn unknown_product_maps_to_bad_request() {
        let app = test_app().await;
        let (status, body) = request(
            &app,
            "POST",
            "/v1/requests",
            Some(serde_json::json!({
                "code": "PA-999",
                "quantity": 1,
                "criticality": "LOW",
                "actor": "admin"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("PA-999"));
    }

    #[tokio::test]
    async fn login_returns_a_session_without_the_password() {
        let app = test_app().await;

        let (status, session) = request(
            &app,
            "POST",
            "/v1/login",
            Some(serde_json::json!({ "username": "Admin", "password": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["username"], "admin");
        assert!(session.get("password").is_none());

        let (status, _) = request(
            &app,
            "POST",
            "/v1/login",
            Some(serde_json::json!({ "username": "admin", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn import_endpoint_reports_the_count() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/products/import")
                    .header("content-type", "text/csv")
                    .body(Body::from("CÓDIGO;DESC;PESO\nPA-1;Bracket;0,5\nPA-2;Shaft;1,5"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["imported"], 2);

        let (_, products) = request(&app, "GET", "/v1/products", None).await;
        assert_eq!(products.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn role_views_come_from_the_table() {
        let app = test_app().await;
        report_fixture(&app).await;

        let (status, view) = request(&app, "GET", "/v1/views/planning", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["role"], "PLANNING");
        assert_eq!(view["sections"][0]["title"], "pending_planning");
        assert_eq!(view["sections"][0]["items"][0]["intents"][0], "approve");

        let (status, _) = request(&app, "GET", "/v1/views/warehouse", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn metrics_cover_the_fresh_report() {
        let app = test_app().await;
        report_fixture(&app).await;

        let (status, body) = request(&app, "GET", "/v1/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active_count"], 1);
        assert_eq!(body["sla_percent"], 100.0);
    }

    #[tokio::test]
    async fn request_export_is_csv() {
        let app = test_app().await;
        report_fixture(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/v1/exports/requests.csv")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/csv; charset=utf-8"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("REQUEST_ID;LOAD;"));
        assert!(text.contains(";PA-250;"));
    }

    #[tokio::test]
    async fn requests_can_be_searched_and_deleted() {
        let app = test_app().await;
        let id = report_fixture(&app).await;

        let (_, hits) = request(&app, "GET", "/v1/requests?search=2209", None).await;
        assert_eq!(hits.as_array().unwrap().len(), 1);
        let (_, misses) = request(&app, "GET", "/v1/requests?search=axle", None).await;
        assert!(misses.as_array().unwrap().is_empty());

        let (status, _) = request(&app, "DELETE", &format!("/v1/requests/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = request(&app, "GET", &format!("/v1/requests/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn master_admin_survives_the_delete_endpoint() {
        let app = test_app().await;
        let (status, _) = request(&app, "DELETE", "/v1/users/admin", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (_, users) = request(&app, "GET", "/v1/users", None).await;
        assert_eq!(users.as_array().unwrap().len(), 2);
    }
}
