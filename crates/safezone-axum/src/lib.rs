#![doc = include_str!("../README.md")]

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use safezone::routes::{self, auth, community_tasks, global_alerts, help_requests, points, seed, tasks};
use safezone::{session, AppContext};
use safezone_core::db::adapter::Adapter;
use safezone_core::db::models::{TaskPatch, User};
use safezone_core::error::{ApiError, SafezoneError};
use safezone_core::options::SafezoneOptions;

// ─── Error Handling ──────────────────────────────────────────────

/// HTTP rendering of an `ApiError`.
struct HttpError(ApiError);

impl From<ApiError> for HttpError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.0.to_json())).into_response();
        if self.0.is_unauthorized() {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

// ─── Current User ────────────────────────────────────────────────

/// The user named by the request's bearer token.
struct CurrentUser(User);

impl FromRequestParts<Arc<AppContext>> for CurrentUser {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, ctx: &Arc<AppContext>) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let user = session::resolve_authorization(ctx, header).await?;
        Ok(Self(user))
    }
}

// ─── Safezone Builder ────────────────────────────────────────────

/// Entry point for serving the SafeZone API with Axum.
pub struct Safezone {
    ctx: Arc<AppContext>,
}

impl Safezone {
    /// Build the shared context from options and a storage backend.
    pub fn new(options: SafezoneOptions, adapter: Arc<dyn Adapter>) -> Result<Self, SafezoneError> {
        Ok(Self {
            ctx: Arc::new(AppContext::new(options, adapter)?),
        })
    }

    pub fn from_context(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    /// All API routes with request tracing.
    pub fn router(&self) -> Router {
        self.api_routes().layer(TraceLayer::new_for_http())
    }

    /// `router()` plus CORS for the configured origins. Origins that are not
    /// valid header values are skipped with a warning.
    pub fn router_with_cors(&self) -> Router {
        let origins: Vec<HeaderValue> = self
            .ctx
            .options
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        let cors = CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true);

        self.router().layer(cors)
    }

    fn api_routes(&self) -> Router {
        Router::new()
            .route("/", get(handle_root))
            .route("/api/auth/register", post(handle_register))
            .route("/api/auth/login", post(handle_login))
            .route("/api/auth/me", get(handle_me))
            .route("/api/tasks", get(handle_list_tasks).post(handle_create_task))
            .route("/api/tasks/{id}", patch(handle_update_task))
            .route("/api/points/history", get(handle_points_history))
            .route(
                "/api/help-requests",
                get(handle_list_help_requests).post(handle_create_help_request),
            )
            .route("/api/help-requests/{id}/respond", patch(handle_respond))
            .route(
                "/api/global-alerts",
                get(handle_list_global_alerts).post(handle_create_global_alert),
            )
            .route("/api/global-alerts/{id}/acknowledge", patch(handle_acknowledge))
            .route("/api/global-alerts/{id}/toggle", patch(handle_toggle))
            .route(
                "/api/community-tasks",
                get(handle_list_community_tasks).post(handle_create_community_task),
            )
            .route("/api/community-tasks/{id}/volunteer", post(handle_volunteer))
            .route("/api/seed-community-tasks", post(handle_seed))
            .with_state(self.ctx.clone())
    }
}

// ─── Route Handlers ─────────────────────────────────────────────

type Ctx = State<Arc<AppContext>>;

async fn handle_root() -> impl IntoResponse {
    Json(routes::ok::handle_root())
}

async fn handle_register(
    State(ctx): Ctx,
    Json(body): Json<auth::RegisterRequest>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(auth::handle_register(&ctx, body).await?))
}

async fn handle_login(
    State(ctx): Ctx,
    Json(body): Json<auth::LoginRequest>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(auth::handle_login(&ctx, body).await?))
}

async fn handle_me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(auth::handle_me(&user))
}

async fn handle_list_tasks(State(ctx): Ctx) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(tasks::handle_list_tasks(&ctx).await?))
}

async fn handle_create_task(
    State(ctx): Ctx,
    CurrentUser(user): CurrentUser,
    Json(body): Json<tasks::CreateTaskRequest>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(tasks::handle_create_task(&ctx, &user, body).await?))
}

async fn handle_update_task(
    State(ctx): Ctx,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(patch): Json<TaskPatch>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(tasks::handle_update_task(&ctx, &user, id, patch).await?))
}

async fn handle_points_history(
    State(ctx): Ctx,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(points::handle_points_history(&ctx, &user).await?))
}

async fn handle_list_help_requests(State(ctx): Ctx) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(help_requests::handle_list_help_requests(&ctx).await?))
}

async fn handle_create_help_request(
    State(ctx): Ctx,
    CurrentUser(user): CurrentUser,
    Json(body): Json<help_requests::CreateHelpRequest>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(
        help_requests::handle_create_help_request(&ctx, &user, body).await?,
    ))
}

async fn handle_respond(
    State(ctx): Ctx,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(help_requests::handle_respond(&ctx, &user, id).await?))
}

async fn handle_list_global_alerts(State(ctx): Ctx) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(global_alerts::handle_list_global_alerts(&ctx).await?))
}

async fn handle_create_global_alert(
    State(ctx): Ctx,
    CurrentUser(user): CurrentUser,
    Json(body): Json<global_alerts::CreateGlobalAlertRequest>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(
        global_alerts::handle_create_global_alert(&ctx, &user, body).await?,
    ))
}

async fn handle_acknowledge(
    State(ctx): Ctx,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(global_alerts::handle_acknowledge(&ctx, id).await?))
}

async fn handle_toggle(
    State(ctx): Ctx,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(global_alerts::handle_toggle(&ctx, id).await?))
}

async fn handle_list_community_tasks(State(ctx): Ctx) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(community_tasks::handle_list_community_tasks(&ctx).await?))
}

async fn handle_create_community_task(
    State(ctx): Ctx,
    CurrentUser(user): CurrentUser,
    Json(body): Json<community_tasks::CreateCommunityTaskRequest>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(
        community_tasks::handle_create_community_task(&ctx, &user, body).await?,
    ))
}

async fn handle_volunteer(
    State(ctx): Ctx,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(community_tasks::handle_volunteer(&ctx, &user, id).await?))
}

async fn handle_seed(State(ctx): Ctx) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(seed::handle_seed_community_tasks(&ctx).await?))
}
