use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Identity, sessions and the role gate.
pub mod accounts;
pub mod auth;
pub mod password;
pub mod policy;
pub mod session;
pub mod validation;

// Gallery records and their collaborators.
pub mod gallery;
pub mod patch;
pub mod repository;
pub mod storage;

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;

// Routers split by who may reach them.
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use session::{MemorySessionStore, SessionState};
pub use storage::{BlobState, LocalBlobStore, MockBlobStore, S3BlobStore};

/// ApiDoc
///
/// OpenAPI description of every route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_images, handlers::register_user, handlers::login, handlers::logout,
        handlers::new_image_form, handlers::create_image, handlers::edit_image_form,
        handlers::edit_image, handlers::delete_image
    ),
    components(
        schemas(
            models::Role, models::ImageRecord, models::UpdatePatch, models::RegisterRequest,
            models::LoginRequest, models::GalleryListing, models::Notice,
            models::NoticeOutcome, models::PreservedInput, models::ImageUploadForm,
        )
    ),
    tags(
        (name = "gallery-portal", description = "Image gallery with role-gated uploads")
    )
)]
struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**: one cloneable container for every
/// collaborator a request may need. Extractors pull the parts they use via `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Users and image records.
    pub repo: RepositoryState,
    /// Raw bytes of uploaded images.
    pub storage: BlobState,
    /// Server-side session markers.
    pub sessions: SessionState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for BlobState {
    fn from_ref(app_state: &AppState) -> BlobState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects anonymous callers with 401 before the handler runs. The work happens in the
/// `AuthUser` extractor; reaching the body means the caller is logged in.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routers, the authentication layer, the upload size limit and the
/// observability stack, then binds the shared state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin routes need a login too; the Admin role itself is checked by the gate
        // inside the operation so a NormalUser gets a notice rather than a 403.
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .layer(body_limit)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens one span per request carrying the method, URI and `x-request-id`, so every log
/// line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
