use std::sync::Arc;

use axum::{Router, extract::FromRef, http::HeaderName, middleware};
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

pub mod auth;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod store;
pub mod token;

// Route declarations, grouped by access tier.
pub mod routes;

// --- Public Re-exports ---

pub use auth::PathAllowlist;
pub use config::{AppConfig, SecurityConfig};
pub use context::{AuthUser, SecurityContext};
pub use credentials::{AuthFailure, BcryptVerifier, CredentialValidator, PasswordVerifier};
pub use guard::{AccessPolicy, Requirement};
pub use routes::SecuredRouter;
pub use store::{MemoryUserStore, UserStore, UserStoreState};
pub use token::{Claims, TokenError, TokenService};

/// ApiDoc
///
/// OpenAPI document for every handler decorated with `#[utoipa::path]`, served at
/// `/api-docs/openapi.json` and browsable through `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::get_me, handlers::all_access,
        handlers::user_access, handlers::moderator_access, handlers::admin_access
    ),
    components(
        schemas(
            models::LoginRequest, models::LoginResponse, models::ProfileResponse,
            models::ErrorBody,
        )
    ),
    tags(
        (name = "tokengate", description = "Stateless token authentication and role authorization")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared, read-only services. Cloning is cheap; nothing in here is mutated after startup,
/// so concurrent requests need no locking.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub tokens: Arc<TokenService>,
    pub credentials: Arc<CredentialValidator>,
    pub allowlist: Arc<PathAllowlist>,
}

impl AppState {
    /// Wires the token service, credential validator and allowlist from `config`, with bcrypt as
    /// the password primitive.
    pub fn new(config: AppConfig, store: UserStoreState) -> Self {
        Self::with_verifier(config, store, BcryptVerifier)
    }

    pub fn with_verifier(
        config: AppConfig,
        store: UserStoreState,
        verifier: impl PasswordVerifier + 'static,
    ) -> Self {
        let security = &config.security;
        let tokens = Arc::new(TokenService::with_secret(security.token_secret.as_bytes()));
        let credentials = Arc::new(CredentialValidator::new(
            store,
            verifier,
            security.store_timeout,
        ));
        let allowlist = Arc::new(PathAllowlist::new(&security.public_paths));

        Self {
            config,
            tokens,
            credentials,
            allowlist,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(app_state: &AppState) -> Arc<TokenService> {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for Arc<CredentialValidator> {
    fn from_ref(app_state: &AppState) -> Arc<CredentialValidator> {
        app_state.credentials.clone()
    }
}

/// create_router
///
/// Assembles the full application: API routes, Swagger UI, both security gates and the
/// observability layers.
pub fn create_router(state: AppState) -> Router {
    build_router(state, routes::api_routes())
}

/// build_router
///
/// Layering fixes the gate order. The authentication filter wraps the whole router and runs
/// before dispatch; the authorization guard is a route layer and runs after dispatch has
/// matched a route, right before the handler.
pub fn build_router(state: AppState, routes: SecuredRouter) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let (api, policy) = routes.into_parts();
    let api = api.route_layer(middleware::from_fn_with_state(
        Arc::new(policy),
        guard::authorization_guard,
    ));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authentication_filter,
        ))
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
/// Builds the per-request span so every log line of a request carries its `x-request-id`.
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
