use axum::{Json, extract::State};

use crate::{
    AppState,
    context::AuthUser,
    error::ApiError,
    models::{LoginRequest, LoginResponse, ProfileResponse},
};

// --- Handlers ---

/// login
///
/// [Allowlisted Route] Exchanges a username/password pair for a bearer token.
///
/// *Security*: unknown usernames, wrong passwords and store outages all produce the same 401
/// body, so the response cannot be used to enumerate accounts.
#[utoipa::path(
    post,
    path = "/auth/token",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::models::ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let principal = state
        .credentials
        .authenticate(&payload.username, &payload.password)
        .await?;

    let ttl = state.config.security.token_ttl;
    let token = state.tokens.issue(&principal, ttl).map_err(|e| {
        tracing::error!(error = %e, "token issuance failed");
        ApiError::from(e)
    })?;

    tracing::info!(user_id = %principal.id(), "token issued");
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: ttl.as_secs(),
    }))
}

/// get_me
///
/// [Authenticated Route] Echoes the identity carried by the presented token.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Missing or invalid token", body = crate::models::ErrorBody)
    )
)]
pub async fn get_me(AuthUser { id, roles }: AuthUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        subject: id,
        roles: roles.into_iter().collect(),
    })
}

/// all_access
///
/// [Public Route] Reachable with or without a token.
#[utoipa::path(
    get,
    path = "/api/test/all",
    responses((status = 200, description = "Public content", body = String))
)]
pub async fn all_access() -> &'static str {
    "Public content"
}

/// user_access
///
/// [Role Route] USER, MODERATOR or ADMIN.
#[utoipa::path(
    get,
    path = "/api/test/user",
    responses(
        (status = 200, description = "User content", body = String),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Insufficient role")
    )
)]
pub async fn user_access() -> &'static str {
    "User content"
}

/// moderator_access
///
/// [Role Route] MODERATOR or ADMIN.
#[utoipa::path(
    get,
    path = "/api/test/mod",
    responses(
        (status = 200, description = "Moderator content", body = String),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Insufficient role")
    )
)]
pub async fn moderator_access() -> &'static str {
    "Moderator content"
}

/// admin_access
///
/// [Role Route] ADMIN only.
#[utoipa::path(
    get,
    path = "/api/test/admin",
    responses(
        (status = 200, description = "Admin content", body = String),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Insufficient role")
    )
)]
pub async fn admin_access() -> &'static str {
    "Admin content"
}
