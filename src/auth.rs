use std::collections::HashSet;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    context::{AuthUser, SecurityContext},
    error::ApiError,
    guard::GuardError,
};

const BEARER_PREFIX: &str = "Bearer ";

/// PathAllowlist
///
/// Paths that skip the authentication filter entirely. An entry ending in `/*` matches the
/// path before the wildcard and everything below it; any other entry must match exactly.
#[derive(Debug, Clone, Default)]
pub struct PathAllowlist {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl PathAllowlist {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowlist = Self::default();
        for entry in entries {
            let entry = entry.as_ref();
            match entry.strip_suffix("/*") {
                Some(base) => {
                    allowlist.exact.insert(base.to_string());
                    allowlist.prefixes.push(format!("{base}/"));
                }
                None => {
                    allowlist.exact.insert(entry.to_string());
                }
            }
        }
        allowlist
    }

    pub fn contains(&self, path: &str) -> bool {
        self.exact.contains(path) || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// Returns the bearer token carried by the `Authorization` header, if any.
///
/// A missing header, a non-UTF-8 value or any scheme other than `Bearer` all count as no token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// authentication_filter
///
/// Runs for every request before route dispatch and decides its security context exactly once:
///
/// 1. Allowlisted paths proceed as `Unauthenticated` without looking at any header.
/// 2. No bearer token: `Unauthenticated`; the authorization guard rejects it later if the
///    endpoint is protected.
/// 3. A token that fails validation is rejected with a generic 401. The specific reason is only
///    logged.
/// 4. A valid token yields `Authenticated` with the claims' subject and roles.
pub async fn authentication_filter(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if state.allowlist.contains(request.uri().path()) {
        request
            .extensions_mut()
            .insert(SecurityContext::Unauthenticated);
        return next.run(request).await;
    }

    let ctx = match bearer_token(request.headers()) {
        None => SecurityContext::Unauthenticated,
        Some(token) => match state.tokens.validate(token) {
            Ok(claims) => SecurityContext::from_claims(claims),
            Err(err) => {
                tracing::debug!(
                    path = %request.uri().path(),
                    reason = %err,
                    "bearer token rejected"
                );
                return ApiError::from(err).into_response();
            }
        },
    };

    request.extensions_mut().insert(ctx);
    next.run(request).await
}

/// The security context attached by [`authentication_filter`]. Requests that never passed the
/// filter read as `Unauthenticated`.
impl<S> FromRequestParts<S> for SecurityContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument. Rejects with 401 when the request carries no
/// authenticated principal, so handlers taking an `AuthUser` can never run anonymously.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match SecurityContext::from_request_parts(parts, state).await? {
            SecurityContext::Authenticated(user) => Ok(user),
            SecurityContext::Unauthenticated => Err(GuardError::MissingToken.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn allowlist_matches_exact_and_wildcard_entries() {
        let allowlist = PathAllowlist::new(["/auth/token", "/swagger-ui/*"]);

        assert!(allowlist.contains("/auth/token"));
        assert!(!allowlist.contains("/auth/token/extra"));
        assert!(allowlist.contains("/swagger-ui"));
        assert!(allowlist.contains("/swagger-ui/index.html"));
        assert!(!allowlist.contains("/swagger-uix"));
        assert!(!allowlist.contains("/api/test/all"));
    }

    #[test]
    fn bearer_token_requires_the_bearer_scheme() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }
}
