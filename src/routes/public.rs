use crate::{guard::Requirement, handlers, routes::SecuredRouter};

/// Public Router Module
///
/// Endpoints any client may call. `/health` and `/auth/token` are also on the default
/// allowlist, so the authentication filter never inspects their headers; `/api/test/all` still
/// passes through the filter and only skips the role check.
pub fn public_routes() -> SecuredRouter {
    SecuredRouter::new()
        // GET /health
        // Load balancer probe.
        .get("/health", || async { "ok" }, Requirement::Public)
        // POST /auth/token
        // Login: exchanges credentials for a bearer token.
        .post("/auth/token", handlers::login, Requirement::Public)
        // GET /api/test/all
        .get("/api/test/all", handlers::all_access, Requirement::Public)
}

