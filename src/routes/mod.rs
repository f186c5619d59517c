//! Router Module Index
//!
//! Organizes routing into access tiers. Every route is declared through [`SecuredRouter`], which
//! records the endpoint's requirement in the access policy at the same time it registers the
//! handler, so a route cannot exist without a declared requirement.

use axum::{
    Router,
    handler::Handler,
    http::Method,
    routing::{self, MethodRouter},
};

use crate::{
    AppState,
    guard::{AccessPolicy, Requirement},
};

/// Routes reachable without a token.
pub mod public;

/// Routes that need any authenticated principal.
pub mod authenticated;

/// Routes gated on role membership.
pub mod roles;

/// A router paired with the access policy of the routes it holds.
#[derive(Default)]
pub struct SecuredRouter {
    router: Router<AppState>,
    policy: AccessPolicy,
}

impl SecuredRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a `GET` handler at `path` under `requirement`. `HEAD` inherits the rule.
    pub fn get<H, T>(self, path: &str, handler: H, requirement: Requirement) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.register(Method::GET, path, routing::get(handler), requirement)
    }

    /// Registers a `POST` handler at `path` under `requirement`.
    pub fn post<H, T>(self, path: &str, handler: H, requirement: Requirement) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.register(Method::POST, path, routing::post(handler), requirement)
    }

    // The method router and the declared rule are built from the same `method`.
    fn register(
        mut self,
        method: Method,
        path: &str,
        handler: MethodRouter<AppState>,
        requirement: Requirement,
    ) -> Self {
        self.router = self.router.route(path, handler);
        self.policy.declare(method, path, requirement);
        self
    }

    pub fn merge(mut self, other: SecuredRouter) -> Self {
        self.router = self.router.merge(other.router);
        self.policy.extend(other.policy);
        self
    }

    pub fn into_parts(self) -> (Router<AppState>, AccessPolicy) {
        (self.router, self.policy)
    }
}

/// The complete API surface.
pub fn api_routes() -> SecuredRouter {
    SecuredRouter::new()
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(roles::role_routes())
}
