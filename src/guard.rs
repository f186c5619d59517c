//! Per-endpoint role authorization.
//!
//! Endpoints declare their requirement once, in a static `(method, route) → Requirement` map
//! built alongside the router. The guard runs as a route layer, after dispatch has resolved the
//! matched route and after the authentication filter has populated the security context.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{MatchedPath, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    context::SecurityContext,
    error::ApiError,
    models::{RoleSet, role_set},
};

/// What an endpoint demands of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Anyone, authenticated or not.
    Public,
    /// Any authenticated principal, whatever its roles.
    Authenticated,
    /// An authenticated principal holding at least one of these roles. An empty set is
    /// equivalent to `Authenticated`.
    AnyOf(RoleSet),
}

impl Requirement {
    /// OR-set requirement. An empty set leaves only the authentication requirement.
    pub fn any_of<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles = role_set(labels);
        if roles.is_empty() {
            Requirement::Authenticated
        } else {
            Requirement::AnyOf(roles)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("no authenticated principal")]
    MissingToken,
    #[error("principal lacks every required role")]
    InsufficientRole,
}

/// Decides whether `ctx` satisfies `requirement`.
pub fn authorize(requirement: &Requirement, ctx: &SecurityContext) -> Result<(), GuardError> {
    match (requirement, ctx.user()) {
        (Requirement::Public, _) => Ok(()),
        (_, None) => Err(GuardError::MissingToken),
        (Requirement::Authenticated, Some(_)) => Ok(()),
        (Requirement::AnyOf(required), Some(user)) => {
            if required.is_empty() || user.has_any_role(required) {
                Ok(())
            } else {
                Err(GuardError::InsufficientRole)
            }
        }
    }
}

/// AccessPolicy
///
/// Immutable after startup. Routes missing from the map fall back to `Authenticated`.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: HashMap<(Method, String), Requirement>,
    fallback: Requirement,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            rules: HashMap::new(),
            fallback: Requirement::Authenticated,
        }
    }
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, method: Method, route: impl Into<String>, requirement: Requirement) {
        self.rules.insert((method, route.into()), requirement);
    }

    pub fn extend(&mut self, other: AccessPolicy) {
        self.rules.extend(other.rules);
    }

    /// Looks up the requirement for a matched route. `HEAD` is served by `GET` handlers, so it
    /// inherits their rule.
    pub fn requirement(&self, method: &Method, route: &str) -> &Requirement {
        let key = (method.clone(), route.to_string());
        self.rules
            .get(&key)
            .or_else(|| {
                (*method == Method::HEAD)
                    .then(|| self.rules.get(&(Method::GET, route.to_string())))
                    .flatten()
            })
            .unwrap_or(&self.fallback)
    }
}

/// authorization_guard
///
/// Route-layer middleware. A request without a security context in its extensions is treated
/// as unauthenticated.
pub async fn authorization_guard(
    State(policy): State<Arc<AccessPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let requirement = policy.requirement(request.method(), &route);
    let ctx = request
        .extensions()
        .get::<SecurityContext>()
        .cloned()
        .unwrap_or_default();

    match authorize(requirement, &ctx) {
        Ok(()) => next.run(request).await,
        Err(err) => {
            tracing::warn!(
                route = %route,
                subject = ctx.user().map(|u| u.id.as_str()).unwrap_or("-"),
                reason = %err,
                "request rejected by authorization guard"
            );
            ApiError::from(err).into_response()
        }
    }
}
