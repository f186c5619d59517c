use crate::{models::RoleSet, token::Claims};

/// SecurityContext
///
/// What the authentication filter concluded about one request. Inserted into that request's
/// extensions and dropped with it; never shared between requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SecurityContext {
    #[default]
    Unauthenticated,
    Authenticated(AuthUser),
}

/// AuthUser
///
/// The identity reconstructed from validated token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Token subject: the principal's opaque id.
    pub id: String,
    pub roles: RoleSet,
}

impl SecurityContext {
    pub fn from_claims(claims: Claims) -> Self {
        SecurityContext::Authenticated(AuthUser {
            id: claims.subject,
            roles: claims.roles,
        })
    }

    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            SecurityContext::Authenticated(user) => Some(user),
            SecurityContext::Unauthenticated => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }
}

impl AuthUser {
    /// True if the user holds at least one of `required`.
    pub fn has_any_role(&self, required: &RoleSet) -> bool {
        !self.roles.is_disjoint(required)
    }
}
