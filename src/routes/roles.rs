use crate::{guard::Requirement, handlers, routes::SecuredRouter};

pub const ROLE_USER: &str = "USER";
pub const ROLE_MODERATOR: &str = "MODERATOR";
pub const ROLE_ADMIN: &str = "ADMIN";

/// Role-gated Router Module
///
/// Each requirement is a flat OR-set. Roles carry no hierarchy: ADMIN reaches the moderator
/// endpoint only because it is listed there.
pub fn role_routes() -> SecuredRouter {
    SecuredRouter::new()
        .get(
            "/api/test/user",
            handlers::user_access,
            Requirement::any_of([ROLE_USER, ROLE_MODERATOR, ROLE_ADMIN]),
        )
        .get(
            "/api/test/mod",
            handlers::moderator_access,
            Requirement::any_of([ROLE_MODERATOR, ROLE_ADMIN]),
        )
        .get(
            "/api/test/admin",
            handlers::admin_access,
            Requirement::any_of([ROLE_ADMIN]),
        )
}
