use crate::{guard::Requirement, handlers, routes::SecuredRouter};

/// Authenticated Router Module
///
/// Routes open to any principal holding a valid token, whatever its roles. Handlers here take
/// the `AuthUser` extractor, which rejects anonymous requests on its own as a second line of
/// defence behind the guard.
pub fn authenticated_routes() -> SecuredRouter {
    SecuredRouter::new()
        // GET /me
        // Identity and roles carried by the presented token.
        .get("/me", handlers::get_me, Requirement::Authenticated)
}
