use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes for any logged-in user, whatever the role or status. The router is
/// wrapped in `auth::require_login`, which puts the resolved `SessionData` into
/// the request extensions for the handlers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /api/me
        // The current session's user id, role and status.
        .route("/me", get(handlers::get_me))
}
