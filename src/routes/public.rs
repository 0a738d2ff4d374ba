use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. Mounted under `/api`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /api/login
        // Verifies credentials and sets the session cookie.
        .route("/login", post(handlers::login))
        // POST /api/register
        // Creates a pending account with role `user`.
        .route("/register", post(handlers::register))
        // POST /api/logout
        // Clears the session cookie and its store entry.
        .route("/logout", post(handlers::logout))
        // GET /api/resources?subject=...&published=...
        // Exact-match listing; defaults to published math resources.
        .route("/resources", get(handlers::get_resources))
}
