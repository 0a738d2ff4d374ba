use crate::{AppState, error::AppError, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{any, delete, get, post},
};

/// Admin Router Module
///
/// Routes exclusively accessible to sessions with role `admin`. Mounted under
/// `/api/admin` and wrapped as a whole in `auth::require_admin`. Unknown paths
/// are matched by explicit catch-all routes so they sit inside that layer too:
/// anyone but an admin gets 403, an admin gets a JSON 404.
pub fn admin_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        // GET /api/admin/users
        // Every account, for the activation queue.
        .route("/users", get(handlers::admin_list_users))
        // POST /api/admin/users/{id}/activate|deactivate
        // Unconditional status overwrite.
        .route("/users/{id}/activate", post(handlers::admin_activate_user))
        .route(
            "/users/{id}/deactivate",
            post(handlers::admin_deactivate_user),
        )
        // GET/POST /api/admin/resources
        // Full listing and direct metadata creation.
        .route(
            "/resources",
            get(handlers::admin_list_resources).post(handlers::admin_create_resource),
        )
        // DELETE /api/admin/resources/{id}
        .route("/resources/{id}", delete(handlers::admin_delete_resource))
        // POST /api/admin/upload
        // Multipart upload; the body is buffered in memory, hence the explicit cap.
        .route(
            "/upload",
            post(handlers::admin_upload_resource).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        // Catch-alls, so unknown paths still pass through the admin guard.
        .route("/", any(admin_not_found))
        .route("/{*rest}", any(admin_not_found))
}

async fn admin_not_found() -> AppError {
    AppError::NotFound
}
