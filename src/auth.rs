use axum::{extract::Request, middleware::Next, response::Response};

use crate::{
    error::{AppError, AppResult},
    session::{Session, SessionData},
};

// --- Passwords ---

/// Hashes a password with bcrypt on the blocking pool.
pub async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("hash task failed: {}", e)))?
        .map_err(|e| AppError::PasswordHashing(e.to_string()))
}

/// Checks a password against a stored bcrypt hash.
///
/// A stored value bcrypt cannot parse is treated as a mismatch, so a corrupt or
/// foreign hash locks the account out instead of failing the request.
pub async fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &stored_hash))
        .await
        .map_err(|e| AppError::Internal(format!("verify task failed: {}", e)))?;

    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!("stored password hash is not a valid bcrypt hash: {}", e);
            Ok(false)
        }
    }
}

// --- Route guards ---

/// require_login
///
/// Middleware for the authenticated router: lets the request through only when
/// it carries a valid session, and exposes that session as a request extension.
/// Otherwise responds 401.
pub async fn require_login(
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let data = session.get().cloned().ok_or(AppError::Unauthorized)?;
    request.extensions_mut().insert(data);
    Ok(next.run(request).await)
}

/// require_admin
///
/// Middleware wrapped around the whole admin router, catch-all routes included. Any
/// request without a session whose role is `admin` gets the same 403, whatever
/// the method or path.
pub async fn require_admin(
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match session.get() {
        Some(data) if data.is_admin() => {
            tracing::debug!(admin = %data.user_id, uri = %request.uri(), "admin access granted");
            let data: SessionData = data.clone();
            request.extensions_mut().insert(data);
            Ok(next.run(request).await)
        }
        Some(data) => {
            tracing::warn!(user = %data.user_id, uri = %request.uri(), "admin access denied");
            Err(AppError::Forbidden)
        }
        None => {
            tracing::debug!(uri = %request.uri(), "admin access denied (no session)");
            Err(AppError::Forbidden)
        }
    }
}
