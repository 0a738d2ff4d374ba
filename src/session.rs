use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use tokio::sync::RwLock;
use tower_cookies::{
    Cookie, Cookies,
    cookie::SameSite,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Role, UserStatus},
};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "portal_session";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not sign session: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("cookie layer missing: {0}")]
    CookieLayer(&'static str),
}

/// SessionData
///
/// What the portal remembers about a logged-in browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: Uuid,
    pub role: Role,
    pub status: UserStatus,
}

impl SessionData {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// SessionStore
///
/// Pluggable backend behind the session cookie. `save` returns the opaque token
/// written to the cookie; `load` resolves it back. An unknown, expired or forged
/// token loads as `None` rather than an error.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, token: &str) -> Result<Option<SessionData>, SessionError>;
    async fn save(&self, data: &SessionData) -> Result<String, SessionError>;
    async fn destroy(&self, token: &str) -> Result<(), SessionError>;
}

pub type SessionState = Arc<dyn SessionStore>;

// --- In-memory store ---

/// MemorySessionStore
///
/// Sessions live in a process-local map keyed by a random token. Used by the
/// tests and by local development; everything is lost on restart.
pub struct MemorySessionStore {
    ttl: Duration,
    entries: RwLock<HashMap<String, (SessionData, Instant)>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(7 * 24 * 3600))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionData>, SessionError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(token)
            .filter(|(_, created)| created.elapsed() < self.ttl)
            .map(|(data, _)| data.clone()))
    }

    async fn save(&self, data: &SessionData) -> Result<String, SessionError> {
        let token = Uuid::new_v4().simple().to_string();
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, created)| created.elapsed() < self.ttl);
        entries.insert(token.clone(), (data.clone(), Instant::now()));
        Ok(token)
    }

    async fn destroy(&self, token: &str) -> Result<(), SessionError> {
        self.entries.write().await.remove(token);
        Ok(())
    }
}

// --- Signed cookie store ---

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: Uuid,
    role: Role,
    status: UserStatus,
    iat: u64,
    exp: u64,
}

/// SignedCookieStore
///
/// Stateless store: the session itself is the cookie value, an HS256-signed
/// token holding `user_id`, `role`, `status` and an expiry. Any replica holding
/// the same secret can read it. `destroy` only removes the cookie client-side.
pub struct SignedCookieStore {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl SignedCookieStore {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[async_trait]
impl SessionStore for SignedCookieStore {
    async fn load(&self, token: &str) -> Result<Option<SessionData>, SessionError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        match decode::<SessionClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(Some(SessionData {
                user_id: data.claims.sub,
                role: data.claims.role,
                status: data.claims.status,
            })),
            Err(e) => {
                tracing::debug!("rejecting session cookie: {:?}", e.kind());
                Ok(None)
            }
        }
    }

    async fn save(&self, data: &SessionData) -> Result<String, SessionError> {
        let iat = unix_now();
        let claims = SessionClaims {
            sub: data.user_id,
            role: data.role,
            status: data.status,
            iat,
            exp: iat + self.ttl.as_secs(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    async fn destroy(&self, _token: &str) -> Result<(), SessionError> {
        Ok(())
    }
}

// --- Extractor ---

/// Session
///
/// The per-request session context handed to handlers and middleware. It wraps
/// the configured `SessionStore` and the request's cookie jar.
///
/// Requires `CookieManagerLayer` on the router.
pub struct Session {
    store: SessionState,
    cookies: Cookies,
    token: Option<String>,
    data: Option<SessionData>,
}

impl Session {
    /// The current session, if the request carried a valid one.
    pub fn get(&self) -> Option<&SessionData> {
        self.data.as_ref()
    }

    /// Starts a new session, replacing any token the request already had.
    pub async fn insert(&mut self, data: SessionData) -> Result<(), AppError> {
        if let Some(old) = self.token.take() {
            self.store.destroy(&old).await?;
        }

        let token = self.store.save(&data).await?;
        self.cookies.add(
            Cookie::build((SESSION_COOKIE, token.clone()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build(),
        );

        self.token = Some(token);
        self.data = Some(data);
        Ok(())
    }

    /// Ends the session on both the store and the client.
    pub async fn clear(&mut self) -> Result<(), AppError> {
        if let Some(token) = self.token.take() {
            self.store.destroy(&token).await?;
        }
        self.cookies
            .remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
        self.data = None;
        Ok(())
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| SessionError::CookieLayer(msg))?;
        let store = SessionState::from_ref(state);

        let token = cookies
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty());

        let data = match &token {
            Some(token) => store.load(token).await?,
            None => None,
        };

        Ok(Session {
            store,
            cookies,
            token,
            data,
        })
    }
}
