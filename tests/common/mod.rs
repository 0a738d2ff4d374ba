#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, header},
};
use edu_portal::{
    AppConfig, AppState, InMemoryRepository, MemorySessionStore, MockStorageService,
    create_router,
    models::{NewUser, Resource, Role, User, UserStatus},
    repository::RepositoryState,
    session::{SESSION_COOKIE, SessionData, SessionState, SessionStore},
};
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const BOUNDARY: &str = "X-PORTAL-TEST-BOUNDARY";

/// TestApp
///
/// The full router over in-memory collaborators. The handles stay available
/// to the test for seeding and inspection.
pub struct TestApp {
    pub router: Router,
    pub repo: RepositoryState,
    pub storage: MockStorageService,
    pub sessions: Arc<MemorySessionStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_parts(Arc::new(InMemoryRepository::new()), MockStorageService::new())
    }

    pub fn with_resources(resources: Vec<Resource>) -> Self {
        Self::with_parts(
            Arc::new(InMemoryRepository::with_resources(resources)),
            MockStorageService::new(),
        )
    }

    pub fn with_parts(repo: RepositoryState, storage: MockStorageService) -> Self {
        let sessions = Arc::new(MemorySessionStore::default());
        let state = AppState {
            repo: repo.clone(),
            storage: Arc::new(storage.clone()),
            sessions: sessions.clone() as SessionState,
            config: AppConfig::default(),
        };

        Self {
            router: create_router(state),
            repo,
            storage,
            sessions,
        }
    }

    /// Inserts a user directly, hashed at bcrypt's minimum cost to keep tests fast.
    pub async fn seed_user(&self, email: &str, password: &str, role: Role, status: UserStatus) -> User {
        let hash = bcrypt::hash(password, 4).unwrap();
        self.repo
            .create_user(NewUser {
                email: email.to_string(),
                password: hash,
                role,
                status,
            })
            .await
            .unwrap()
    }

    /// A `Cookie` header value for a fresh session of `user`.
    pub async fn cookie_for(&self, user: &User) -> String {
        let token = self
            .sessions
            .save(&SessionData {
                user_id: user.id,
                role: user.role,
                status: user.status,
            })
            .await
            .unwrap();
        format!("{}={}", SESSION_COOKIE, token)
    }

    pub async fn admin_cookie(&self) -> String {
        let admin = self
            .seed_user("admin@portal.test", "admin-pass", Role::Admin, UserStatus::Active)
            .await;
        self.cookie_for(&admin).await
    }

    pub async fn user_cookie(&self) -> String {
        let user = self
            .seed_user("eleve@portal.test", "eleve-pass", Role::User, UserStatus::Active)
            .await;
        self.cookie_for(&user).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn request(method: Method, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(
    method: Method,
    uri: &str,
    body: serde_json::Value,
    cookie: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Builds a `multipart/form-data` upload. `file` is `(filename, content_type, bytes)`.
pub fn multipart_request(
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
    cookie: Option<&str>,
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `name=value` of the session cookie set by a response, if any.
pub fn session_cookie_from(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(SESSION_COOKIE))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub fn resource(subject: &str, resource_type: &str, is_published: bool) -> Resource {
    Resource {
        id: Uuid::new_v4(),
        title: format!("{} {}", subject, resource_type),
        description: None,
        subject: subject.to_string(),
        resource_type: resource_type.to_string(),
        filename: None,
        is_published,
        created_at: None,
    }
}
