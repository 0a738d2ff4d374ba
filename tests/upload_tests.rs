mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::{TestApp, body_json, multipart_request};
use edu_portal::{
    InMemoryRepository, MockStorageService,
    models::{NewResource, NewUser, Resource, User, UserStatus},
    repository::{RepoResult, Repository, RepositoryError},
};
use serde_json::json;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use uuid::Uuid;

const UPLOAD: &str = "/api/admin/upload";

/// Delegates to an in-memory repository but refuses resource inserts while
/// `fail_inserts` is set, to exercise the path where the file is stored and
/// the metadata is not.
struct FailingInsertRepository {
    inner: InMemoryRepository,
    fail_inserts: AtomicBool,
}

impl FailingInsertRepository {
    fn new(fail_inserts: bool) -> Self {
        Self {
            inner: InMemoryRepository::new(),
            fail_inserts: AtomicBool::new(fail_inserts),
        }
    }
}

#[async_trait]
impl Repository for FailingInsertRepository {
    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.inner.get_user_by_email(email).await
    }
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        self.inner.create_user(user).await
    }
    async fn update_user_status(&self, id: Uuid, status: UserStatus) -> RepoResult<u64> {
        self.inner.update_user_status(id, status).await
    }
    async fn list_users(&self) -> RepoResult<Vec<User>> {
        self.inner.list_users().await
    }
    async fn get_resources_by_subject(
        &self,
        subject: &str,
        published: bool,
    ) -> RepoResult<Vec<Resource>> {
        self.inner.get_resources_by_subject(subject, published).await
    }
    async fn list_resources(&self) -> RepoResult<Vec<Resource>> {
        self.inner.list_resources().await
    }
    async fn create_resource(&self, resource: NewResource) -> RepoResult<Resource> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(RepositoryError::EmptyInsert("resources"));
        }
        self.inner.create_resource(resource).await
    }
    async fn delete_resource(&self, id: Uuid) -> RepoResult<u64> {
        self.inner.delete_resource(id).await
    }
}

// --- Happy path ---

#[tokio::test]
async fn test_upload_stores_file_and_records_resource() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let response = app
        .send(multipart_request(
            UPLOAD,
            &[
                ("resource_type", "correction"),
                ("subject", "pc"),
                ("title", "Devoir 1"),
                ("description", "Corrigé détaillé"),
            ],
            Some(("devoir 1.pdf", "application/pdf", &b"%PDF-1.4 test"[..])),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Fichier uploadé");
    assert_eq!(body["resource"]["filename"], "devoir_1.pdf");
    assert_eq!(body["resource"]["resource_type"], "correction");
    assert_eq!(body["resource"]["subject"], "pc");
    assert_eq!(body["resource"]["title"], "Devoir 1");
    assert_eq!(body["resource"]["description"], "Corrigé détaillé");
    assert_eq!(body["resource"]["is_published"], true);

    let stored = app
        .storage
        .object("corrections/devoir_1.pdf")
        .await
        .expect("object should be stored under the type folder");
    assert_eq!(stored.bytes, b"%PDF-1.4 test");
    assert_eq!(stored.content_type, "application/pdf");

    let resources = app.repo.list_resources().await.unwrap();
    assert_eq!(resources.len(), 1);
}

#[tokio::test]
async fn test_upload_uses_one_folder_per_type() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    for (kind, expected_key) in [
        ("enonce", "enonces/cours.mp4"),
        ("correction", "corrections/cours.mp4"),
        ("video", "videos/cours.mp4"),
        ("audio", "audios/cours.mp4"),
    ] {
        let response = app
            .send(multipart_request(
                UPLOAD,
                &[("resource_type", kind), ("subject", "svt")],
                Some(("cours.mp4", "video/mp4", &b"data"[..])),
                Some(&cookie),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "type {}", kind);
        assert!(app.storage.object(expected_key).await.is_some(), "{}", expected_key);
    }
    assert_eq!(app.storage.object_count().await, 4);
}

#[tokio::test]
async fn test_upload_sanitizes_traversal_filename() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let response = app
        .send(multipart_request(
            UPLOAD,
            &[("resource_type", "enonce"), ("subject", "math")],
            Some(("../../etc/passwd", "text/plain", &b"root:x:0:0"[..])),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert!(app.storage.object("enonces/etc_passwd").await.is_some());
    assert_eq!(body_json(response).await["resource"]["filename"], "etc_passwd");
}

#[tokio::test]
async fn test_upload_folds_accented_filename() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let response = app
        .send(multipart_request(
            UPLOAD,
            &[("resource_type", "enonce"), ("subject", "math")],
            Some(("énoncé maths.pdf", "application/pdf", &b"x"[..])),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert!(app.storage.object("enonces/enonce_maths.pdf").await.is_some());
    assert_eq!(body_json(response).await["resource"]["filename"], "enonce_maths.pdf");
}

#[tokio::test]
async fn test_upload_same_name_overwrites_object_but_adds_row() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    for payload in [b"first".as_slice(), b"second".as_slice()] {
        let response = app
            .send(multipart_request(
                UPLOAD,
                &[("resource_type", "audio"), ("subject", "math")],
                Some(("podcast.mp3", "audio/mpeg", payload)),
                Some(&cookie),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let stored = app.storage.object("audios/podcast.mp3").await.unwrap();
    assert_eq!(stored.bytes, b"second");
    assert_eq!(app.repo.list_resources().await.unwrap().len(), 2);
}

// --- Validation ---

#[tokio::test]
async fn test_upload_rejects_invalid_or_missing_type_before_storage() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    for fields in [
        vec![("resource_type", "podcast"), ("subject", "math")],
        vec![("resource_type", "Video"), ("subject", "math")],
        vec![("subject", "math")],
    ] {
        let response = app
            .send(multipart_request(
                UPLOAD,
                &fields,
                Some(("notes.pdf", "application/pdf", &b"x"[..])),
                Some(&cookie),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "success": false, "message": "Type de ressource invalide" })
        );
    }

    assert_eq!(app.storage.upload_attempts().await, 0);
    assert!(app.repo.list_resources().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let response = app
        .send(multipart_request(
            UPLOAD,
            &[("resource_type", "video"), ("subject", "math")],
            None,
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.storage.upload_attempts().await, 0);
}

#[tokio::test]
async fn test_upload_rejects_filename_that_sanitizes_to_nothing() {
    let app = TestApp::new();
    let cookie = app.admin_cookie().await;

    let response = app
        .send(multipart_request(
            UPLOAD,
            &[("resource_type", "video"), ("subject", "math")],
            Some(("../..", "video/mp4", &b"x"[..])),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "message": "Nom de fichier vide" })
    );
    assert_eq!(app.storage.upload_attempts().await, 0);
}

#[tokio::test]
async fn test_upload_forbidden_for_non_admin_without_storage_call() {
    let app = TestApp::new();
    let cookie = app.user_cookie().await;

    let response = app
        .send(multipart_request(
            UPLOAD,
            &[("resource_type", "video"), ("subject", "math")],
            Some(("cours.mp4", "video/mp4", &b"x"[..])),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.storage.upload_attempts().await, 0);
}

// --- Failures ---

#[tokio::test]
async fn test_upload_storage_failure_returns_500_and_records_nothing() {
    let app = TestApp::with_parts(
        Arc::new(InMemoryRepository::new()),
        MockStorageService::new_failing(),
    );
    let cookie = app.admin_cookie().await;

    let response = app
        .send(multipart_request(
            UPLOAD,
            &[("resource_type", "enonce"), ("subject", "math")],
            Some(("sujet.pdf", "application/pdf", &b"x"[..])),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "message": "Échec de l'upload du fichier" })
    );

    assert_eq!(app.storage.upload_attempts().await, 1);
    assert!(app.repo.list_resources().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_metadata_failure_removes_stored_object() {
    let app = TestApp::with_parts(
        Arc::new(FailingInsertRepository::new(true)),
        MockStorageService::new(),
    );
    let cookie = app.admin_cookie().await;

    let response = app
        .send(multipart_request(
            UPLOAD,
            &[("resource_type", "video"), ("subject", "math")],
            Some(("cours.mp4", "video/mp4", &b"x"[..])),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["success"], false);

    assert_eq!(app.storage.upload_attempts().await, 1);
    assert!(app.storage.object("videos/cours.mp4").await.is_none());
}

#[tokio::test]
async fn test_upload_metadata_failure_keeps_object_of_existing_resource() {
    let repo = Arc::new(FailingInsertRepository::new(false));
    let app = TestApp::with_parts(repo.clone(), MockStorageService::new());
    let cookie = app.admin_cookie().await;
    let form = [("resource_type", "enonce"), ("subject", "math")];

    let first = app
        .send(multipart_request(
            UPLOAD,
            &form,
            Some(("sujet.pdf", "application/pdf", &b"v1"[..])),
            Some(&cookie),
        ))
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    repo.fail_inserts.store(true, Ordering::SeqCst);
    let second = app
        .send(multipart_request(
            UPLOAD,
            &form,
            Some(("sujet.pdf", "application/pdf", &b"v2"[..])),
            Some(&cookie),
        ))
        .await;
    assert_eq!(second.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // The surviving row must still point at a stored file.
    let rows = app.repo.list_resources().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].filename.as_deref(), Some("sujet.pdf"));
    assert!(app.storage.object("enonces/sujet.pdf").await.is_some());
}
