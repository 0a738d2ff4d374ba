use crate::{
    AppState,
    auth,
    error::{AppError, AppResult},
    models::{
        self, CreateResourceRequest, Credentials, LoginResponse, MessageResponse, NewResource,
        NewUser, Resource, ResourceResponse, ResourceType, SessionInfo, User, UserStatus,
    },
    repository::RepositoryError,
    session::{Session, SessionData},
    storage::secure_filename,
};
use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

/// Returned as `token` on login. The session cookie is the real credential.
pub const PLACEHOLDER_TOKEN: &str = "fake-jwt-token";

const DEFAULT_SUBJECT: &str = "math";

const MSG_EMAIL_TAKEN: &str = "Email déjà utilisé";

// --- Filter Structs ---

/// ResourceFilter
///
/// Query parameters of the public listing (GET /api/resources).
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResourceFilter {
    /// Subject tag to match exactly. Defaults to `math`.
    pub subject: Option<String>,
    /// Only the literal `true` selects published resources; any other value selects unpublished ones. Defaults to `true`.
    pub published: Option<String>,
}

impl ResourceFilter {
    fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or(DEFAULT_SUBJECT)
    }

    fn published(&self) -> bool {
        self.published.as_deref().is_none_or(|value| value == "true")
    }
}

// --- Authentication ---

/// login
///
/// [Public Route] Verifies credentials and opens a session holding the user's
/// id, role and status. An unknown email and a wrong password produce the same 401.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Bad credentials", body = MessageResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    mut session: Session,
    Json(payload): Json<Credentials>,
) -> AppResult<Json<LoginResponse>> {
    let Some(user) = state.repo.get_user_by_email(&payload.email).await? else {
        tracing::info!("login rejected: unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !auth::verify_password(&payload.password, &user.password).await? {
        tracing::info!(user = %user.id, "login rejected: password mismatch");
        return Err(AppError::InvalidCredentials);
    }

    session
        .insert(SessionData {
            user_id: user.id,
            role: user.role,
            status: user.status,
        })
        .await?;

    tracing::info!(user = %user.id, role = %user.role, status = %user.status, "user logged in");

    Ok(Json(LoginResponse {
        success: true,
        token: PLACEHOLDER_TOKEN.to_string(),
        role: user.role,
        status: user.status,
    }))
}

/// register
///
/// [Public Route] Creates a pending, non-admin account. Rejects an email that
/// is already taken.
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = Credentials,
    responses(
        (status = 200, description = "Registered", body = MessageResponse),
        (status = 400, description = "Email already used", body = MessageResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> AppResult<Json<MessageResponse>> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest("Email et mot de passe requis".to_string()));
    }

    if state.repo.get_user_by_email(&payload.email).await?.is_some() {
        return Err(AppError::BadRequest(MSG_EMAIL_TAKEN.to_string()));
    }

    let hash = auth::hash_password(&payload.password).await?;
    // A concurrent registration can still win between the check and the insert.
    let user = match state
        .repo
        .create_user(NewUser::registration(payload.email, hash))
        .await
    {
        Ok(user) => user,
        Err(RepositoryError::Conflict(_)) => {
            return Err(AppError::BadRequest(MSG_EMAIL_TAKEN.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user = %user.id, "user registered (pending)");
    Ok(Json(MessageResponse::ok("Inscription réussie")))
}

/// logout
///
/// [Public Route] Drops the current session, if any.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(mut session: Session) -> AppResult<Json<MessageResponse>> {
    if let Some(data) = session.get() {
        tracing::info!(user = %data.user_id, "user logged out");
    }
    session.clear().await?;
    Ok(Json(MessageResponse::ok("Déconnexion réussie")))
}

/// get_me
///
/// [Authenticated Route] Echoes the session resolved by `require_login`.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current session", body = SessionInfo),
        (status = 401, description = "No session", body = MessageResponse)
    )
)]
pub async fn get_me(Extension(current): Extension<SessionData>) -> Json<SessionInfo> {
    Json(SessionInfo {
        success: true,
        user_id: current.user_id,
        role: current.role,
        status: current.status,
    })
}

// --- Public Resources ---

/// get_resources
///
/// [Public Route] Lists resources of one subject with the requested publication state.
#[utoipa::path(
    get,
    path = "/api/resources",
    params(ResourceFilter),
    responses((status = 200, description = "Matching resources", body = [Resource]))
)]
pub async fn get_resources(
    State(state): State<AppState>,
    Query(filter): Query<ResourceFilter>,
) -> AppResult<Json<Vec<models::Resource>>> {
    let resources = state
        .repo
        .get_resources_by_subject(filter.subject(), filter.published())
        .await?;
    Ok(Json(resources))
}

// --- Admin: Users ---

/// admin_list_users
///
/// [Admin Route] Every user row. Password hashes are never serialized.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Not an admin", body = MessageResponse)
    )
)]
pub async fn admin_list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.repo.list_users().await?))
}

async fn set_user_status(
    state: &AppState,
    admin: &SessionData,
    user_id: Uuid,
    status: UserStatus,
) -> AppResult<()> {
    let touched = state.repo.update_user_status(user_id, status).await?;
    if touched == 0 {
        tracing::warn!(admin = %admin.user_id, user = %user_id, %status, "status update matched no user");
    } else {
        tracing::info!(admin = %admin.user_id, user = %user_id, %status, "user status updated");
    }
    Ok(())
}

/// admin_activate_user
///
/// [Admin Route] Sets the user's status to `active`. Succeeds for unknown ids too.
#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/activate",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Activated", body = MessageResponse),
        (status = 403, description = "Not an admin", body = MessageResponse)
    )
)]
pub async fn admin_activate_user(
    State(state): State<AppState>,
    Extension(admin): Extension<SessionData>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    set_user_status(&state, &admin, id, UserStatus::Active).await?;
    Ok(Json(MessageResponse::ok("Utilisateur activé")))
}

/// admin_deactivate_user
///
/// [Admin Route] Sets the user's status to `inactive`. Succeeds for unknown ids too.
#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/deactivate",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deactivated", body = MessageResponse),
        (status = 403, description = "Not an admin", body = MessageResponse)
    )
)]
pub async fn admin_deactivate_user(
    State(state): State<AppState>,
    Extension(admin): Extension<SessionData>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    set_user_status(&state, &admin, id, UserStatus::Inactive).await?;
    Ok(Json(MessageResponse::ok("Utilisateur désactivé")))
}

// --- Admin: Resources ---

/// admin_list_resources
///
/// [Admin Route] Every resource, published or not, any subject.
#[utoipa::path(
    get,
    path = "/api/admin/resources",
    responses(
        (status = 200, description = "All resources", body = [Resource]),
        (status = 403, description = "Not an admin", body = MessageResponse)
    )
)]
pub async fn admin_list_resources(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<models::Resource>>> {
    Ok(Json(state.repo.list_resources().await?))
}

/// admin_create_resource
///
/// [Admin Route] Records resource metadata as sent, published immediately.
/// Neither `resource_type` nor any other field is validated on this path.
#[utoipa::path(
    post,
    path = "/api/admin/resources",
    request_body = CreateResourceRequest,
    responses(
        (status = 200, description = "Created", body = ResourceResponse),
        (status = 403, description = "Not an admin", body = MessageResponse)
    )
)]
pub async fn admin_create_resource(
    State(state): State<AppState>,
    Json(payload): Json<CreateResourceRequest>,
) -> AppResult<Json<ResourceResponse>> {
    let resource = state.repo.create_resource(NewResource::from(payload)).await?;
    tracing::info!(resource = %resource.id, "resource created");

    Ok(Json(ResourceResponse {
        success: true,
        message: None,
        resource,
    }))
}

/// admin_delete_resource
///
/// [Admin Route] Deletes the resource row. An unknown id still reports success.
/// The stored file, if any, is left in the bucket.
#[utoipa::path(
    delete,
    path = "/api/admin/resources/{id}",
    params(("id" = Uuid, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not an admin", body = MessageResponse)
    )
)]
pub async fn admin_delete_resource(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let deleted = state.repo.delete_resource(id).await?;
    tracing::info!(resource = %id, deleted, "resource delete processed");
    Ok(Json(MessageResponse::ok("Ressource supprimée")))
}

// --- Admin: Upload ---

#[derive(Default)]
struct UploadParts {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
    resource_type: Option<String>,
    subject: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

fn malformed(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Formulaire invalide: {}", e.body_text()))
}

async fn read_upload(mut multipart: Multipart) -> AppResult<UploadParts> {
    let mut parts = UploadParts::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                parts.file_name = Some(field.file_name().unwrap_or_default().to_string());
                parts.content_type = field.content_type().map(str::to_string);
                parts.bytes = field.bytes().await.map_err(malformed)?.to_vec();
            }
            "resource_type" => parts.resource_type = Some(field.text().await.map_err(malformed)?),
            "subject" => parts.subject = Some(field.text().await.map_err(malformed)?),
            "title" => parts.title = Some(field.text().await.map_err(malformed)?),
            "description" => parts.description = Some(field.text().await.map_err(malformed)?),
            other => tracing::debug!(field = other, "ignoring unexpected upload field"),
        }
    }

    Ok(parts)
}

/// admin_upload_resource
///
/// [Admin Route] Stores an uploaded file under `{folder}/{filename}`, the folder
/// being derived from `resource_type`, then records its metadata.
///
/// *Validation*: the type, the presence of a file and a non-empty sanitized
/// filename are all checked before the storage service is called.
///
/// *Partial failure*: if the metadata insert fails after the file was stored,
/// the request fails with 500. The object is deleted again (best effort) only
/// when this upload created it; an object that already backed another resource
/// is kept.
#[utoipa::path(
    post,
    path = "/api/admin/upload",
    request_body(content = models::UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Uploaded and recorded", body = ResourceResponse),
        (status = 400, description = "Invalid type or filename", body = MessageResponse),
        (status = 403, description = "Not an admin", body = MessageResponse),
        (status = 500, description = "Storage failure", body = MessageResponse)
    )
)]
pub async fn admin_upload_resource(
    State(state): State<AppState>,
    Extension(admin): Extension<SessionData>,
    multipart: Multipart,
) -> AppResult<Json<ResourceResponse>> {
    let form = read_upload(multipart).await?;

    let resource_type: ResourceType = form
        .resource_type
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| AppError::BadRequest("Type de ressource invalide".to_string()))?;

    let raw_name = form
        .file_name
        .ok_or_else(|| AppError::BadRequest("Aucun fichier fourni".to_string()))?;
    let filename = secure_filename(&raw_name);
    if filename.is_empty() {
        return Err(AppError::BadRequest("Nom de fichier vide".to_string()));
    }

    let key = format!("{}/{}", resource_type.folder(), filename);
    let content_type = form
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let size = form.bytes.len();

    // Same-name uploads share one object; only a key this request created may be cleaned up.
    let replaced = state.storage.exists(&key).await?;
    state.storage.upload(&key, form.bytes, &content_type).await?;
    tracing::info!(admin = %admin.user_id, key = %key, size, "resource file uploaded");

    let new_resource = NewResource {
        title: form.title.unwrap_or_default(),
        description: form.description,
        subject: form.subject.unwrap_or_default(),
        resource_type: resource_type.as_str().to_string(),
        filename: Some(filename),
        is_published: true,
    };

    let resource = match state.repo.create_resource(new_resource).await {
        Ok(resource) => resource,
        Err(e) if replaced => {
            tracing::error!(key = %key, "metadata insert failed after overwriting an existing object: {}", e);
            return Err(e.into());
        }
        Err(e) => {
            tracing::error!(key = %key, "metadata insert failed after upload, removing object: {}", e);
            if let Err(cleanup) = state.storage.delete(&key).await {
                tracing::error!(key = %key, "orphaned object left in bucket: {}", cleanup);
            }
            return Err(e.into());
        }
    };

    Ok(Json(ResourceResponse {
        success: true,
        message: Some("Fichier uploadé".to_string()),
        resource,
    }))
}
