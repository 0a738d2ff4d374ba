use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, postgres::PgRow};
use std::{fmt, str::FromStr};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enumerations ---

/// Role
///
/// The RBAC field of a user. Only `admin` unlocks the `/api/admin/*` surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// UserStatus
///
/// Account lifecycle: `pending` after registration, then toggled between
/// `active` and `inactive` by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum UserStatus {
    #[default]
    Pending,
    Active,
    Inactive,
}

/// ResourceType
///
/// The closed set of upload kinds. Each one owns a folder in the storage bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ResourceType {
    Enonce,
    Correction,
    Video,
    Audio,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} value: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Enonce => "enonce",
            ResourceType::Correction => "correction",
            ResourceType::Video => "video",
            ResourceType::Audio => "audio",
        }
    }

    /// Storage folder that receives files of this type.
    pub fn folder(&self) -> &'static str {
        match self {
            ResourceType::Enonce => "enonces",
            ResourceType::Correction => "corrections",
            ResourceType::Video => "videos",
            ResourceType::Audio => "audios",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(ParseEnumError { kind: "role", value: other.to_string() }),
        }
    }
}

impl FromStr for UserStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UserStatus::Pending),
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            other => Err(ParseEnumError { kind: "status", value: other.to_string() }),
        }
    }
}

impl FromStr for ResourceType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enonce" => Ok(ResourceType::Enonce),
            "correction" => Ok(ResourceType::Correction),
            "video" => Ok(ResourceType::Video),
            "audio" => Ok(ResourceType::Audio),
            other => Err(ParseEnumError { kind: "resource_type", value: other.to_string() }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A row of the `users` table. The password hash is readable from storage but
/// never serialized into an API response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password: String,
    pub role: Role,
    pub status: UserStatus,
}

// `role` and `status` are TEXT columns, decoded through FromStr.
impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let status: String = row.try_get("status")?;

        Ok(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password: row.try_get("password")?,
            role: role.parse().map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            status: status.parse().map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        })
    }
}

/// NewUser
///
/// Insert payload for the `users` table. Serialized as-is by the REST backend,
/// so unlike `User` it does carry the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub status: UserStatus,
}

impl NewUser {
    /// Every self-registered account starts as a pending, non-admin user.
    pub fn registration(email: String, password_hash: String) -> Self {
        Self {
            email,
            password: password_hash,
            role: Role::User,
            status: UserStatus::Pending,
        }
    }
}

/// Resource
///
/// A row of the `resources` table. `resource_type` stays a free string here:
/// direct metadata creation does not validate it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    pub resource_type: String,
    pub filename: Option<String>,
    pub is_published: bool,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub created_at: Option<DateTime<Utc>>,
}

/// NewResource
///
/// Insert payload for the `resources` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewResource {
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    pub resource_type: String,
    pub filename: Option<String>,
    pub is_published: bool,
}

// --- Request Payloads (Input Schemas) ---

/// Credentials
///
/// Body of both `POST /api/login` and `POST /api/register`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Credentials {
    #[serde(default)]
    #[schema(example = "eleve@example.com")]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// CreateResourceRequest
///
/// Body of `POST /api/admin/resources`. Every field is optional on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateResourceRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[schema(example = "math")]
    pub subject: String,
    #[serde(default)]
    #[schema(example = "enonce")]
    pub resource_type: String,
    #[serde(default)]
    pub filename: Option<String>,
}

impl From<CreateResourceRequest> for NewResource {
    fn from(req: CreateResourceRequest) -> Self {
        NewResource {
            title: req.title,
            description: req.description,
            subject: req.subject,
            resource_type: req.resource_type,
            filename: req.filename,
            is_published: true,
        }
    }
}

/// UploadForm
///
/// Documentation-only schema for the multipart body of `POST /api/admin/upload`.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    #[schema(example = "correction")]
    pub resource_type: String,
    #[schema(example = "math")]
    pub subject: String,
    pub title: String,
    pub description: String,
}

// --- Response Payloads (Output Schemas) ---

/// MessageResponse
///
/// The `{success, message}` envelope shared by acknowledgements and errors.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

/// LoginResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub success: bool,
    /// Placeholder kept for frontend compatibility; the session cookie is the credential.
    pub token: String,
    pub role: Role,
    pub status: UserStatus,
}

/// ResourceResponse
///
/// Returned by both direct creation and the upload flow.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ResourceResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub resource: Resource,
}

/// SessionInfo
///
/// Output of `GET /api/me`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionInfo {
    pub success: bool,
    pub user_id: Uuid,
    pub role: Role,
    pub status: UserStatus,
}
