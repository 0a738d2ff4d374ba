use crate::models::{NewResource, NewUser, Resource, User, UserStatus};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

mod memory;
mod postgres;
mod supabase;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;
pub use supabase::SupabaseRepository;

/// RepositoryError
///
/// Failure of the remote table service. Never surfaced verbatim to clients.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("table API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The table API answered an insert without echoing the inserted row.
    #[error("{0} insert returned no row")]
    EmptyInsert(&'static str),

    /// An insert hit a unique constraint (duplicate email).
    #[error("{0} insert conflicts with an existing row")]
    Conflict(&'static str),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// One method per table operation the portal performs. Every method is a single
/// round-trip to the backing service; none of them retries.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across
/// Axum's request tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Fails with `RepositoryError::Conflict` when the email is already taken.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    /// Overwrites the status. Returns the number of rows touched, zero for an unknown id.
    async fn update_user_status(&self, id: Uuid, status: UserStatus) -> RepoResult<u64>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;

    // --- Resources ---
    /// Exact match on both `subject` and `is_published`.
    async fn get_resources_by_subject(
        &self,
        subject: &str,
        published: bool,
    ) -> RepoResult<Vec<Resource>>;
    async fn list_resources(&self) -> RepoResult<Vec<Resource>>;
    async fn create_resource(&self, resource: NewResource) -> RepoResult<Resource>;
    /// Returns the number of rows deleted, zero for an unknown id.
    async fn delete_resource(&self, id: Uuid) -> RepoResult<u64>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
