use super::{RepoResult, Repository, RepositoryError};
use crate::models::{NewResource, NewUser, Resource, User, UserStatus};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password, role, status";
const RESOURCE_COLUMNS: &str =
    "id, title, description, subject, resource_type, filename, is_published, created_at";

/// PostgresRepository
///
/// Direct connection to the portal's Postgres database (the Docker database in
/// local mode). Queries are checked at runtime so the crate builds without a
/// live `DATABASE_URL`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 LIMIT 1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let query = format!(
            "INSERT INTO users (email, password, role, status) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let created = sqlx::query_as::<_, User>(&query)
            .bind(&user.email)
            .bind(&user.password)
            .bind(user.role.as_str())
            .bind(user.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    RepositoryError::Conflict("users")
                }
                other => RepositoryError::from(other),
            })?;
        Ok(created)
    }

    async fn update_user_status(&self, id: Uuid, status: UserStatus) -> RepoResult<u64> {
        let result = sqlx::query("UPDATE users SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users");
        sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)
    }

    async fn get_resources_by_subject(
        &self,
        subject: &str,
        published: bool,
    ) -> RepoResult<Vec<Resource>> {
        let query = format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE subject = $1 AND is_published = $2"
        );
        sqlx::query_as::<_, Resource>(&query)
            .bind(subject)
            .bind(published)
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)
    }

    async fn list_resources(&self) -> RepoResult<Vec<Resource>> {
        let query = format!("SELECT {RESOURCE_COLUMNS} FROM resources");
        sqlx::query_as::<_, Resource>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)
    }

    async fn create_resource(&self, resource: NewResource) -> RepoResult<Resource> {
        let query = format!(
            r#"
            INSERT INTO resources (title, description, subject, resource_type, filename, is_published)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RESOURCE_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Resource>(&query)
            .bind(&resource.title)
            .bind(&resource.description)
            .bind(&resource.subject)
            .bind(&resource.resource_type)
            .bind(&resource.filename)
            .bind(resource.is_published)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn delete_resource(&self, id: Uuid) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
