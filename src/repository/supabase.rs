use super::{RepoResult, Repository, RepositoryError};
use crate::models::{NewResource, NewUser, Resource, User, UserStatus};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// SupabaseRepository
///
/// Talks to the hosted tables through Supabase's PostgREST gateway
/// (`{project}/rest/v1/{table}`). Filters use PostgREST's `column=eq.value`
/// syntax, and writes ask for `return=representation` so the affected rows come back.
#[derive(Clone)]
pub struct SupabaseRepository {
    client: reqwest::Client,
    rest_url: String,
    api_key: String,
}

impl SupabaseRepository {
    pub fn new(project_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            rest_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }

    /// Starts an authenticated request against one table.
    fn table(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn rows<T: DeserializeOwned>(request: RequestBuilder) -> RepoResult<Vec<T>> {
        let rows = request
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<T>>()
            .await?;
        Ok(rows)
    }

    /// PostgREST answers a unique violation with 409.
    fn conflict(table: &'static str) -> impl Fn(RepositoryError) -> RepositoryError {
        move |e| match e {
            RepositoryError::Http(ref err) if err.status() == Some(StatusCode::CONFLICT) => {
                RepositoryError::Conflict(table)
            }
            other => other,
        }
    }

    fn eq(value: impl std::fmt::Display) -> String {
        format!("eq.{}", value)
    }
}

#[async_trait]
impl Repository for SupabaseRepository {
    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let request = self
            .table(Method::GET, "users")
            .query(&[("select", "*".to_string()), ("email", Self::eq(email))]);
        let users: Vec<User> = Self::rows(request).await?;
        Ok(users.into_iter().next())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let request = self
            .table(Method::POST, "users")
            .header("Prefer", "return=representation")
            .json(&user);
        let users: Vec<User> = Self::rows(request).await.map_err(Self::conflict("users"))?;
        users
            .into_iter()
            .next()
            .ok_or(RepositoryError::EmptyInsert("users"))
    }

    async fn update_user_status(&self, id: Uuid, status: UserStatus) -> RepoResult<u64> {
        let request = self
            .table(Method::PATCH, "users")
            .header("Prefer", "return=representation")
            .query(&[("id", Self::eq(id))])
            .json(&serde_json::json!({ "status": status }));
        let touched: Vec<serde_json::Value> = Self::rows(request).await?;
        Ok(touched.len() as u64)
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let request = self.table(Method::GET, "users").query(&[("select", "*")]);
        Self::rows(request).await
    }

    async fn get_resources_by_subject(
        &self,
        subject: &str,
        published: bool,
    ) -> RepoResult<Vec<Resource>> {
        let request = self.table(Method::GET, "resources").query(&[
            ("select", "*".to_string()),
            ("subject", Self::eq(subject)),
            ("is_published", Self::eq(published)),
        ]);
        Self::rows(request).await
    }

    async fn list_resources(&self) -> RepoResult<Vec<Resource>> {
        let request = self.table(Method::GET, "resources").query(&[("select", "*")]);
        Self::rows(request).await
    }

    async fn create_resource(&self, resource: NewResource) -> RepoResult<Resource> {
        let request = self
            .table(Method::POST, "resources")
            .header("Prefer", "return=representation")
            .json(&resource);
        let rows: Vec<Resource> = Self::rows(request).await?;
        rows.into_iter()
            .next()
            .ok_or(RepositoryError::EmptyInsert("resources"))
    }

    async fn delete_resource(&self, id: Uuid) -> RepoResult<u64> {
        let request = self
            .table(Method::DELETE, "resources")
            .header("Prefer", "return=representation")
            .query(&[("id", Self::eq(id))]);
        let deleted: Vec<serde_json::Value> = Self::rows(request).await?;
        Ok(deleted.len() as u64)
    }
}
