use super::{RepoResult, Repository, RepositoryError};
use crate::models::{NewResource, NewUser, Resource, User, UserStatus};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// InMemoryRepository
///
/// A process-local stand-in for the remote tables, used by the integration
/// tests. Rows keep insertion order; emails are unique like in the real table.
#[derive(Default)]
pub struct InMemoryRepository {
    users: RwLock<Vec<User>>,
    resources: RwLock<Vec<Resource>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the resources table with fully-formed rows.
    pub fn with_resources(resources: Vec<Resource>) -> Self {
        Self {
            users: RwLock::new(Vec::new()),
            resources: RwLock::new(resources),
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("users"));
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password: user.password,
            role: user.role,
            status: user.status,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn update_user_status(&self, id: Uuid, status: UserStatus) -> RepoResult<u64> {
        let mut users = self.users.write().await;
        let mut touched = 0;
        for user in users.iter_mut().filter(|u| u.id == id) {
            user.status = status;
            touched += 1;
        }
        Ok(touched)
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        Ok(self.users.read().await.clone())
    }

    async fn get_resources_by_subject(
        &self,
        subject: &str,
        published: bool,
    ) -> RepoResult<Vec<Resource>> {
        let resources = self.resources.read().await;
        Ok(resources
            .iter()
            .filter(|r| r.subject == subject && r.is_published == published)
            .cloned()
            .collect())
    }

    async fn list_resources(&self) -> RepoResult<Vec<Resource>> {
        Ok(self.resources.read().await.clone())
    }

    async fn create_resource(&self, resource: NewResource) -> RepoResult<Resource> {
        let created = Resource {
            id: Uuid::new_v4(),
            title: resource.title,
            description: resource.description,
            subject: resource.subject,
            resource_type: resource.resource_type,
            filename: resource.filename,
            is_published: resource.is_published,
            created_at: Some(Utc::now()),
        };
        self.resources.write().await.push(created.clone());
        Ok(created)
    }

    async fn delete_resource(&self, id: Uuid) -> RepoResult<u64> {
        let mut resources = self.resources.write().await;
        let before = resources.len();
        resources.retain(|r| r.id != id);
        Ok((before - resources.len()) as u64)
    }
}
