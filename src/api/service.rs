use async_trait::async_trait;
use std::sync::Arc;

use crate::http::{Gateway, GatewayError};
use crate::models::{NewUser, User, UserPatch};

/// Operations on the remote users collection
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserService: Send + Sync {
    /// Every user
    async fn list(&self) -> Result<Vec<User>, GatewayError>;

    /// One user by id
    async fn get(&self, id: i64) -> Result<User, GatewayError>;

    /// Create a user; the server assigns the id
    async fn create(&self, user: NewUser) -> Result<User, GatewayError>;

    /// Apply a partial update
    async fn update(&self, id: i64, patch: UserPatch) -> Result<User, GatewayError>;

    async fn delete(&self, id: i64) -> Result<(), GatewayError>;
}

/// `UserService` backed by the REST endpoints under `/users`
#[derive(Debug, Clone)]
pub struct HttpUserService {
    gateway: Arc<Gateway>,
}

impl HttpUserService {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

fn user_path(id: i64) -> String {
    format!("/users/{id}")
}

#[async_trait]
impl UserService for HttpUserService {
    async fn list(&self) -> Result<Vec<User>, GatewayError> {
        self.gateway.get("/users").await
    }

    async fn get(&self, id: i64) -> Result<User, GatewayError> {
        self.gateway.get(&user_path(id)).await
    }

    async fn create(&self, user: NewUser) -> Result<User, GatewayError> {
        self.gateway.post("/users", &user).await
    }

    async fn update(&self, id: i64, patch: UserPatch) -> Result<User, GatewayError> {
        self.gateway.put(&user_path(id), &patch).await
    }

    async fn delete(&self, id: i64) -> Result<(), GatewayError> {
        self.gateway.delete(&user_path(id)).await
    }
}
