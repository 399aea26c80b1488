use std::sync::Arc;
use tracing::debug;

use super::service::UserService;
use crate::constants::USERS_QUERY_KEY;
use crate::http::GatewayError;
use crate::models::{NewUser, User, UserPatch};
use crate::query::{QueryClient, QueryError};

/// Cache key of a single user
pub fn user_query_key(id: i64) -> String {
    format!("{USERS_QUERY_KEY}/{id}")
}

/// Read the user list through the cache under the `users` key
pub async fn users_query(
    queries: &QueryClient,
    service: Arc<dyn UserService>,
) -> Result<Arc<Vec<User>>, QueryError> {
    queries
        .fetch(USERS_QUERY_KEY, move || {
            let service = Arc::clone(&service);
            async move { service.list().await.map_err(anyhow::Error::from) }
        })
        .await
}

/// Users collection with cached reads.
///
/// Mutations go straight to the service, then refresh the per-user entry
/// and mark the list stale.
#[derive(Clone)]
pub struct UsersApi {
    service: Arc<dyn UserService>,
    queries: QueryClient,
}

impl UsersApi {
    pub fn new(service: Arc<dyn UserService>, queries: QueryClient) -> Self {
        Self { service, queries }
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub async fn list(&self) -> Result<Arc<Vec<User>>, QueryError> {
        users_query(&self.queries, Arc::clone(&self.service)).await
    }

    pub async fn get(&self, id: i64) -> Result<Arc<User>, QueryError> {
        let service = Arc::clone(&self.service);
        self.queries
            .fetch(&user_query_key(id), move || {
                let service = Arc::clone(&service);
                async move { service.get(id).await.map_err(anyhow::Error::from) }
            })
            .await
    }

    pub async fn create(&self, user: NewUser) -> Result<User, GatewayError> {
        let created = self.service.create(user).await?;
        debug!(id = created.id, "user created");
        self.queries.set_query_data(&user_query_key(created.id), created.clone());
        self.queries.invalidate(USERS_QUERY_KEY);
        Ok(created)
    }

    pub async fn update(&self, id: i64, patch: UserPatch) -> Result<User, GatewayError> {
        let updated = self.service.update(id, patch).await?;
        debug!(id, "user updated");
        self.queries.set_query_data(&user_query_key(id), updated.clone());
        self.queries.invalidate(USERS_QUERY_KEY);
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), GatewayError> {
        self.service.delete(id).await?;
        debug!(id, "user deleted");
        self.queries.remove(&user_query_key(id));
        self.queries.invalidate(USERS_QUERY_KEY);
        Ok(())
    }
}

impl std::fmt::Debug for UsersApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsersApi")
            .field("queries", &self.queries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::service::MockUserService;
    use crate::query::{QueryOptions, QueryStatus};
    use pretty_assertions::assert_eq;
    use reqwest::StatusCode;
    use std::time::Duration;

    fn user(id: i64, name: &str) -> User {
        User {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            avatar: None,
        }
    }

    fn queries() -> QueryClient {
        QueryClient::new(QueryOptions {
            stale_time: Duration::from_secs(60),
            retry: 0,
            ..QueryOptions::default()
        })
    }

    #[tokio::test]
    async fn test_list_is_cached_until_a_mutation() {
        let mut service = MockUserService::new();
        service
            .expect_list()
            .times(2)
            .returning(|| Ok(vec![user(1, "Dylan")]));
        service
            .expect_create()
            .times(1)
            .returning(|new| Ok(User { id: 2, name: new.name, email: new.email, avatar: new.avatar }));

        let api = UsersApi::new(Arc::new(service), queries());
        assert_eq!(api.list().await.unwrap().len(), 1);
        assert_eq!(api.list().await.unwrap().len(), 1);

        let created = api
            .create(NewUser {
                name: "Ann".into(),
                email: "ann@example.com".into(),
                avatar: None,
            })
            .await
            .unwrap();
        assert_eq!(created.id, 2);
        assert!(api.queries().state(USERS_QUERY_KEY).unwrap().is_stale);
        assert_eq!(
            api.queries().get_query_data::<User>("users/2").as_deref(),
            Some(&created)
        );

        api.list().await.unwrap();
    }

    #[tokio::test]
    async fn test_update_refreshes_single_entry() {
        let mut service = MockUserService::new();
        service
            .expect_update()
            .withf(|id, patch| *id == 1 && patch.name.as_deref() == Some("Dyl"))
            .returning(|id, _| Ok(user(id, "Dyl")));

        let api = UsersApi::new(Arc::new(service), queries());
        api.queries().set_query_data(&user_query_key(1), user(1, "Dylan"));

        let patch = UserPatch {
            name: Some("Dyl".into()),
            ..UserPatch::default()
        };
        api.update(1, patch).await.unwrap();
        let cached = api.get(1).await.unwrap();
        assert_eq!(cached.name, "Dyl");
    }

    #[tokio::test]
    async fn test_delete_drops_entry() {
        let mut service = MockUserService::new();
        service.expect_delete().times(1).returning(|_| Ok(()));

        let api = UsersApi::new(Arc::new(service), queries());
        api.queries().set_query_data(&user_query_key(3), user(3, "Cy"));
        api.delete(3).await.unwrap();
        assert!(api.queries().state("users/3").is_none());
    }

    #[tokio::test]
    async fn test_failed_list_surfaces_error_state() {
        let mut service = MockUserService::new();
        service.expect_list().times(1).returning(|| {
            Err(GatewayError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Internal Server Error".into(),
                body: String::new(),
            })
        });

        let api = UsersApi::new(Arc::new(service), queries());
        let err = api.list().await.unwrap_err();
        let gateway_error = err
            .fetch_error()
            .and_then(|e| e.downcast_ref::<GatewayError>())
            .unwrap();
        assert_eq!(gateway_error.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(
            api.queries().state(USERS_QUERY_KEY).unwrap().status,
            QueryStatus::Error
        );
    }
}
