use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, Request, StatusCode};
use std::sync::Arc;
use tracing::{debug, error};

use super::errors::{ErrorClass, GatewayError};
use crate::session::read_persisted_session;
use crate::storage::DurableStorage;

/// What a response stage knows about the exchange it observes
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
}

/// Stage run on every outgoing request, in registration order
pub trait RequestInterceptor: Send + Sync {
    fn intercept(&self, request: &mut Request) -> Result<(), GatewayError>;
}

/// Stage observing every finished exchange, in registration order
pub trait ResponseInterceptor: Send + Sync {
    fn on_success(&self, _ctx: &RequestContext, _status: StatusCode) {}

    fn on_error(&self, _ctx: &RequestContext, _error: &GatewayError) {}
}

/// Where the bearer token comes from
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<String>;
}

impl<F> TokenSource for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// Token read from the persisted session on every request, so a login in
/// another process is picked up without restarting
pub struct StoredToken {
    storage: Arc<dyn DurableStorage>,
}

impl StoredToken {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self { storage }
    }
}

impl TokenSource for StoredToken {
    fn token(&self) -> Option<String> {
        match read_persisted_session(self.storage.as_ref()) {
            Ok(session) => session.and_then(|s| s.token),
            Err(e) => {
                debug!(error = %e, "no usable token in storage");
                None
            }
        }
    }
}

/// Sets `Authorization: Bearer <token>` when a token is available
pub struct BearerAuth {
    source: Box<dyn TokenSource>,
}

impl BearerAuth {
    pub fn new(source: impl TokenSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }
}

impl RequestInterceptor for BearerAuth {
    fn intercept(&self, request: &mut Request) -> Result<(), GatewayError> {
        let Some(token) = self.source.token().filter(|t| !t.is_empty()) else {
            return Ok(());
        };

        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| GatewayError::Config(format!("invalid token: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// Logs one distinguishable message per failure class. Never recovers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorClassifier;

impl ResponseInterceptor for ErrorClassifier {
    fn on_success(&self, ctx: &RequestContext, status: StatusCode) {
        debug!(method = %ctx.method, path = %ctx.path, status = status.as_u16(), "request succeeded");
    }

    fn on_error(&self, ctx: &RequestContext, err: &GatewayError) {
        let class = err.class();
        match err {
            GatewayError::Status {
                status, message, ..
            } if class == ErrorClass::Http => {
                error!(
                    method = %ctx.method,
                    path = %ctx.path,
                    status = status.as_u16(),
                    "{}: {}",
                    class.describe(),
                    message
                );
            }
            GatewayError::Status { status, .. } => {
                error!(
                    method = %ctx.method,
                    path = %ctx.path,
                    status = status.as_u16(),
                    "{}",
                    class.describe()
                );
            }
            GatewayError::Config(detail) | GatewayError::Decode(detail) => {
                error!(method = %ctx.method, path = %ctx.path, "{}: {}", class.describe(), detail);
            }
            GatewayError::Network(source) => {
                error!(method = %ctx.method, path = %ctx.path, error = %source, "{}", class.describe());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::session::SessionStore;
    use crate::storage::MemoryStorage;

    fn request() -> Request {
        Request::new(Method::GET, "https://api.example.com/users".parse().unwrap())
    }

    #[test]
    fn test_bearer_header_from_token() {
        let auth = BearerAuth::new(|| Some("abc".to_string()));
        let mut req = request();
        auth.intercept(&mut req).unwrap();
        assert_eq!(req.headers()[AUTHORIZATION], "Bearer abc");
    }

    #[test]
    fn test_no_header_without_token() {
        let auth = BearerAuth::new(|| None);
        let mut req = request();
        auth.intercept(&mut req).unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_invalid_token_is_config_error() {
        let auth = BearerAuth::new(|| Some("bad\ntoken".to_string()));
        let err = auth.intercept(&mut request()).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Config);
    }

    #[test]
    fn test_stored_token_follows_session() {
        let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::new());
        let source = StoredToken::new(storage.clone());
        assert_eq!(source.token(), None);

        let session = SessionStore::load(storage);
        let user = User {
            id: 1,
            name: "Dylan".into(),
            email: "dylan@example.com".into(),
            avatar: None,
        };
        session.login(user, "mock-token-12345").unwrap();
        assert_eq!(source.token().as_deref(), Some("mock-token-12345"));

        session.logout().unwrap();
        assert_eq!(source.token(), None);
    }
}
