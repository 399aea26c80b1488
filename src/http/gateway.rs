use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::errors::{error_message_from_body, GatewayError};
use super::interceptors::{
    BearerAuth, ErrorClassifier, RequestContext, RequestInterceptor, ResponseInterceptor,
    StoredToken,
};
use super::progress::{progress_body, ProgressCallback};
use crate::app::ApiConfig;
use crate::constants::{HTTP_REQUEST_TIMEOUT_SECS, UPLOAD_CHUNK_SIZE};
use crate::storage::DurableStorage;

enum RequestBody {
    Empty,
    Json(Vec<u8>),
    Multipart(Form),
}

/// A single file sent as one multipart part
#[derive(Debug, Clone)]
pub struct MultipartFile {
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

/// The single HTTP pipeline every API call goes through.
///
/// Requests pass through the request stages in order; every outcome is
/// shown to the response stages; callers get the decoded payload or the
/// original error.
pub struct Gateway {
    client: Client,
    base_url: String,
    request_stages: Vec<Arc<dyn RequestInterceptor>>,
    response_stages: Vec<Arc<dyn ResponseInterceptor>>,
}

/// Builder for [`Gateway`]
pub struct GatewayBuilder {
    base_url: String,
    timeout: Duration,
    request_stages: Vec<Arc<dyn RequestInterceptor>>,
    response_stages: Vec<Arc<dyn ResponseInterceptor>>,
}

impl GatewayBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Append a request stage
    pub fn request_stage(mut self, stage: impl RequestInterceptor + 'static) -> Self {
        self.request_stages.push(Arc::new(stage));
        self
    }

    /// Append a response stage
    pub fn response_stage(mut self, stage: impl ResponseInterceptor + 'static) -> Self {
        self.response_stages.push(Arc::new(stage));
        self
    }

    pub fn build(self) -> Result<Gateway, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(Gateway {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            request_stages: self.request_stages,
            response_stages: self.response_stages,
        })
    }
}

impl Gateway {
    pub fn builder(base_url: impl Into<String>) -> GatewayBuilder {
        GatewayBuilder {
            base_url: base_url.into(),
            timeout: Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
            request_stages: Vec::new(),
            response_stages: Vec::new(),
        }
    }

    /// The standard pipeline: bearer token from durable storage, then
    /// error classification
    pub fn from_config(
        api: &ApiConfig,
        storage: Arc<dyn DurableStorage>,
    ) -> Result<Self, GatewayError> {
        Self::builder(&api.base_url)
            .timeout(api.timeout())
            .request_stage(BearerAuth::new(StoredToken::new(storage)))
            .response_stage(ErrorClassifier)
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        self.request(Method::GET, path, RequestBody::Empty, decode_json)
            .await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let ctx = context(&Method::POST, path);
        let body = self.encode(&ctx, body)?;
        self.request(Method::POST, path, body, decode_json).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let ctx = context(&Method::PUT, path);
        let body = self.encode(&ctx, body)?;
        self.request(Method::PUT, path, body, decode_json).await
    }

    /// DELETE; any response body is ignored
    pub async fn delete(&self, path: &str) -> Result<(), GatewayError> {
        self.request(Method::DELETE, path, RequestBody::Empty, |_| Ok(()))
            .await
    }

    /// POST a single file as multipart form data.
    ///
    /// Bypasses JSON encoding; `on_progress` receives the percentage of the
    /// file handed to the transport.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        file: MultipartFile,
        on_progress: Option<ProgressCallback>,
    ) -> Result<T, GatewayError> {
        let ctx = context(&Method::POST, path);
        let total = file.data.len() as u64;
        let part = Part::stream_with_length(
            progress_body(file.data, UPLOAD_CHUNK_SIZE, on_progress),
            total,
        )
        .file_name(file.file_name)
        .mime_str(&file.mime_type)
        .map_err(|e| GatewayError::Config(format!("invalid MIME type: {e}")));

        let part = match part {
            Ok(part) => part,
            Err(e) => {
                self.report(&ctx, Err(&e));
                return Err(e);
            }
        };

        let form = Form::new().part(file.field, part);
        self.request(Method::POST, path, RequestBody::Multipart(form), decode_json)
            .await
    }

    fn encode<B: Serialize + ?Sized>(
        &self,
        ctx: &RequestContext,
        body: &B,
    ) -> Result<RequestBody, GatewayError> {
        match serde_json::to_vec(body) {
            Ok(bytes) => Ok(RequestBody::Json(bytes)),
            Err(e) => {
                let err = GatewayError::Config(format!("could not encode body: {e}"));
                self.report(ctx, Err(&err));
                Err(err)
            }
        }
    }

    async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        decode: impl FnOnce(&Bytes) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let ctx = context(&method, path);
        let result = match self.exchange(method, path, body).await {
            Ok((status, bytes)) => decode(&bytes).map(|value| (status, value)),
            Err(e) => Err(e),
        };

        match result {
            Ok((status, value)) => {
                self.report(&ctx, Ok(status));
                Ok(value)
            }
            Err(e) => {
                self.report(&ctx, Err(&e));
                Err(e)
            }
        }
    }

    async fn exchange(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<(reqwest::StatusCode, Bytes), GatewayError> {
        let builder = self.client.request(method, self.url(path));
        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(bytes) => builder.body(bytes),
            RequestBody::Multipart(form) => builder.multipart(form),
        };

        let mut request = builder.build().map_err(GatewayError::from_transport)?;
        for stage in &self.request_stages {
            stage.intercept(&mut request)?;
        }

        let response = self
            .client
            .execute(request)
            .await
            .map_err(GatewayError::from_transport)?;

        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await.map_err(GatewayError::from_transport)?;
            return Ok((status, bytes));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(%status, error = %e, "could not read error body");
                String::new()
            }
        };
        let message = error_message_from_body(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        Err(GatewayError::Status {
            status,
            message,
            body,
        })
    }

    fn report(&self, ctx: &RequestContext, outcome: Result<reqwest::StatusCode, &GatewayError>) {
        for stage in &self.response_stages {
            match outcome {
                Ok(status) => stage.on_success(ctx, status),
                Err(e) => stage.on_error(ctx, e),
            }
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.base_url)
            .field("request_stages", &self.request_stages.len())
            .field("response_stages", &self.response_stages.len())
            .finish()
    }
}

fn context(method: &Method, path: &str) -> RequestContext {
    RequestContext {
        method: method.clone(),
        path: path.to_string(),
    }
}

fn decode_json<T: DeserializeOwned>(bytes: &Bytes) -> Result<T, GatewayError> {
    serde_json::from_slice(bytes).map_err(|e| GatewayError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let gateway = Gateway::builder("https://api.example.com/v1/").build().unwrap();
        assert_eq!(gateway.base_url(), "https://api.example.com/v1");
        assert_eq!(gateway.url("/users"), "https://api.example.com/v1/users");
        assert_eq!(gateway.url("users/7"), "https://api.example.com/v1/users/7");
    }

    #[test]
    fn test_from_config_installs_default_stages() {
        let storage: Arc<dyn DurableStorage> = Arc::new(crate::storage::MemoryStorage::new());
        let gateway = Gateway::from_config(&ApiConfig::default(), storage).unwrap();
        assert_eq!(gateway.base_url(), "https://api.example.com");
        assert_eq!(gateway.request_stages.len(), 1);
        assert_eq!(gateway.response_stages.len(), 1);
    }
}
