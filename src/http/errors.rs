use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a gateway call. Always returned to the caller; the gateway
/// only logs a classification of it.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The server answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    Status {
        status: StatusCode,
        message: String,
        body: String,
    },

    /// The request went out but no response came back
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The request could not be built or sent
    #[error("Request configuration error: {0}")]
    Config(String),

    /// The response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Logging classes of `GatewayError`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Unauthorized,
    Forbidden,
    NotFound,
    ServerError,
    /// Any other non-2xx status
    Http,
    Network,
    Config,
    Decode,
}

impl ErrorClass {
    /// Human-readable description used in logs
    pub fn describe(self) -> &'static str {
        match self {
            ErrorClass::Unauthorized => "unauthorized, please log in again",
            ErrorClass::Forbidden => "access denied",
            ErrorClass::NotFound => "requested resource does not exist",
            ErrorClass::ServerError => "server error",
            ErrorClass::Http => "request failed",
            ErrorClass::Network => "network error, please check your connection",
            ErrorClass::Config => "request configuration error",
            ErrorClass::Decode => "unexpected response body",
        }
    }
}

impl GatewayError {
    /// Sort a transport failure into network vs. configuration errors
    pub(crate) fn from_transport(error: reqwest::Error) -> Self {
        if error.is_builder() {
            GatewayError::Config(error.to_string())
        } else if error.is_decode() {
            GatewayError::Decode(error.to_string())
        } else {
            GatewayError::Network(error)
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            GatewayError::Status { status, .. } => match status.as_u16() {
                401 => ErrorClass::Unauthorized,
                403 => ErrorClass::Forbidden,
                404 => ErrorClass::NotFound,
                500 => ErrorClass::ServerError,
                _ => ErrorClass::Http,
            },
            GatewayError::Network(_) => ErrorClass::Network,
            GatewayError::Config(_) => ErrorClass::Config,
            GatewayError::Decode(_) => ErrorClass::Decode,
        }
    }

    /// HTTP status when the server answered
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pull a `message` field out of a JSON error body
pub(crate) fn error_message_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
