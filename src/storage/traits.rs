use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Errors raised by durable storage backends
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding failed with: {0}")]
    Encode(String),

    #[error("Decoding failed with: {0}")]
    Decode(String),

    #[error("Storage location unavailable: {0}")]
    Unavailable(String),
}

/// String key/value storage that survives process restarts.
///
/// Modeled on browser local storage: values are opaque strings, a missing key
/// is `None` rather than an error, and there is no coordination between
/// independent writers (last write wins).
#[cfg_attr(test, mockall::automock)]
pub trait DurableStorage: Send + Sync {
    /// Read the value stored under `key`
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Serialize `value` as JSON and store it under `key`
pub fn save_json<T>(storage: &dyn DurableStorage, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(value).map_err(|e| StorageError::Encode(e.to_string()))?;
    storage.set_item(key, &json)
}

/// Load and deserialize the JSON value stored under `key`
pub fn load_json<T>(storage: &dyn DurableStorage, key: &str) -> Result<Option<T>, StorageError>
where
    T: DeserializeOwned,
{
    match storage.get_item(key)? {
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| StorageError::Decode(e.to_string())),
        None => Ok(None),
    }
}
