//! Shared helpers for integration tests.
#![allow(dead_code)]

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

use tracing::subscriber::DefaultGuard;
use userdesk::app::{AppState, Config};
use userdesk::models::User;
use userdesk::storage::MemoryStorage;

/// App state talking to `base_url`, with in-memory storage and no retries
pub fn app_state(base_url: &str) -> AppState {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.query.retry = 0;
    AppState::with_storage(config, Arc::new(MemoryStorage::new())).unwrap()
}

pub fn dylan() -> User {
    User {
        id: 1,
        name: "Dylan".into(),
        email: "dylan@example.com".into(),
        avatar: None,
    }
}

pub fn user_json(id: i64, name: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase()),
    })
}

/// Log output captured from the current thread
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Capture every log line emitted on this thread until the guard drops.
///
/// Works with `#[tokio::test]`'s current-thread runtime.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
