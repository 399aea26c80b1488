/// Constants module to avoid magic numbers in the codebase

// Network Configuration
pub const DEFAULT_API_BASE_URL: &str = "https://api.example.com";
pub const API_BASE_URL_ENV: &str = "API_BASE_URL";
pub const CONFIG_ENV_PREFIX: &str = "USERDESK_";

// Timeouts
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 10;

// Durable storage keys
pub const SESSION_STORAGE_KEY: &str = "user-storage";
pub const SESSION_STORAGE_VERSION: u32 = 0;

// Query keys
pub const USERS_QUERY_KEY: &str = "users";

// Query defaults (mirrors the usual query-cache defaults)
pub const DEFAULT_QUERY_STALE_TIME_SECS: u64 = 0;
pub const DEFAULT_QUERY_RETRY: u32 = 3;
pub const QUERY_RETRY_BASE_DELAY_MS: u64 = 1000;
pub const QUERY_RETRY_MAX_DELAY_MS: u64 = 30_000;

// Upload limits
pub const MAX_UPLOAD_SIZE_MB: u64 = 100;
pub const MAX_UPLOAD_SIZE_BYTES: u64 = MAX_UPLOAD_SIZE_MB * 1024 * 1024;
pub const ALLOWED_UPLOAD_MIME_PREFIXES: &[&str] = &["image/", "video/"];
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
/// Leading bytes inspected to recognise a file format
pub const MIME_SNIFF_BYTES: usize = 4096;
pub const UPLOAD_PATH: &str = "/upload";
pub const UPLOAD_FIELD_NAME: &str = "file";

// User-facing messages
pub const LOAD_FAILED_MESSAGE: &str = "failed to load, please retry";
pub const UPLOAD_BUSY_MESSAGE: &str = "upload in progress, please wait";
pub const UPLOAD_FAILED_MESSAGE: &str = "file upload failed, please retry";

// Demo login (the mock account offered by `login` without arguments)
pub const DEMO_USER_ID: i64 = 1;
pub const DEMO_USER_NAME: &str = "Dylan";
pub const DEMO_USER_EMAIL: &str = "dylan@example.com";
pub const DEMO_TOKEN: &str = "mock-token-12345";
