pub mod api;
pub mod app;
pub mod cli;
pub mod constants;
pub mod http;
pub mod models;
pub mod query;
pub mod session;
pub mod storage;
pub mod store;
pub mod upload;
pub mod utils;

pub use app::{load_config, AppState, Config};
pub use http::{Gateway, GatewayError};
pub use query::QueryClient;
pub use session::SessionStore;
