// Gateway module for query - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod client;
mod types;

// Public re-exports - the ONLY way to access query functionality
pub use client::QueryClient;
pub use types::{QueryError, QueryOptions, QueryState, QueryStatus};
