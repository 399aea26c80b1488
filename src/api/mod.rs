// Gateway module for api - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod cached;
mod service;

// Public re-exports - the ONLY way to access api functionality
pub use cached::{user_query_key, users_query, UsersApi};
pub use service::{HttpUserService, UserService};

#[cfg(test)]
pub use service::MockUserService;
