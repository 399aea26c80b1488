// Gateway module for store - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod container;
mod types;

// Public re-exports - the ONLY way to access store functionality
pub use container::Store;
pub use types::{Effect, Reducer, Subscriber, SubscriptionId};
