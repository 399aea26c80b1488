// Gateway module for storage - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod file_storage;
mod memory_storage;
mod traits;

// Public re-exports - the ONLY way to access storage functionality
pub use file_storage::FileStorage;
pub use memory_storage::MemoryStorage;
pub use traits::{load_json, save_json, DurableStorage, StorageError};

#[cfg(test)]
pub use traits::MockDurableStorage;
