// Gateway module for utils - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod logger;
mod mime;

// Public re-exports - the ONLY way to access utils functionality
pub use logger::{init_logger, log_error, log_info, log_warn};
pub use mime::{mime_type_for_bytes, mime_type_for_extension, normalize_input_path, sniff_mime};
