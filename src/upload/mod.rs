// Gateway module for upload - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod file;
mod uploader;

// Public re-exports - the ONLY way to access upload functionality
pub use file::{UploadError, UploadFile};
pub use uploader::{upload_file, EmbeddedMedia, MediaKind, MediaUploader};
