// Gateway module for http - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod errors;
mod gateway;
mod interceptors;
mod progress;

// Public re-exports - the ONLY way to access http functionality
pub use errors::{ErrorClass, GatewayError};
pub use gateway::{Gateway, GatewayBuilder, MultipartFile};
pub use interceptors::{
    BearerAuth, ErrorClassifier, RequestContext, RequestInterceptor, ResponseInterceptor,
    StoredToken, TokenSource,
};
pub use progress::{progress_percent, ProgressCallback};
