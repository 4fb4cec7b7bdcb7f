pub mod api_key;
pub mod middleware;
pub mod registry;

pub use middleware::{auth_middleware, require_admin, AuthUser};
pub use registry::UserRegistry;
