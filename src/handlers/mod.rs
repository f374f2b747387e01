mod fallback;
mod health;
pub mod proxy;

pub use fallback::{method_not_allowed, not_found};
pub use health::{HealthResponse, health_check};
pub use proxy::proxy_messages;
