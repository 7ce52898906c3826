pub(crate) mod auth;
pub(crate) mod core;
pub(crate) mod errors;
pub(crate) mod handlers;
pub(crate) mod permissions;
pub(crate) mod router;
pub(crate) mod sync;
pub(crate) mod types;

pub use self::core::AppConfig;
pub use errors::init_tracing;
pub use router::build_router;
