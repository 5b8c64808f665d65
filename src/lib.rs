#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the login server
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service label on exported metrics
pub const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");

pub mod cache;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod providers;
pub mod session;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use handlers::{configure_o11y, configure_services};
pub use models::Session;
pub use providers::{ProviderRegistry, SessionProvider};
pub use session::{LoginOrchestrator, SessionResolver};
pub use settings::LoginServerSettings;
