//! HTTP handlers
//!
//! The public listener serves `/login/{provider}` and `/session/{provider}`.
//! Health and metrics live on a separate observability listener.

pub mod login;
pub mod o11y;
pub mod session;

pub use login::login;
pub use o11y::{health, metrics};
pub use session::session;

use actix_web::web;

/// Routes of the public listener
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.route("/login/{provider}", web::get().to(login))
        .route("/session/{provider}", web::get().to(session));
}

/// Routes of the observability listener
pub fn configure_o11y(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics));
}
