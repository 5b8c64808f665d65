//! Session resolution and login orchestration
//!
//! - [`resolver`] - read-through cache in front of provider verification
//! - [`login`] - reuse-or-authenticate flow behind `/login/{provider}`

pub mod login;
pub mod resolver;

pub use login::{LoginOrchestrator, LoginOutcome};
pub use resolver::{Resolution, SessionResolver};
