//! Testing utilities shared by unit and integration tests
//!
//! Enabled with the `testing` feature.
//!
//! - [`fixtures`] - settings, sessions and wiring helpers
//! - [`mock`] - scriptable [`mock::MockProvider`] and a cache with a manual clock
//! - [`upstream`] - throwaway HTTP server standing in for a third party app
//!
//! ## Usage
//!
//! ```rust,ignore
//! use oathkeeper_login::testing::{fixtures::TestFixtures, mock::{ManualClockStore, MockProvider}};
//!
//! let store = Arc::new(ManualClockStore::new());
//! let provider = MockProvider::new("ghost", "ghost-admin-api-session")
//!     .accepting("abc", TestFixtures::session());
//! let resolver = TestFixtures::resolver(store.clone());
//! ```

pub mod fixtures;
pub mod mock;
pub mod upstream;

pub use fixtures::TestFixtures;
pub use mock::{ManualClockStore, MockProvider};
pub use upstream::{RecordedRequest, StubResponse, StubUpstream};

/// Common test constants
pub mod constants {
    use std::time::Duration;

    /// Cache TTL used throughout the tests
    pub const TEST_TTL: Duration = Duration::from_secs(15 * 60);

    pub const TEST_SUBJECT: &str = "42";

    pub const TEST_EMAIL: &str = "a@b.com";

    pub const TEST_USERNAME: &str = "svc@example.com";

    pub const TEST_PASSWORD: &str = "correct horse battery staple";
}
