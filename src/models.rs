use serde::{Deserialize, Serialize};

/// Error message returned by `/session/{provider}` when no valid session exists
pub const INVALID_SESSION: &str = "invalid session";

/// Normalized identity record handed back to Oathkeeper
///
/// The same JSON shape is used as the HTTP response body and as the cached
/// value, so a cache hit can be returned without re-encoding.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Session {
    pub subject: String,
    #[serde(default)]
    pub extra: SessionExtra,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct SessionExtra {
    #[serde(default)]
    pub email: String,
}

impl Session {
    /// Create a session with no contact address
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            extra: SessionExtra::default(),
        }
    }

    /// Create a session carrying an email address
    #[must_use]
    pub fn with_email(subject: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            extra: SessionExtra {
                email: email.into(),
            },
        }
    }

    /// A session can only be trusted when it names a principal
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.subject.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
