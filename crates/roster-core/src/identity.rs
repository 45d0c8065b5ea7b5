//! Identity domain model.
//!
//! Represents the authenticated user as reported by the auth capability.

use serde::{Deserialize, Serialize};

/// The authenticated user's identity.
///
/// Produced by the auth capability on sign-in or read back from the local
/// profile cache on a cold start. An `Identity` is replaced wholesale on
/// every auth-state transition, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user ID assigned by the auth capability.
    pub uid: String,
    /// Email address, if the auth capability reported one.
    pub email: Option<String>,
}

impl Identity {
    /// Creates a new identity.
    pub fn new(uid: impl Into<String>, email: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            email,
        }
    }

    /// Returns the email address or a placeholder for display purposes.
    pub fn display_email(&self) -> &str {
        self.email.as_deref().unwrap_or("(no email)")
    }
}
