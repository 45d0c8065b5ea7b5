//! Session state types.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// The derived authentication state exposed to the presentation layer.
///
/// A session starts in `Initializing` until the auth capability reports its
/// first state, then moves between `Unauthenticated` and `Authenticated` on
/// every subsequent transition. It never returns to `Initializing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionState {
    /// The first auth-state report has not arrived yet.
    Initializing,
    /// No identity is signed in.
    Unauthenticated,
    /// A user is signed in.
    Authenticated(Identity),
}

impl SessionState {
    /// True until the auth capability reports its first state.
    pub fn is_initializing(&self) -> bool {
        matches!(self, Self::Initializing)
    }

    /// True while a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Returns the signed-in identity, if any.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }
}
