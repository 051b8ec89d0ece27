//! Session types: the data structures that describe who is signed in.
//!
//! A "session" here is the client's view of the identity provider's
//! session. It tracks:
//! - WHO is signed in (`user`)
//! - WHETHER the first remote fetch is still running (`loading`)
//! - WHETHER that fetch ever completed (`initialized`)

use meak_protocol::UserIdentity;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for [`SessionStore`](crate::SessionStore) behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Run auth mutations (sign-up, sign-in, sign-out, profile update,
    /// password reset) one at a time, in call order.
    ///
    /// With this off, two overlapping mutations both run and whichever
    /// remote call answers last decides the local `user`.
    ///
    /// Default: `true`.
    pub serialize_mutations: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            serialize_mutations: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AuthState
// ---------------------------------------------------------------------------

/// The two states the rest of the app cares about.
///
/// ```text
///   Unauthenticated ──(sign-in / sign-up with session / remote SIGNED_IN)──→ Authenticated
///         ↑                                                                    │
///         └──────────────(sign-out / remote notification without session)─────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The local session snapshot.
///
/// Invariant: `initialized == true` implies the first remote session fetch
/// has completed; until then `loading == true`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: Option<UserIdentity>,
    pub loading: bool,
    pub initialized: bool,
}

impl Session {
    /// The state at process start: nobody known yet, fetch pending.
    pub fn new() -> Self {
        Self {
            user: None,
            loading: true,
            initialized: false,
        }
    }

    pub fn state(&self) -> AuthState {
        if self.user.is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// How a successful sign-up ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The provider issued a session right away; `user` is set.
    SignedIn,

    /// The account exists but the email must be confirmed first. `user`
    /// is unchanged and the caller should show a "check your email" screen.
    ConfirmationRequired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_loading_and_uninitialized() {
        let session = Session::new();
        assert!(session.user.is_none());
        assert!(session.loading);
        assert!(!session.initialized);
        assert_eq!(session.state(), AuthState::Unauthenticated);
    }

    #[test]
    fn test_state_follows_user() {
        let session = Session {
            user: Some(UserIdentity::new("u-1", "a@b.com")),
            loading: false,
            initialized: true,
        };
        assert_eq!(session.state(), AuthState::Authenticated);
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_mutations_serialized_by_default() {
        assert!(SessionConfig::default().serialize_mutations);
    }
}
