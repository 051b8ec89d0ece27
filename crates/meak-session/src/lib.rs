//! Session state for the Meak client.
//!
//! This crate owns the answer to "who is signed in":
//!
//! 1. **Session store**: the [`SessionStore`] holds the current
//!    [`Session`] and performs the auth mutations against an
//!    [`AuthBackend`](meak_transport::AuthBackend)
//! 2. **Bootstrap**: one initial session fetch, then following the
//!    backend's change notifications
//! 3. **Validation**: local checks for the sign-up form ([`SignUpForm`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Router Layer (above)  ← watches the session to redirect navigation
//!     ↕
//! Session Layer (this crate)  ← owns user, loading, initialized
//!     ↕
//! Transport Layer (below)  ← talks to the identity provider
//! ```

mod error;
mod session;
mod store;
mod validation;

pub use error::{ALREADY_REGISTERED_MESSAGE, AuthError, RATE_LIMITED_MESSAGE};
pub use session::{AuthState, Session, SessionConfig, SignUpOutcome};
pub use store::SessionStore;
pub use validation::{MIN_PASSWORD_LEN, SignUpForm, is_valid_phone, validate_credentials};
