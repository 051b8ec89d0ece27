//! # Meak
//!
//! Client core for the Meak local-services marketplace.
//!
//! Meak connects clients with nearby service providers. This crate holds
//! the parts of the app that are not UI: who is signed in, where a user is
//! allowed to navigate, and typed access to profiles, bookings and
//! provider ratings on the hosted backend.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meak::prelude::*;
//!
//! # async fn run() -> Result<(), MeakError> {
//! let client = MeakClient::builder()
//!     .url("https://project.example.co")
//!     .anon_key("public-anon-key")
//!     .build()
//!     .await?;
//! client.start().await;
//!
//! client.session().sign_in("amina@example.ma", "secret1").await?;
//! let user = client.session().user().expect("signed in");
//! let tasks = client.bookings().client_tasks(&user.id).await?;
//! # let _ = tasks;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;

pub use client::{MeakClient, MeakClientBuilder, RESET_PASSWORD_REDIRECT};
pub use error::MeakError;

pub mod prelude {
    //! Everything an app shell needs, in one import.

    pub use crate::{MeakClient, MeakClientBuilder, MeakError};
    pub use meak_protocol::{
        AuthChange, AuthEvent, Profile, Review, Task, TaskStatus, UserId, UserIdentity,
        UserMetadata,
    };
    pub use meak_router::{
        GuardConfig, HistoryNavigator, Navigator, RedirectTarget, RouteGuard, RouteLocation,
        RouterError, evaluate,
    };
    pub use meak_services::{
        BookingsService, NewTask, ProfileUpdate, ProfilesService, ProviderRating,
        ProviderSearch, ProvidersService, RemoteError,
    };
    pub use meak_session::{
        AuthError, AuthState, Session, SessionConfig, SessionStore, SignUpForm, SignUpOutcome,
        validate_credentials,
    };
    pub use meak_transport::{
        AuthBackend, BackendConfig, FileTokenStore, HttpBackend, MemoryTokenStore, TableBackend,
        TokenStore, TransportError,
    };
}
