//! Remote backend abstraction for the Meak client.
//!
//! Provides the [`AuthBackend`] and [`TableBackend`] traits that abstract
//! over the identity provider and the table API, the typed [`TableQuery`]
//! that replaces ad-hoc query strings, and the [`TokenStore`] the session
//! is persisted through.
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpBackend`], a `reqwest` client for a
//!   GoTrue-style auth API and a PostgREST-style table API.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "http")]
mod http;
mod query;
mod store;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::{BackendConfig, HttpBackend, error_message};
pub use query::{Filter, FilterOp, Order, TableQuery};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};

use std::future::Future;

use meak_protocol::{AuthChange, AuthResponse, AuthSession, UserIdentity, UserMetadata};
use serde_json::Value;
use tokio::sync::broadcast;

/// The identity provider: everything that creates, reads, or destroys a
/// session.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → one backend is shared (behind an `Arc`) by
///   the session store, its listener task and the table services.
/// - Every future is `Send` so callers can drive it from `tokio::spawn`.
///
/// Implementations emit an [`AuthChange`] on the [`subscribe`] channel for
/// every session change they observe, including the ones they caused.
///
/// [`subscribe`]: AuthBackend::subscribe
pub trait AuthBackend: Send + Sync + 'static {
    /// Registers a new account. The response has no session when the
    /// provider requires email confirmation first.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> impl Future<Output = Result<AuthResponse, TransportError>> + Send;

    /// Exchanges an email and password for a session.
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthSession, TransportError>> + Send;

    /// Ends the current session. The local session is dropped even when
    /// the remote call fails.
    fn sign_out(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Updates the signed-in user's metadata and returns the updated user.
    fn update_user(
        &self,
        metadata: &UserMetadata,
    ) -> impl Future<Output = Result<UserIdentity, TransportError>> + Send;

    /// Returns the current session, if any.
    fn get_session(
        &self,
    ) -> impl Future<Output = Result<Option<AuthSession>, TransportError>> + Send;

    /// Sends a password-recovery email.
    fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Subscribes to session-change notifications.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}

/// The table API. Rows are opaque JSON; typing them is the caller's job.
pub trait TableBackend: Send + Sync + 'static {
    /// Returns every row matching the query.
    fn select(
        &self,
        query: &TableQuery,
    ) -> impl Future<Output = Result<Vec<Value>, TransportError>> + Send;

    /// Inserts one row and returns it as stored (with generated columns).
    fn insert(
        &self,
        table: &str,
        row: &Value,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;

    /// Applies `patch` to every row matching the query's filters.
    fn update(
        &self,
        query: &TableQuery,
        patch: &Value,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Inserts the row, or merges it into the row with the same primary key.
    fn upsert(
        &self,
        table: &str,
        row: &Value,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
