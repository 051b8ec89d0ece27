//! The session store: the single owner of "who is signed in".
//!
//! Everything that changes the local [`Session`] goes through here:
//! - the five auth mutations (sign-up, sign-in, sign-out, profile update,
//!   password reset), each performing exactly one remote call
//! - `bootstrap`, which performs the first session fetch and then keeps
//!   `user` in sync with the backend's change notifications
//!
//! # Concurrency note
//!
//! The current `Session` lives in a `tokio::sync::watch` channel, so any
//! number of readers can observe it without locking. Writers always replace
//! the whole value. Mutations additionally pass through a single-flight
//! gate (a `tokio::sync::Mutex<()>`) unless
//! [`SessionConfig::serialize_mutations`] is off. Notifications never take
//! the gate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use meak_protocol::{AuthChange, UserIdentity, UserMetadata};
use meak_transport::AuthBackend;
use tokio::sync::{MutexGuard, broadcast, watch};
use tokio::task::JoinHandle;

use crate::{AuthError, Session, SessionConfig, SignUpForm, SignUpOutcome};

/// Owns the local session and the auth mutations that change it.
///
/// ## Lifecycle
///
/// ```text
/// new() ──→ bootstrap() ──→ [listening] ──→ shutdown() / drop
///   │            │
///   │            └─ user set, loading = false, initialized = true (once)
///   └─ user = None, loading = true, initialized = false
/// ```
///
/// Share it behind an `Arc`; `bootstrap` needs one to hand a weak
/// reference to its listener task.
pub struct SessionStore<B: AuthBackend> {
    backend: Arc<B>,
    config: SessionConfig,
    state: watch::Sender<Session>,
    gate: tokio::sync::Mutex<()>,
    bootstrapped: AtomicBool,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<B: AuthBackend> SessionStore<B> {
    pub fn new(backend: Arc<B>, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(Session::new());
        Self {
            backend,
            config,
            state,
            gate: tokio::sync::Mutex::new(()),
            bootstrapped: AtomicBool::new(false),
            listener: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// A copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// A receiver that observes every replacement of the session.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.state.borrow().user.clone()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Creates an account with a display name.
    ///
    /// `user` is only set when the provider answers with an active
    /// session. A pending email confirmation leaves it untouched and
    /// returns [`SignUpOutcome::ConfirmationRequired`].
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let metadata = UserMetadata {
            full_name: Some(display_name.to_string()),
            ..Default::default()
        };
        self.register(email, password, metadata).await
    }

    /// Validates the full sign-up form, then creates the account with the
    /// profile fields as metadata. Nothing is sent if validation fails.
    pub async fn sign_up_with_profile(
        &self,
        form: &SignUpForm,
    ) -> Result<SignUpOutcome, AuthError> {
        form.validate()?;
        let metadata = UserMetadata {
            first_name: Some(form.first_name.trim().to_string()),
            last_name: Some(form.last_name.trim().to_string()),
            phone: Some(form.phone.trim().to_string()),
            postal_code: Some(form.postal_code.trim().to_string()),
            ..Default::default()
        };
        self.register(form.email.trim(), &form.password, metadata)
            .await
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<SignUpOutcome, AuthError> {
        let _gate = self.lock_gate().await;

        let response = self
            .backend
            .sign_up(email, password, &metadata)
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "sign-up rejected"))?;

        match response.session {
            Some(session) => {
                let user_id = session.user.id.clone();
                self.set_user(Some(session.user));
                tracing::info!(%user_id, "signed up and signed in");
                Ok(SignUpOutcome::SignedIn)
            }
            None => {
                tracing::info!("sign-up pending email confirmation");
                Ok(SignUpOutcome::ConfirmationRequired)
            }
        }
    }

    /// Signs in with email and password. On failure `user` is unchanged.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let _gate = self.lock_gate().await;

        let session = self
            .backend
            .sign_in_with_password(email, password)
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "sign-in rejected"))?;

        let user_id = session.user.id.clone();
        self.set_user(Some(session.user));
        tracing::info!(%user_id, "signed in");
        Ok(())
    }

    /// Signs out. The local `user` is cleared once the remote call
    /// resolves, whether or not it succeeded; a remote failure is still
    /// returned.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let _gate = self.lock_gate().await;

        let result = self.backend.sign_out().await;
        self.set_user(None);

        match result {
            Ok(()) => {
                tracing::info!("signed out");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "remote sign-out failed, local session cleared");
                Err(e.into())
            }
        }
    }

    /// Updates the signed-in user's metadata. On success only the fields
    /// present in `fields` are merged into the local user; nothing is
    /// re-fetched.
    pub async fn update_profile(&self, fields: UserMetadata) -> Result<(), AuthError> {
        let _gate = self.lock_gate().await;

        self.backend
            .update_user(&fields)
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "profile update rejected"))?;

        self.state.send_modify(|session| {
            if let Some(user) = session.user.as_mut() {
                user.metadata.merge(&fields);
            }
        });
        tracing::debug!("profile updated");
        Ok(())
    }

    /// Sends a password-recovery email. The local session is not touched.
    pub async fn reset_password(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), AuthError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::InvalidInput(
                "Please enter your email address".into(),
            ));
        }

        let _gate = self.lock_gate().await;
        self.backend
            .reset_password_for_email(email, redirect_to)
            .await?;
        tracing::info!("password recovery email requested");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bootstrap
    // -----------------------------------------------------------------------

    /// Runs the first session fetch, then follows the backend's change
    /// notifications until [`shutdown`](Self::shutdown) or drop.
    ///
    /// The notification subscription is opened before the fetch so a
    /// change that lands in between is not lost. A failed fetch starts the
    /// app signed out. Calling this more than once does nothing.
    pub async fn bootstrap(self: &Arc<Self>) {
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            tracing::debug!("bootstrap already ran");
            return;
        }

        let changes = self.backend.subscribe();

        let user = match self.backend.get_session().await {
            Ok(session) => session.map(|s| s.user),
            Err(e) => {
                tracing::warn!(error = %e, "initial session fetch failed, starting signed out");
                None
            }
        };

        let authenticated = user.is_some();
        self.state.send_modify(|session| {
            session.user = user;
            session.loading = false;
            session.initialized = true;
        });
        tracing::info!(authenticated, "session initialized");

        let handle = tokio::spawn(listen(Arc::downgrade(self), changes));
        let previous = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Stops following change notifications. Mutations keep working.
    pub fn shutdown(&self) {
        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!("session listener stopped");
        }
    }

    /// Applies one notification: `user` follows the notified session.
    fn apply_change(&self, change: AuthChange) {
        tracing::debug!(event = %change.event, "session change received");
        self.set_user(change.session.map(|s| s.user));
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn lock_gate(&self) -> Option<MutexGuard<'_, ()>> {
        if self.config.serialize_mutations {
            Some(self.gate.lock().await)
        } else {
            None
        }
    }

    fn set_user(&self, user: Option<UserIdentity>) {
        self.state.send_modify(|session| session.user = user);
    }
}

impl<B: AuthBackend> Drop for SessionStore<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn listen<B: AuthBackend>(
    store: std::sync::Weak<SessionStore<B>>,
    mut changes: broadcast::Receiver<AuthChange>,
) {
    loop {
        match changes.recv().await {
            Ok(change) => {
                let Some(store) = store.upgrade() else { break };
                store.apply_change(change);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "session listener lagged behind notifications");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
