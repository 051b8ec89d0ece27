//! `MeakClient` builder and lifecycle.
//!
//! This is the entry point for the app shell. It ties together all the
//! layers: transport → session → services, and hands out a route guard
//! wired to the session.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use meak_router::{GuardConfig, Navigator, RouteGuard};
use meak_services::{BookingsService, ProfilesService, ProvidersService};
use meak_session::{Session, SessionConfig, SessionStore};
use meak_transport::{BackendConfig, FileTokenStore, HttpBackend, MemoryTokenStore, TokenStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::MeakError;

/// Where password-recovery emails send the user back to.
pub const RESET_PASSWORD_REDIRECT: &str = "meak://reset-password-confirm";

/// Builder for configuring a [`MeakClient`].
///
/// # Example
///
/// ```rust,no_run
/// use meak::prelude::*;
///
/// # async fn run() -> Result<(), MeakError> {
/// let client = MeakClient::builder()
///     .url("https://project.example.co")
///     .anon_key("public-anon-key")
///     .session_file("/tmp/meak-session.json")
///     .build()
///     .await?;
/// client.start().await;
/// # Ok(())
/// # }
/// ```
pub struct MeakClientBuilder {
    backend: BackendConfig,
    session_config: SessionConfig,
    guard_config: GuardConfig,
    token_store: Option<Box<dyn TokenStore>>,
    reset_redirect: String,
}

impl MeakClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            backend: BackendConfig::default(),
            session_config: SessionConfig::default(),
            guard_config: GuardConfig::default(),
            token_store: None,
            reset_redirect: RESET_PASSWORD_REDIRECT.to_string(),
        }
    }

    /// Sets the backend project URL.
    pub fn url(mut self, url: &str) -> Self {
        self.backend.url = url.to_string();
        self
    }

    /// Sets the public (anon) API key.
    pub fn anon_key(mut self, key: &str) -> Self {
        self.backend.anon_key = key.to_string();
        self
    }

    /// Replaces the whole backend configuration. Call before `url` and
    /// `anon_key`, which edit it.
    pub fn backend_config(mut self, config: BackendConfig) -> Self {
        self.backend = config;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    pub fn guard_config(mut self, config: GuardConfig) -> Self {
        self.guard_config = config;
        self
    }

    /// Persists the session through `store`. Defaults to memory only.
    pub fn token_store(mut self, store: impl TokenStore) -> Self {
        self.token_store = Some(Box::new(store));
        self
    }

    /// Persists the session in a JSON file at `path`.
    pub fn session_file(self, path: impl AsRef<Path>) -> Self {
        self.token_store(FileTokenStore::new(path))
    }

    /// Overrides the deep link that password-recovery emails point to.
    pub fn reset_redirect(mut self, redirect: &str) -> Self {
        self.reset_redirect = redirect.to_string();
        self
    }

    /// Builds the client. Starts the token auto-refresh task when the
    /// backend config asks for it, so this must run inside a Tokio runtime.
    ///
    /// The session is not fetched yet; call [`MeakClient::start`].
    ///
    /// # Errors
    /// [`MeakError::Router`] if the guard config fails
    /// [`GuardConfig::validate`], [`MeakError::Transport`] if the backend
    /// can't be set up.
    pub async fn build(self) -> Result<MeakClient, MeakError> {
        self.guard_config.validate()?;
        let store = self
            .token_store
            .unwrap_or_else(|| Box::new(MemoryTokenStore::new()));
        let backend = Arc::new(HttpBackend::new(self.backend, store)?);

        let refresh_task = backend
            .config()
            .auto_refresh_token
            .then(|| backend.start_auto_refresh());

        let session = Arc::new(SessionStore::new(Arc::clone(&backend), self.session_config));

        tracing::info!(url = %backend.config().url, "meak client ready");

        Ok(MeakClient {
            profiles: ProfilesService::new(Arc::clone(&backend)),
            bookings: BookingsService::new(Arc::clone(&backend)),
            providers: ProvidersService::new(Arc::clone(&backend)),
            backend,
            session,
            guard_config: self.guard_config,
            reset_redirect: self.reset_redirect,
            refresh_task: Mutex::new(refresh_task),
        })
    }
}

impl Default for MeakClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The assembled client: one backend shared by the session store and the
/// table services.
pub struct MeakClient {
    backend: Arc<HttpBackend>,
    session: Arc<SessionStore<HttpBackend>>,
    profiles: ProfilesService<HttpBackend>,
    bookings: BookingsService<HttpBackend>,
    providers: ProvidersService<HttpBackend>,
    guard_config: GuardConfig,
    reset_redirect: String,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl MeakClient {
    /// Creates a new builder.
    pub fn builder() -> MeakClientBuilder {
        MeakClientBuilder::new()
    }

    /// Fetches the current session and starts following session changes.
    /// Safe to call more than once.
    pub async fn start(&self) {
        self.session.bootstrap().await;
    }

    pub fn session(&self) -> &Arc<SessionStore<HttpBackend>> {
        &self.session
    }

    /// A receiver of every session change, for UI and the route guard.
    pub fn watch_session(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    pub fn backend(&self) -> &Arc<HttpBackend> {
        &self.backend
    }

    pub fn profiles(&self) -> &ProfilesService<HttpBackend> {
        &self.profiles
    }

    pub fn bookings(&self) -> &BookingsService<HttpBackend> {
        &self.bookings
    }

    pub fn providers(&self) -> &ProvidersService<HttpBackend> {
        &self.providers
    }

    pub fn guard_config(&self) -> &GuardConfig {
        &self.guard_config
    }

    /// A route guard using this client's guard config. Run it with
    /// [`watch_session`](Self::watch_session) and the host's location.
    pub fn route_guard<N: Navigator>(&self, navigator: N) -> Result<RouteGuard<N>, MeakError> {
        Ok(RouteGuard::new(self.guard_config.clone(), navigator)?)
    }

    /// Sends a password-recovery email that links back into the app.
    pub async fn reset_password(&self, email: &str) -> Result<(), MeakError> {
        self.session
            .reset_password(email, Some(&self.reset_redirect))
            .await?;
        Ok(())
    }

    /// Stops the session listener and the token auto-refresh task.
    pub fn shutdown(&self) {
        self.session.shutdown();
        let refresh = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = refresh {
            task.abort();
        }
        tracing::info!("meak client stopped");
    }
}

impl Drop for MeakClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}
