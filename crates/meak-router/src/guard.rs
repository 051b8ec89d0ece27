//! The route guard: a pure redirect rule plus the driver that applies it.

use meak_session::Session;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{Navigator, RouteLocation, RouterError};

// ---------------------------------------------------------------------------
// GuardConfig
// ---------------------------------------------------------------------------

/// Where the guard draws the line and where it sends people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// First path segment of the screens reachable without a session.
    pub auth_group: String,

    /// Where signed-out users are sent.
    pub login_route: String,

    /// Where signed-in users are sent.
    pub home_route: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            auth_group: "(auth)".into(),
            login_route: "/(auth)/login".into(),
            home_route: "/(tabs)".into(),
        }
    }
}

impl GuardConfig {
    /// Checks that both redirect targets are routes the guard accepts:
    /// the login route inside `auth_group`, the home route outside it.
    /// Otherwise every redirect would trigger another one.
    ///
    /// # Errors
    /// [`RouterError::InvalidRoute`] for a relative route,
    /// [`RouterError::InvalidConfig`] for a target on the wrong side of
    /// the group.
    pub fn validate(&self) -> Result<(), RouterError> {
        let group = self.auth_group.as_str();
        if group.is_empty() || group.contains('/') {
            return Err(RouterError::InvalidConfig(format!(
                "auth group {group:?} must be a single path segment"
            )));
        }

        let login: RouteLocation = self.login_route.parse()?;
        if !login.is_in_group(group) {
            return Err(RouterError::InvalidConfig(format!(
                "login route {login} is outside the auth group {group}"
            )));
        }

        let home: RouteLocation = self.home_route.parse()?;
        if home.is_in_group(group) {
            return Err(RouterError::InvalidConfig(format!(
                "home route {home} is inside the auth group {group}"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// evaluate
// ---------------------------------------------------------------------------

/// A redirect the guard wants performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    Login,
    Home,
}

impl RedirectTarget {
    /// The configured path for this target.
    pub fn path(self, config: &GuardConfig) -> &str {
        match self {
            Self::Login => &config.login_route,
            Self::Home => &config.home_route,
        }
    }
}

/// Decides whether `location` is allowed for `session`.
///
/// ```text
/// initialized │ user │ in auth group │ result
/// ────────────┼──────┼───────────────┼────────
///    false    │  *   │       *       │ None
///    true     │ None │      no       │ Login
///    true     │ Some │      yes      │ Home
///    true     │  *   │       *       │ None
/// ```
pub fn evaluate(
    session: &Session,
    location: &RouteLocation,
    config: &GuardConfig,
) -> Option<RedirectTarget> {
    if !session.initialized {
        return None;
    }
    let in_auth_group = location.is_in_group(&config.auth_group);
    match (&session.user, in_auth_group) {
        (None, false) => Some(RedirectTarget::Login),
        (Some(_), true) => Some(RedirectTarget::Home),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// RouteGuard
// ---------------------------------------------------------------------------

/// Applies [`evaluate`] to every change of the session or the location.
pub struct RouteGuard<N: Navigator> {
    config: GuardConfig,
    navigator: N,
}

impl<N: Navigator> RouteGuard<N> {
    /// # Errors
    /// Rejects a config that fails [`GuardConfig::validate`].
    pub fn new(config: GuardConfig, navigator: N) -> Result<Self, RouterError> {
        config.validate()?;
        Ok(Self { config, navigator })
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Evaluates once and performs the redirect, if any. Returns what was
    /// done.
    pub async fn check(
        &self,
        session: &Session,
        location: &RouteLocation,
    ) -> Result<Option<RedirectTarget>, RouterError> {
        let Some(target) = evaluate(session, location, &self.config) else {
            return Ok(None);
        };
        let path = target.path(&self.config);
        tracing::info!(from = %location, to = path, "route guard redirect");
        self.navigator.replace(path).await?;
        Ok(Some(target))
    }

    /// Follows both inputs until both are closed.
    ///
    /// The current values are checked immediately, then again after every
    /// change; there is no debouncing. A failed navigation is logged and
    /// the guard keeps running.
    pub async fn run(
        &self,
        mut session: watch::Receiver<Session>,
        mut location: watch::Receiver<RouteLocation>,
    ) {
        let mut session_open = true;
        let mut location_open = true;

        loop {
            let current_session = session.borrow_and_update().clone();
            let current_location = location.borrow_and_update().clone();
            if let Err(e) = self.check(&current_session, &current_location).await {
                tracing::warn!(error = %e, location = %current_location, "route guard redirect failed");
            }

            tokio::select! {
                changed = session.changed(), if session_open => {
                    session_open = changed.is_ok();
                }
                changed = location.changed(), if location_open => {
                    location_open = changed.is_ok();
                }
                else => break,
            }
        }

        tracing::debug!("route guard stopped");
    }

    /// Runs the guard on its own task.
    pub fn spawn(
        self,
        session: watch::Receiver<Session>,
        location: watch::Receiver<RouteLocation>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(session, location).await })
    }
}
