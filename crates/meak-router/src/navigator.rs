//! The seam between the guard and whatever actually moves the screen.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::{RouteLocation, RouterError};

/// Performs navigation on behalf of the [`RouteGuard`](crate::RouteGuard).
///
/// `replace` swaps the current location for `path` without adding a
/// back-stack entry, so the user can't navigate back into a screen the
/// guard just moved them out of.
pub trait Navigator: Send + Sync + 'static {
    fn replace(&self, path: &str) -> impl Future<Output = Result<(), RouterError>> + Send;
}

impl<N: Navigator> Navigator for Arc<N> {
    fn replace(&self, path: &str) -> impl Future<Output = Result<(), RouterError>> + Send {
        (**self).replace(path)
    }
}

/// An in-memory navigator.
///
/// Publishes every replaced location on a watch channel, so the same
/// channel can be fed back to [`RouteGuard::run`](crate::RouteGuard::run)
/// as its location input. Also keeps the list of paths it was asked to
/// replace.
pub struct HistoryNavigator {
    location: watch::Sender<RouteLocation>,
    history: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    pub fn new(initial: RouteLocation) -> Self {
        let (location, _) = watch::channel(initial);
        Self {
            location,
            history: Mutex::new(Vec::new()),
        }
    }

    /// A receiver of the current location.
    pub fn location(&self) -> watch::Receiver<RouteLocation> {
        self.location.subscribe()
    }

    pub fn current(&self) -> RouteLocation {
        self.location.borrow().clone()
    }

    /// Moves to `location` as a user action would (not a replace).
    pub fn push(&self, location: RouteLocation) {
        self.location.send_replace(location);
    }

    /// Every path passed to `replace`, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for HistoryNavigator {
    async fn replace(&self, path: &str) -> Result<(), RouterError> {
        let location: RouteLocation = path.parse()?;
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
        self.location.send_replace(location);
        Ok(())
    }
}
