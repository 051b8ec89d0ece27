//! Navigation guarding for the Meak client.
//!
//! The guard keeps signed-out users inside the auth route group and
//! signed-in users out of it. It is split in two:
//!
//! - [`evaluate`]: a pure function from `(session, location)` to an
//!   optional redirect
//! - [`RouteGuard`]: a driver that re-runs [`evaluate`] whenever the
//!   session or the location changes and hands redirects to a
//!   [`Navigator`]
//!
//! # Key types
//!
//! - [`RouteLocation`]: a parsed path (`/(auth)/login` → `["(auth)", "login"]`)
//! - [`GuardConfig`]: group name and redirect targets
//! - [`HistoryNavigator`]: in-memory navigator for hosts without a router

#![allow(async_fn_in_trait)]

mod error;
mod guard;
mod navigator;
mod route;

pub use error::RouterError;
pub use guard::{GuardConfig, RedirectTarget, RouteGuard, evaluate};
pub use navigator::{HistoryNavigator, Navigator};
pub use route::RouteLocation;
