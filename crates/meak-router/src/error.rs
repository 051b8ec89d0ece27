//! Error types for the router layer.

/// Errors that can occur while navigating.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The path is not an absolute route.
    #[error("invalid route: {0:?}")]
    InvalidRoute(String),

    /// The guard config would send the user somewhere the guard itself
    /// redirects away from.
    #[error("invalid guard config: {0}")]
    InvalidConfig(String),

    /// The host refused or could not perform the navigation.
    #[error("navigation failed: {0}")]
    NavigationFailed(String),
}
