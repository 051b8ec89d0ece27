//! Error types for the session layer.

use meak_transport::TransportError;

/// What the user sees for a duplicate-account rejection.
pub const ALREADY_REGISTERED_MESSAGE: &str = "An account with this email already exists";

/// What the user sees when the provider throttles sign-ups.
pub const RATE_LIMITED_MESSAGE: &str = "Please wait a few minutes before trying again";

/// Errors returned by every [`SessionStore`](crate::SessionStore) mutation.
///
/// Each variant carries the provider's message, and `Display` prints it
/// verbatim so a screen can show it directly. Two rejections get a
/// friendlier text through [`AuthError::user_message`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The email already has an account.
    #[error("{0}")]
    AlreadyRegistered(String),

    /// The provider is rate-limiting this client or address.
    #[error("{0}")]
    RateLimited(String),

    /// Any other rejection: bad credentials, weak password, expired link.
    #[error("{0}")]
    Rejected(String),

    /// The request never got an answer (includes transport timeouts).
    #[error("{0}")]
    Network(String),

    /// The input was refused locally before any request was made.
    #[error("{0}")]
    InvalidInput(String),
}

impl AuthError {
    /// Classifies a provider message by the two substrings screens care
    /// about. Matching ignores case.
    pub fn from_provider_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("already registered") {
            Self::AlreadyRegistered(message)
        } else if lower.contains("rate limit") {
            Self::RateLimited(message)
        } else {
            Self::Rejected(message)
        }
    }

    /// The provider's (or validator's) message, unmodified.
    pub fn message(&self) -> &str {
        match self {
            Self::AlreadyRegistered(m)
            | Self::RateLimited(m)
            | Self::Rejected(m)
            | Self::Network(m)
            | Self::InvalidInput(m) => m,
        }
    }

    /// The text to put on screen.
    pub fn user_message(&self) -> &str {
        match self {
            Self::AlreadyRegistered(_) => ALREADY_REGISTERED_MESSAGE,
            Self::RateLimited(_) => RATE_LIMITED_MESSAGE,
            other => other.message(),
        }
    }
}

impl From<TransportError> for AuthError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Api { message, .. } => Self::from_provider_message(message),
            TransportError::Network(message) => Self::Network(message),
            other => Self::Rejected(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_registered_gets_friendly_text() {
        let err = AuthError::from_provider_message("User already registered");
        assert!(matches!(err, AuthError::AlreadyRegistered(_)));
        assert_eq!(err.user_message(), ALREADY_REGISTERED_MESSAGE);
        // Display still shows what the provider said.
        assert_eq!(err.to_string(), "User already registered");
    }

    #[test]
    fn test_rate_limit_gets_friendly_text() {
        let err = AuthError::from_provider_message("email rate limit exceeded");
        assert!(matches!(err, AuthError::RateLimited(_)));
        assert_eq!(err.user_message(), RATE_LIMITED_MESSAGE);
    }

    #[test]
    fn test_other_messages_surface_verbatim() {
        let err = AuthError::from_provider_message("Invalid login credentials");
        assert!(matches!(err, AuthError::Rejected(_)));
        assert_eq!(err.user_message(), "Invalid login credentials");
    }

    #[test]
    fn test_from_transport_api_error_classifies_message() {
        let err: AuthError = TransportError::Api {
            status: 422,
            message: "User already registered".into(),
        }
        .into();
        assert!(matches!(err, AuthError::AlreadyRegistered(_)));
    }

    #[test]
    fn test_from_transport_network_error() {
        let err: AuthError = TransportError::Network("timed out".into()).into();
        assert_eq!(err, AuthError::Network("timed out".into()));
    }

    #[test]
    fn test_from_transport_not_authenticated_is_rejected() {
        let err: AuthError = TransportError::NotAuthenticated.into();
        assert_eq!(err.message(), "not signed in");
    }
}
