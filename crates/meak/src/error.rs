//! Unified error type for the Meak client.

use meak_protocol::ProtocolError;
use meak_router::RouterError;
use meak_services::RemoteError;
use meak_session::AuthError;
use meak_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `meak` facade crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MeakError {
    /// A transport-level error (request, storage, configuration).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An auth error (rejected credentials, rate limit, invalid form).
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A table service error (not found, malformed row).
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A navigation error.
    #[error(transparent)]
    Router(#[from] RouterError),
}

impl MeakError {
    /// The text to put on screen for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(e) => e.user_message().to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Network("connection refused".into());
        let meak_err: MeakError = err.into();
        assert!(matches!(meak_err, MeakError::Transport(_)));
        assert!(meak_err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let meak_err: MeakError = err.into();
        assert!(matches!(meak_err, MeakError::Protocol(_)));
    }

    #[test]
    fn test_from_auth_error_keeps_friendly_message() {
        let err = AuthError::from_provider_message("email rate limit exceeded");
        let meak_err: MeakError = err.into();
        assert!(matches!(meak_err, MeakError::Auth(_)));
        assert_eq!(meak_err.to_string(), "email rate limit exceeded");
        assert_eq!(
            meak_err.user_message(),
            "Please wait a few minutes before trying again"
        );
    }

    #[test]
    fn test_from_remote_error() {
        let err = RemoteError::NotFound {
            table: "tasks",
            id: "t-1".into(),
        };
        let meak_err: MeakError = err.into();
        assert!(matches!(meak_err, MeakError::Remote(_)));
        assert_eq!(meak_err.user_message(), "tasks row t-1 not found");
    }

    #[test]
    fn test_from_router_error() {
        let err = RouterError::InvalidRoute("login".into());
        let meak_err: MeakError = err.into();
        assert!(matches!(meak_err, MeakError::Router(_)));
    }
}
