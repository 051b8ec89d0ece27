use meak_protocol::ProtocolError;

/// Errors that can occur talking to the remote backend.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The backend answered with a non-success status. `message` is the
    /// human-readable text from the response body, verbatim.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The request never got an answer: DNS, TLS, connection reset, or the
    /// HTTP client's own timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The answer arrived but couldn't be parsed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The operation needs a session and there isn't one.
    #[error("not signed in")]
    NotAuthenticated,

    /// Reading or writing the token store failed.
    #[error("token storage failed: {0}")]
    Storage(String),

    /// The backend configuration is unusable (bad URL, TLS setup, ...).
    #[error("invalid backend configuration: {0}")]
    Config(String),
}

impl TransportError {
    /// The HTTP status for API rejections, `None` for everything else.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
