//! Error types for the table services.

use meak_transport::TransportError;

/// Errors returned by every table service call.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The request failed or the backend rejected it.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A row came back in a shape the client doesn't understand.
    #[error("malformed {table} row: {source}")]
    Decode {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A lookup by id matched no row.
    #[error("{table} row {id} not found")]
    NotFound { table: &'static str, id: String },
}
