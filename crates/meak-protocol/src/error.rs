//! Error types for the protocol layer.
//!
//! Each Meak crate defines its own error enum. A `ProtocolError` always
//! means the bytes were wrong, never the network or the credentials.

/// Errors that can occur while encoding or decoding wire payloads.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
        #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or a row
    /// whose column types changed on the backend.
        #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The payload parsed but doesn't make sense, e.g. a token response
    /// with neither a user nor a session in it.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
