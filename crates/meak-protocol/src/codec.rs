//! Codec trait and implementations for serializing/deserializing payloads.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The transport uses one to persist sessions in the token store and to
//! read row payloads, without caring which format sits underneath.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `DeserializeOwned` (vs plain `Deserialize`) means the result doesn't
/// borrow from the input bytes, so the buffer can be dropped right after
/// decoding.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Encodes to a UTF-8 string, for stores that only hold text.
    fn encode_string<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        let bytes = self.encode(value)?;
        String::from_utf8(bytes)
            .map_err(|e| ProtocolError::InvalidMessage(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON is what the backend speaks and what the token store persists, so
/// it is the only codec the client needs.
///
/// ## Example
///
/// ```rust
/// use meak_protocol::{Codec, JsonCodec, UserIdentity};
///
/// let codec = JsonCodec;
/// let user = UserIdentity::new("u-1", "a@b.com");
///
/// let bytes = codec.encode(&user).unwrap();
/// let decoded: UserIdentity = codec.decode(&bytes).unwrap();
/// assert_eq!(user, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuthSession, UserIdentity};

    #[test]
    fn test_json_codec_persists_session_as_text() {
        let session = AuthSession {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            token_type: "bearer".into(),
            expires_in: 3600,
            expires_at: Some(1_700_000_000),
            user: UserIdentity::new("u-1", "a@b.com"),
        };

        let text = JsonCodec.encode_string(&session).unwrap();
        assert!(text.contains("\"refresh_token\":\"refresh\""));

        let back: AuthSession = JsonCodec.decode(text.as_bytes()).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_json_codec_decode_garbage_returns_decode_error() {
        let result: Result<AuthSession, _> = JsonCodec.decode(b"{not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
