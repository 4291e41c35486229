//! Codec trait and implementations for moving messages to and from bytes.
//!
//! The room layer never touches bytes. A transport picks a [`Codec`] and
//! hands decoded [`ClientRequest`](crate::ClientRequest)s to the dispatcher.
//! [`JsonCodec`] is the only implementation today; it keeps messages
//! readable in logs and browser tools.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes bytes back.
///
/// ## Trait bounds
///
/// - `Send + Sync`: one codec is shared by every connection task, and
///   Tokio may run those tasks on any worker thread.
/// - `'static`: the codec is stored inside the dispatcher, which outlives
///   any single request.
///
/// ## Generic methods
///
/// `encode` accepts anything `Serialize`; `decode` produces anything
/// `DeserializeOwned`, so the decoded request owns its strings and the
/// input buffer can be dropped right away. The same codec therefore
/// handles [`ClientRequest`](crate::ClientRequest) in and
/// [`ServerMessage`](crate::ServerMessage) out.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into an owned value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` for malformed or mistyped input.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// JSON keeps requests readable in logs and browser tools, and matches
/// what web clients send anyway. Messages are tagged by a `type` field,
/// seats travel as `1`/`2` and unlimited budgets as `-1`.
///
/// Behind the `json` feature, which is on by default. Builds without it
/// must bring their own codec.
///
/// ```rust
/// use gomoku_protocol::{ClientRequest, Codec, JsonCodec, RoomId};
///
/// let codec = JsonCodec;
/// let request = ClientRequest::Undo { room_id: RoomId("AB12CD".into()) };
/// let bytes = codec.encode(&request).unwrap();
/// let decoded: ClientRequest = codec.decode(&bytes).unwrap();
/// assert_eq!(request, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
