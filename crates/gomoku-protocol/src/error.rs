//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes or values on the wire were
//! wrong. Rule violations, seat conflicts and missing rooms are room
//! errors and never show up here.

/// Errors that can occur while encoding, decoding or validating wire data.
///
/// The dispatcher answers all of them with a 400 error message, using the
/// `Display` text as the message body.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a reply into bytes).
    ///
    /// Only possible for values serde_json can't represent. The types in
    /// this crate never hit it, but a custom payload could.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a request).
    ///
    /// Common causes: malformed JSON, a missing `type` tag, missing
    /// required fields, or a truncated frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but a value is out of range.
    ///
    /// Produced by the `TryFrom<u8>` conversions, e.g. seat `3` or rule
    /// style `9`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
