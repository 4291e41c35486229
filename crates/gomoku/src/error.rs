//! Unified error type for the gomoku façade.

use gomoku_protocol::ProtocolError;
use gomoku_room::RoomError;

/// Top-level error that wraps the crate-specific errors.
///
/// Seat-binding, engine and validation failures all reach this type
/// through [`RoomError`], so callers deal with one error and one
/// [`code`](Self::code).
#[derive(Debug, thiserror::Error)]
pub enum GomokuError {
    /// Bytes that don't decode into a request, or a reply that can't be
    /// encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Room(#[from] RoomError),

    /// A networked-room request arrived without a caller identity.
    #[error("{0} needs a caller identity")]
    MissingIdentity(&'static str),

    /// A local-room request arrived without a seat.
    #[error("{0} needs a seat in local rooms")]
    MissingSeat(&'static str),
}

impl GomokuError {
    /// HTTP-style status code for error replies.
    pub fn code(&self) -> u16 {
        match self {
            Self::Protocol(_) | Self::MissingSeat(_) => 400,
            Self::MissingIdentity(_) => 401,
            Self::Room(err) => err.kind().code(),
        }
    }
}
