//! Error types for seat binding.

use gomoku_protocol::{Identity, Seat};

/// Why a seat could not be bound or used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// Another identity already holds this seat.
    #[error("seat {0} is already taken")]
    SeatTaken(Seat),

    /// This identity already holds a different seat.
    #[error("{identity} is already connected to seat {seat}")]
    IdentityAlreadyBound { identity: Identity, seat: Seat },

    /// The seat can't be bound at all (it is played by the computer).
    #[error("seat {0} is not available to remote players")]
    SeatUnavailable(Seat),

    /// The identity holds no seat in this room.
    #[error("{0} is not seated in this room")]
    NotSeated(Identity),

    /// Not every human seat has been bound yet.
    #[error("not all players have joined")]
    RoomNotReady,

    /// Binding operations on a local room.
    #[error("room is not networked")]
    NotNetworked,
}
