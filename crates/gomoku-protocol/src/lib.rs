//! Wire vocabulary for Gomoku rooms.
//!
//! - **Types** ([`Seat`], [`Stone`], [`RuleStyle`], [`ActionType`], ...):
//!   the words every other crate uses.
//! - **Messages** ([`ClientRequest`], [`ServerMessage`], [`RoomSnapshot`]):
//!   request and response shapes for whatever transport sits on top.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes in, bytes out.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (ClientRequest) → Room (actions)
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{
    ActionResponse, ClientRequest, CreateRoom, RoomListEntry, RoomSnapshot, SeatSetup, SeatView,
    ServerMessage, TimeView, UNLIMITED_TIME,
};
pub use types::{
    coordinate_char, ActionType, Identity, RoomId, RoomPhase, RuleStyle, Seat, Stone, Swap2Choice,
};
