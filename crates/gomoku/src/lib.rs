//! # Gomoku
//!
//! Server-authoritative match orchestration for Gomoku and its opening
//! variants (Standard, Pro, Swap, Swap2).
//!
//! Each match is a room running in its own Tokio task. Rooms derive whose
//! turn it is from a replayable action log, support undo and redo, drive
//! computer-controlled seats through a pluggable [`GameEngine`], bind
//! remote identities to seats in networked play, and publish what happens
//! on a shared event bus.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gomoku::prelude::*;
//!
//! # async fn run() -> Result<(), GomokuError> {
//! let mut registry = RoomRegistry::<FreestyleEngine>::new();
//! let room_id = registry.create_room(RoomSettings::local_pvp(19, RuleStyle::Standard))?;
//! let room = registry.get(&room_id)?;
//!
//! let state = room.make_move(Seat::One, 9, 9).await?;
//! assert_eq!(state.next_seat, Some(Seat::Two));
//! # Ok(())
//! # }
//! ```
//!
//! Transports usually go through a [`Dispatcher`], which speaks the
//! [`ClientRequest`]/[`ServerMessage`] protocol.

mod error;
mod handler;
pub mod telemetry;

pub use error::GomokuError;
pub use handler::Dispatcher;

pub use gomoku_bus::{EventBus, HandlerError, SubscriptionToken};
pub use gomoku_engine::{EngineError, FreestyleEngine, GameEngine, SearchBudget};
pub use gomoku_protocol::{ClientRequest, Codec, JsonCodec, ServerMessage};
pub use gomoku_room::{RoomBus, RoomError, RoomHandle, RoomRegistry, RoomSettings};
pub use gomoku_session::BindingError;

/// Everything needed to run rooms and dispatch requests.
pub mod prelude {
    pub use crate::{Dispatcher, GomokuError};

    pub use gomoku_bus::{HandlerError, SubscriptionToken};
    pub use gomoku_engine::{EngineError, FreestyleEngine, GameEngine, SearchBudget};
    pub use gomoku_protocol::{
        ActionResponse, ActionType, ClientRequest, Codec, CreateRoom, Identity, JsonCodec,
        RoomId, RoomListEntry, RoomPhase, RoomSnapshot, RuleStyle, Seat, SeatSetup, SeatView,
        ServerMessage, Stone, Swap2Choice, TimeView, UNLIMITED_TIME,
    };
    pub use gomoku_room::{
        AiConfig, ErrorKind, RegistryConfig, RoomBus, RoomError, RoomEvent, RoomEventKind,
        RoomHandle, RoomRegistry, RoomSettings, SeatConfig, Topic, ValidationError,
    };
    pub use gomoku_session::BindingError;
}
