//! Match rooms for Gomoku.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! board engine, the action log, the clock and the seat binding. Nothing
//! else mutates them.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates, finds and disposes rooms
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`ActionLog`]: the replayable history with an undo/redo cursor
//! - [`TurnState`]: whose turn it is, folded purely from the log
//! - [`RoomSettings`]: validated room configuration
//! - [`RoomEvent`]: what rooms publish on the shared [`RoomBus`]

mod config;
mod error;
mod events;
mod log;
mod manager;
mod resolver;
mod room;
mod sequencer;

pub use config::{
    AiConfig, RegistryConfig, RoomSettings, SeatConfig, ValidationError, DEFAULT_AI_DEPTH,
    MAX_AI_DEPTH, MAX_BOARD_SIZE, MIN_BOARD_SIZE,
};
pub use error::{ErrorKind, RoomError};
pub use events::{RoomBus, RoomEvent, RoomEventKind, Topic};
pub use log::{Action, ActionKind, ActionLog, LogError};
pub use manager::RoomRegistry;
pub use room::{spawn_room, RoomHandle};
pub use sequencer::{describe_log, expected, pro_violation, Expectation, OpeningPhase, TurnState};
