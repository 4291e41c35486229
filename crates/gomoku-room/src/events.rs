//! Events rooms publish on the shared bus.
//!
//! One bus serves every room in a registry, so each event carries its
//! room id. Subscriptions made through a [`RoomHandle`](crate::RoomHandle)
//! only ever see their own room's events.

use gomoku_bus::EventBus;
use gomoku_protocol::{ActionType, Identity, RoomId, RoomSnapshot, Seat};

/// Bus topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Any committed action, undo or redo.
    StateChanged,
    /// Re-published from `StateChanged` while the game is running.
    TurnExpected,
    GameOver,
    SeatConnected,
    SeatDisconnected,
    /// An AI turn failed (engine error, panic or timeout).
    ResolutionFailed,
    RoomDisposed,
}

/// What happened. Each variant belongs to exactly one [`Topic`].
///
/// `StateChanged` carries the full snapshot so subscribers (a transport
/// pushing updates to clients, a UI redrawing the board) never have to
/// call back into the room from inside a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEventKind {
    StateChanged(Box<RoomSnapshot>),
    TurnExpected { seat: Seat, action: ActionType },
    /// `winner` is `None` for a draw.
    GameOver { winner: Option<Seat> },
    SeatConnected { seat: Seat, identity: Identity },
    SeatDisconnected { seat: Seat, identity: Identity },
    ResolutionFailed { seat: Seat, reason: String },
    RoomDisposed,
}

impl RoomEventKind {
    pub fn topic(&self) -> Topic {
        match self {
            Self::StateChanged(_) => Topic::StateChanged,
            Self::TurnExpected { .. } => Topic::TurnExpected,
            Self::GameOver { .. } => Topic::GameOver,
            Self::SeatConnected { .. } => Topic::SeatConnected,
            Self::SeatDisconnected { .. } => Topic::SeatDisconnected,
            Self::ResolutionFailed { .. } => Topic::ResolutionFailed,
            Self::RoomDisposed => Topic::RoomDisposed,
        }
    }
}

/// Payload of every bus event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEvent {
    pub room_id: RoomId,
    pub kind: RoomEventKind,
}

impl RoomEvent {
    pub fn topic(&self) -> Topic {
        self.kind.topic()
    }
}

/// The bus type shared by a registry and its rooms.
pub type RoomBus = EventBus<Topic, RoomEvent>;
