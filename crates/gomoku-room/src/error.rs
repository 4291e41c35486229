//! Error types for the room layer.
//!
//! [`RoomError`] is what every [`RoomHandle`](crate::RoomHandle) call can
//! fail with. Errors from the lower crates (engine, seat binding, action
//! log) convert into it with `?`, so the room actor has one error type to
//! reply with. [`ErrorKind`] then folds the variants into the six classes
//! a transport needs to pick a status code:
//!
//! | Kind | Code | Variants |
//! |------|------|----------|
//! | Validation | 400 | `Validation` |
//! | IllegalMove | 409 | `IllegalMove`, `GameOver`, `ActionNotExpected`, `ResolutionInFlight`, engine placement errors |
//! | SeatConflict | 403 | `Binding` |
//! | UndoRedoBoundary | 409 | `NoMoreUndo`, `NoMoreRedo`, `SwapLocked` |
//! | EngineFailure | 500 | other engine errors, `Timeout` |
//! | Unavailable | 404 | `NotFound`, `Unavailable`, `NoRoomCode` |

use gomoku_engine::EngineError;
use gomoku_protocol::RoomId;
use gomoku_session::BindingError;

use crate::{LogError, ValidationError};

/// Errors that can occur during room operations.
///
/// Every rejection leaves the room exactly as it was before the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room settings were refused.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The placement breaks a rule-style constraint (Pro opening squares).
    #[error("illegal move: {0}")]
    IllegalMove(String),

    /// The game has ended; only undo, redo and reads are accepted.
    #[error("the game is over")]
    GameOver,

    /// Wrong seat, wrong action type, or an AI seat is expected.
    #[error("{0}")]
    ActionNotExpected(String),

    /// An AI turn is being computed; undo and redo must wait.
    #[error("an AI turn is being resolved")]
    ResolutionInFlight,

    /// The caller holds no seat, the seat is taken, or the room isn't full
    /// yet. Only networked rooms produce these, apart from `NotNetworked`.
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("no moves to reverse")]
    NoMoreUndo,

    #[error("no moves to reapply")]
    NoMoreRedo,

    /// The action to undo exchanged colours and later actions depend on it.
    #[error("cannot reverse swap choice")]
    SwapLocked,

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A search or suggestion exceeded its time limit.
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room's command channel is closed (disposed or shutting down).
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    /// No unused room code could be drawn.
    #[error("could not allocate a room code")]
    NoRoomCode,
}

impl From<LogError> for RoomError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::NoMoreUndo => Self::NoMoreUndo,
            LogError::NoMoreRedo => Self::NoMoreRedo,
        }
    }
}

/// Coarse classification used by transports to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    IllegalMove,
    SeatConflict,
    UndoRedoBoundary,
    EngineFailure,
    Unavailable,
}

impl ErrorKind {
    /// HTTP-style status code.
    pub fn code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::IllegalMove => 409,
            Self::SeatConflict => 403,
            Self::UndoRedoBoundary => 409,
            Self::EngineFailure => 500,
            Self::Unavailable => 404,
        }
    }
}

impl RoomError {
    /// Which class of failure this is. See the module docs for the table.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::IllegalMove(_)
            | Self::GameOver
            | Self::ActionNotExpected(_)
            | Self::ResolutionInFlight => ErrorKind::IllegalMove,
            // The engine refusing a placement is the player's mistake.
            Self::Engine(
                EngineError::OutOfBounds { .. } | EngineError::Occupied { .. } | EngineError::GameOver,
            ) => ErrorKind::IllegalMove,
            Self::Engine(_) | Self::Timeout(_) => ErrorKind::EngineFailure,
            Self::Binding(_) => ErrorKind::SeatConflict,
            Self::NoMoreUndo | Self::NoMoreRedo | Self::SwapLocked => ErrorKind::UndoRedoBoundary,
            Self::NotFound(_) | Self::Unavailable(_) | Self::NoRoomCode => ErrorKind::Unavailable,
        }
    }
}
