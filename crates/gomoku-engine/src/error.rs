//! Engine errors.

use gomoku_protocol::Stone;

/// Errors reported by a [`GameEngine`](crate::GameEngine).
///
/// A failed call leaves the engine exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("position ({row}, {col}) is off the board")]
    OutOfBounds { row: usize, col: usize },

    #[error("position ({row}, {col}) is already occupied")]
    Occupied { row: usize, col: usize },

    #[error("the game is already over")]
    GameOver,

    #[error("no legal move available for {0}")]
    NoLegalMove(Stone),

    /// An effect does not match the board it is being applied to.
    #[error("effect does not match the board: {0}")]
    InconsistentEffect(String),

    /// The engine failed internally (a panicking search, a lost worker).
    #[error("engine failure: {0}")]
    Crashed(String),
}
