//! Board engine interface for Gomoku rooms.
//!
//! A room never inspects the board itself. It drives a [`GameEngine`]:
//! apply a move, get back an opaque effect, keep the effect in the action
//! log so the move can be inverted on undo and reapplied on redo.
//!
//! [`FreestyleEngine`] is the reference implementation: freestyle five in a
//! row with pair captures, and a one-ply heuristic for suggestions.

mod error;
mod freestyle;

use std::fmt;
use std::time::Duration;

use gomoku_protocol::Stone;

pub use error::EngineError;
pub use freestyle::{FreestyleEngine, MoveEffect, CAPTURE_WIN};

/// Limits for a single move search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBudget {
    /// Search depth, `>= 1`.
    pub depth: u32,
    /// Wall-clock limit. The caller enforces it; engines may also stop early.
    pub timeout: Duration,
}

/// Board rules and search, as seen by a room.
///
/// Stone colour alternates with every applied move starting from black;
/// the engine tracks it, the room only says where.
///
/// ## Contract
///
/// - Every method that returns `Err` leaves the engine unchanged.
/// - `invert(e)` right after the move that produced `e` restores the exact
///   previous position; `reapply(e)` right after `invert(e)` restores the
///   position after the move.
/// - Engines are cloned for background search, so clones must be
///   independent.
pub trait GameEngine: Clone + Send + Sync + 'static {
    /// What a move changed, enough to invert and reapply it.
    type Effect: Clone + fmt::Debug + Send + Sync + 'static;

    /// An empty board of the given size.
    fn new_game(width: usize, height: usize) -> Self;

    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// Places the next stone at `(row, col)`.
    fn apply_move(&mut self, row: usize, col: usize) -> Result<Self::Effect, EngineError>;

    /// Takes back the move that produced `effect`.
    fn invert(&mut self, effect: &Self::Effect) -> Result<(), EngineError>;

    /// Replays a previously inverted move.
    fn reapply(&mut self, effect: &Self::Effect) -> Result<(), EngineError>;

    /// Row-major copy of the board, `board[row][col]`.
    fn board_snapshot(&self) -> Vec<Vec<Stone>>;

    fn is_game_over(&self) -> bool;

    /// `None` while playing and after a draw.
    fn winner(&self) -> Option<Stone>;

    /// Score for a colour (captured stones for the reference engine).
    fn score_of(&self, stone: Stone) -> u32;

    /// Proposes a move for `stone` without changing the position.
    fn suggest_move(&self, stone: Stone, budget: &SearchBudget)
        -> Result<(usize, usize), EngineError>;
}
