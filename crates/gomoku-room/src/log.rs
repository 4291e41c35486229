//! The action log: every committed action, plus an undo/redo cursor.
//!
//! ```text
//!  applied           redo suffix
//! ┌────┬────┬────┐ ┌────┬────┐
//! │ a0 │ a1 │ a2 │ │ a3 │ a4 │
//! └────┴────┴────┘ └────┴────┘
//!                 ▲
//!               cursor = 3, len = 5
//! ```
//!
//! Committing at cursor 3 would drop `a3` and `a4` for good.

use std::time::Duration;

use gomoku_protocol::{ActionType, Seat, Swap2Choice};

/// What a seat did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Move { row: usize, col: usize },
    SwapDecision { did_swap: bool },
    OpeningChoice { choice: Swap2Choice },
}

impl ActionKind {
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Move { .. } => ActionType::Move,
            Self::SwapDecision { .. } => ActionType::SwapDecision,
            Self::OpeningChoice { .. } => ActionType::OpeningChoice,
        }
    }

    /// `true` for decisions that hand black to the other seat.
    pub fn exchanges_colours(&self) -> bool {
        matches!(
            self,
            Self::SwapDecision { did_swap: true }
                | Self::OpeningChoice {
                    choice: Swap2Choice::TakeBlack
                }
        )
    }
}

/// One committed action. Never modified after commit.
#[derive(Debug, Clone)]
pub struct Action<F> {
    pub seat: Seat,
    pub kind: ActionKind,
    /// Engine effect of a move, used to invert and reapply it.
    pub effect: Option<F>,
    /// Time since the room started.
    pub timestamp: Duration,
    /// Time charged to `seat` for this turn.
    pub think_time: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    #[error("nothing to undo")]
    NoMoreUndo,
    #[error("nothing to redo")]
    NoMoreRedo,
}

/// Ordered actions with a cursor in `0..=len`.
#[derive(Debug, Clone)]
pub struct ActionLog<F> {
    actions: Vec<Action<F>>,
    cursor: usize,
}

impl<F> Default for ActionLog<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> ActionLog<F> {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            cursor: 0,
        }
    }

    /// Drops the redo suffix, appends `action` and moves the cursor past it.
    /// Returns how many redoable actions were discarded.
    pub fn commit(&mut self, action: Action<F>) -> usize {
        let dropped = self.actions.len() - self.cursor;
        self.actions.truncate(self.cursor);
        self.actions.push(action);
        self.cursor = self.actions.len();
        dropped
    }

    /// Steps the cursor back and returns the action it stepped over.
    pub fn undo(&mut self) -> Result<&Action<F>, LogError> {
        if self.cursor == 0 {
            return Err(LogError::NoMoreUndo);
        }
        self.cursor -= 1;
        Ok(&self.actions[self.cursor])
    }

    /// Steps the cursor forward and returns the action it stepped over.
    pub fn redo(&mut self) -> Result<&Action<F>, LogError> {
        if self.cursor == self.actions.len() {
            return Err(LogError::NoMoreRedo);
        }
        self.cursor += 1;
        Ok(&self.actions[self.cursor - 1])
    }

    /// The action [`undo`](Self::undo) would step over.
    pub fn peek_undo(&self) -> Option<&Action<F>> {
        self.cursor.checked_sub(1).map(|i| &self.actions[i])
    }

    /// The action [`redo`](Self::redo) would step over.
    pub fn peek_redo(&self) -> Option<&Action<F>> {
        self.actions.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.actions.len()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Actions before the cursor.
    pub fn applied(&self) -> &[Action<F>] {
        &self.actions[..self.cursor]
    }

    /// Actions after the cursor.
    pub fn redo_suffix(&self) -> &[Action<F>] {
        &self.actions[self.cursor..]
    }

    /// All actions, applied or not.
    pub fn iter(&self) -> impl Iterator<Item = &Action<F>> {
        self.actions.iter()
    }
}
