//! Driving AI seats.
//!
//! Opening decisions are instant and come from a fixed policy. Moves are
//! searched on a clone of the engine on Tokio's blocking pool, bounded by
//! a timeout, and the result is mailed back to the room actor, which
//! commits it like any human move.
//!
//! ```text
//! actor ──clone engine──► spawn_blocking(suggest_move)
//!   ▲                              │ timeout
//!   └──── RoomCommand::Resolved ◄──┘ (WeakSender: never keeps a room alive)
//! ```

use gomoku_engine::{EngineError, GameEngine, SearchBudget};
use gomoku_protocol::{ActionType, RuleStyle, Seat, Stone, Swap2Choice};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::room::RoomCommand;
use crate::{ActionKind, OpeningPhase, RoomError, TurnState};

/// The one in-flight AI search of a room.
#[derive(Debug)]
pub(crate) struct PendingResolution {
    pub id: u64,
    pub seat: Seat,
    pub task: JoinHandle<()>,
}

impl PendingResolution {
    /// Stops the task. Its outcome, if already mailed, becomes stale.
    pub fn cancel(self) {
        self.task.abort();
    }
}

/// What an AI seat does with its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Plan {
    /// Commit this decision right away.
    Decide(ActionKind),
    /// Search for a move.
    Search,
}

/// Opening policy for AI seats: as seat 2, always take black; as seat 1 at
/// the final Swap2 decision, keep black; under Pro, play the two
/// constrained opening stones on fixed points. Everything else is searched.
pub(crate) fn plan(turn: &TurnState, width: usize, height: usize) -> Plan {
    let expected = turn.expectation();
    match expected.action {
        ActionType::Move => match pro_opening(turn, width, height) {
            Some((row, col)) => Plan::Decide(ActionKind::Move { row, col }),
            None => Plan::Search,
        },
        ActionType::SwapDecision => Plan::Decide(ActionKind::SwapDecision {
            did_swap: expected.phase == OpeningPhase::SwapDecision,
        }),
        ActionType::OpeningChoice => Plan::Decide(ActionKind::OpeningChoice {
            choice: Swap2Choice::TakeBlack,
        }),
    }
}

/// Centre, then three columns right of it.
pub(crate) fn pro_opening(turn: &TurnState, width: usize, height: usize) -> Option<(usize, usize)> {
    if turn.rule_style != RuleStyle::Pro {
        return None;
    }
    let (row, col) = (height / 2, width / 2);
    match turn.moves {
        0 => Some((row, col)),
        1 => Some((row, col + 3)),
        _ => None,
    }
}

/// Runs `suggest_move` on the blocking pool under `budget.timeout`.
///
/// A panicking engine surfaces as [`EngineError::Crashed`]. On timeout the
/// blocking thread finishes on its own and its answer is dropped.
pub(crate) async fn search<E: GameEngine>(
    engine: E,
    stone: Stone,
    budget: SearchBudget,
    what: &'static str,
) -> Result<(usize, usize), RoomError> {
    let task = tokio::task::spawn_blocking(move || engine.suggest_move(stone, &budget));
    match tokio::time::timeout(budget.timeout, task).await {
        Err(_) => Err(RoomError::Timeout(what)),
        Ok(Err(join_err)) => Err(RoomError::Engine(EngineError::Crashed(join_err.to_string()))),
        Ok(Ok(result)) => result.map_err(RoomError::from),
    }
}

/// Starts the search for `seat` and mails the outcome back as
/// [`RoomCommand::Resolved`] tagged with `id`.
pub(crate) fn spawn_search<E: GameEngine>(
    id: u64,
    seat: Seat,
    engine: E,
    stone: Stone,
    budget: SearchBudget,
    mailbox: mpsc::WeakSender<RoomCommand>,
) -> PendingResolution {
    let task = tokio::spawn(async move {
        let outcome = search(engine, stone, budget, "search").await;
        if let Some(tx) = mailbox.upgrade() {
            let _ = tx.send(RoomCommand::Resolved { id, seat, outcome }).await;
        }
    });
    PendingResolution { id, seat, task }
}
