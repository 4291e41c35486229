//! Whose turn is it, and what must they do?
//!
//! Answered by folding the applied prefix of the action log into a
//! [`TurnState`], starting from scratch every time. Nothing here caches a
//! "current player": after undo or redo the answer is simply recomputed
//! from what is left in the log.
//!
//! ```text
//! Standard / Pro   Main ─────────────────────────────────────────────►
//!
//! Swap             Opening{0} → Opening{1} → SwapDecision → Main
//!                  (seat 1 places 2)          (seat 2)
//!
//! Swap2            Opening{0..2} → Swap2Choice ─┬─ TakeBlack/TakeWhite → Main
//!                  (seat 1 places 3) (seat 2)   └─ PlaceTwo → ExtraPlacements{0..1}
//!                                                  (seat 2 places 2)
//!                                                  → FinalSwapDecision → Main
//!                                                    (seat 1)
//! ```

use gomoku_protocol::{coordinate_char, ActionType, RuleStyle, Seat, Stone, Swap2Choice};

use crate::{ActionKind, RoomError};

/// Opening sub-state. Only `Main` exists under Standard and Pro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpeningPhase {
    /// Seat 1 is placing the opening stones.
    Opening { placed: u8 },
    /// Seat 2 decides whether to take black (Swap).
    SwapDecision,
    /// Seat 2 picks a Swap2 option.
    Swap2Choice,
    /// Seat 2 is placing the two extra Swap2 stones.
    ExtraPlacements { placed: u8 },
    /// Seat 1 decides whether to take white after the extra stones.
    FinalSwapDecision,
    /// Regular alternating play.
    Main,
}

/// Who acts next, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectation {
    pub seat: Seat,
    pub action: ActionType,
    pub phase: OpeningPhase,
}

/// The result of folding a log prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnState {
    pub rule_style: RuleStyle,
    pub phase: OpeningPhase,
    /// Seat currently owning black.
    pub black: Seat,
    /// Stones placed so far (captures don't reduce it).
    pub moves: usize,
}

const SWAP_OPENING_STONES: u8 = 2;
const SWAP2_OPENING_STONES: u8 = 3;
const SWAP2_EXTRA_STONES: u8 = 2;

impl TurnState {
    /// State before any action.
    pub fn initial(rule_style: RuleStyle) -> Self {
        let phase = match rule_style {
            RuleStyle::Standard | RuleStyle::Pro => OpeningPhase::Main,
            RuleStyle::Swap | RuleStyle::Swap2 => OpeningPhase::Opening { placed: 0 },
        };
        Self {
            rule_style,
            phase,
            black: Seat::One,
            moves: 0,
        }
    }

    /// Folds `kinds` (oldest first) into a state.
    pub fn replay<'a, I>(rule_style: RuleStyle, kinds: I) -> Self
    where
        I: IntoIterator<Item = &'a ActionKind>,
    {
        kinds
            .into_iter()
            .fold(Self::initial(rule_style), |state, kind| state.advance(kind))
    }

    /// State after `kind`.
    ///
    /// Total: an action that doesn't fit the phase still counts its stone
    /// or colour exchange. Rooms only commit actions that passed
    /// [`check`](Self::check), so that never happens on a real log.
    pub fn advance(self, kind: &ActionKind) -> Self {
        let mut next = self;
        match *kind {
            ActionKind::Move { .. } => next.moves += 1,
            ActionKind::SwapDecision { did_swap } => {
                if did_swap {
                    next.black = next.black.other();
                }
            }
            ActionKind::OpeningChoice { choice } => {
                if choice == Swap2Choice::TakeBlack {
                    next.black = next.black.other();
                }
            }
        }

        next.phase = match (self.phase, kind) {
            (OpeningPhase::Opening { placed }, ActionKind::Move { .. }) => {
                let placed = placed + 1;
                match self.rule_style {
                    RuleStyle::Swap if placed >= SWAP_OPENING_STONES => OpeningPhase::SwapDecision,
                    RuleStyle::Swap2 if placed >= SWAP2_OPENING_STONES => OpeningPhase::Swap2Choice,
                    _ => OpeningPhase::Opening { placed },
                }
            }
            (OpeningPhase::SwapDecision, ActionKind::SwapDecision { .. }) => OpeningPhase::Main,
            (OpeningPhase::Swap2Choice, ActionKind::OpeningChoice { choice }) => match choice {
                Swap2Choice::PlaceTwo => OpeningPhase::ExtraPlacements { placed: 0 },
                Swap2Choice::TakeBlack | Swap2Choice::TakeWhite => OpeningPhase::Main,
            },
            (OpeningPhase::ExtraPlacements { placed }, ActionKind::Move { .. }) => {
                if placed + 1 >= SWAP2_EXTRA_STONES {
                    OpeningPhase::FinalSwapDecision
                } else {
                    OpeningPhase::ExtraPlacements { placed: placed + 1 }
                }
            }
            (OpeningPhase::FinalSwapDecision, ActionKind::SwapDecision { .. }) => OpeningPhase::Main,
            (phase, _) => phase,
        };
        next
    }

    /// Colour of the next stone.
    pub fn colour_to_move(&self) -> Stone {
        Stone::for_ply(self.moves)
    }

    pub fn colour_of(&self, seat: Seat) -> Stone {
        if seat == self.black {
            Stone::Black
        } else {
            Stone::White
        }
    }

    /// Seat playing `stone`. `Empty` maps to no seat.
    pub fn seat_of(&self, stone: Stone) -> Option<Seat> {
        match stone {
            Stone::Black => Some(self.black),
            Stone::White => Some(self.black.other()),
            Stone::Empty => None,
        }
    }

    pub fn expectation(&self) -> Expectation {
        let (seat, action) = match self.phase {
            OpeningPhase::Opening { .. } => (Seat::One, ActionType::Move),
            OpeningPhase::SwapDecision => (Seat::Two, ActionType::SwapDecision),
            OpeningPhase::Swap2Choice => (Seat::Two, ActionType::OpeningChoice),
            OpeningPhase::ExtraPlacements { .. } => (Seat::Two, ActionType::Move),
            OpeningPhase::FinalSwapDecision => (Seat::One, ActionType::SwapDecision),
            OpeningPhase::Main => {
                let seat = match self.colour_to_move() {
                    Stone::White => self.black.other(),
                    Stone::Black | Stone::Empty => self.black,
                };
                (seat, ActionType::Move)
            }
        };
        Expectation {
            seat,
            action,
            phase: self.phase,
        }
    }

    /// Rejects `kind` from `seat` unless it is exactly what is expected.
    pub fn check(&self, seat: Seat, kind: &ActionKind) -> Result<Expectation, RoomError> {
        let expected = self.expectation();
        if seat != expected.seat {
            return Err(RoomError::ActionNotExpected("Not your turn".into()));
        }
        if kind.action_type() != expected.action {
            return Err(RoomError::ActionNotExpected(format!(
                "expected {} from seat {}, got {}",
                expected.action,
                expected.seat,
                kind.action_type()
            )));
        }
        Ok(expected)
    }
}

/// What the room waits for after `applied` (oldest first).
pub fn expected<'a, I>(applied: I, rule_style: RuleStyle) -> Expectation
where
    I: IntoIterator<Item = &'a ActionKind>,
{
    TurnState::replay(rule_style, applied).expectation()
}

/// Pro opening constraint for a stone at `(row, col)`, if broken.
///
/// The first stone goes on the exact centre; the second must stay outside
/// the 5×5 square around it (Chebyshev distance of at least 3).
pub fn pro_violation(
    state: &TurnState,
    width: usize,
    height: usize,
    row: usize,
    col: usize,
) -> Option<&'static str> {
    if state.rule_style != RuleStyle::Pro {
        return None;
    }
    let (cr, cc) = (height / 2, width / 2);
    match state.moves {
        0 if (row, col) != (cr, cc) => Some("Stone should be in the middle"),
        1 if row.abs_diff(cr).max(col.abs_diff(cc)) < 3 => {
            Some("Stone should be outside the inner 5x5 square")
        }
        _ => None,
    }
}

/// One human-readable line per action, e.g. `Player 1 played BLACK at 99`.
pub fn describe_log<'a, I>(rule_style: RuleStyle, actions: I) -> Vec<String>
where
    I: IntoIterator<Item = (Seat, &'a ActionKind)>,
{
    let mut state = TurnState::initial(rule_style);
    let mut lines = Vec::new();
    for (seat, kind) in actions {
        let line = match *kind {
            ActionKind::Move { row, col } => format!(
                "Player {seat} played {} at {}{}",
                state.colour_to_move(),
                coordinate_char(row),
                coordinate_char(col)
            ),
            ActionKind::SwapDecision { did_swap: true } => format!("Player {seat} swapped colors"),
            ActionKind::SwapDecision { did_swap: false } => {
                format!("Player {seat} didn't swap colors")
            }
            ActionKind::OpeningChoice { choice } => match choice {
                Swap2Choice::TakeBlack => format!("Player {seat} took black"),
                Swap2Choice::TakeWhite => format!("Player {seat} took white"),
                Swap2Choice::PlaceTwo => format!("Player {seat} chose to place two more stones"),
            },
        };
        lines.push(line);
        state = state.advance(kind);
    }
    lines
}
