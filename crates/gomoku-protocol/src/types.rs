//! Core vocabulary shared by every layer: seats, stones, rule styles,
//! action types and identity newtypes.
//!
//! These types travel on the wire, so each one pins its JSON shape with
//! serde attributes. The tests at the bottom of this file lock those shapes
//! down; a mismatch means the client can't parse our messages.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Seat
// ---------------------------------------------------------------------------

/// One of the two match participants.
///
/// A seat is independent of board colour: under the swap rules seat 2 can
/// end up playing black. On the wire a seat is the plain number `1` or `2`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Seat {
    One,
    Two,
}

impl Seat {
    /// Both seats, in seat order.
    pub const ALL: [Seat; 2] = [Seat::One, Seat::Two];

    /// The opposing seat.
    pub fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    /// Zero-based index, handy for `[T; 2]` per-seat tables.
    pub fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }

    /// The wire number (`1` or `2`).
    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

impl TryFrom<u8> for Seat {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(ProtocolError::InvalidMessage(format!(
                "seat must be 1 or 2, got {other}"
            ))),
        }
    }
}

impl From<Seat> for u8 {
    fn from(seat: Seat) -> Self {
        seat.number()
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

// ---------------------------------------------------------------------------
// Stone
// ---------------------------------------------------------------------------

/// Content of a board cell, and the colour a seat plays.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Stone {
    #[default]
    Empty,
    Black,
    White,
}

impl Stone {
    /// The other colour. `Empty` stays `Empty`.
    pub fn opponent(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
            Self::Empty => Self::Empty,
        }
    }

    /// Colour of the `n`-th stone placed in a game (0-based): black first.
    pub fn for_ply(n: usize) -> Self {
        if n % 2 == 0 { Self::Black } else { Self::White }
    }
}

impl fmt::Display for Stone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "EMPTY"),
            Self::Black => write!(f, "BLACK"),
            Self::White => write!(f, "WHITE"),
        }
    }
}

// ---------------------------------------------------------------------------
// Rule styles and actions
// ---------------------------------------------------------------------------

/// Opening rule set governing placement constraints and colour negotiation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "PascalCase")]
pub enum RuleStyle {
    #[default]
    Standard,
    Pro,
    Swap,
    Swap2,
}

impl TryFrom<u8> for RuleStyle {
    type Error = ProtocolError;

    /// Numeric form used by older clients (`0..=3`).
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Standard),
            1 => Ok(Self::Pro),
            2 => Ok(Self::Swap),
            3 => Ok(Self::Swap2),
            other => Err(ProtocolError::InvalidMessage(format!(
                "unknown rule style {other}"
            ))),
        }
    }
}

impl fmt::Display for RuleStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "Standard"),
            Self::Pro => write!(f, "Pro"),
            Self::Swap => write!(f, "Swap"),
            Self::Swap2 => write!(f, "Swap2"),
        }
    }
}

/// The kind of action a room expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ActionType {
    /// Place a stone.
    Move,
    /// Decide whether to exchange colours (Swap, and the last Swap2 step).
    SwapDecision,
    /// Pick one of the three Swap2 options.
    OpeningChoice,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move => write!(f, "Move"),
            Self::SwapDecision => write!(f, "SwapDecision"),
            Self::OpeningChoice => write!(f, "OpeningChoice"),
        }
    }
}

/// The three options offered to seat 2 after the Swap2 opening stones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Swap2Choice {
    TakeBlack,
    TakeWhite,
    PlaceTwo,
}

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A room code, e.g. `"K7Q2ZD"`.
///
/// Serialized as the bare string (`#[serde(transparent)]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An external caller identity in networked rooms (an address, a user id,
/// whatever the transport authenticates). Opaque to the room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Room phase
// ---------------------------------------------------------------------------

/// Coarse lifecycle of a room, derived from its state on every snapshot.
///
/// Unlike a strictly ordered state machine this one can move backwards:
/// undoing the winning move takes a `Finished` room back to `InProgress`.
///
/// ```text
/// WaitingForPlayers ⇄ InProgress ⇄ Finished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomPhase {
    /// Networked room with at least one human seat still unbound.
    WaitingForPlayers,
    /// Moves are being played.
    InProgress,
    /// The engine reports the game over.
    Finished,
}

impl RoomPhase {
    /// Returns `true` if the room still has seats for remote players.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::WaitingForPlayers)
    }
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForPlayers => write!(f, "WaitingForPlayers"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

/// Renders a board index as a single character: `0-9`, then `A-Z`.
///
/// Boards are at most 25 wide, so every index fits.
pub fn coordinate_char(index: usize) -> char {
    const CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    CHARS.get(index).map(|c| *c as char).unwrap_or('?')
}

// =========================================================================
// Tests
// =========================================================================
