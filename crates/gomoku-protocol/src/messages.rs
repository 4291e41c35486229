//! Request and response shapes exchanged with the transport/UI layer.
//!
//! The transport decides how these bytes move (WebSocket, HTTP, a local
//! UI loop); this module only pins down what they look like.

use serde::{Deserialize, Serialize};

use crate::{ActionType, RoomId, RoomPhase, RuleStyle, Seat, Stone, Swap2Choice};

/// Sentinel used on the wire for "no time limit".
pub const UNLIMITED_TIME: f64 = -1.0;

fn unlimited() -> f64 {
    UNLIMITED_TIME
}

// ---------------------------------------------------------------------------
// Room creation
// ---------------------------------------------------------------------------

/// Per-seat setup sent when creating a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatSetup {
    pub is_ai: bool,
    /// Search depth for AI seats. Ignored for humans.
    #[serde(default)]
    pub ai_depth: u32,
    /// Search timeout for AI seats, in milliseconds. `None` uses the default.
    #[serde(default)]
    pub search_timeout_ms: Option<u64>,
}

impl SeatSetup {
    pub fn human() -> Self {
        Self {
            is_ai: false,
            ai_depth: 0,
            search_timeout_ms: None,
        }
    }

    pub fn ai(depth: u32) -> Self {
        Self {
            is_ai: true,
            ai_depth: depth,
            search_timeout_ms: None,
        }
    }
}

/// Everything needed to create a room. Validated by the room layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRoom {
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub rule_style: RuleStyle,
    pub seats: [SeatSetup; 2],
    /// Total thinking time per seat in seconds, `-1` for unlimited.
    #[serde(default = "unlimited")]
    pub total_time: f64,
    /// Thinking time per turn in seconds, `-1` for unlimited.
    #[serde(default = "unlimited")]
    pub turn_time: f64,
    /// Networked rooms bind remote identities to seats.
    #[serde(default)]
    pub networked: bool,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Operations a client can ask of the room layer.
///
/// Internally tagged: `{ "type": "MakeMove", "room_id": "AB12CD", ... }`.
/// `seat` is optional on acting requests because networked callers act
/// through their bound identity instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    CreateRoom(CreateRoom),
    MakeMove {
        room_id: RoomId,
        #[serde(default)]
        seat: Option<Seat>,
        row: usize,
        col: usize,
    },
    Swap {
        room_id: RoomId,
        #[serde(default)]
        seat: Option<Seat>,
        did_swap: bool,
    },
    ChooseOpening {
        room_id: RoomId,
        #[serde(default)]
        seat: Option<Seat>,
        choice: Swap2Choice,
    },
    Undo { room_id: RoomId },
    Redo { room_id: RoomId },
    GetState { room_id: RoomId },
    RequestSuggestion { room_id: RoomId, seat: Seat },
    ResolvePending { room_id: RoomId },
    Connect { room_id: RoomId, seat: Seat },
    Disconnect { room_id: RoomId },
    AvailableSeats { room_id: RoomId },
    ListRooms,
    DisposeRoom { room_id: RoomId },
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Time accounting for one seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeView {
    /// Time consumed so far, including the running turn.
    pub elapsed_ms: u64,
    /// Time left, `None` when the seat has no limit.
    pub remaining_ms: Option<u64>,
}

/// Public view of one seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatView {
    pub seat: Seat,
    pub color: Stone,
    pub score: u32,
    pub time: TimeView,
    pub is_ai: bool,
    /// Always `true` in local rooms; in networked rooms whether an identity
    /// is bound (AI seats count as connected).
    pub connected: bool,
}

/// Full observable state of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub width: usize,
    pub height: usize,
    pub rule_style: RuleStyle,
    pub phase: RoomPhase,
    /// Row-major board, `board[row][col]`.
    pub board: Vec<Vec<Stone>>,
    pub is_game_over: bool,
    /// `None` while playing and for a draw.
    pub winner: Option<Seat>,
    /// `None` once the game is over.
    pub next_seat: Option<Seat>,
    pub next_action: Option<ActionType>,
    /// One description per logged action, including redoable ones.
    pub action_log: Vec<String>,
    /// Number of applied actions; entries past it can be redone.
    pub cursor: usize,
    pub seats: [SeatView; 2],
    pub has_pending_action: bool,
    pub resolution_in_flight: bool,
}

impl RoomSnapshot {
    /// View of a single seat.
    pub fn seat(&self, seat: Seat) -> &SeatView {
        &self.seats[seat.index()]
    }
}

/// Reply to an acting request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    pub state: RoomSnapshot,
}

/// A room summary returned by room listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomListEntry {
    pub room_id: RoomId,
    pub phase: RoomPhase,
    pub rule_style: RuleStyle,
    pub width: usize,
    pub height: usize,
    pub available_seats: Vec<Seat>,
}

/// Messages sent back to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    RoomCreated { room_id: RoomId },
    ActionResult(ActionResponse),
    State(RoomSnapshot),
    Suggestion { row: usize, col: usize },
    ResolutionStarted { started: bool },
    Connected { seat: Seat },
    Disconnected { seat: Option<Seat> },
    Seats { available: Vec<Seat> },
    RoomList { rooms: Vec<RoomListEntry> },
    RoomDisposed { room_id: RoomId },
    /// `code` follows HTTP conventions (400 bad request, 404 not found, ...).
    Error { code: u16, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_move_json_format() {
        let req = ClientRequest::MakeMove {
            room_id: RoomId("AB12CD".into()),
            seat: Some(Seat::One),
            row: 9,
            col: 9,
        };
        let json: serde_json::Value = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "MakeMove");
        assert_eq!(json["room_id"], "AB12CD");
        assert_eq!(json["seat"], 1);
        assert_eq!(json["row"], 9);
    }

    #[test]
    fn test_make_move_without_seat_parses() {
        let req: ClientRequest = serde_json::from_str(
            r#"{"type":"MakeMove","room_id":"X","row":1,"col":2}"#,
        )
        .unwrap();
        assert_eq!(
            req,
            ClientRequest::MakeMove {
                room_id: RoomId("X".into()),
                seat: None,
                row: 1,
                col: 2,
            }
        );
    }

    #[test]
    fn test_create_room_defaults_to_unlimited_time() {
        let req: ClientRequest = serde_json::from_str(
            r#"{
                "type": "CreateRoom",
                "width": 19,
                "height": 19,
                "rule_style": "Swap",
                "seats": [{"is_ai": false}, {"is_ai": true, "ai_depth": 3}]
            }"#,
        )
        .unwrap();
        let ClientRequest::CreateRoom(create) = req else {
            panic!("expected CreateRoom");
        };
        assert_eq!(create.rule_style, RuleStyle::Swap);
        assert_eq!(create.total_time, UNLIMITED_TIME);
        assert_eq!(create.turn_time, UNLIMITED_TIME);
        assert!(!create.networked);
        assert_eq!(create.seats[1], SeatSetup::ai(3));
    }

    #[test]
    fn test_error_message_json_format() {
        let msg = ServerMessage::Error {
            code: 409,
            message: "not your turn".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["code"], 409);
    }
}
