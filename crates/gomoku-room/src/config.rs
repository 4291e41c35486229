//! Room and registry configuration.

use std::time::Duration;

use gomoku_clock::ClockConfig;
use gomoku_engine::SearchBudget;
use gomoku_protocol::{CreateRoom, RuleStyle, Seat, SeatSetup, UNLIMITED_TIME};
use serde::{Deserialize, Serialize};

/// Smallest accepted board side.
pub const MIN_BOARD_SIZE: usize = 10;
/// Largest accepted board side. Coordinates render as `0-9A-O`.
pub const MAX_BOARD_SIZE: usize = 25;
/// Deepest accepted AI search.
pub const MAX_AI_DEPTH: u32 = 10;
/// Depth used for AI seats created with the defaults, and for suggestions
/// requested by human seats.
pub const DEFAULT_AI_DEPTH: u32 = 4;

const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SUGGESTION_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Why a room configuration was refused. Raised before any actor exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("board size {width}x{height} is outside 10..=25")]
    BoardSize { width: usize, height: usize },

    #[error("invalid {name}: {reason}")]
    TimeBudget { name: &'static str, reason: String },

    #[error("seat {seat}: AI depth {depth} is outside 1..=10")]
    AiDepth { seat: Seat, depth: u32 },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("a networked room needs at least one human seat")]
    NoHumanSeat,
}

// ---------------------------------------------------------------------------
// Seats
// ---------------------------------------------------------------------------

/// How a computer-controlled seat searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    pub depth: u32,
    pub search_timeout: Duration,
}

impl AiConfig {
    pub fn with_depth(depth: u32) -> Self {
        Self {
            depth,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }

    pub fn budget(&self) -> SearchBudget {
        SearchBudget {
            depth: self.depth,
            timeout: self.search_timeout,
        }
    }
}

/// One seat: human when `ai` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeatConfig {
    pub ai: Option<AiConfig>,
}

impl SeatConfig {
    pub fn human() -> Self {
        Self { ai: None }
    }

    pub fn ai(depth: u32) -> Self {
        Self {
            ai: Some(AiConfig::with_depth(depth)),
        }
    }

    pub fn is_ai(&self) -> bool {
        self.ai.is_some()
    }
}

// ---------------------------------------------------------------------------
// RoomSettings
// ---------------------------------------------------------------------------

/// Everything fixed at room creation.
///
/// Defaults: 19×19 Standard, seat 1 human, seat 2 AI at depth
/// [`DEFAULT_AI_DEPTH`], no time limits, local play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    pub width: usize,
    pub height: usize,
    pub rule_style: RuleStyle,
    /// Indexed by [`Seat::index`].
    pub seats: [SeatConfig; 2],
    /// Total thinking time per seat. `None` is unlimited.
    pub total_time: Option<Duration>,
    /// Thinking time per turn. `None` is unlimited.
    pub turn_time: Option<Duration>,
    /// Networked rooms bind each human seat to one remote identity.
    pub networked: bool,
    /// Limit for read-only move suggestions.
    pub suggestion_timeout: Duration,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            width: 19,
            height: 19,
            rule_style: RuleStyle::Standard,
            seats: [SeatConfig::human(), SeatConfig::ai(DEFAULT_AI_DEPTH)],
            total_time: None,
            turn_time: None,
            networked: false,
            suggestion_timeout: DEFAULT_SUGGESTION_TIMEOUT,
        }
    }
}

impl RoomSettings {
    /// Two humans on a `size`×`size` board.
    pub fn local_pvp(size: usize, rule_style: RuleStyle) -> Self {
        Self {
            width: size,
            height: size,
            rule_style,
            seats: [SeatConfig::human(), SeatConfig::human()],
            ..Self::default()
        }
    }

    pub fn seat(&self, seat: Seat) -> &SeatConfig {
        &self.seats[seat.index()]
    }

    /// Seats a remote player may bind to.
    pub fn human_seats(&self) -> Vec<Seat> {
        Seat::ALL
            .into_iter()
            .filter(|seat| !self.seat(*seat).is_ai())
            .collect()
    }

    pub fn clock_config(&self) -> ClockConfig {
        ClockConfig {
            total: self.total_time,
            per_turn: self.turn_time,
        }
    }

    /// Checks every constraint; the first violation wins.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let in_range = |n: usize| (MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&n);
        if !in_range(self.width) || !in_range(self.height) {
            return Err(ValidationError::BoardSize {
                width: self.width,
                height: self.height,
            });
        }

        for seat in Seat::ALL {
            if let Some(ai) = &self.seat(seat).ai {
                if ai.depth == 0 || ai.depth > MAX_AI_DEPTH {
                    return Err(ValidationError::AiDepth {
                        seat,
                        depth: ai.depth,
                    });
                }
                if ai.search_timeout.is_zero() {
                    return Err(ValidationError::ZeroTimeout("search timeout"));
                }
            }
        }

        if self.suggestion_timeout.is_zero() {
            return Err(ValidationError::ZeroTimeout("suggestion timeout"));
        }
        if self.total_time.is_some_and(|d| d.is_zero()) {
            return Err(ValidationError::ZeroTimeout("total time"));
        }
        if self.turn_time.is_some_and(|d| d.is_zero()) {
            return Err(ValidationError::ZeroTimeout("turn time"));
        }

        if self.networked && self.human_seats().is_empty() {
            return Err(ValidationError::NoHumanSeat);
        }
        Ok(())
    }
}

/// Wire seconds to a budget: the `-1` sentinel is unlimited, anything
/// else must be a positive finite number.
fn parse_budget(name: &'static str, secs: f64) -> Result<Option<Duration>, ValidationError> {
    if secs == UNLIMITED_TIME {
        return Ok(None);
    }
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ValidationError::TimeBudget {
            name,
            reason: format!("{secs} is neither -1 nor a positive number of seconds"),
        });
    }
    Ok(Some(Duration::from_secs_f64(secs)))
}

fn seat_from_setup(setup: &SeatSetup) -> SeatConfig {
    if !setup.is_ai {
        return SeatConfig::human();
    }
    SeatConfig {
        ai: Some(AiConfig {
            depth: setup.ai_depth,
            search_timeout: setup
                .search_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_SEARCH_TIMEOUT),
        }),
    }
}

impl TryFrom<&CreateRoom> for RoomSettings {
    type Error = ValidationError;

    fn try_from(req: &CreateRoom) -> Result<Self, Self::Error> {
        let settings = Self {
            width: req.width,
            height: req.height,
            rule_style: req.rule_style,
            seats: [seat_from_setup(&req.seats[0]), seat_from_setup(&req.seats[1])],
            total_time: parse_budget("total time", req.total_time)?,
            turn_time: parse_budget("turn time", req.turn_time)?,
            networked: req.networked,
            suggestion_timeout: DEFAULT_SUGGESTION_TIMEOUT,
        };
        settings.validate()?;
        Ok(settings)
    }
}

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Settings for a [`RoomRegistry`](crate::RoomRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Capacity of each room's command mailbox.
    pub mailbox_size: usize,
    /// Length of generated room codes.
    pub room_code_length: usize,
    /// Attempts at drawing an unused room code before giving up.
    pub max_code_attempts: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            mailbox_size: 64,
            room_code_length: 6,
            max_code_attempts: 32,
        }
    }
}

impl RegistryConfig {
    /// Clamp out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        if self.mailbox_size == 0 {
            tracing::warn!("mailbox_size of 0 is not allowed, using 1");
            self.mailbox_size = 1;
        }
        if !(4..=16).contains(&self.room_code_length) {
            let clamped = self.room_code_length.clamp(4, 16);
            tracing::warn!(
                requested = self.room_code_length,
                clamped,
                "room_code_length out of range, clamping"
            );
            self.room_code_length = clamped;
        }
        self.max_code_attempts = self.max_code_attempts.max(1);
        self
    }
}
