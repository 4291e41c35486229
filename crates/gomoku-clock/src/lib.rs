//! Per-seat thinking-time accounting.
//!
//! The clock never stores "time left". It stores how much each seat has
//! consumed plus the instant the running turn began, and derives
//! everything else on demand. That makes rollback trivial: on undo or
//! redo the room sums the `think_time` of the applied actions and calls
//! [`Clock::rebuild`].
//!
//! Time comes from `tokio::time::Instant`, so tests can pause the runtime
//! and `advance` it deterministically.
//!
//! Budgets are reported, not enforced: a seat that runs out keeps playing
//! and [`Clock::remaining`] reports zero.

use std::time::Duration;

use gomoku_protocol::Seat;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Time budgets shared by both seats. `None` means unlimited.
///
/// Missing fields deserialize as unlimited, so `{}` is a valid config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Total thinking time per seat for the whole match.
    pub total: Option<Duration>,
    /// Thinking time per turn.
    pub per_turn: Option<Duration>,
}

impl ClockConfig {
    /// No limits at all.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Fix inconsistent values so the config is safe to use.
    ///
    /// Called by [`Clock::new`]. A per-turn budget larger than the total
    /// can never apply, so it is clamped to the total.
    pub fn validated(mut self) -> Self {
        if let (Some(total), Some(per_turn)) = (self.total, self.per_turn) {
            if per_turn > total {
                warn!(
                    per_turn_ms = per_turn.as_millis() as u64,
                    total_ms = total.as_millis() as u64,
                    "per-turn budget exceeds total budget, clamping"
                );
                self.per_turn = Some(total);
            }
        }
        self
    }

    pub fn is_unlimited(&self) -> bool {
        self.total.is_none() && self.per_turn.is_none()
    }
}

/// Time left for a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Unlimited,
    Left(Duration),
}

impl Remaining {
    /// Milliseconds left, `None` when unlimited.
    pub fn as_millis(&self) -> Option<u64> {
        match self {
            Self::Unlimited => None,
            Self::Left(d) => Some(d.as_millis() as u64),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Left(d) if d.is_zero())
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// One room's clock.
#[derive(Debug, Clone)]
pub struct Clock {
    config: ClockConfig,
    /// Charged time per seat, indexed by [`Seat::index`].
    accumulated: [Duration; 2],
    /// Seat whose turn is running and when it started.
    running: Option<(Seat, Instant)>,
}

impl Clock {
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config: config.validated(),
            accumulated: [Duration::ZERO; 2],
            running: None,
        }
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Seat whose turn is being timed, if any.
    pub fn current(&self) -> Option<Seat> {
        self.running.map(|(seat, _)| seat)
    }

    /// Starts timing `seat`. Any uncharged running time is discarded.
    pub fn on_turn_start(&mut self, seat: Seat) {
        self.running = Some((seat, Instant::now()));
    }

    /// Stops timing without charging anyone.
    pub fn stop(&mut self) {
        if let Some((seat, _)) = self.running.take() {
            debug!(%seat, "clock stopped");
        }
    }

    /// Time the running turn has taken so far.
    fn running_for(&self, seat: Seat) -> Duration {
        match self.running {
            Some((current, start)) if current == seat => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Total time `seat` has used, including its running turn.
    pub fn elapsed(&self, seat: Seat) -> Duration {
        self.accumulated[seat.index()] + self.running_for(seat)
    }

    /// Time already charged to `seat`, excluding the running turn.
    pub fn charged(&self, seat: Seat) -> Duration {
        self.accumulated[seat.index()]
    }

    /// Charges the running turn to its seat and returns the amount.
    ///
    /// The turn keeps running from now, so calling this twice in a row
    /// charges (almost) nothing the second time. Returns zero when no turn
    /// is being timed.
    pub fn consume_elapsed_into_budget(&mut self) -> Duration {
        let Some((seat, start)) = self.running else {
            return Duration::ZERO;
        };
        let spent = start.elapsed();
        self.accumulated[seat.index()] += spent;
        self.running = Some((seat, Instant::now()));

        if let Some(per_turn) = self.config.per_turn {
            if spent > per_turn {
                warn!(
                    %seat,
                    spent_ms = spent.as_millis() as u64,
                    budget_ms = per_turn.as_millis() as u64,
                    "turn exceeded per-turn budget"
                );
            }
        }
        spent
    }

    /// Time left for `seat`: total minus used, further bounded by the
    /// per-turn budget while its turn is running.
    pub fn remaining(&self, seat: Seat) -> Remaining {
        if self.config.is_unlimited() {
            return Remaining::Unlimited;
        }
        let running = self.running_for(seat);
        let total_left = self
            .config
            .total
            .map(|total| total.saturating_sub(self.accumulated[seat.index()] + running));
        let turn_left = self
            .config
            .per_turn
            .map(|per_turn| per_turn.saturating_sub(running));

        match (total_left, turn_left) {
            (Some(a), Some(b)) => Remaining::Left(a.min(b)),
            (Some(a), None) | (None, Some(a)) => Remaining::Left(a),
            (None, None) => Remaining::Unlimited,
        }
    }

    /// Replaces the charged totals with the sum of `charges` and restarts
    /// timing for `current`.
    pub fn rebuild<I>(&mut self, charges: I, current: Option<Seat>)
    where
        I: IntoIterator<Item = (Seat, Duration)>,
    {
        self.accumulated = [Duration::ZERO; 2];
        for (seat, spent) in charges {
            self.accumulated[seat.index()] += spent;
        }
        self.running = current.map(|seat| (seat, Instant::now()));
        debug!(
            seat_1_ms = self.accumulated[0].as_millis() as u64,
            seat_2_ms = self.accumulated[1].as_millis() as u64,
            "clock rebuilt"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_clamps_per_turn_to_total() {
        let cfg = ClockConfig {
            total: Some(Duration::from_secs(60)),
            per_turn: Some(Duration::from_secs(90)),
        }
        .validated();
        assert_eq!(cfg.per_turn, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_unlimited_config_reports_unlimited() {
        let clock = Clock::new(ClockConfig::unlimited());
        assert_eq!(clock.remaining(Seat::One), Remaining::Unlimited);
        assert_eq!(clock.remaining(Seat::Two).as_millis(), None);
    }

    #[test]
    fn test_consume_without_running_turn_is_zero() {
        let mut clock = Clock::new(ClockConfig::unlimited());
        assert_eq!(clock.consume_elapsed_into_budget(), Duration::ZERO);
        assert_eq!(clock.elapsed(Seat::One), Duration::ZERO);
    }

    #[test]
    fn test_remaining_exhausted() {
        assert!(Remaining::Left(Duration::ZERO).is_exhausted());
        assert!(!Remaining::Unlimited.is_exhausted());
    }
}
