//! Reference engine: freestyle Gomoku with pair captures.
//!
//! Rules:
//!
//! - black moves first and colours alternate on every move
//! - a stone that flanks exactly two opposing stones on a line removes
//!   them and scores two for its colour
//! - five or more in a row wins, as does reaching [`CAPTURE_WIN`]
//! - a full board with no winner is a draw
//!
//! Every move records a [`MoveEffect`] holding the captured stones, so
//! `invert` and `reapply` restore a position exactly without replaying
//! the game.

use std::time::Instant;

use gomoku_protocol::Stone;

use crate::{EngineError, GameEngine, SearchBudget};

/// Captured stones needed to win.
pub const CAPTURE_WIN: u32 = 10;

/// Stones in a row needed to win.
const LINE_WIN: usize = 5;

/// The four line axes. Each is walked in both directions.
const AXES: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// What one move did to a [`FreestyleEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveEffect {
    pub row: usize,
    pub col: usize,
    pub color: Stone,
    /// Opponent stones removed by pair captures.
    pub captured: Vec<(usize, usize)>,
    before: Outcome,
    after: Outcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Outcome {
    game_over: bool,
    winner: Option<Stone>,
}

/// Freestyle Gomoku with pair captures.
///
/// - Five or more in a row wins.
/// - Flanking exactly two opponent stones (`X O O X`) removes them; ten
///   captured stones win.
/// - A full board without a winner is a draw.
#[derive(Debug, Clone)]
pub struct FreestyleEngine {
    width: usize,
    height: usize,
    cells: Vec<Stone>,
    to_move: Stone,
    /// Captured stones, indexed by capturing colour (black, white).
    captures: [u32; 2],
    outcome: Outcome,
}

fn color_index(stone: Stone) -> Option<usize> {
    match stone {
        Stone::Black => Some(0),
        Stone::White => Some(1),
        Stone::Empty => None,
    }
}

impl FreestyleEngine {
    /// Colour of the next stone.
    pub fn to_move(&self) -> Stone {
        self.to_move
    }

    pub fn stone_at(&self, row: usize, col: usize) -> Stone {
        if row < self.height && col < self.width {
            self.cells[row * self.width + col]
        } else {
            Stone::Empty
        }
    }

    pub fn stones_on_board(&self) -> usize {
        self.cells.iter().filter(|s| **s != Stone::Empty).count()
    }

    fn set(&mut self, row: usize, col: usize, stone: Stone) {
        self.cells[row * self.width + col] = stone;
    }

    /// Cell `steps` away from `(row, col)` along `(dr, dc)`, if on the board.
    fn step(&self, row: usize, col: usize, (dr, dc): (isize, isize), steps: isize) -> Option<(usize, usize)> {
        let r = row as isize + dr * steps;
        let c = col as isize + dc * steps;
        if r < 0 || c < 0 || r >= self.height as isize || c >= self.width as isize {
            return None;
        }
        Some((r as usize, c as usize))
    }

    /// Pairs that a `color` stone at `(row, col)` would capture.
    fn captures_from(&self, row: usize, col: usize, color: Stone) -> Vec<(usize, usize)> {
        let opponent = color.opponent();
        let mut captured = Vec::new();
        for axis in AXES {
            for sign in [1, -1] {
                let dir = (axis.0 * sign, axis.1 * sign);
                let (Some(a), Some(b), Some(c)) = (
                    self.step(row, col, dir, 1),
                    self.step(row, col, dir, 2),
                    self.step(row, col, dir, 3),
                ) else {
                    continue;
                };
                if self.stone_at(a.0, a.1) == opponent
                    && self.stone_at(b.0, b.1) == opponent
                    && self.stone_at(c.0, c.1) == color
                {
                    captured.push(a);
                    captured.push(b);
                }
            }
        }
        captured
    }

    /// Longest run of `color` through `(row, col)` along one axis, counting
    /// `(row, col)` itself as `color`.
    fn run_length(&self, row: usize, col: usize, axis: (isize, isize), color: Stone) -> usize {
        let mut len = 1;
        for sign in [1, -1] {
            let dir = (axis.0 * sign, axis.1 * sign);
            let mut steps = 1;
            while let Some((r, c)) = self.step(row, col, dir, steps) {
                if self.stone_at(r, c) != color {
                    break;
                }
                len += 1;
                steps += 1;
            }
        }
        len
    }

    fn longest_run(&self, row: usize, col: usize, color: Stone) -> usize {
        AXES.iter()
            .map(|axis| self.run_length(row, col, *axis, color))
            .max()
            .unwrap_or(1)
    }

    fn outcome_after(&self, row: usize, col: usize, color: Stone) -> Outcome {
        let idx = color_index(color).unwrap_or(0);
        if self.longest_run(row, col, color) >= LINE_WIN || self.captures[idx] >= CAPTURE_WIN {
            return Outcome {
                game_over: true,
                winner: Some(color),
            };
        }
        if self.cells.iter().all(|s| *s != Stone::Empty) {
            return Outcome {
                game_over: true,
                winner: None,
            };
        }
        Outcome::default()
    }

    /// Board and counters after `effect`, with no checks.
    fn commit_effect(&mut self, effect: &MoveEffect) {
        self.set(effect.row, effect.col, effect.color);
        for (r, c) in &effect.captured {
            self.set(*r, *c, Stone::Empty);
        }
        if let Some(idx) = color_index(effect.color) {
            self.captures[idx] += effect.captured.len() as u32;
        }
        self.to_move = effect.color.opponent();
        self.outcome = effect.after;
    }

    fn heuristic(&self, row: usize, col: usize, color: Stone) -> u64 {
        fn weight(run: usize) -> u64 {
            match run {
                0 | 1 => 1,
                2 => 10,
                3 => 100,
                4 => 10_000,
                _ => 1_000_000,
            }
        }
        let attack: u64 = AXES
            .iter()
            .map(|axis| weight(self.run_length(row, col, *axis, color)))
            .sum();
        let defence: u64 = AXES
            .iter()
            .map(|axis| weight(self.run_length(row, col, *axis, color.opponent())))
            .sum();
        let captures = self.captures_from(row, col, color).len() as u64;
        attack * 2 + defence + captures * 500
    }

    fn near_a_stone(&self, row: usize, col: usize) -> bool {
        let r0 = row.saturating_sub(2);
        let c0 = col.saturating_sub(2);
        let r1 = (row + 2).min(self.height - 1);
        let c1 = (col + 2).min(self.width - 1);
        (r0..=r1).any(|r| (c0..=c1).any(|c| self.stone_at(r, c) != Stone::Empty))
    }
}

impl GameEngine for FreestyleEngine {
    type Effect = MoveEffect;

    fn new_game(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Stone::Empty; width * height],
            to_move: Stone::Black,
            captures: [0, 0],
            outcome: Outcome::default(),
        }
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn apply_move(&mut self, row: usize, col: usize) -> Result<MoveEffect, EngineError> {
        if self.outcome.game_over {
            return Err(EngineError::GameOver);
        }
        if row >= self.height || col >= self.width {
            return Err(EngineError::OutOfBounds { row, col });
        }
        if self.stone_at(row, col) != Stone::Empty {
            return Err(EngineError::Occupied { row, col });
        }

        let color = self.to_move;
        let captured = self.captures_from(row, col, color);

        // Apply first, then judge the resulting position.
        let before = self.outcome;
        let mut effect = MoveEffect {
            row,
            col,
            color,
            captured,
            before,
            after: before,
        };
        self.commit_effect(&effect);
        effect.after = self.outcome_after(row, col, color);
        self.outcome = effect.after;
        Ok(effect)
    }

    fn invert(&mut self, effect: &MoveEffect) -> Result<(), EngineError> {
        if self.stone_at(effect.row, effect.col) != effect.color
            || self.to_move != effect.color.opponent()
        {
            return Err(EngineError::InconsistentEffect(format!(
                "no {} stone to take back at ({}, {})",
                effect.color, effect.row, effect.col
            )));
        }
        if effect
            .captured
            .iter()
            .any(|(r, c)| self.stone_at(*r, *c) != Stone::Empty)
        {
            return Err(EngineError::InconsistentEffect(
                "captured cells are occupied".into(),
            ));
        }

        self.set(effect.row, effect.col, Stone::Empty);
        for (r, c) in &effect.captured {
            self.set(*r, *c, effect.color.opponent());
        }
        if let Some(idx) = color_index(effect.color) {
            self.captures[idx] -= effect.captured.len() as u32;
        }
        self.to_move = effect.color;
        self.outcome = effect.before;
        Ok(())
    }

    fn reapply(&mut self, effect: &MoveEffect) -> Result<(), EngineError> {
        let opponent = effect.color.opponent();
        if self.to_move != effect.color
            || self.stone_at(effect.row, effect.col) != Stone::Empty
            || effect
                .captured
                .iter()
                .any(|(r, c)| self.stone_at(*r, *c) != opponent)
        {
            return Err(EngineError::InconsistentEffect(format!(
                "cannot replay {} at ({}, {})",
                effect.color, effect.row, effect.col
            )));
        }
        self.commit_effect(effect);
        Ok(())
    }

    fn board_snapshot(&self) -> Vec<Vec<Stone>> {
        self.cells
            .chunks(self.width)
            .map(|row| row.to_vec())
            .collect()
    }

    fn is_game_over(&self) -> bool {
        self.outcome.game_over
    }

    fn winner(&self) -> Option<Stone> {
        self.outcome.winner
    }

    fn score_of(&self, stone: Stone) -> u32 {
        color_index(stone).map(|idx| self.captures[idx]).unwrap_or(0)
    }

    fn suggest_move(
        &self,
        stone: Stone,
        budget: &SearchBudget,
    ) -> Result<(usize, usize), EngineError> {
        if self.outcome.game_over {
            return Err(EngineError::GameOver);
        }
        let centre = (self.height / 2, self.width / 2);
        if self.stones_on_board() == 0 {
            return Ok(centre);
        }

        let deadline = Instant::now() + budget.timeout;
        let distance = |r: usize, c: usize| r.abs_diff(centre.0).max(c.abs_diff(centre.1));
        let mut best: Option<(u64, usize, (usize, usize))> = None;

        for row in 0..self.height {
            for col in 0..self.width {
                if self.stone_at(row, col) != Stone::Empty || !self.near_a_stone(row, col) {
                    continue;
                }
                let score = self.heuristic(row, col, stone);
                let dist = distance(row, col);
                let better = match best {
                    None => true,
                    Some((s, d, _)) => score > s || (score == s && dist < d),
                };
                if better {
                    best = Some((score, dist, (row, col)));
                }
            }
            if Instant::now() >= deadline && best.is_some() {
                tracing::debug!(row, "search deadline reached, returning best so far");
                break;
            }
        }

        best.map(|(_, _, pos)| pos)
            .ok_or(EngineError::NoLegalMove(stone))
    }
}
