//! Decay-weighted momentum over a trailing window of attributed leverage.
//!
//! For the point at the end of the window, a record at backward distance `d`
//! is weighted `(1 - alpha)^d` when it belongs to the current game and
//! `(1 - beta)^d` when it belongs to an earlier one. Momentum for each side is
//! the weighted mean of that side's attributed leverage.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::warn;

use super::rules::{Competitor, Score};
use crate::error::{MomentumError, Result};

pub const DEFAULT_WINDOW: usize = 5;
/// Intra-game decay rate.
pub const DEFAULT_ALPHA: f64 = 0.33;
/// Cross-game decay rate.
pub const DEFAULT_BETA: f64 = 0.5;

/// One played point. Immutable once appended to the history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointRecord {
    /// 1-based position in the match.
    pub index: usize,
    /// 0-based game the point belongs to.
    pub game: usize,
    pub winner: Competitor,
    /// In-game score after the point.
    pub score: Score,
    pub leverage: f64,
    pub g_a: f64,
    pub g_b: f64,
}

/// Momentum of both sides right after a point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MomentumSample {
    pub a: f64,
    pub b: f64,
}

/// Split a point's leverage between the two series: the scorer's series gets
/// it, with B's series carrying the opposite sign.
pub fn attribute(winner: Competitor, leverage: f64) -> (f64, f64) {
    match winner {
        Competitor::A => (leverage, 0.0),
        Competitor::B => (0.0, -leverage),
    }
}

// ── Decay schedule ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecaySchedule {
    pub window: usize,
    pub alpha: f64,
    pub beta: f64,
}

impl Default for DecaySchedule {
    fn default() -> Self {
        DecaySchedule {
            window: DEFAULT_WINDOW,
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
        }
    }
}

impl DecaySchedule {
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(MomentumError::InvalidConfiguration(
                "window must hold at least one point".into(),
            ));
        }
        for (name, rate) in [("alpha", self.alpha), ("beta", self.beta)] {
            if !(rate > 0.0 && rate < 1.0) {
                return Err(MomentumError::InvalidConfiguration(format!(
                    "{} must lie strictly between 0 and 1, got {}",
                    name, rate
                )));
            }
        }
        if self.beta <= self.alpha {
            warn!(
                "beta ({}) <= alpha ({}): finished games will fade no faster than the current one",
                self.beta, self.alpha
            );
        }
        Ok(())
    }

    /// Weight of a record at backward `distance` from the newest point.
    pub fn weight(&self, distance: usize, same_game: bool) -> f64 {
        let rate = if same_game { self.alpha } else { self.beta };
        (1.0 - rate).powi(distance as i32)
    }
}

// ── Momentum ─────────────────────────────────────────────────────────────────

/// Momentum over records given newest first. Only the first `window` records
/// are used; a shorter run is normalised over what is there.
pub fn momentum<'a, I>(newest_first: I, current_game: usize, schedule: &DecaySchedule) -> MomentumSample
where
    I: IntoIterator<Item = &'a PointRecord>,
{
    let mut numerator_a = 0.0;
    let mut numerator_b = 0.0;
    let mut denominator = 0.0;

    for (distance, record) in newest_first.into_iter().take(schedule.window).enumerate() {
        let w = schedule.weight(distance, record.game == current_game);
        numerator_a += record.g_a * w;
        numerator_b += record.g_b * w;
        denominator += w;
    }

    if denominator == 0.0 {
        return MomentumSample::default();
    }
    MomentumSample {
        a: numerator_a / denominator,
        b: numerator_b / denominator,
    }
}

/// Momentum right after `history[position]`, recomputed from the history.
pub fn momentum_at(history: &[PointRecord], position: usize, schedule: &DecaySchedule) -> MomentumSample {
    let Some(current) = history.get(position) else {
        return MomentumSample::default();
    };
    momentum(history[..=position].iter().rev(), current.game, schedule)
}

/// Trailing window maintained point by point. Produces exactly the same
/// numbers as [`momentum_at`] over the full history.
#[derive(Debug, Clone)]
pub struct MomentumWindow {
    schedule: DecaySchedule,
    records: VecDeque<PointRecord>,
}

impl MomentumWindow {
    pub fn new(schedule: DecaySchedule) -> Self {
        MomentumWindow {
            schedule,
            records: VecDeque::with_capacity(schedule.window),
        }
    }

    /// Slide the window over `record` and return the new momentum.
    pub fn push(&mut self, record: PointRecord) -> MomentumSample {
        if self.records.len() == self.schedule.window {
            self.records.pop_front();
        }
        self.records.push_back(record);
        momentum(self.records.iter().rev(), record.game, &self.schedule)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
