//! Point-by-point match processing.
//!
//! A match moves `NotStarted -> InGame -> GameOver -> InGame ... -> MatchDone`.
//! Each declared game opens with a 0:0 score; a game that ends before the
//! terminal condition holds is rejected when the next one is declared.
//!
//! For every point the tracker:
//! 1. estimates the leverage from the pre-point score (two estimator calls)
//! 2. attributes it to the scorer's series
//! 3. appends the immutable [`PointRecord`] and advances the score
//! 4. slides the momentum window and emits a [`PointRow`]
//! 5. closes the game if the point decided it
//!
//! The trailing window is not reset between games; points of earlier games
//! keep contributing with the faster cross-game decay.

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use super::momentum::{
    attribute, momentum_at, DecaySchedule, MomentumSample, MomentumWindow, PointRecord,
};
use super::rules::{Competitor, GameRules, Score};
use super::win_probability::{MonteCarlo, ScoringModel, WinProbability, DEFAULT_TRIALS};
use crate::error::{MomentumError, Result};

// ── Match state machine ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchState {
    NotStarted,
    InGame,
    GameOver,
    MatchDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// A declared game boundary: the next game begins.
    GameStart,
    /// A point was played; `decided` if it satisfied the terminal condition.
    Point { decided: bool },
    EndOfInput,
}

impl MatchState {
    /// The state after `event`, or `None` if the event is illegal here.
    pub fn next(self, event: MatchEvent) -> Option<MatchState> {
        use MatchEvent::*;
        use MatchState::*;
        match (self, event) {
            (NotStarted | GameOver, GameStart) => Some(InGame),
            (InGame, Point { decided: false }) => Some(InGame),
            (InGame, Point { decided: true }) => Some(GameOver),
            (GameOver, EndOfInput) => Some(MatchDone),
            // An empty match, or a final game still in progress.
            (NotStarted | InGame, EndOfInput) => Some(self),
            (MatchDone, EndOfInput) => Some(MatchDone),
            _ => None,
        }
    }
}

// ── Settings ─────────────────────────────────────────────────────────────────

/// Characters used for the two sides in point sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    a: char,
    b: char,
}

impl Labels {
    pub fn new(a: char, b: char) -> Result<Self> {
        if a == b {
            return Err(MomentumError::InvalidConfiguration(format!(
                "both sides share the label '{}'",
                a
            )));
        }
        Ok(Labels { a, b })
    }

    pub fn resolve(&self, label: char) -> Option<Competitor> {
        if label == self.a {
            Some(Competitor::A)
        } else if label == self.b {
            Some(Competitor::B)
        } else {
            None
        }
    }

    pub fn label(&self, who: Competitor) -> char {
        match who {
            Competitor::A => self.a,
            Competitor::B => self.b,
        }
    }
}

impl Default for Labels {
    fn default() -> Self {
        Labels { a: 'F', b: 'H' }
    }
}

/// Everything [`process_match`] needs besides the scoring model and the games.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSettings {
    pub rules: GameRules,
    pub schedule: DecaySchedule,
    pub trials: usize,
    pub labels: Labels,
}

impl Default for MatchSettings {
    fn default() -> Self {
        MatchSettings {
            rules: GameRules::table_tennis(),
            schedule: DecaySchedule::default(),
            trials: DEFAULT_TRIALS,
            labels: Labels::default(),
        }
    }
}

// ── Output rows ──────────────────────────────────────────────────────────────

/// One output row per point, in match order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointRow {
    pub point: usize,
    pub game: usize,
    pub score_a: u32,
    pub score_b: u32,
    pub leverage: f64,
    pub g_a: f64,
    pub g_b: f64,
    pub momentum_a: f64,
    pub momentum_b: f64,
}

impl PointRow {
    fn new(record: &PointRecord, sample: MomentumSample) -> Self {
        PointRow {
            point: record.index,
            game: record.game,
            score_a: record.score.a,
            score_b: record.score.b,
            leverage: record.leverage,
            g_a: record.g_a,
            g_b: record.g_b,
            momentum_a: sample.a,
            momentum_b: sample.b,
        }
    }

    /// Score after the point as "a:b".
    pub fn score_label(&self) -> String {
        format!("{}:{}", self.score_a, self.score_b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameResult {
    pub game: usize,
    pub final_score: Score,
    pub winner: Competitor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    pub rows: Vec<PointRow>,
    pub games: Vec<GameResult>,
    pub state: MatchState,
}

impl MatchReport {
    pub fn games_won(&self, who: Competitor) -> usize {
        self.games.iter().filter(|g| g.winner == who).count()
    }
}

// ── Leverage ─────────────────────────────────────────────────────────────────

/// Swing in win probability decided by the point played at `before`:
/// A's chances if A takes it minus B's chances if B takes it. The same
/// formula is used whoever scores; Monte-Carlo noise can make it negative.
pub fn point_leverage<E: WinProbability + ?Sized>(estimator: &mut E, before: Score) -> Result<f64> {
    before.validate()?;
    let p_win = estimator.estimate(before.with_point(Competitor::A))?.prob_a;
    let p_lose = estimator.estimate(before.with_point(Competitor::B))?.prob_b;
    Ok(p_win - p_lose)
}

// ── Tracker ──────────────────────────────────────────────────────────────────

/// Owns the match state: in-game score, append-only point history and the
/// trailing momentum window.
pub struct MomentumTracker<E> {
    estimator: E,
    schedule: DecaySchedule,
    labels: Labels,
    state: MatchState,
    game: usize,
    score: Score,
    history: Vec<PointRecord>,
    samples: Vec<MomentumSample>,
    window: MomentumWindow,
    games: Vec<GameResult>,
}

impl<E: WinProbability> MomentumTracker<E> {
    pub fn new(estimator: E, schedule: DecaySchedule, labels: Labels) -> Result<Self> {
        schedule.validate()?;
        Ok(MomentumTracker {
            estimator,
            schedule,
            labels,
            state: MatchState::NotStarted,
            game: 0,
            score: Score::default(),
            history: Vec::new(),
            samples: Vec::new(),
            window: MomentumWindow::new(schedule),
            games: Vec::new(),
        })
    }

    /// Open the next declared game. Fails with `IncompleteGame` if the
    /// current one has not been decided.
    pub fn begin_game(&mut self) -> Result<()> {
        let next = self.state.next(MatchEvent::GameStart).ok_or_else(|| match self.state {
            MatchState::InGame => MomentumError::IncompleteGame {
                game_index: self.game,
                score_a: self.score.a,
                score_b: self.score.b,
            },
            _ => MomentumError::InvalidInput("match is already finished".into()),
        })?;

        if self.state == MatchState::GameOver {
            self.game += 1;
        }
        self.score = Score::default();
        self.state = next;
        Ok(())
    }

    /// Play one point won by the side labelled `label`.
    pub fn play_point(&mut self, label: char) -> Result<PointRow> {
        if self.state != MatchState::InGame {
            return Err(MomentumError::InvalidInput(format!(
                "point '{}' played while match is {:?} (game {}, score {})",
                label, self.state, self.game, self.score
            )));
        }
        let winner = self.labels.resolve(label).ok_or_else(|| {
            MomentumError::InvalidInput(format!(
                "unknown point winner '{}' at point {} (game {}), expected '{}' or '{}'",
                label,
                self.history.len() + 1,
                self.game,
                self.labels.label(Competitor::A),
                self.labels.label(Competitor::B)
            ))
        })?;

        let leverage = point_leverage(&mut self.estimator, self.score)?;
        let (g_a, g_b) = attribute(winner, leverage);
        self.score = self.score.with_point(winner);

        let record = PointRecord {
            index: self.history.len() + 1,
            game: self.game,
            winner,
            score: self.score,
            leverage,
            g_a,
            g_b,
        };
        let sample = self.window.push(record);
        self.history.push(record);
        self.samples.push(sample);

        debug!(
            point = record.index,
            game = record.game,
            score = %record.score,
            leverage,
            momentum_a = sample.a,
            momentum_b = sample.b,
            "point played"
        );

        let decided = self.estimator.rules().winner(self.score);
        if let Some(game_winner) = decided {
            self.games.push(GameResult {
                game: self.game,
                final_score: self.score,
                winner: game_winner,
            });
            info!(
                "Game {} to '{}' at {}",
                self.game + 1,
                self.labels.label(game_winner),
                self.score
            );
        }
        self.state = self
            .state
            .next(MatchEvent::Point { decided: decided.is_some() })
            .unwrap_or(self.state);

        Ok(PointRow::new(&record, sample))
    }

    /// Close the input. A decided final game ends the match; an undecided
    /// one leaves it in progress.
    pub fn finish(&mut self) -> MatchState {
        self.state = self.state.next(MatchEvent::EndOfInput).unwrap_or(self.state);
        self.state
    }

    /// Feed whole declared games and collect the per-point rows. Returns
    /// nothing on failure; the tracker keeps the points played so far.
    pub fn process_match<S: AsRef<str>>(&mut self, games: &[S]) -> Result<MatchReport> {
        let mut rows = Vec::new();
        for game in games {
            self.begin_game()?;
            for label in game.as_ref().chars() {
                rows.push(self.play_point(label)?);
            }
        }
        let state = self.finish();
        info!(
            "Processed {} points over {} games ({:?})",
            rows.len(),
            games.len(),
            state
        );
        Ok(MatchReport {
            rows,
            games: self.games.clone(),
            state,
        })
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn history(&self) -> &[PointRecord] {
        &self.history
    }

    pub fn samples(&self) -> &[MomentumSample] {
        &self.samples
    }

    pub fn games(&self) -> &[GameResult] {
        &self.games
    }

    /// Momentum for every point recomputed from the full history.
    pub fn recompute_samples(&self) -> Vec<MomentumSample> {
        (0..self.history.len())
            .map(|i| momentum_at(&self.history, i, &self.schedule))
            .collect()
    }
}

/// Run a whole match with the sequential Monte-Carlo estimator over `rng`.
pub fn process_match<S, R>(
    model: ScoringModel,
    games: &[S],
    settings: &MatchSettings,
    rng: R,
) -> Result<MatchReport>
where
    S: AsRef<str>,
    R: Rng,
{
    let estimator = MonteCarlo::new(model, settings.rules, settings.trials, rng)?;
    MomentumTracker::new(estimator, settings.schedule, settings.labels)?.process_match(games)
}

// ── Tests ────────────────────────────────────────────────────────────────────
