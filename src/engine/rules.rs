//! Scoring primitives: who can win a point, the running in-game score, and
//! the rule that decides when a game is over.

use serde::Serialize;

use crate::error::{MomentumError, Result};

/// One of the two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Competitor {
    A,
    B,
}

impl Competitor {
    pub fn opponent(self) -> Self {
        match self {
            Competitor::A => Competitor::B,
            Competitor::B => Competitor::A,
        }
    }
}

/// In-game score `(points for A, points for B)`. Resets to 0:0 every game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Score {
    pub a: u32,
    pub b: u32,
}

impl Score {
    /// Largest point count either side may hold; leaves room for any play-out.
    pub const MAX_POINTS: u32 = 1 << 30;

    pub const fn new(a: u32, b: u32) -> Self {
        Score { a, b }
    }

    /// Build a score from signed input, rejecting negative point counts.
    pub fn try_new(a: i64, b: i64) -> Result<Self> {
        if a < 0 || b < 0 {
            return Err(MomentumError::InvalidInput(format!(
                "score cannot be negative, got {}:{}",
                a, b
            )));
        }
        let a = u32::try_from(a)
            .map_err(|_| MomentumError::InvalidInput(format!("score {} out of range", a)))?;
        let b = u32::try_from(b)
            .map_err(|_| MomentumError::InvalidInput(format!("score {} out of range", b)))?;
        let score = Score { a, b };
        score.validate()?;
        Ok(score)
    }

    pub fn validate(&self) -> Result<()> {
        if self.a > Self::MAX_POINTS || self.b > Self::MAX_POINTS {
            return Err(MomentumError::InvalidInput(format!(
                "score {} exceeds {} points",
                self, Self::MAX_POINTS
            )));
        }
        Ok(())
    }

    /// The score after `winner` takes one more point.
    pub fn with_point(self, winner: Competitor) -> Self {
        match winner {
            Competitor::A => Score::new(self.a + 1, self.b),
            Competitor::B => Score::new(self.a, self.b + 1),
        }
    }

    /// The same score seen from the other side of the net.
    pub fn swapped(self) -> Self {
        Score::new(self.b, self.a)
    }

    pub fn total_points(&self) -> u32 {
        self.a + self.b
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.a, self.b)
    }
}

/// The terminal condition of a game: the leader must reach `win_threshold`
/// and be ahead by at least `win_margin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    pub win_threshold: u32,
    pub win_margin: u32,
}

impl GameRules {
    /// Eleven points, win by two.
    pub const fn table_tennis() -> Self {
        GameRules {
            win_threshold: 11,
            win_margin: 2,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.win_threshold == 0 {
            return Err(MomentumError::InvalidConfiguration(
                "win_threshold must be at least 1".into(),
            ));
        }
        if self.win_margin == 0 {
            return Err(MomentumError::InvalidConfiguration(
                "win_margin must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The side that has won the game at `score`, if the game is over.
    pub fn winner(&self, score: Score) -> Option<Competitor> {
        let (leader, high, low) = if score.a >= score.b {
            (Competitor::A, score.a, score.b)
        } else {
            (Competitor::B, score.b, score.a)
        };
        if high >= self.win_threshold && high - low >= self.win_margin {
            Some(leader)
        } else {
            None
        }
    }

    pub fn is_over(&self, score: Score) -> bool {
        self.winner(score).is_some()
    }
}

impl Default for GameRules {
    fn default() -> Self {
        GameRules::table_tennis()
    }
}
