use thiserror::Error;

/// Errors surfaced by the win-probability estimator and the momentum tracker.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MomentumError {
    /// Weights, trial counts, window or decay parameters out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Unrecognised point-winner label, negative score, point after a decided game
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A declared game ended without satisfying the terminal condition
    #[error("Game {game_index} ended undecided at {score_a}:{score_b}")]
    IncompleteGame {
        game_index: usize,
        score_a: u32,
        score_b: u32,
    },
}

pub type Result<T> = std::result::Result<T, MomentumError>;
