pub mod momentum;
pub mod rules;
pub mod tracker;
pub mod win_probability;

pub use momentum::{DecaySchedule, MomentumSample, PointRecord};
pub use rules::{Competitor, GameRules, Score};
pub use tracker::{
    process_match, GameResult, Labels, MatchReport, MatchSettings, MatchState, MomentumTracker,
    PointRow,
};
pub use win_probability::{estimate, Estimate, MonteCarlo, ParallelMonteCarlo, ScoringModel, WinProbability};
