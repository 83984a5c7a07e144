use std::path::PathBuf;

use clap::Parser;

use crate::engine::momentum::{DecaySchedule, DEFAULT_ALPHA, DEFAULT_BETA, DEFAULT_WINDOW};
use crate::engine::win_probability::validate_trials;
use crate::engine::{GameRules, Labels, MatchSettings, ScoringModel};
use crate::error::Result;
use crate::report::OutputFormat;

/// Point-by-point win probability and momentum for a racket-sport match
#[derive(Parser, Debug, Clone)]
#[command(name = "rally-momentum", version, about)]
pub struct Config {
    /// File with one game per line as a string of point-winner labels (stdin if omitted)
    #[arg(long, env = "GAMES_PATH")]
    pub games: Option<PathBuf>,

    /// Relative per-point scoring weight of side A
    #[arg(long, env = "WEIGHT_A", default_value = "0.45")]
    pub weight_a: f64,

    /// Relative per-point scoring weight of side B
    #[arg(long, env = "WEIGHT_B", default_value = "0.55")]
    pub weight_b: f64,

    /// Label marking a point won by side A
    #[arg(long, env = "LABEL_A", default_value = "F")]
    pub label_a: char,

    /// Label marking a point won by side B
    #[arg(long, env = "LABEL_B", default_value = "H")]
    pub label_b: char,

    /// Monte-Carlo play-outs per win-probability estimate
    #[arg(long, env = "TRIALS", default_value = "10000")]
    pub trials: usize,

    /// Number of trailing points in the momentum window
    #[arg(long, env = "WINDOW", default_value_t = DEFAULT_WINDOW)]
    pub window: usize,

    /// Decay rate for points of the current game (0 < alpha < 1)
    #[arg(long, env = "ALPHA", default_value_t = DEFAULT_ALPHA)]
    pub alpha: f64,

    /// Decay rate for points of earlier games (0 < beta < 1, normally > alpha)
    #[arg(long, env = "BETA", default_value_t = DEFAULT_BETA)]
    pub beta: f64,

    /// Points needed to win a game
    #[arg(long, env = "WIN_THRESHOLD", default_value = "11")]
    pub win_threshold: u32,

    /// Lead needed to win a game
    #[arg(long, env = "WIN_MARGIN", default_value = "2")]
    pub win_margin: u32,

    /// Seed for the random source (entropy if omitted)
    #[arg(long, env = "SEED")]
    pub seed: Option<u64>,

    /// Run trial batches in parallel
    #[arg(long, env = "PARALLEL", default_value = "false")]
    pub parallel: bool,

    /// Worker threads for --parallel (rayon's default if omitted)
    #[arg(long, env = "THREADS")]
    pub threads: Option<usize>,

    /// Output format
    #[arg(long, env = "FORMAT", value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.scoring_model()?;
        self.match_settings()?;
        if self.threads == Some(0) {
            anyhow::bail!("threads must be at least 1");
        }
        if self.threads.is_some() && !self.parallel {
            tracing::warn!("--threads has no effect without --parallel");
        }
        Ok(())
    }

    /// Dedicated pool for parallel trial batches, sized by `--threads`.
    pub fn thread_pool(&self) -> anyhow::Result<rayon::ThreadPool> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = self.threads {
            builder = builder.num_threads(threads);
        }
        builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build thread pool: {}", e))
    }

    pub fn scoring_model(&self) -> Result<ScoringModel> {
        ScoringModel::new(self.weight_a, self.weight_b)
    }

    pub fn match_settings(&self) -> Result<MatchSettings> {
        let rules = GameRules {
            win_threshold: self.win_threshold,
            win_margin: self.win_margin,
        };
        rules.validate()?;
        let schedule = DecaySchedule {
            window: self.window,
            alpha: self.alpha,
            beta: self.beta,
        };
        schedule.validate()?;
        validate_trials(self.trials)?;
        Ok(MatchSettings {
            rules,
            schedule,
            trials: self.trials,
            labels: Labels::new(self.label_a, self.label_b)?,
        })
    }
}
