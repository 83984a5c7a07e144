use std::fs::File;
use std::io::{self, BufReader};

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use rally_momentum::config::Config;
use rally_momentum::engine::{
    process_match, Competitor, MatchReport, MomentumTracker, ParallelMonteCarlo,
};
use rally_momentum::feed::read_games;
use rally_momentum::report::render;

fn main() -> Result<()> {
    // Initialise tracing / logging (stderr, so stdout carries only the report)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config::parse();
    config.validate()?;

    let games = match &config.games {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open games file {}", path.display()))?;
            read_games(BufReader::new(file))?
        }
        None => read_games(io::stdin().lock())?,
    };
    info!("Loaded {} games", games.len());

    let model = config.scoring_model()?;
    let settings = config.match_settings()?;
    info!(
        "Scoring weights {:.3}/{:.3}, {} trials per estimate, window {}, alpha {}, beta {}",
        model.weight_a(),
        model.weight_b(),
        settings.trials,
        settings.schedule.window,
        settings.schedule.alpha,
        settings.schedule.beta
    );

    let report: MatchReport = if config.parallel {
        let seed = config.seed.unwrap_or_else(rand::random);
        let pool = config.thread_pool()?;
        info!(
            "Parallel estimation with seed {} on {} threads",
            seed,
            pool.current_num_threads()
        );
        let estimator = ParallelMonteCarlo::new(model, settings.rules, settings.trials, seed)?;
        let mut tracker = MomentumTracker::new(estimator, settings.schedule, settings.labels)?;
        pool.install(|| tracker.process_match(&games))?
    } else {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        process_match(model, &games, &settings, rng)?
    };

    info!(
        "Match {:?}: games {}-{}",
        report.state,
        report.games_won(Competitor::A),
        report.games_won(Competitor::B)
    );

    print!("{}", render(&report, &settings.labels, config.format)?);
    Ok(())
}
