//! Monte-Carlo win probability for a single game from an arbitrary score.
//!
//! Each point is an independent draw weighted by the two sides' scoring
//! propensities. From a given score the game is played out to completion
//! many times under the configured [`GameRules`], and the share of play-outs
//! each side wins is its estimated win probability.
//!
//! Two estimators are provided:
//! - **[`MonteCarlo`]**: sequential, over any injected [`Rng`]
//! - **[`ParallelMonteCarlo`]**: fixed-size trial batches on rayon, each batch
//!   with its own seeded stream, so the result depends on the seed only and
//!   never on the thread count

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::rules::{Competitor, GameRules, Score};
use crate::error::{MomentumError, Result};

/// Default number of play-outs per estimate.
pub const DEFAULT_TRIALS: usize = 10_000;

/// Trials per independently seeded batch in [`ParallelMonteCarlo`].
const BATCH_SIZE: usize = 1_000;

// ── Scoring model ────────────────────────────────────────────────────────────

/// Relative per-point scoring propensity of the two sides. A wins a point
/// with probability `weight_a / (weight_a + weight_b)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringModel {
    weight_a: f64,
    weight_b: f64,
}

impl ScoringModel {
    pub fn new(weight_a: f64, weight_b: f64) -> Result<Self> {
        for (name, w) in [("weight_a", weight_a), ("weight_b", weight_b)] {
            if !w.is_finite() || w <= 0.0 {
                return Err(MomentumError::InvalidConfiguration(format!(
                    "{} must be a positive finite number, got {}",
                    name, w
                )));
            }
        }
        if !(weight_a + weight_b).is_finite() {
            return Err(MomentumError::InvalidConfiguration(format!(
                "weight_a + weight_b overflows, got {} and {}",
                weight_a, weight_b
            )));
        }
        Ok(ScoringModel { weight_a, weight_b })
    }

    pub fn weight_a(&self) -> f64 {
        self.weight_a
    }

    pub fn weight_b(&self) -> f64 {
        self.weight_b
    }

    pub fn total_weight(&self) -> f64 {
        self.weight_a + self.weight_b
    }

    /// Probability that A takes any single point.
    pub fn point_probability_a(&self) -> f64 {
        self.weight_a / self.total_weight()
    }

    /// The same model with the sides exchanged.
    pub fn swapped(&self) -> Self {
        ScoringModel {
            weight_a: self.weight_b,
            weight_b: self.weight_a,
        }
    }

    /// Draw the winner of one point.
    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Competitor {
        if rng.gen_range(0.0..self.total_weight()) < self.weight_a {
            Competitor::A
        } else {
            Competitor::B
        }
    }
}

// ── Estimate ─────────────────────────────────────────────────────────────────

/// Result of one Monte-Carlo estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub prob_a: f64,
    /// Complement of `prob_a`; every play-out has exactly one winner.
    pub prob_b: f64,
    /// Mean number of simulated points needed to finish the game.
    pub mean_points_remaining: f64,
}

impl Estimate {
    pub fn prob(&self, who: Competitor) -> f64 {
        match who {
            Competitor::A => self.prob_a,
            Competitor::B => self.prob_b,
        }
    }
}

/// Raw counts from a run of play-outs. Merging is associative, so batch
/// order never changes the final numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    wins_a: u64,
    wins_b: u64,
    points: u64,
}

impl Tally {
    fn merge(self, other: Tally) -> Tally {
        Tally {
            wins_a: self.wins_a + other.wins_a,
            wins_b: self.wins_b + other.wins_b,
            points: self.points + other.points,
        }
    }

    fn trials(&self) -> u64 {
        self.wins_a + self.wins_b
    }

    fn into_estimate(self) -> Estimate {
        let n = self.trials() as f64;
        let prob_a = self.wins_a as f64 / n;
        Estimate {
            prob_a,
            prob_b: 1.0 - prob_a,
            mean_points_remaining: self.points as f64 / n,
        }
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Estimate each side's probability of winning the game from `score`.
///
/// Consumes randomness from `rng` only. Fails with `InvalidConfiguration`
/// when `trials` is zero or the rules are degenerate, and with `InvalidInput`
/// when `score` exceeds [`Score::MAX_POINTS`].
pub fn estimate<R: Rng + ?Sized>(
    model: &ScoringModel,
    rules: &GameRules,
    score: Score,
    trials: usize,
    rng: &mut R,
) -> Result<Estimate> {
    validate_trials(trials)?;
    rules.validate()?;
    score.validate()?;
    Ok(run_trials(model, rules, score, trials, rng).into_estimate())
}

/// A source of win probabilities for the momentum tracker.
pub trait WinProbability {
    fn estimate(&mut self, score: Score) -> Result<Estimate>;

    /// The rules play-outs are simulated under.
    fn rules(&self) -> &GameRules;
}

/// Sequential estimator over an injected random source.
pub struct MonteCarlo<R> {
    model: ScoringModel,
    rules: GameRules,
    trials: usize,
    rng: R,
}

impl<R: Rng> MonteCarlo<R> {
    pub fn new(model: ScoringModel, rules: GameRules, trials: usize, rng: R) -> Result<Self> {
        validate_trials(trials)?;
        rules.validate()?;
        Ok(MonteCarlo {
            model,
            rules,
            trials,
            rng,
        })
    }
}

impl MonteCarlo<StdRng> {
    pub fn seeded(model: ScoringModel, rules: GameRules, trials: usize, seed: u64) -> Result<Self> {
        Self::new(model, rules, trials, StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy(model: ScoringModel, rules: GameRules, trials: usize) -> Result<Self> {
        Self::new(model, rules, trials, StdRng::from_entropy())
    }
}

impl<R: Rng> WinProbability for MonteCarlo<R> {
    fn estimate(&mut self, score: Score) -> Result<Estimate> {
        score.validate()?;
        Ok(run_trials(&self.model, &self.rules, score, self.trials, &mut self.rng).into_estimate())
    }

    fn rules(&self) -> &GameRules {
        &self.rules
    }
}

/// Batch-parallel estimator. Call `k`, batch `i` draws from a stream seeded
/// by `(seed, k, i)`, so repeated runs with the same seed are bit-identical.
pub struct ParallelMonteCarlo {
    model: ScoringModel,
    rules: GameRules,
    trials: usize,
    seed: u64,
    calls: u64,
}

impl ParallelMonteCarlo {
    pub fn new(model: ScoringModel, rules: GameRules, trials: usize, seed: u64) -> Result<Self> {
        validate_trials(trials)?;
        rules.validate()?;
        Ok(ParallelMonteCarlo {
            model,
            rules,
            trials,
            seed,
            calls: 0,
        })
    }
}

impl WinProbability for ParallelMonteCarlo {
    fn estimate(&mut self, score: Score) -> Result<Estimate> {
        score.validate()?;
        let call = self.calls;
        self.calls += 1;

        let batches = self.trials.div_ceil(BATCH_SIZE);
        let tally = (0..batches)
            .into_par_iter()
            .map(|i| {
                let len = BATCH_SIZE.min(self.trials - i * BATCH_SIZE);
                let mut rng = StdRng::seed_from_u64(stream_seed(self.seed, call, i as u64));
                run_trials(&self.model, &self.rules, score, len, &mut rng)
            })
            .reduce(Tally::default, Tally::merge);

        Ok(tally.into_estimate())
    }

    fn rules(&self) -> &GameRules {
        &self.rules
    }
}

// ── Simulation ───────────────────────────────────────────────────────────────

pub(crate) fn validate_trials(trials: usize) -> Result<()> {
    if trials == 0 {
        return Err(MomentumError::InvalidConfiguration(
            "trials must be positive".into(),
        ));
    }
    Ok(())
}

fn run_trials<R: Rng + ?Sized>(
    model: &ScoringModel,
    rules: &GameRules,
    score: Score,
    trials: usize,
    rng: &mut R,
) -> Tally {
    let mut tally = Tally::default();
    for _ in 0..trials {
        let (winner, points) = play_out(model, rules, score, rng);
        match winner {
            Competitor::A => tally.wins_a += 1,
            Competitor::B => tally.wins_b += 1,
        }
        tally.points += u64::from(points);
    }
    tally
}

/// Play one game to completion from `score`. Returns the winner and the
/// number of points it took.
fn play_out<R: Rng + ?Sized>(
    model: &ScoringModel,
    rules: &GameRules,
    mut score: Score,
    rng: &mut R,
) -> (Competitor, u32) {
    let mut points = 0;
    loop {
        if let Some(winner) = rules.winner(score) {
            return (winner, points);
        }
        score = score.with_point(model.draw(rng));
        points += 1;
    }
}

/// SplitMix64 finaliser over the three stream coordinates.
fn stream_seed(seed: u64, call: u64, batch: u64) -> u64 {
    let mut z = seed
        .wrapping_add(call.wrapping_mul(0x9e37_79b9_7f4a_7c15))
        .wrapping_add(batch.wrapping_mul(0xd1b5_4a32_d192_ed03));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    fn model(a: f64, b: f64) -> ScoringModel {
        ScoringModel::new(a, b).unwrap()
    }

    const RULES: GameRules = GameRules::table_tennis();

    // ── Scoring model ────────────────────────────────────────────────────────

    #[test]
    fn scoring_model_rejects_non_positive_weights() {
        assert!(matches!(
            ScoringModel::new(0.0, 1.0),
            Err(MomentumError::InvalidConfiguration(_))
        ));
        assert!(ScoringModel::new(0.5, -0.1).is_err());
        assert!(ScoringModel::new(f64::NAN, 0.5).is_err());
        assert!(ScoringModel::new(f64::INFINITY, 0.5).is_err());
    }

    #[test]
    fn scoring_model_rejects_overflowing_total() {
        assert!(matches!(
            ScoringModel::new(f64::MAX, f64::MAX),
            Err(MomentumError::InvalidConfiguration(_))
        ));
        assert!(ScoringModel::new(1e308, 1e308).is_err());
        assert!(ScoringModel::new(1e307, 1e307).is_ok());
    }

    #[test]
    fn scoring_model_point_probability() {
        let m = model(0.45, 0.55);
        assert_relative_eq!(m.point_probability_a(), 0.45, epsilon = 1e-12);
        assert_relative_eq!(m.swapped().point_probability_a(), 0.55, epsilon = 1e-12);
    }

    // ── Estimator contract ───────────────────────────────────────────────────

    #[test]
    fn zero_trials_is_a_configuration_error() {
        let err = estimate(&model(1.0, 1.0), &RULES, Score::default(), 0, &mut rng(1));
        assert!(matches!(err, Err(MomentumError::InvalidConfiguration(_))));
        assert!(MonteCarlo::seeded(model(1.0, 1.0), RULES, 0, 1).is_err());
        assert!(ParallelMonteCarlo::new(model(1.0, 1.0), RULES, 0, 1).is_err());
    }

    #[test]
    fn probabilities_in_range_and_sum_to_one() {
        let mut r = rng(7);
        for (wa, wb) in [(0.45, 0.55), (0.9, 0.1), (3.0, 1.0)] {
            let m = model(wa, wb);
            for a in [0, 4, 9, 10, 12] {
                for b in [0, 5, 10, 11] {
                    let e = estimate(&m, &RULES, Score::new(a, b), 500, &mut r).unwrap();
                    assert!((0.0..=1.0).contains(&e.prob_a), "prob_a {}", e.prob_a);
                    assert!((0.0..=1.0).contains(&e.prob_b), "prob_b {}", e.prob_b);
                    assert_eq!(e.prob_a + e.prob_b, 1.0);
                }
            }
        }
    }

    #[test]
    fn oversized_score_is_invalid_input() {
        let huge = Score::new(u32::MAX, u32::MAX);
        let err = estimate(&model(1.0, 1.0), &RULES, huge, 10, &mut rng(1));
        assert!(matches!(err, Err(MomentumError::InvalidInput(_))));

        let mut seq = MonteCarlo::seeded(model(1.0, 1.0), RULES, 10, 1).unwrap();
        assert!(matches!(seq.estimate(huge), Err(MomentumError::InvalidInput(_))));
        let mut par = ParallelMonteCarlo::new(model(1.0, 1.0), RULES, 10, 1).unwrap();
        assert!(matches!(par.estimate(huge), Err(MomentumError::InvalidInput(_))));
    }

    #[test]
    fn terminal_score_is_certain() {
        let e = estimate(&model(1.0, 1.0), &RULES, Score::new(11, 3), 100, &mut rng(3)).unwrap();
        assert_eq!(e.prob_a, 1.0);
        assert_eq!(e.prob_b, 0.0);
        assert_eq!(e.mean_points_remaining, 0.0);
    }

    #[test]
    fn even_weights_from_love_all_is_a_coin_flip() {
        let e = estimate(&model(1.0, 1.0), &RULES, Score::default(), 20_000, &mut rng(11)).unwrap();
        assert_relative_eq!(e.prob_a, 0.5, epsilon = 0.02);
    }

    #[test]
    fn deuce_matches_closed_form() {
        // From 10:10 A must win two in a row: P = p² / (p² + q²).
        let p: f64 = 0.6;
        let q = 1.0 - p;
        let expected = p * p / (p * p + q * q);
        let e = estimate(&model(0.6, 0.4), &RULES, Score::new(10, 10), 40_000, &mut rng(5)).unwrap();
        assert_relative_eq!(e.prob_a, expected, epsilon = 0.015);
    }

    #[test]
    fn deuce_mean_length_matches_closed_form() {
        // Each two-point round ends the game with probability p² + q² = 0.5.
        let e = estimate(&model(1.0, 1.0), &RULES, Score::new(10, 10), 40_000, &mut rng(6)).unwrap();
        assert_relative_eq!(e.mean_points_remaining, 4.0, epsilon = 0.1);
    }

    #[test]
    fn symmetry_under_side_swap() {
        let m = model(0.45, 0.55);
        let score = Score::new(6, 4);
        let direct = estimate(&m, &RULES, score, 20_000, &mut rng(21)).unwrap();
        let mirrored = estimate(&m.swapped(), &RULES, score.swapped(), 20_000, &mut rng(22)).unwrap();
        assert_relative_eq!(direct.prob_a, mirrored.prob_b, epsilon = 0.025);
        assert_relative_eq!(direct.prob_b, mirrored.prob_a, epsilon = 0.025);
    }

    #[test]
    fn more_points_never_hurts() {
        let m = model(0.5, 0.5);
        let mut r = rng(31);
        let mut last = 0.0;
        for a in [0, 3, 6, 9] {
            let e = estimate(&m, &RULES, Score::new(a, 3), 20_000, &mut r).unwrap();
            assert!(
                e.prob_a > last,
                "prob_a at {}:3 ({:.3}) should exceed {:.3}",
                a,
                e.prob_a,
                last
            );
            last = e.prob_a;
        }
    }

    #[test]
    fn stronger_side_is_favoured() {
        let e = estimate(&model(0.6, 0.4), &RULES, Score::default(), 10_000, &mut rng(8)).unwrap();
        assert!(e.prob_a > 0.75, "0.6 point share should win most games, got {:.3}", e.prob_a);
    }

    // ── Estimator implementations ────────────────────────────────────────────

    #[test]
    fn seeded_monte_carlo_is_reproducible() {
        let m = model(0.45, 0.55);
        let mut first = MonteCarlo::seeded(m, RULES, 2_000, 99).unwrap();
        let mut second = MonteCarlo::seeded(m, RULES, 2_000, 99).unwrap();
        for score in [Score::new(0, 0), Score::new(5, 7), Score::new(10, 9)] {
            assert_eq!(first.estimate(score).unwrap(), second.estimate(score).unwrap());
        }
    }

    #[test]
    fn parallel_result_is_independent_of_thread_count() {
        let m = model(0.45, 0.55);
        let run = |threads: usize| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap()
                .install(|| {
                    let mut est = ParallelMonteCarlo::new(m, RULES, 5_500, 42).unwrap();
                    vec![
                        est.estimate(Score::new(2, 3)).unwrap(),
                        est.estimate(Score::new(2, 3)).unwrap(),
                    ]
                })
        };
        let single = run(1);
        let many = run(4);
        assert_eq!(single, many);
        // Successive calls draw fresh streams.
        assert_ne!(single[0], single[1]);
    }

    #[test]
    fn parallel_agrees_with_closed_form() {
        let mut est = ParallelMonteCarlo::new(model(0.6, 0.4), RULES, 40_000, 17).unwrap();
        let e = est.estimate(Score::new(10, 10)).unwrap();
        assert_relative_eq!(e.prob_a, 0.36 / 0.52, epsilon = 0.015);
        assert_eq!(e.prob_a + e.prob_b, 1.0);
    }

    #[test]
    fn stream_seeds_differ_per_batch_and_call() {
        assert_ne!(stream_seed(1, 0, 0), stream_seed(1, 0, 1));
        assert_ne!(stream_seed(1, 0, 0), stream_seed(1, 1, 0));
        assert_eq!(stream_seed(5, 2, 3), stream_seed(5, 2, 3));
    }
}
