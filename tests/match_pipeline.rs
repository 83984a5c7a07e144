use rand::rngs::StdRng;
use rand::SeedableRng;

use rally_momentum::engine::{
    process_match, Competitor, GameRules, Labels, MatchSettings, MatchState, MomentumTracker,
    ParallelMonteCarlo, ScoringModel,
};
use rally_momentum::feed::parse_games;
use rally_momentum::report::{render, OutputFormat};

const SAMPLE: &str = include_str!("../data/sample_match.txt");

fn settings() -> MatchSettings {
    MatchSettings {
        trials: 500,
        ..MatchSettings::default()
    }
}

fn model() -> ScoringModel {
    ScoringModel::new(0.45, 0.55).unwrap()
}

#[test]
fn sample_match_end_to_end() {
    let games = parse_games(SAMPLE);
    assert_eq!(games.len(), 7);
    let total_points: usize = games.iter().map(|g| g.len()).sum();

    let report = process_match(model(), &games, &settings(), StdRng::seed_from_u64(1)).unwrap();

    assert_eq!(report.rows.len(), total_points);
    assert_eq!(report.state, MatchState::MatchDone);
    assert_eq!(report.games.len(), 7);
    assert_eq!(report.games_won(Competitor::A), 4);
    assert_eq!(report.games_won(Competitor::B), 3);

    // Point indices run across the whole match; game indices never go back.
    for (i, row) in report.rows.iter().enumerate() {
        assert_eq!(row.point, i + 1);
        assert!(row.game < 7);
        assert!((row.g_a == 0.0) || (row.g_b == 0.0));
    }
    for pair in report.rows.windows(2) {
        assert!(pair[1].game >= pair[0].game);
        if pair[1].game != pair[0].game {
            assert_eq!(pair[1].score_a + pair[1].score_b, 1);
        }
    }

    let csv = render(&report, &Labels::default(), OutputFormat::Csv).unwrap();
    assert_eq!(csv.lines().count(), total_points + 1);
}

#[test]
fn parallel_estimator_drives_the_same_match() {
    let games = parse_games(SAMPLE);
    let s = settings();
    let run = || {
        let estimator = ParallelMonteCarlo::new(model(), GameRules::table_tennis(), 1_500, 8).unwrap();
        MomentumTracker::new(estimator, s.schedule, s.labels)
            .unwrap()
            .process_match(&games)
            .unwrap()
    };
    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert_eq!(first.state, MatchState::MatchDone);
    assert_eq!(first.games_won(Competitor::A), 4);
}

#[test]
fn truncated_game_in_the_middle_is_rejected() {
    let games = vec!["HFHHHHHH".to_string(), "FFFFFFFFFFF".to_string()];
    let err = process_match(model(), &games, &settings(), StdRng::seed_from_u64(1)).unwrap_err();
    assert_eq!(err.to_string(), "Game 0 ended undecided at 1:7");
}
