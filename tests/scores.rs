use chrono::{Duration, TimeZone, Utc};
use maze_chase::error::StoreError;
use maze_chase::scores::{
    rank_leaderboard, GameResult, JsonlScoreStore, MemoryScoreStore, ScoreRecord, ScoreStore,
};
use maze_chase::GameMode;
use tempfile::TempDir;

fn record(user: &str, result: GameResult, survival: f64) -> ScoreRecord {
    ScoreRecord::new(user, format!("{user}-name"), 50, result, survival, GameMode::Classic)
}

fn seeded_store() -> MemoryScoreStore {
    let mut store = MemoryScoreStore::new();
    for r in [
        record("ann", GameResult::Lose, 40.0),
        record("ann", GameResult::Win, 12.0),
        record("bob", GameResult::Lose, 90.0),
        record("cid", GameResult::Win, 30.0),
        record("bob", GameResult::Lose, 10.0),
    ] {
        store.save(r).unwrap();
    }
    store
}

#[test]
fn leaderboard_ranks_wins_then_survival() {
    let board = seeded_store().leaderboard(50).unwrap();
    let order: Vec<_> = board
        .iter()
        .map(|r| (r.user_id.as_str(), r.result, r.survival_time))
        .collect();
    assert_eq!(
        order,
        vec![
            ("cid", GameResult::Win, 30.0),
            ("ann", GameResult::Win, 12.0),
            ("bob", GameResult::Lose, 90.0),
        ]
    );
}

#[test]
fn leaderboard_respects_the_limit() {
    let board = seeded_store().leaderboard(2).unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[1].user_id, "ann");
}

#[test]
fn ties_are_broken_by_user_id() {
    let board = rank_leaderboard(
        vec![
            record("zed", GameResult::Win, 20.0),
            record("amy", GameResult::Win, 20.0),
        ],
        10,
    );
    assert_eq!(board[0].user_id, "amy");
    assert_eq!(board[1].user_id, "zed");
}

#[test]
fn best_for_matches_the_leaderboard_entry() {
    let store = seeded_store();
    let best = store.best_for("bob").unwrap().unwrap();
    assert_eq!(best.survival_time, 90.0);
    let ann = store.best_for("ann").unwrap().unwrap();
    assert_eq!(ann.result, GameResult::Win);
    assert!(store.best_for("nobody").unwrap().is_none());
}

#[test]
fn user_scores_are_newest_first() {
    let mut store = MemoryScoreStore::new();
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    for (i, survival) in [5.0, 6.0, 7.0].into_iter().enumerate() {
        let mut r = record("ann", GameResult::Lose, survival);
        r.timestamp = base + Duration::minutes(i as i64);
        store.save(r).unwrap();
    }
    store.save(record("bob", GameResult::Win, 1.0)).unwrap();

    let history = store.user_scores("ann", 2).unwrap();
    let times: Vec<_> = history.iter().map(|r| r.survival_time).collect();
    assert_eq!(times, vec![7.0, 6.0]);
}

#[test]
fn user_stats_summarise_games() {
    let store = seeded_store();
    let ann = store.user_stats("ann").unwrap();
    assert_eq!(ann.total_games, 2);
    assert_eq!(ann.total_wins, 1);
    assert_eq!(ann.best_win_time, Some(12.0));
    assert_eq!(ann.best_survival_time, 40.0);

    let bob = store.user_stats("bob").unwrap();
    assert_eq!(bob.total_wins, 0);
    assert_eq!(bob.best_win_time, None);

    assert_eq!(store.user_stats("nobody").unwrap().total_games, 0);
}

#[test]
fn negative_scores_are_stored_as_zero() {
    let r = ScoreRecord::new("ann", "Ann", -35, GameResult::Lose, 3.0, GameMode::Survival);
    assert_eq!(r.score, 0);
}

#[test]
fn invalid_records_are_rejected() {
    let mut store = MemoryScoreStore::new();
    let err = store.save(record("", GameResult::Win, 1.0)).unwrap_err();
    assert!(matches!(err, StoreError::InvalidRecord { .. }));
    let err = store
        .save(record("ann", GameResult::Win, f64::NAN))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidRecord { .. }));
    assert!(store.records().unwrap().is_empty());
}

#[test]
fn jsonl_store_round_trips_through_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scores.jsonl");

    let mut store = JsonlScoreStore::new(&path);
    assert!(store.records().unwrap().is_empty(), "missing file reads as empty");

    let first = record("ann", GameResult::Win, 12.5);
    let second = record("bob", GameResult::Lose, 70.0);
    store.save(first.clone()).unwrap();
    store.save(second.clone()).unwrap();

    let reopened = JsonlScoreStore::new(&path);
    assert_eq!(reopened.records().unwrap(), vec![first, second]);
    assert_eq!(reopened.leaderboard(1).unwrap()[0].user_id, "ann");

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("\"result\":\"win\""));
}

#[test]
fn jsonl_store_reports_corrupt_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scores.jsonl");
    std::fs::write(&path, "{not json}\n").unwrap();
    let err = JsonlScoreStore::new(&path).records().unwrap_err();
    assert!(matches!(err, StoreError::Serialization(_)));
}

#[test]
fn records_without_a_mode_default_to_classic() {
    let line = r#"{"user_id":"ann","username":"Ann","score":10,"result":"lose","survival_time":4.0,"timestamp":"2024-03-01T12:00:00Z"}"#;
    let r: ScoreRecord = serde_json::from_str(line).unwrap();
    assert_eq!(r.mode, GameMode::Classic);
}
