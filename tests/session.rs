use std::io;

use maze_chase::clock::ManualClock;
use maze_chase::error::{StoreError, StoreResult};
use maze_chase::game::START;
use maze_chase::scores::{GameResult, MemoryScoreStore, ScoreRecord, ScoreStore};
use maze_chase::session::{GameSession, Player};
use maze_chase::{GameConfig, GameMode, Grid, Outcome, Simulation};

struct BrokenStore;

impl ScoreStore for BrokenStore {
    fn save(&mut self, _record: ScoreRecord) -> StoreResult<()> {
        Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk gone")))
    }

    fn records(&self) -> StoreResult<Vec<ScoreRecord>> {
        Ok(Vec::new())
    }
}

fn player() -> Player {
    Player {
        user_id: "u-1".to_string(),
        username: "tester".to_string(),
    }
}

/// Session on an open 10x10 grid with an agent parked on the start cell, so
/// every tick is a hit.
fn doomed_sim(started_at: f64) -> Simulation {
    let config = GameConfig {
        spawn_chance: 0.0,
        score_interval: 1e9,
        agent_count: 0,
        ..GameConfig::default()
    };
    let mut sim = Simulation::with_grid(config, Grid::bordered(10, 10), 9, started_at);
    sim.add_agent(START, started_at);
    sim
}

#[test]
fn loss_is_recorded_exactly_once() {
    let clock = ManualClock::new(2.0);
    let mut session = GameSession::new(
        doomed_sim(2.0),
        &clock,
        MemoryScoreStore::new(),
        player(),
        GameMode::Survival,
    );
    let mut events = Vec::new();

    clock.advance(1.0);
    assert_eq!(session.tick(None, &mut events), Outcome::Playing);
    assert!(!session.is_recorded());

    clock.advance(1.5);
    assert_eq!(session.tick(None, &mut events), Outcome::Lose);
    for _ in 0..5 {
        clock.advance(1.0);
        session.tick(None, &mut events);
    }

    let records = session.store().records().unwrap();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.user_id, "u-1");
    assert_eq!(r.username, "tester");
    assert_eq!(r.result, GameResult::Lose);
    assert_eq!(r.score, 0, "negative score is clamped");
    assert_eq!(r.survival_time, 2.5);
    assert_eq!(r.mode, GameMode::Survival);
    assert!(session.is_recorded());
    assert!(!session.is_offline());
}

#[test]
fn failed_save_goes_offline_without_touching_the_game() {
    let clock = ManualClock::new(0.0);
    let mut session = GameSession::new(doomed_sim(0.0), &clock, BrokenStore, player(), GameMode::Classic);
    let mut events = Vec::new();
    clock.advance(0.1);
    session.tick(None, &mut events);
    clock.advance(0.1);
    assert_eq!(session.tick(None, &mut events), Outcome::Lose);

    assert!(session.is_offline());
    assert_eq!(session.simulation().outcome(), Outcome::Lose);
    assert_eq!(session.simulation().score(), -20);
}

#[test]
fn restart_allows_a_second_record() {
    let clock = ManualClock::new(0.0);
    let config = GameConfig {
        seed: Some(5),
        ..GameConfig::default()
    };
    let sim = Simulation::new(config, 0.0);
    let mut session = GameSession::new(sim, &clock, MemoryScoreStore::new(), player(), GameMode::Classic);

    clock.set(10.0);
    session.restart();
    assert!(!session.is_recorded());
    assert_eq!(session.simulation().started_at(), 10.0);
    assert_eq!(session.simulation().outcome(), Outcome::Playing);
    assert_eq!(session.now(), 10.0);
}

#[test]
fn resize_goes_through_the_clock() {
    let clock = ManualClock::new(0.0);
    let sim = Simulation::new(GameConfig { seed: Some(2), ..GameConfig::default() }, 0.0);
    let mut session = GameSession::new(sim, &clock, MemoryScoreStore::new(), player(), GameMode::Classic);
    let mut events = Vec::new();
    assert!(session.resize(40, 60, &mut events));
    assert_eq!(session.simulation().grid().width(), 60);
    assert!(!session.resize(41, 61, &mut events));
}
