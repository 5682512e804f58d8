use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::GameMode;
use crate::event::Event;
use crate::game::{Outcome, Simulation};
use crate::grid::Dir;
use crate::scores::{GameResult, ScoreRecord, ScoreStore};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub user_id: String,
    pub username: String,
}

/// Drives a [`Simulation`] from a clock and records the result once the
/// game ends.
pub struct GameSession<C, S> {
    sim: Simulation,
    clock: C,
    store: S,
    player: Player,
    mode: GameMode,
    recorded: bool,
    offline: bool,
}

impl<C: Clock, S: ScoreStore> GameSession<C, S> {
    pub fn new(sim: Simulation, clock: C, store: S, player: Player, mode: GameMode) -> Self {
        Self {
            sim,
            clock,
            store,
            player,
            mode,
            recorded: false,
            offline: false,
        }
    }

    /// One step at the clock's current reading.
    pub fn tick(&mut self, input: Option<Dir>, events: &mut Vec<Event>) -> Outcome {
        let now = self.clock.now();
        let outcome = self.sim.step(now, input, events);
        if outcome.is_terminal() && !self.recorded {
            self.recorded = true;
            self.record(outcome, now);
        }
        outcome
    }

    fn record(&mut self, outcome: Outcome, now: f64) {
        let Some(result) = GameResult::from_outcome(outcome) else {
            return;
        };
        let survival_time = (now - self.sim.started_at()).max(0.0);
        let record = ScoreRecord::new(
            self.player.user_id.clone(),
            self.player.username.clone(),
            self.sim.score(),
            result,
            survival_time,
            self.mode,
        );
        match self.store.save(record) {
            Ok(()) => {
                self.offline = false;
                info!(?result, score = self.sim.score(), survival_time, "outcome recorded");
            }
            Err(err) => {
                self.offline = true;
                warn!(error = %err, "failed to record outcome");
            }
        }
    }

    /// Starts a new game on a fresh maze.
    pub fn restart(&mut self) {
        let now = self.clock.now();
        self.sim.reset(now);
        self.recorded = false;
    }

    pub fn resize(&mut self, height: usize, width: usize, events: &mut Vec<Event>) -> bool {
        let now = self.clock.now();
        self.sim.resize(height, width, now, events)
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn is_recorded(&self) -> bool {
        self.recorded
    }

    /// Whether the last save attempt failed.
    pub fn is_offline(&self) -> bool {
        self.offline
    }
}
