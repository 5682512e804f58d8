//! The per-step game state machine.
//!
//! [`Simulation::step`] advances one tick in a fixed order: score accrual,
//! power-up spawning, expiry, display countdowns, agents, player movement,
//! collection, win check, collision check. Agents move before the player so
//! a player cannot slip through a cell an agent is leaving in the same tick.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;

use crate::agent::Agent;
use crate::config::{GameConfig, MIN_DIMENSION};
use crate::event::Event;
use crate::grid::{Cell, Dir, Grid};
use crate::maze::{self, MazeRequest};
use crate::powerup::{EffectCountdowns, PowerUp, PowerUpKind, PowerUpRegistry};

pub const START: Cell = Cell::new(1, 1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Playing,
    Win,
    Lose,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Outcome::Playing)
    }
}

pub struct Simulation {
    config: GameConfig,
    rng: ChaCha8Rng,
    grid: Grid,
    goal: Cell,
    player: Cell,
    /// Continuous (row, col) the player is drawn at.
    player_pos: (f64, f64),
    intent: Option<Dir>,
    agents: Vec<Agent>,
    power_ups: PowerUpRegistry,
    score: i64,
    lives: u32,
    outcome: Outcome,
    started_at: f64,
    last_score_at: f64,
    last_spawn_check: f64,
}

impl Simulation {
    /// Fresh session with a generated maze. Seeds from `config.seed` when set.
    pub fn new(config: GameConfig, now: f64) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(config, rng, now)
    }

    pub fn with_rng(config: GameConfig, mut rng: ChaCha8Rng, now: f64) -> Self {
        let goal = goal_for(config.height, config.width);
        let spawns = agent_spawns(config.height, config.width, config.agent_count);
        let mut reserved = spawns.clone();
        reserved.push(START);

        let maze = maze::generate(
            &mut rng,
            &MazeRequest {
                height: config.height,
                width: config.width,
                start: START,
                goal,
                reserved: &reserved,
                also_from: &[],
                wall_density: config.wall_density,
                max_attempts: config.max_maze_attempts,
            },
        );
        let mut sim = Self::assemble(config, rng, maze.grid, now);
        for cell in spawns {
            sim.add_agent(cell, now);
        }
        sim
    }

    /// Session on a caller-supplied grid with no agents. Start is (1,1) and
    /// the goal is the interior corner opposite.
    pub fn with_grid(config: GameConfig, grid: Grid, seed: u64, now: f64) -> Self {
        let mut config = config;
        config.height = grid.height();
        config.width = grid.width();
        Self::assemble(config, ChaCha8Rng::seed_from_u64(seed), grid, now)
    }

    fn assemble(config: GameConfig, rng: ChaCha8Rng, grid: Grid, now: f64) -> Self {
        let goal = goal_for(grid.height(), grid.width());
        let power_ups = PowerUpRegistry::new(config.power_up_params());
        let lives = config.starting_lives;
        Self {
            config,
            rng,
            grid,
            goal,
            player: START,
            player_pos: to_point(START),
            intent: None,
            agents: Vec::new(),
            power_ups,
            score: 0,
            lives,
            outcome: Outcome::Playing,
            started_at: now,
            last_score_at: now,
            last_spawn_check: now,
        }
    }

    pub fn add_agent(&mut self, cell: Cell, now: f64) {
        let agent = Agent::new(cell, now, self.config.agent_timing())
            .with_speed_multiplier(self.config.agent_speed_multiplier);
        self.agents.push(agent);
    }

    pub fn place_power_up(&mut self, kind: PowerUpKind, cell: Cell, now: f64) -> bool {
        self.power_ups.place(kind, cell, now)
    }

    /// Throws the session away and starts over on a new maze of the current
    /// dimensions.
    pub fn reset(&mut self, now: f64) {
        info!(score = self.score, "session reset");
        let rng = ChaCha8Rng::seed_from_u64(self.rng.gen());
        *self = Self::with_rng(self.config.clone(), rng, now);
    }

    pub fn step(&mut self, now: f64, input: Option<Dir>, events: &mut Vec<Event>) -> Outcome {
        if self.outcome.is_terminal() {
            return self.outcome;
        }

        if now - self.last_score_at >= self.config.score_interval {
            self.score += self.config.score_per_interval;
            self.last_score_at = now;
        }

        self.maybe_spawn_power_up(now, events);
        self.power_ups.expire(now, events);
        self.power_ups.tick_countdowns();

        for agent in &mut self.agents {
            agent.update_path(&self.grid, self.player, now);
            agent.update(now);
        }

        self.move_player(now, input, events);

        let collected = self.power_ups.collect_at(self.player, now, &mut self.agents, events);
        self.score -= self.config.power_up_cost * collected.len() as i64;

        if self.player == self.goal {
            self.score += self.config.win_bonus;
            self.outcome = Outcome::Win;
            info!(score = self.score, elapsed = now - self.started_at, "maze completed");
            events.push(Event::Won { score: self.score });
            return self.outcome;
        }

        if self.agents.iter().any(|agent| agent.position() == self.player) {
            return self.resolve_hit(now, events);
        }

        Outcome::Playing
    }

    fn maybe_spawn_power_up(&mut self, now: f64, events: &mut Vec<Event>) {
        if now - self.last_spawn_check < self.config.spawn_check_interval {
            return;
        }
        self.last_spawn_check = now;
        if self.power_ups.is_full() || self.rng.gen::<f64>() >= self.config.spawn_chance {
            return;
        }
        let mut occupied: Vec<Cell> = self.agents.iter().map(Agent::position).collect();
        occupied.push(self.player);
        occupied.push(self.goal);
        self.power_ups
            .try_spawn(&mut self.rng, &self.grid, &occupied, now, events);
    }

    fn move_player(&mut self, now: f64, input: Option<Dir>, events: &mut Vec<Event>) {
        self.intent = input;
        let Some(dir) = input else {
            return;
        };
        let Some(target) = self.grid.neighbor(self.player, dir) else {
            self.intent = None;
            return;
        };

        if !self.grid.is_open(target) {
            let breakable = self.power_ups.effects().is_active(PowerUpKind::WallBreaker, now);
            if !(breakable && self.grid.break_wall(target)) {
                return;
            }
            events.push(Event::WallBroken { cell: target });
        }

        let mut speed = self.config.player_speed;
        if self.power_ups.effects().is_active(PowerUpKind::Speed, now) {
            speed *= 2.0;
        }
        let goal = to_point(target);
        self.player_pos = smooth_move(self.player_pos, goal, speed);

        let eps = self.config.arrive_epsilon;
        if (self.player_pos.0 - goal.0).abs() < eps && (self.player_pos.1 - goal.1).abs() < eps {
            self.player = target;
        }
    }

    fn resolve_hit(&mut self, now: f64, events: &mut Vec<Event>) -> Outcome {
        self.lives = self.lives.saturating_sub(1);
        self.player = START;
        self.player_pos = to_point(START);
        self.intent = None;

        if self.lives == 0 {
            self.score -= self.config.lose_penalty;
            self.outcome = Outcome::Lose;
            info!(score = self.score, elapsed = now - self.started_at, "game over");
            events.push(Event::Lost { score: self.score });
            return self.outcome;
        }

        info!(lives_left = self.lives, "player hit");
        events.push(Event::PlayerHit {
            lives_left: self.lives,
        });
        Outcome::Playing
    }

    /// Adapts the session to a new playfield size. Dimensions below the
    /// minimum are raised to it. Changes within the threshold are ignored;
    /// larger ones rescale every entity into the new interior and rebuild
    /// the maze so the goal is reachable from the player's rescaled cell.
    /// Returns whether the maze was rebuilt.
    pub fn resize(&mut self, height: usize, width: usize, now: f64, events: &mut Vec<Event>) -> bool {
        let height = height.max(MIN_DIMENSION);
        let width = width.max(MIN_DIMENSION);
        let (old_h, old_w) = (self.grid.height(), self.grid.width());
        let threshold = self.config.resize_threshold;
        if height.abs_diff(old_h) <= threshold && width.abs_diff(old_w) <= threshold {
            return false;
        }

        let rescale = |cell: Cell| Cell {
            row: rescale_axis(cell.row, old_h, height),
            col: rescale_axis(cell.col, old_w, width),
        };

        self.player = rescale(self.player);
        self.player_pos = to_point(self.player);
        self.goal = goal_for(height, width);
        for agent in &mut self.agents {
            agent.relocate(rescale(agent.position()));
        }

        // Verified from where the player stands now and from the respawn cell.
        let reserved: Vec<Cell> = self.agents.iter().map(Agent::position).collect();
        let maze = maze::generate(
            &mut self.rng,
            &MazeRequest {
                height,
                width,
                start: self.player,
                goal: self.goal,
                reserved: &reserved,
                also_from: &[START],
                wall_density: self.config.wall_density,
                max_attempts: self.config.max_maze_attempts,
            },
        );
        self.grid = maze.grid;
        self.config.height = height;
        self.config.width = width;

        let grid = &self.grid;
        self.power_ups
            .remap(|cell| Some(rescale(cell)).filter(|c| grid.is_open(*c)));

        info!(old_h, old_w, height, width, "playfield resized");
        events.push(Event::MazeRegenerated {
            fallback: maze.fallback,
        });
        true
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn start(&self) -> Cell {
        START
    }

    pub fn goal(&self) -> Cell {
        self.goal
    }

    pub fn player(&self) -> Cell {
        self.player
    }

    pub fn player_position(&self) -> (f64, f64) {
        self.player_pos
    }

    pub fn intent(&self) -> Option<Dir> {
        self.intent
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn power_ups(&self) -> &PowerUpRegistry {
        &self.power_ups
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    pub fn snapshot(&self, now: f64) -> Snapshot {
        Snapshot {
            grid: self.grid.clone(),
            player: self.player,
            player_position: self.player_pos,
            goal: self.goal,
            agents: self
                .agents
                .iter()
                .map(|agent| AgentView {
                    cell: agent.position(),
                    frozen: agent.is_frozen(now),
                    path: agent.path().copied().collect(),
                })
                .collect(),
            power_ups: self.power_ups.live().to_vec(),
            effects: self
                .power_ups
                .effects()
                .iter()
                .map(|(kind, _)| EffectView {
                    kind,
                    remaining: self.power_ups.effects().remaining(kind, now),
                })
                .collect(),
            countdowns: *self.power_ups.countdowns(),
            score: self.score,
            lives: self.lives,
            outcome: self.outcome,
            elapsed: now - self.started_at,
        }
    }
}

/// Read-only view handed to a renderer.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub grid: Grid,
    pub player: Cell,
    pub player_position: (f64, f64),
    pub goal: Cell,
    pub agents: Vec<AgentView>,
    pub power_ups: Vec<PowerUp>,
    pub effects: Vec<EffectView>,
    pub countdowns: EffectCountdowns,
    pub score: i64,
    pub lives: u32,
    pub outcome: Outcome,
    pub elapsed: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct AgentView {
    pub cell: Cell,
    pub frozen: bool,
    pub path: Vec<Cell>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EffectView {
    pub kind: PowerUpKind,
    pub remaining: f64,
}

fn goal_for(height: usize, width: usize) -> Cell {
    Cell::new(height.saturating_sub(2), width.saturating_sub(2))
}

/// Centre first, then the two interior corners away from start and goal.
fn agent_spawns(height: usize, width: usize, count: usize) -> Vec<Cell> {
    let candidates = [
        Cell::new(height / 2, width / 2),
        Cell::new(1, width.saturating_sub(2)),
        Cell::new(height.saturating_sub(2), 1),
    ];
    (0..count).map(|i| candidates[i % candidates.len()]).collect()
}

fn rescale_axis(value: usize, old: usize, new: usize) -> usize {
    let scaled = (value as f64 / old as f64 * new as f64).floor() as usize;
    scaled.clamp(1, new.saturating_sub(2))
}

fn to_point(cell: Cell) -> (f64, f64) {
    (cell.row as f64, cell.col as f64)
}

/// Moves `current` toward `target` by at most `speed`, snapping when closer.
fn smooth_move(current: (f64, f64), target: (f64, f64), speed: f64) -> (f64, f64) {
    let d_row = target.0 - current.0;
    let d_col = target.1 - current.1;
    let dist = (d_row * d_row + d_col * d_col).sqrt();
    if dist < speed {
        return target;
    }
    (current.0 + d_row / dist * speed, current.1 + d_col / dist * speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smooth_move_snaps_within_one_step() {
        assert_eq!(smooth_move((1.0, 1.0), (1.0, 1.03), 0.04), (1.0, 1.03));
        let moved = smooth_move((1.0, 1.0), (1.0, 2.0), 0.25);
        assert!((moved.1 - 1.25).abs() < 1e-9);
        assert_eq!(moved.0, 1.0);
    }

    #[test]
    fn rescale_stays_inside_the_border() {
        assert_eq!(rescale_axis(1, 20, 10), 1);
        assert_eq!(rescale_axis(18, 20, 40), 36);
        assert_eq!(rescale_axis(38, 40, 12), 10);
    }
}
