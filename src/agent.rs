use std::collections::VecDeque;

use serde::Serialize;
use tracing::debug;

use crate::grid::{Cell, Dir, Grid};
use crate::pathfinding::find_path;

pub const DEFAULT_STEP_INTERVAL: f64 = 0.6;
pub const DEFAULT_PATHFIND_INTERVAL: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentTiming {
    /// Seconds between steps at speed multiplier 1.0.
    pub step_interval: f64,
    /// Seconds between forced path recomputes.
    pub pathfind_interval: f64,
}

impl Default for AgentTiming {
    fn default() -> Self {
        Self {
            step_interval: DEFAULT_STEP_INTERVAL,
            pathfind_interval: DEFAULT_PATHFIND_INTERVAL,
        }
    }
}

/// A pursuer that replans toward a target on its own cadence and walks its
/// cached path one cell per step interval.
///
/// The agent never holds the grid; every call that needs it borrows the
/// current one. Timestamps are seconds on the simulation clock.
#[derive(Clone, Debug, Serialize)]
pub struct Agent {
    position: Cell,
    path: VecDeque<Cell>,
    last_recompute: f64,
    last_move: f64,
    last_target: Option<Cell>,
    frozen_until: Option<f64>,
    speed_multiplier: f64,
    #[serde(skip)]
    timing: AgentTiming,
}

impl Agent {
    pub fn new(position: Cell, now: f64, timing: AgentTiming) -> Self {
        Self {
            position,
            path: VecDeque::new(),
            last_recompute: now,
            last_move: now,
            last_target: None,
            frozen_until: None,
            speed_multiplier: 1.0,
            timing,
        }
    }

    pub fn with_speed_multiplier(mut self, multiplier: f64) -> Self {
        self.speed_multiplier = multiplier;
        self
    }

    pub fn position(&self) -> Cell {
        self.position
    }

    /// Cells still to walk, next step first.
    pub fn path(&self) -> impl ExactSizeIterator<Item = &Cell> {
        self.path.iter()
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    /// Moves the agent without walking, discarding its plan. Used when the
    /// maze is rebuilt underneath it.
    pub fn relocate(&mut self, cell: Cell) {
        self.position = cell;
        self.clear_path();
    }

    pub fn clear_path(&mut self) {
        self.path.clear();
    }

    /// Frozen from `now` for `duration` seconds. A later freeze replaces the
    /// earlier deadline rather than adding to it.
    pub fn freeze(&mut self, now: f64, duration: f64) {
        self.frozen_until = Some(now + duration);
    }

    pub fn is_frozen(&self, now: f64) -> bool {
        self.frozen_until.is_some_and(|until| now < until)
    }

    pub fn frozen_until(&self) -> Option<f64> {
        self.frozen_until
    }

    pub fn update_path(&mut self, grid: &Grid, target: Cell, now: f64) {
        if self.is_frozen(now) || !self.needs_recompute(target, now) {
            return;
        }

        let path = find_path(grid, self.position, target);
        if path.len() > 1 {
            self.path = path.into_iter().skip(1).collect();
            self.last_target = Some(target);
            self.last_recompute = now;
        } else if self.path.is_empty() {
            self.greedy_step(grid, target);
            self.last_target = Some(target);
            self.last_recompute = now;
        }
    }

    fn needs_recompute(&self, target: Cell, now: f64) -> bool {
        let Some(last_target) = self.last_target else {
            return true;
        };
        now - self.last_recompute >= self.timing.pathfind_interval
            || last_target.row.abs_diff(target.row) > 1
            || last_target.col.abs_diff(target.col) > 1
            || self.path.is_empty()
    }

    /// Single-cell plan toward `target` for when search comes back empty:
    /// the dominant axis first, then the first open direction.
    fn greedy_step(&mut self, grid: &Grid, target: Cell) {
        let d_row = target.row as isize - self.position.row as isize;
        let d_col = target.col as isize - self.position.col as isize;
        if d_row == 0 && d_col == 0 {
            return;
        }
        let preferred = if d_row.abs() > d_col.abs() {
            if d_row > 0 {
                Dir::Down
            } else {
                Dir::Up
            }
        } else if d_col > 0 {
            Dir::Right
        } else {
            Dir::Left
        };

        let open_step = |dir: Dir| grid.neighbor(self.position, dir).filter(|c| grid.is_open(*c));
        let next = open_step(preferred).or_else(|| Dir::ALL.into_iter().find_map(open_step));

        match next {
            Some(cell) => {
                debug!(from = ?self.position, to = ?cell, "agent falling back to greedy step");
                self.path = VecDeque::from([cell]);
            }
            None => debug!(at = ?self.position, "agent boxed in, staying put"),
        }
    }

    /// Takes one cached step if the step interval has elapsed. Returns
    /// whether the agent moved.
    pub fn update(&mut self, now: f64) -> bool {
        if self.is_frozen(now) {
            return false;
        }
        let interval = self.timing.step_interval / self.speed_multiplier;
        if now - self.last_move < interval {
            return false;
        }
        match self.path.pop_front() {
            Some(next) => {
                self.position = next;
                self.last_move = now;
                true
            }
            None => false,
        }
    }
}
