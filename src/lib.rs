//! Maze-chase game core: a randomly walled maze, pursuers that replan with
//! A*, timed power-ups, and a step-driven simulation that ends in a win or
//! a loss.

pub mod agent;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod game;
pub mod grid;
pub mod maze;
pub mod pathfinding;
pub mod powerup;
pub mod scores;
pub mod session;

pub use config::{GameConfig, GameMode};
pub use event::Event;
pub use game::{Outcome, Simulation, Snapshot};
pub use grid::{Cell, Dir, Grid, Tile};
