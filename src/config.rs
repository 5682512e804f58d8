use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentTiming, DEFAULT_PATHFIND_INTERVAL, DEFAULT_STEP_INTERVAL};
use crate::error::{ConfigError, ConfigResult};
use crate::maze::DEFAULT_MAX_ATTEMPTS;
use crate::powerup::PowerUpParams;

pub const MIN_DIMENSION: usize = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Classic,
    Speed,
    Survival,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Classic => "classic",
            GameMode::Speed => "speed",
            GameMode::Survival => "survival",
        }
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classic" => Ok(GameMode::Classic),
            "speed" => Ok(GameMode::Speed),
            "survival" => Ok(GameMode::Survival),
            other => Err(format!("unknown game mode `{other}`")),
        }
    }
}

/// Tuning for one game session. Every field has a default, so a TOML file
/// only needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub height: usize,
    pub width: usize,
    pub wall_density: f64,
    pub max_maze_attempts: u32,

    /// Cells per step the player's sub-position travels.
    pub player_speed: f64,
    pub arrive_epsilon: f64,
    pub starting_lives: u32,

    pub agent_count: usize,
    pub agent_step_interval: f64,
    pub agent_pathfind_interval: f64,
    pub agent_speed_multiplier: f64,

    pub spawn_chance: f64,
    pub spawn_check_interval: f64,
    pub max_power_ups: usize,
    pub power_up_lifetime: f64,
    pub effect_duration: f64,
    pub power_up_cost: i64,

    pub score_per_interval: i64,
    pub score_interval: f64,
    pub win_bonus: i64,
    pub lose_penalty: i64,

    /// Steps per second the front end drives; also scales the HUD countdowns.
    pub frame_rate: u32,
    pub resize_threshold: usize,
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            height: 21,
            width: 31,
            wall_density: 0.25,
            max_maze_attempts: DEFAULT_MAX_ATTEMPTS,
            player_speed: 0.04,
            arrive_epsilon: 0.05,
            starting_lives: 2,
            agent_count: 1,
            agent_step_interval: DEFAULT_STEP_INTERVAL,
            agent_pathfind_interval: DEFAULT_PATHFIND_INTERVAL,
            agent_speed_multiplier: 1.0,
            spawn_chance: 0.02,
            spawn_check_interval: 1.0,
            max_power_ups: 3,
            power_up_lifetime: 15.0,
            effect_duration: 3.0,
            power_up_cost: 10,
            score_per_interval: 10,
            score_interval: 1.0,
            win_bonus: 100,
            lose_penalty: 20,
            frame_rate: 60,
            resize_threshold: 2,
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: GameConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Applies `MAZE_CHASE_FPS` and `MAZE_CHASE_SEED`. Unparsable or zero
    /// values are ignored.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(fps) = lookup("MAZE_CHASE_FPS")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0)
        {
            self.frame_rate = fps;
        }
        if let Some(seed) = lookup("MAZE_CHASE_SEED").and_then(|v| v.parse::<u64>().ok()) {
            self.seed = Some(seed);
        }
    }

    /// Mode-specific overrides on top of this config.
    pub fn for_mode(&self, mode: GameMode) -> Self {
        let mut config = self.clone();
        match mode {
            GameMode::Classic => {}
            GameMode::Speed => config.agent_speed_multiplier *= 1.5,
            GameMode::Survival => config.starting_lives = 3,
        }
        config
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.height < 5 || self.width < 5 {
            return Err(invalid("height/width", "grid must be at least 5x5"));
        }
        if !(0.0..0.5).contains(&self.wall_density) {
            return Err(invalid("wall_density", "must be in [0, 0.5)"));
        }
        let positive = [
            ("player_speed", self.player_speed),
            ("arrive_epsilon", self.arrive_epsilon),
            ("agent_step_interval", self.agent_step_interval),
            ("agent_pathfind_interval", self.agent_pathfind_interval),
            ("agent_speed_multiplier", self.agent_speed_multiplier),
            ("spawn_check_interval", self.spawn_check_interval),
            ("score_interval", self.score_interval),
        ];
        for (field, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(invalid(field, "must be a positive number"));
            }
        }
        if !(0.0..=1.0).contains(&self.spawn_chance) {
            return Err(invalid("spawn_chance", "must be in [0, 1]"));
        }
        if self.frame_rate == 0 {
            return Err(invalid("frame_rate", "must be positive"));
        }
        Ok(())
    }

    pub fn agent_timing(&self) -> AgentTiming {
        AgentTiming {
            step_interval: self.agent_step_interval,
            pathfind_interval: self.agent_pathfind_interval,
        }
    }

    pub fn power_up_params(&self) -> PowerUpParams {
        PowerUpParams {
            lifetime: self.power_up_lifetime,
            effect_duration: self.effect_duration,
            max_live: self.max_power_ups,
            display_fps: self.frame_rate,
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
