//! Score records and the stores that keep them.
//!
//! The leaderboard keeps one entry per user, that user's best game, where
//! "best" means a win beats a loss and a longer survival beats a shorter
//! one. Entries are ranked by the same order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GameMode;
use crate::error::{StoreError, StoreResult};
use crate::game::Outcome;

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 50;
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Win,
    Lose,
}

impl GameResult {
    pub fn from_outcome(outcome: Outcome) -> Option<Self> {
        match outcome {
            Outcome::Win => Some(GameResult::Win),
            Outcome::Lose => Some(GameResult::Lose),
            Outcome::Playing => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub user_id: String,
    pub username: String,
    pub score: u64,
    pub result: GameResult,
    pub survival_time: f64,
    #[serde(default)]
    pub mode: GameMode,
    pub timestamp: DateTime<Utc>,
}

impl ScoreRecord {
    /// Record for a finished game. Negative simulation scores are stored
    /// as zero.
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        score: i64,
        result: GameResult,
        survival_time: f64,
        mode: GameMode,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            score: score.max(0) as u64,
            result,
            survival_time,
            mode,
            timestamp: Utc::now(),
        }
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.user_id.trim().is_empty() || self.username.trim().is_empty() {
            return Err(invalid("user id and username are required"));
        }
        if !self.survival_time.is_finite() || self.survival_time < 0.0 {
            return Err(invalid("survival time must be a non-negative number"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> StoreError {
    StoreError::InvalidRecord {
        reason: reason.to_string(),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UserStats {
    pub total_games: u32,
    pub total_wins: u32,
    /// Shortest survival time among wins.
    pub best_win_time: Option<f64>,
    pub best_survival_time: f64,
}

/// Persistence for finished games.
pub trait ScoreStore {
    fn save(&mut self, record: ScoreRecord) -> StoreResult<()>;

    fn records(&self) -> StoreResult<Vec<ScoreRecord>>;

    fn leaderboard(&self, limit: usize) -> StoreResult<Vec<ScoreRecord>> {
        Ok(rank_leaderboard(self.records()?, limit))
    }

    /// Most recent games first.
    fn user_scores(&self, user_id: &str, limit: usize) -> StoreResult<Vec<ScoreRecord>> {
        let mut scores: Vec<_> = self
            .records()?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect();
        scores.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        scores.truncate(limit);
        Ok(scores)
    }

    fn best_for(&self, user_id: &str) -> StoreResult<Option<ScoreRecord>> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .min_by(rank_order))
    }

    fn user_stats(&self, user_id: &str) -> StoreResult<UserStats> {
        let mut stats = UserStats::default();
        for record in self.records()?.iter().filter(|r| r.user_id == user_id) {
            stats.total_games += 1;
            if record.result == GameResult::Win {
                stats.total_wins += 1;
                stats.best_win_time = Some(match stats.best_win_time {
                    Some(best) => best.min(record.survival_time),
                    None => record.survival_time,
                });
            }
            stats.best_survival_time = stats.best_survival_time.max(record.survival_time);
        }
        Ok(stats)
    }
}

/// Wins before losses, then longer survival first.
fn rank_order(a: &ScoreRecord, b: &ScoreRecord) -> Ordering {
    let result_rank = |r: &ScoreRecord| match r.result {
        GameResult::Win => 0,
        GameResult::Lose => 1,
    };
    result_rank(a)
        .cmp(&result_rank(b))
        .then_with(|| b.survival_time.total_cmp(&a.survival_time))
}

/// Best record per user, ranked, at most `limit` entries.
pub fn rank_leaderboard(records: Vec<ScoreRecord>, limit: usize) -> Vec<ScoreRecord> {
    let mut best: HashMap<String, ScoreRecord> = HashMap::new();
    for record in records {
        match best.get(&record.user_id) {
            Some(current) if rank_order(current, &record) != Ordering::Greater => {}
            _ => {
                best.insert(record.user_id.clone(), record);
            }
        }
    }
    let mut ranked: Vec<_> = best.into_values().collect();
    ranked.sort_by(|a, b| rank_order(a, b).then_with(|| a.user_id.cmp(&b.user_id)));
    ranked.truncate(limit);
    ranked
}

#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    records: Vec<ScoreRecord>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryScoreStore {
    fn save(&mut self, record: ScoreRecord) -> StoreResult<()> {
        record.validate()?;
        self.records.push(record);
        Ok(())
    }

    fn records(&self) -> StoreResult<Vec<ScoreRecord>> {
        Ok(self.records.clone())
    }
}

/// Appends one JSON object per line. A missing file reads as empty.
#[derive(Debug)]
pub struct JsonlScoreStore {
    path: PathBuf,
}

impl JsonlScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScoreStore for JsonlScoreStore {
    fn save(&mut self, record: ScoreRecord) -> StoreResult<()> {
        record.validate()?;
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        debug!(path = %self.path.display(), user = %record.user_id, "score saved");
        Ok(())
    }

    fn records(&self) -> StoreResult<Vec<ScoreRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}
