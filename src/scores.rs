use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::collab::ScoreStore;
use crate::error::{Error, Result};
use crate::settings::{config_dir, write_json};
use crate::speed::ProfileId;

pub const SCORES_PATH_ENV: &str = "SNAKE_GRACE_SCORES";
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub name: String,
    pub score: u32,
    pub profile: ProfileId,
    /// Seconds since the Unix epoch.
    pub recorded_at: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBook {
    #[serde(default)]
    pub high_score: u32,
    #[serde(default)]
    pub history: Vec<ScoreRecord>,
}

impl ScoreBook {
    /// Best `n` entries, highest first; ties keep the older entry first.
    pub fn top(&self, n: usize) -> Vec<&ScoreRecord> {
        let mut ranked: Vec<&ScoreRecord> = self.history.iter().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score).then(a.recorded_at.cmp(&b.recorded_at)));
        ranked.truncate(n);
        ranked
    }

    fn push(&mut self, record: ScoreRecord) {
        self.history.push(record);
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }
}

/// High score plus the most recent runs, kept in one JSON file. Every write
/// re-reads the file so two sessions do not clobber each other's history.
#[derive(Debug, Clone)]
pub struct JsonScoreStore {
    path: PathBuf,
}

impl JsonScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonScoreStore { path: path.into() }
    }

    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os(SCORES_PATH_ENV) {
            return Self::new(explicit);
        }
        Self::new(config_dir().join("scores.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<ScoreBook> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ScoreBook::default()),
            Err(source) => return Err(Error::Io { path: self.path.clone(), source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| Error::Json {
            path: self.path.clone(),
            source,
        })
    }

    pub fn history(&self) -> Result<Vec<ScoreRecord>> {
        Ok(self.read()?.history)
    }

    fn update(&self, f: impl FnOnce(&mut ScoreBook)) -> Result<()> {
        let mut book = self.read()?;
        f(&mut book);
        write_json(&self.path, &book)?;
        debug!("wrote scores to {}", self.path.display());
        Ok(())
    }
}

impl ScoreStore for JsonScoreStore {
    fn high_score(&mut self) -> Result<u32> {
        Ok(self.read()?.high_score)
    }

    fn save_score(&mut self, score: u32, name: &str, profile: ProfileId) -> Result<()> {
        let record = ScoreRecord {
            name: name.to_string(),
            score,
            profile,
            recorded_at: unix_now(),
        };
        self.update(|book| book.push(record))
    }

    fn save_high_score(&mut self, score: u32) -> Result<()> {
        self.update(|book| book.high_score = book.high_score.max(score))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("snake-grace-scores-{}-{}", std::process::id(), name))
            .join("scores.json")
    }

    fn cleanup(path: &Path) {
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn empty_store_reports_zero() {
        let mut store = JsonScoreStore::new(temp_path("empty"));
        assert_eq!(store.high_score().unwrap(), 0);
        assert!(store.history().unwrap().is_empty());
    }

    #[test]
    fn high_score_only_goes_up() {
        let path = temp_path("high");
        let mut store = JsonScoreStore::new(&path);

        store.save_high_score(120).unwrap();
        store.save_high_score(80).unwrap();
        assert_eq!(store.high_score().unwrap(), 120);

        cleanup(&path);
    }

    #[test]
    fn history_is_capped_and_ranked() {
        let path = temp_path("history");
        let mut store = JsonScoreStore::new(&path);

        for i in 0..(HISTORY_LIMIT as u32 + 5) {
            store.save_score(i * 10, "p", ProfileId::Normal).unwrap();
        }

        let book = store.read().unwrap();
        assert_eq!(book.history.len(), HISTORY_LIMIT);
        assert_eq!(book.history[0].score, 50);

        let top = book.top(3);
        let scores: Vec<u32> = top.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![540, 530, 520]);

        cleanup(&path);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"[1,2").unwrap();

        let mut store = JsonScoreStore::new(&path);
        assert!(matches!(store.high_score(), Err(Error::Json { .. })));

        cleanup(&path);
    }
}
