//! Boundaries between the game loop and the outside world.
//!
//! The loop owns one of each and calls into them; none of them may call back
//! into the loop or block it.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::settings::Settings;
use crate::snake::{Cell, Direction};
use crate::speed::ProfileId;

/// Which feedback channels an effect should use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cue {
    pub sound: bool,
    pub haptic: bool,
}

/// Fire-and-forget sound, haptic and visual notifications.
pub trait Effects {
    fn on_eat(&mut self, cue: Cue);
    fn on_collision(&mut self, cue: Cue);
    fn on_game_over(&mut self, cue: Cue);
    fn on_new_record(&mut self, cue: Cue);
}

/// Score persistence. Callers treat every error as best-effort.
pub trait ScoreStore {
    fn high_score(&mut self) -> Result<u32>;
    fn save_score(&mut self, score: u32, name: &str, profile: ProfileId) -> Result<()>;
    fn save_high_score(&mut self, score: u32) -> Result<()>;
}

pub trait SettingsProvider {
    fn load(&self) -> Settings;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Countdown { remaining: u8 },
    Running { grace: bool },
    Paused { grace: bool },
    GameOver { won: bool },
}

/// Everything a presenter needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub snake: &'a [Cell],
    pub food: Option<Cell>,
    pub direction: Direction,
    pub width: i32,
    pub height: i32,
    pub score: u32,
    pub high_score: u32,
    pub profile: ProfileId,
    pub phase: usize,
    pub status: Status,
}

pub trait Presenter {
    fn render(&mut self, frame: &Frame<'_>);
}

/// Effects sink for headless runs.
#[derive(Debug, Default, Copy, Clone)]
pub struct Silent;

impl Effects for Silent {
    fn on_eat(&mut self, _cue: Cue) {}
    fn on_collision(&mut self, _cue: Cue) {}
    fn on_game_over(&mut self, _cue: Cue) {}
    fn on_new_record(&mut self, _cue: Cue) {}
}

impl Presenter for Silent {
    fn render(&mut self, _frame: &Frame<'_>) {}
}

/// Score store that forgets everything when dropped.
#[derive(Debug, Default, Clone)]
pub struct MemoryScores {
    pub high: u32,
    pub history: Vec<(u32, String, ProfileId)>,
}

impl ScoreStore for MemoryScores {
    fn high_score(&mut self) -> Result<u32> {
        Ok(self.high)
    }

    fn save_score(&mut self, score: u32, name: &str, profile: ProfileId) -> Result<()> {
        self.history.push((score, name.to_string(), profile));
        Ok(())
    }

    fn save_high_score(&mut self, score: u32) -> Result<()> {
        self.high = self.high.max(score);
        Ok(())
    }
}

/// Fixed settings, for when nothing is persisted.
impl SettingsProvider for Settings {
    fn load(&self) -> Settings {
        self.clone()
    }
}
