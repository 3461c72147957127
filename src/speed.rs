//! Difficulty profiles.
//!
//! A profile is a base tick interval and grace period plus an ordered list of
//! phases. The session's score picks the phase; each time the phase index
//! moves forward, the phase's deltas shorten the interval and the grace
//! period, never below the profile's floors.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One score band. The band is left once `score >= threshold * 10`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Phase {
    pub threshold: u32,
    pub speed_delta_ms: u64,
    pub grace_delta_ms: u64,
}

const fn phase(threshold: u32, speed_delta_ms: u64, grace_delta_ms: u64) -> Phase {
    Phase { threshold, speed_delta_ms, grace_delta_ms }
}

/// Last-phase threshold; no reachable score leaves it.
pub const CEILING: u32 = u32::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedProfile {
    pub id: ProfileId,
    pub base_speed_ms: u64,
    pub min_speed_ms: u64,
    pub base_grace_ms: u64,
    pub min_grace_ms: u64,
    pub phases: &'static [Phase],
}

static SLOW_PHASES: [Phase; 6] = [
    phase(15, 0, 0),
    phase(30, 15, 30),
    phase(50, 15, 40),
    phase(75, 20, 50),
    phase(105, 20, 60),
    phase(CEILING, 25, 70),
];

static NORMAL_PHASES: [Phase; 7] = [
    phase(12, 0, 0),
    phase(25, 12, 30),
    phase(40, 12, 40),
    phase(60, 14, 40),
    phase(85, 16, 50),
    phase(115, 18, 50),
    phase(CEILING, 20, 60),
];

static FAST_PHASES: [Phase; 8] = [
    phase(10, 0, 0),
    phase(20, 10, 25),
    phase(35, 10, 30),
    phase(50, 10, 35),
    phase(70, 12, 35),
    phase(95, 12, 40),
    phase(125, 14, 40),
    phase(CEILING, 15, 45),
];

static VERY_FAST_PHASES: [Phase; 9] = [
    phase(8, 0, 0),
    phase(16, 6, 20),
    phase(28, 6, 20),
    phase(42, 8, 25),
    phase(60, 8, 25),
    phase(80, 10, 30),
    phase(105, 10, 30),
    phase(135, 12, 35),
    phase(CEILING, 12, 35),
];

static PROFILES: [SpeedProfile; 4] = [
    SpeedProfile {
        id: ProfileId::Slow,
        base_speed_ms: 220,
        min_speed_ms: 110,
        base_grace_ms: 600,
        min_grace_ms: 350,
        phases: &SLOW_PHASES,
    },
    SpeedProfile {
        id: ProfileId::Normal,
        base_speed_ms: 160,
        min_speed_ms: 80,
        base_grace_ms: 500,
        min_grace_ms: 280,
        phases: &NORMAL_PHASES,
    },
    SpeedProfile {
        id: ProfileId::Fast,
        base_speed_ms: 120,
        min_speed_ms: 60,
        base_grace_ms: 420,
        min_grace_ms: 220,
        phases: &FAST_PHASES,
    },
    SpeedProfile {
        id: ProfileId::VeryFast,
        base_speed_ms: 90,
        min_speed_ms: 45,
        base_grace_ms: 350,
        min_grace_ms: 180,
        phases: &VERY_FAST_PHASES,
    },
];

impl SpeedProfile {
    pub fn get(id: ProfileId) -> &'static SpeedProfile {
        &PROFILES[id.index() as usize - 1]
    }

    pub fn all() -> &'static [SpeedProfile] {
        &PROFILES
    }

    pub fn base_speed(&self) -> Duration {
        Duration::from_millis(self.base_speed_ms)
    }

    pub fn base_grace(&self) -> Duration {
        Duration::from_millis(self.base_grace_ms)
    }

    /// Index of the first phase whose `threshold * 10` exceeds `score`, or
    /// the last phase when none does.
    pub fn phase_for_score(&self, score: u32) -> usize {
        self.phases
            .iter()
            .position(|p| u64::from(p.threshold) * 10 > u64::from(score))
            .unwrap_or(self.phases.len() - 1)
    }
}

/// User-selectable difficulty preset, numbered 1 to 4 in menus.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileId {
    Slow,
    #[default]
    Normal,
    Fast,
    VeryFast,
}

impl ProfileId {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(ProfileId::Slow),
            2 => Some(ProfileId::Normal),
            3 => Some(ProfileId::Fast),
            4 => Some(ProfileId::VeryFast),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            ProfileId::Slow => 1,
            ProfileId::Normal => 2,
            ProfileId::Fast => 3,
            ProfileId::VeryFast => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProfileId::Slow => "Slow",
            ProfileId::Normal => "Normal",
            ProfileId::Fast => "Fast",
            ProfileId::VeryFast => "Very Fast",
        }
    }

    pub fn profile(self) -> &'static SpeedProfile {
        SpeedProfile::get(self)
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts the menu number (`"2"`) or the name (`"normal"`, `"very-fast"`).
impl FromStr for ProfileId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        let parsed = match key.as_str() {
            "slow" => Some(ProfileId::Slow),
            "normal" => Some(ProfileId::Normal),
            "fast" => Some(ProfileId::Fast),
            "veryfast" => Some(ProfileId::VeryFast),
            other => other.parse::<u8>().ok().and_then(ProfileId::from_index),
        };
        parsed.ok_or_else(|| Error::UnknownProfile(s.to_string()))
    }
}

/// Emitted when the phase index moves forward.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: usize,
    pub to: usize,
    pub interval: Duration,
    pub grace: Duration,
}

/// Per-run difficulty state. The phase index only ever increases until
/// `reset`.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    profile: &'static SpeedProfile,
    phase: usize,
    interval_ms: u64,
    grace_ms: u64,
}

impl PhaseTracker {
    pub fn new(id: ProfileId) -> Self {
        let profile = SpeedProfile::get(id);
        PhaseTracker {
            profile,
            phase: 0,
            interval_ms: profile.base_speed_ms,
            grace_ms: profile.base_grace_ms,
        }
    }

    pub fn reset(&mut self) {
        *self = PhaseTracker::new(self.profile.id);
    }

    pub fn profile(&self) -> &'static SpeedProfile {
        self.profile
    }

    pub fn phase(&self) -> usize {
        self.phase
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    /// Moves to the phase `score` falls in, if that is further along. Each
    /// phase passed on the way applies its own deltas.
    pub fn update(&mut self, score: u32) -> Option<PhaseChange> {
        let target = self.profile.phase_for_score(score);
        if target <= self.phase {
            return None;
        }

        let from = self.phase;
        for p in &self.profile.phases[from + 1..=target] {
            self.interval_ms = self
                .interval_ms
                .saturating_sub(p.speed_delta_ms)
                .max(self.profile.min_speed_ms);
            self.grace_ms = self
                .grace_ms
                .saturating_sub(p.grace_delta_ms)
                .max(self.profile.min_grace_ms);
        }
        self.phase = target;

        Some(PhaseChange {
            from,
            to: target,
            interval: self.interval(),
            grace: self.grace(),
        })
    }
}
