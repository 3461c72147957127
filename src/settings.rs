use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::collab::SettingsProvider;
use crate::error::{Error, Result};
use crate::speed::ProfileId;

pub const SETTINGS_PATH_ENV: &str = "SNAKE_GRACE_SETTINGS";
const MAX_NAME_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "enabled")]
    pub sound_enabled: bool,
    #[serde(default = "enabled")]
    pub haptics_enabled: bool,
    #[serde(default)]
    pub speed_profile: ProfileId,
    #[serde(default = "default_player_name")]
    pub player_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            version: default_version(),
            sound_enabled: true,
            haptics_enabled: true,
            speed_profile: ProfileId::default(),
            player_name: default_player_name(),
        }
    }
}

impl Settings {
    pub fn sanitized(mut self) -> Self {
        self.version = default_version();
        let name: String = self
            .player_name
            .trim()
            .chars()
            .filter(|c| !c.is_control())
            .take(MAX_NAME_LEN)
            .collect();
        let name = name.trim();
        self.player_name = if name.is_empty() {
            default_player_name()
        } else {
            name.to_string()
        };
        self
    }
}

fn default_version() -> u32 {
    1
}

fn enabled() -> bool {
    true
}

fn default_player_name() -> String {
    "Player".to_string()
}

/// Settings persisted as pretty JSON. A missing or unreadable file yields the
/// defaults.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonSettingsStore { path: path.into() }
    }

    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os(SETTINGS_PATH_ENV) {
            return Self::new(explicit);
        }
        Self::new(config_dir().join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        write_json(&self.path, settings)
    }
}

impl SettingsProvider for JsonSettingsStore {
    fn load(&self) -> Settings {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("could not read settings from {}: {}", self.path.display(), e);
                }
                return Settings::default();
            }
        };

        match serde_json::from_slice::<Settings>(&bytes) {
            Ok(settings) => {
                debug!("loaded settings from {}", self.path.display());
                settings.sanitized()
            }
            Err(e) => {
                warn!("ignoring malformed settings in {}: {}", self.path.display(), e);
                Settings::default()
            }
        }
    }
}

/// `$XDG_CONFIG_HOME/snake-grace`, falling back to `~/.config/snake-grace` and
/// finally the working directory.
pub fn config_dir() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|home| {
                let mut p = PathBuf::from(home);
                p.push(".config");
                p
            })
        })
        .map(|base| base.join("snake-grace"))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let io_err = |source| Error::Io { path: path.to_path_buf(), source };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let text = serde_json::to_string_pretty(value).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("snake-grace-settings-{}-{}", std::process::id(), name))
            .join("settings.json")
    }

    #[test]
    fn missing_file_gives_defaults() {
        let store = JsonSettingsStore::new(temp_path("missing"));
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn save_then_load() {
        let path = temp_path("roundtrip");
        let store = JsonSettingsStore::new(&path);
        let settings = Settings {
            sound_enabled: false,
            speed_profile: ProfileId::VeryFast,
            player_name: "ada".to_string(),
            ..Settings::default()
        };

        store.save(&settings).expect("save settings");
        assert_eq!(store.load(), settings);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let path = temp_path("malformed");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{ not json").unwrap();

        assert_eq!(JsonSettingsStore::new(&path).load(), Settings::default());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn serde_defaults_fill_missing_fields() {
        let parsed: Settings = serde_json::from_str(r#"{"speed_profile":"fast"}"#)
            .expect("settings JSON should parse");
        assert_eq!(parsed.speed_profile, ProfileId::Fast);
        assert!(parsed.sound_enabled);
        assert!(parsed.haptics_enabled);
        assert_eq!(parsed.player_name, "Player");
    }

    #[test]
    fn sanitized_trims_names() {
        let settings = Settings {
            version: 9,
            player_name: "  a-very-long-player-name-indeed \n".to_string(),
            ..Settings::default()
        }
        .sanitized();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.player_name, "a-very-long-play");

        let blank = Settings { player_name: " \t".to_string(), ..Settings::default() }.sanitized();
        assert_eq!(blank.player_name, "Player");
    }
}
