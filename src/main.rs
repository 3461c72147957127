mod app;
mod term;

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use simplelog::{Config, LevelFilter, WriteLogger};

use snake_grace::collab::SettingsProvider;
use snake_grace::game::{GameConfig, DEFAULT_HEIGHT, DEFAULT_WIDTH, MAX_GRID_SIDE};
use snake_grace::scores::JsonScoreStore;
use snake_grace::settings::JsonSettingsStore;
use snake_grace::speed::ProfileId;

#[derive(Parser)]
#[command(name = "snake-grace")]
#[command(version, about = "Snake with a forgiving grace period and a speed ramp")]
struct Cli {
    /// Grid width in cells
    #[arg(long, default_value_t = DEFAULT_WIDTH, value_parser = grid_side())]
    width: i32,

    /// Grid height in cells
    #[arg(long, default_value_t = DEFAULT_HEIGHT, value_parser = grid_side())]
    height: i32,

    /// Speed profile: 1-4 or slow, normal, fast, very-fast
    #[arg(long)]
    profile: Option<ProfileId>,

    /// Name recorded with your scores
    #[arg(long)]
    name: Option<String>,

    /// Silence the bell for this session
    #[arg(long)]
    no_sound: bool,

    /// Settings file (default: $XDG_CONFIG_HOME/snake-grace/settings.json)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Score file (default: $XDG_CONFIG_HOME/snake-grace/scores.json)
    #[arg(long)]
    scores: Option<PathBuf>,

    /// Where to write the log; the terminal itself is taken by the game
    #[arg(long, default_value = "snake-grace.log")]
    log_file: PathBuf,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn grid_side() -> clap::builder::RangedI64ValueParser<i32> {
    clap::value_parser!(i32).range(1..=i64::from(MAX_GRID_SIDE))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging before anything else
    let log_file = File::create(&cli.log_file)
        .with_context(|| format!("Failed to create log file {}", cli.log_file.display()))?;
    WriteLogger::init(cli.log_level, Config::default(), log_file).context("Failed to initialize logger")?;

    info!("starting snake-grace {}", env!("CARGO_PKG_VERSION"));

    let settings_store = cli.settings.map(JsonSettingsStore::new).unwrap_or_else(JsonSettingsStore::from_env);
    let scores = cli.scores.map(JsonScoreStore::new).unwrap_or_else(JsonScoreStore::from_env);

    info!(
        "settings in {}, scores in {}",
        settings_store.path().display(),
        scores.path().display()
    );

    let persisted = settings_store.load();
    let mut settings = persisted.clone();
    if let Some(profile) = cli.profile {
        settings.speed_profile = profile;
    }
    if let Some(name) = cli.name {
        settings.player_name = name;
    }
    if cli.no_sound {
        settings.sound_enabled = false;
    }
    let settings = settings.sanitized();

    let config = GameConfig::new(cli.width, cli.height);
    app::App::new(config, settings, persisted, settings_store, scores).run()
}
