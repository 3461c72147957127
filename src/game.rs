//! The tick-driven game loop.
//!
//! `Game` owns every piece of session state and is the only thing that
//! mutates it. Input arrives as `Command`s applied between ticks; ticks come
//! from the internal `TickTimer`, polled by the driver through `advance`.
//!
//! A run goes Countdown -> Running -> GameOver. While running, a detected
//! collision does not end the run straight away: it opens a grace period in
//! which the snake holds still and the player may steer out. Paused can be
//! entered from Running (in or out of grace) and returns to the same place.

use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::collab::{Cue, Effects, Frame, MemoryScores, Presenter, ScoreStore, SettingsProvider, Silent, Status};
use crate::collision;
use crate::error::{Error, Result};
use crate::food::{FoodSpawner, RandomSpawner};
use crate::settings::Settings;
use crate::snake::{Cell, Direction, Snake};
use crate::speed::{PhaseTracker, ProfileId};
use crate::timer::TickTimer;

pub const DEFAULT_WIDTH: i32 = 27;
pub const DEFAULT_HEIGHT: i32 = 42;
pub const FOOD_SCORE: u32 = 10;
pub const COUNTDOWN_STEPS: u8 = 3;
pub const COUNTDOWN_STEP: Duration = Duration::from_secs(1);
/// Longest grid side accepted; keeps the board drawable and food placement
/// cheap.
pub const MAX_GRID_SIDE: i32 = 1024;
const INITIAL_SNAKE_LENGTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub width: i32,
    pub height: i32,
    pub initial_length: usize,
    pub food_score: u32,
    pub countdown_steps: u8,
    pub countdown_step: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            initial_length: INITIAL_SNAKE_LENGTH,
            food_score: FOOD_SCORE,
            countdown_steps: COUNTDOWN_STEPS,
            countdown_step: COUNTDOWN_STEP,
        }
    }
}

impl GameConfig {
    pub fn new(width: i32, height: i32) -> Self {
        GameConfig { width, height, ..Default::default() }
    }

    /// The starting snake lies left of the grid centre and there has to be
    /// room for at least one piece of food.
    pub fn validate(&self) -> Result<()> {
        if self.width > MAX_GRID_SIDE || self.height > MAX_GRID_SIDE {
            return Err(Error::GridTooLarge { width: self.width, height: self.height, max: MAX_GRID_SIDE });
        }

        let length = self.initial_length.max(1);
        let fits = self.width > 0
            && self.height > 0
            && (self.width / 2) as usize + 1 >= length
            && (self.width as usize) * (self.height as usize) > length;
        if fits {
            Ok(())
        } else {
            Err(Error::GridTooSmall { width: self.width, height: self.height, length })
        }
    }

    fn start_cell(&self) -> Cell {
        Cell::new(self.width / 2, self.height / 2)
    }
}

/// Input into the state machine. Requests that make no sense in the current
/// state are dropped without complaint.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    Direction(Direction),
    Pause,
    Resume,
    TogglePause,
    Restart,
}

/// What a single tick did.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; nothing happened.
    Idle,
    Moved,
    Ate,
    /// A collision was detected and the grace period began.
    GraceStarted,
    /// Inside the grace period; the direction was updated, the snake held.
    Steering,
    GameOver,
    /// The board filled up.
    Won,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RunState {
    Countdown { remaining: u8 },
    Running,
    Paused { since: Instant },
    GameOver { won: bool },
}

/// The outside world, as seen by the game loop.
pub struct Collaborators {
    pub effects: Box<dyn Effects>,
    pub scores: Box<dyn ScoreStore>,
    pub presenter: Box<dyn Presenter>,
    pub spawner: Box<dyn FoodSpawner>,
    pub clock: Box<dyn Clock>,
}

impl Collaborators {
    /// No output, in-memory scores, random food, real time.
    pub fn headless() -> Self {
        Collaborators {
            effects: Box::new(Silent),
            scores: Box::new(MemoryScores::default()),
            presenter: Box::new(Silent),
            spawner: Box::new(RandomSpawner::new()),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_effects(mut self, effects: impl Effects + 'static) -> Self {
        self.effects = Box::new(effects);
        self
    }

    pub fn with_scores(mut self, scores: impl ScoreStore + 'static) -> Self {
        self.scores = Box::new(scores);
        self
    }

    pub fn with_presenter(mut self, presenter: impl Presenter + 'static) -> Self {
        self.presenter = Box::new(presenter);
        self
    }

    pub fn with_spawner(mut self, spawner: impl FoodSpawner + 'static) -> Self {
        self.spawner = Box::new(spawner);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }
}

/// Serializable view of the session, for debugging and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub snake: Vec<Cell>,
    pub food: Option<Cell>,
    pub score: u32,
    pub high_score: u32,
    pub profile: ProfileId,
    pub phase: usize,
    #[serde(with = "crate::serde_duration")]
    pub interval: Duration,
    #[serde(with = "crate::serde_duration")]
    pub grace: Duration,
    pub direction: Direction,
    pub next_direction: Direction,
    pub status: Status,
}

pub struct Game {
    config: GameConfig,
    settings: Settings,
    collab: Collaborators,
    timer: TickTimer,
    state: RunState,
    snake: Snake,
    food: Option<Cell>,
    score: u32,
    high_score: u32,
    record_announced: bool,
    speed: PhaseTracker,
    direction: Direction,
    next_direction: Direction,
    grace_started: Option<Instant>,
}

impl Game {
    /// Reads the settings once and starts the first run's countdown.
    pub fn new(config: GameConfig, settings: &dyn SettingsProvider, collab: Collaborators) -> Result<Self> {
        config.validate()?;
        let settings = settings.load();

        let mut game = Game {
            snake: Snake::new(config.start_cell(), Direction::Right, config.initial_length),
            speed: PhaseTracker::new(settings.speed_profile),
            config,
            settings,
            collab,
            timer: TickTimer::new(),
            state: RunState::GameOver { won: false },
            food: None,
            score: 0,
            high_score: 0,
            record_announced: false,
            direction: Direction::Right,
            next_direction: Direction::Right,
            grace_started: None,
        };
        game.start_run();
        Ok(game)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    pub fn food(&self) -> Option<Cell> {
        self.food
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn phase(&self) -> usize {
        self.speed.phase()
    }

    pub fn profile(&self) -> ProfileId {
        self.speed.profile().id
    }

    pub fn tick_interval(&self) -> Duration {
        self.speed.interval()
    }

    pub fn grace_duration(&self) -> Duration {
        self.speed.grace()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn next_direction(&self) -> Direction {
        self.next_direction
    }

    pub fn in_grace(&self) -> bool {
        self.grace_started.is_some()
    }

    pub fn timer(&self) -> &TickTimer {
        &self.timer
    }

    pub fn status(&self) -> Status {
        let grace = self.in_grace();
        match self.state {
            RunState::Countdown { remaining } => Status::Countdown { remaining },
            RunState::Running => Status::Running { grace },
            RunState::Paused { .. } => Status::Paused { grace },
            RunState::GameOver { won } => Status::GameOver { won },
        }
    }

    pub fn is_over(&self) -> bool {
        matches!(self.state, RunState::GameOver { .. })
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            snake: self.snake.body().to_vec(),
            food: self.food,
            score: self.score,
            high_score: self.high_score,
            profile: self.profile(),
            phase: self.phase(),
            interval: self.tick_interval(),
            grace: self.grace_duration(),
            direction: self.direction,
            next_direction: self.next_direction,
            status: self.status(),
        }
    }

    ///////////////////////////////////////////////////////////////////////////
    // Settings toggles

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.settings.sound_enabled = enabled;
    }

    pub fn set_haptics_enabled(&mut self, enabled: bool) {
        self.settings.haptics_enabled = enabled;
    }

    /// The profile in play is fixed for a run; the choice applies from the
    /// next restart.
    pub fn select_profile(&mut self, profile: ProfileId) {
        self.settings.speed_profile = profile;
    }

    ///////////////////////////////////////////////////////////////////////////
    // Input

    pub fn handle(&mut self, command: Command) {
        match command {
            Command::Direction(d) => self.request_direction(d),
            Command::Pause => self.request_pause(),
            Command::Resume => self.request_resume(),
            Command::TogglePause => {
                if matches!(self.state, RunState::Paused { .. }) {
                    self.request_resume()
                } else {
                    self.request_pause()
                }
            }
            Command::Restart => self.request_restart(),
        }
    }

    /// Buffers `direction` for the next tick. Reversing into the neck is
    /// refused here rather than at move time.
    pub fn request_direction(&mut self, direction: Direction) {
        match self.state {
            RunState::Countdown { .. } | RunState::Running => {}
            _ => {
                trace!("direction {:?} ignored while {:?}", direction, self.status());
                return;
            }
        }

        if direction.is_opposite(self.direction) {
            trace!("reverse direction {:?} refused", direction);
            return;
        }
        self.next_direction = direction;
    }

    pub fn request_pause(&mut self) {
        if self.state != RunState::Running {
            trace!("pause ignored while {:?}", self.status());
            return;
        }

        self.timer.cancel();
        self.state = RunState::Paused { since: self.collab.clock.now() };
        debug!("paused (grace active: {})", self.in_grace());
        self.render();
    }

    pub fn request_resume(&mut self) {
        let RunState::Paused { since } = self.state else {
            trace!("resume ignored while {:?}", self.status());
            return;
        };

        let now = self.collab.clock.now();
        // Time spent paused does not count towards the grace period.
        if let Some(start) = self.grace_started.as_mut() {
            *start += now.saturating_duration_since(since);
        }
        self.state = RunState::Running;
        self.timer.arm(self.speed.interval(), now);
        debug!("resumed");
        self.render();
    }

    pub fn request_restart(&mut self) {
        self.start_run();
    }

    ///////////////////////////////////////////////////////////////////////////
    // Time

    /// Delivers a due tick, if any. Returns what the tick did.
    pub fn advance(&mut self) -> Option<TickOutcome> {
        let now = self.collab.clock.now();
        self.timer.poll(now)?;
        Some(self.on_timer())
    }

    /// How long the driver may wait before calling `advance` again.
    pub fn until_next_tick(&self) -> Option<Duration> {
        self.timer.until_next(self.collab.clock.now())
    }

    fn on_timer(&mut self) -> TickOutcome {
        match self.state {
            RunState::Countdown { remaining } => {
                self.countdown_step(remaining);
                TickOutcome::Idle
            }
            RunState::Running => self.tick(),
            _ => TickOutcome::Idle,
        }
    }

    fn countdown_step(&mut self, remaining: u8) {
        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            self.state = RunState::Countdown { remaining };
            self.render();
            return;
        }

        let now = self.collab.clock.now();
        self.state = RunState::Running;
        self.timer.arm(self.speed.interval(), now);
        debug!("countdown over, ticking every {:?}", self.speed.interval());
        self.render();
    }

    /// One simulation step. Does nothing unless the run is in progress.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != RunState::Running {
            return TickOutcome::Idle;
        }
        let now = self.collab.clock.now();

        if let Some(start) = self.grace_started {
            if now.saturating_duration_since(start) < self.speed.grace() {
                self.direction = self.next_direction;
                return TickOutcome::Steering;
            }

            if let Some(kind) = self.collision_ahead(self.direction) {
                info!("grace period ran out facing {:?} ({:?})", self.direction, kind);
                self.finish(false);
                return TickOutcome::GameOver;
            }
            debug!("steered clear during grace period");
            self.grace_started = None;
        }

        self.direction = self.next_direction;

        if let Some(kind) = self.collision_ahead(self.direction) {
            debug!("{:?} collision heading {:?}, grace period starts", kind, self.direction);
            self.grace_started = Some(now);
            let cue = self.cue();
            self.collab.effects.on_collision(cue);
            self.render();
            return TickOutcome::GraceStarted;
        }

        let eats = self.food == Some(self.snake.head().step(self.direction));
        if eats {
            self.snake.grow();
        }
        self.snake.move_to(self.direction);

        let outcome = if eats { self.eat(now) } else { TickOutcome::Moved };
        if outcome != TickOutcome::Won {
            self.render();
        }
        outcome
    }

    ///////////////////////////////////////////////////////////////////////////

    fn start_run(&mut self) {
        let now = self.collab.clock.now();
        self.timer.cancel();

        self.speed = PhaseTracker::new(self.settings.speed_profile);
        self.snake = Snake::new(self.config.start_cell(), Direction::Right, self.config.initial_length);
        self.direction = Direction::Right;
        self.next_direction = Direction::Right;
        self.grace_started = None;
        self.score = 0;
        self.record_announced = false;

        match self.collab.scores.high_score() {
            Ok(stored) => self.high_score = self.high_score.max(stored),
            Err(e) => warn!("could not read high score: {}", e),
        }

        self.food = self.spawn_food();
        if self.food.is_none() {
            // validate() rules this out for real grids
            self.finish(true);
            return;
        }

        info!(
            "new run on {}x{} grid, profile {}, high score {}",
            self.config.width,
            self.config.height,
            self.profile(),
            self.high_score
        );

        if self.config.countdown_steps == 0 {
            self.state = RunState::Running;
            self.timer.arm(self.speed.interval(), now);
        } else {
            self.state = RunState::Countdown { remaining: self.config.countdown_steps };
            self.timer.arm(self.config.countdown_step, now);
        }
        self.render();
    }

    fn eat(&mut self, now: Instant) -> TickOutcome {
        self.score += self.config.food_score;
        let cue = self.cue();

        if let Some(change) = self.speed.update(self.score) {
            info!(
                "phase {} -> {} at score {}: tick {:?}, grace {:?}",
                change.from, change.to, self.score, change.interval, change.grace
            );
            self.timer.cancel();
            self.timer.arm(change.interval, now);
        }

        self.collab.effects.on_eat(cue);
        if !self.record_announced && self.score > self.high_score {
            self.record_announced = true;
            self.collab.effects.on_new_record(cue);
        }

        self.food = self.spawn_food();
        if self.food.is_none() {
            info!("board full at score {}", self.score);
            self.finish(true);
            return TickOutcome::Won;
        }
        TickOutcome::Ate
    }

    fn finish(&mut self, won: bool) {
        self.timer.cancel();
        self.grace_started = None;
        self.state = RunState::GameOver { won };
        info!("game over (won: {}), score {}", won, self.score);

        let cue = self.cue();
        self.collab.effects.on_game_over(cue);

        let name = self.settings.player_name.clone();
        if let Err(e) = self.collab.scores.save_score(self.score, &name, self.profile()) {
            warn!("could not save score: {}", e);
        }
        if self.score > self.high_score {
            self.high_score = self.score;
            if let Err(e) = self.collab.scores.save_high_score(self.score) {
                warn!("could not save high score: {}", e);
            }
        }
        self.render();
    }

    fn spawn_food(&mut self) -> Option<Cell> {
        let food = self
            .collab
            .spawner
            .spawn(self.snake.body(), self.config.width, self.config.height)?;
        debug_assert!(!self.snake.occupies(food), "food spawned on the snake at {:?}", food);
        debug_assert!(food.in_bounds(self.config.width, self.config.height));
        Some(food)
    }

    fn collision_ahead(&self, direction: Direction) -> Option<collision::Collision> {
        collision::check(direction, self.snake.body(), self.config.width, self.config.height)
    }

    fn cue(&self) -> Cue {
        Cue {
            sound: self.settings.sound_enabled,
            haptic: self.settings.haptics_enabled,
        }
    }

    fn render(&mut self) {
        let status = self.status();
        let frame = Frame {
            snake: self.snake.body(),
            food: self.food,
            direction: self.direction,
            width: self.config.width,
            height: self.config.height,
            score: self.score,
            high_score: self.high_score,
            profile: self.speed.profile().id,
            phase: self.speed.phase(),
            status,
        };
        self.collab.presenter.render(&frame);
    }

    ///////////////////////////////////////////////////////////////////////////
    // Test setup

    /// Replaces the snake mid-run and points it at `direction`. An empty
    /// `cells` leaves the current snake in place.
    #[doc(hidden)]
    pub fn set_snake_for_test(&mut self, cells: Vec<Cell>, direction: Direction) {
        if let Some(snake) = Snake::from_cells(cells) {
            self.snake = snake;
        }
        self.direction = direction;
        self.next_direction = direction;
    }

    #[doc(hidden)]
    pub fn set_food_for_test(&mut self, food: Cell) {
        self.food = Some(food);
    }

    /// Jumps past the countdown straight into a running state.
    #[doc(hidden)]
    pub fn skip_countdown_for_test(&mut self) {
        if let RunState::Countdown { .. } = self.state {
            self.countdown_step(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn game(width: i32, height: i32, clock: &ManualClock) -> Game {
        let collab = Collaborators::headless()
            .with_clock(clock.clone())
            .with_spawner(RandomSpawner::seeded(3));
        Game::new(GameConfig::new(width, height), &Settings::default(), collab).unwrap()
    }

    #[test]
    fn validate_rejects_tiny_grids() {
        assert!(GameConfig::new(10, 10).validate().is_ok());
        assert!(GameConfig::new(3, 1).validate().is_err());
        assert!(GameConfig::new(0, 10).validate().is_err());
        assert!(GameConfig::new(4, 1).validate().is_ok());
    }

    #[test]
    fn validate_rejects_oversized_grids() {
        assert!(GameConfig::new(MAX_GRID_SIDE, MAX_GRID_SIDE).validate().is_ok());
        for (w, h) in [(65536, 40), (40, MAX_GRID_SIDE + 1), (i32::MAX, i32::MAX)] {
            let err = GameConfig::new(w, h).validate().unwrap_err();
            assert!(matches!(err, Error::GridTooLarge { .. }), "{}x{} gave {:?}", w, h, err);
        }

        let collab = Collaborators::headless().with_clock(ManualClock::new());
        assert!(Game::new(GameConfig::new(65536, 40), &Settings::default(), collab).is_err());
    }

    #[test]
    fn empty_test_snake_is_refused() {
        let clock = ManualClock::new();
        let mut g = game(10, 10, &clock);
        let body = g.snake().body().to_vec();
        g.set_snake_for_test(vec![], Direction::Up);
        assert_eq!(g.snake().body(), body.as_slice());
    }

    #[test]
    fn toggles_survive_restart() {
        let clock = ManualClock::new();
        let mut g = game(10, 10, &clock);
        g.set_sound_enabled(false);
        g.set_haptics_enabled(false);
        g.request_restart();
        assert!(!g.settings().sound_enabled);
        assert!(!g.settings().haptics_enabled);
        assert_eq!(g.cue(), Cue { sound: false, haptic: false });
    }

    #[test]
    fn starts_in_countdown_centered() {
        let clock = ManualClock::new();
        let g = game(10, 10, &clock);
        assert_eq!(g.status(), Status::Countdown { remaining: 3 });
        assert_eq!(g.snake().body(), &[Cell::new(5, 5), Cell::new(4, 5), Cell::new(3, 5)]);
        assert!(!g.snake().occupies(g.food().unwrap()));
    }

    #[test]
    fn countdown_runs_three_steps() {
        let clock = ManualClock::new();
        let mut g = game(10, 10, &clock);

        for remaining in [2, 1] {
            clock.advance(COUNTDOWN_STEP);
            assert_eq!(g.advance(), Some(TickOutcome::Idle));
            assert_eq!(g.status(), Status::Countdown { remaining });
        }
        clock.advance(COUNTDOWN_STEP);
        g.advance();
        assert_eq!(g.status(), Status::Running { grace: false });
        assert_eq!(g.timer().interval(), Some(g.tick_interval()));
    }

    #[test]
    fn countdown_ignores_ticks_and_pause_but_buffers_direction() {
        let clock = ManualClock::new();
        let mut g = game(10, 10, &clock);
        let body = g.snake().body().to_vec();

        assert_eq!(g.tick(), TickOutcome::Idle);
        g.request_pause();
        g.request_direction(Direction::Up);

        assert_eq!(g.snake().body(), body.as_slice());
        assert_eq!(g.status(), Status::Countdown { remaining: 3 });
        assert_eq!(g.next_direction(), Direction::Up);
        assert_eq!(g.direction(), Direction::Right);
    }

    #[test]
    fn snapshot_serializes() {
        let clock = ManualClock::new();
        let g = game(10, 10, &clock);
        let json = serde_json::to_string(&g.snapshot()).expect("serialize snapshot");
        let back: GameSnapshot = serde_json::from_str(&json).expect("deserialize snapshot");
        assert_eq!(back, g.snapshot());
    }
}
