use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, info, warn};

use snake_grace::collab::{Cue, Effects, Frame, Presenter, Status};
use snake_grace::food::RandomSpawner;
use snake_grace::game::{Collaborators, Command, Game, GameConfig};
use snake_grace::scores::JsonScoreStore;
use snake_grace::settings::{JsonSettingsStore, Settings};
use snake_grace::snake::{Cell, Direction};
use snake_grace::speed::ProfileId;

use crate::term::{Coords, TermInt, TermManager};

const SNAKE_BODY_CHAR: char = '█';
const FOOD_CHAR: char = 'O';
const DEAD_SNAKE_CHAR: char = 'X';
const IDLE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Input {
    Game(Command),
    ToggleSound,
    ToggleHaptics,
    SelectProfile(ProfileId),
    Quit,
}

pub fn map_key(ev: &KeyEvent) -> Option<Input> {
    if ev.modifiers.contains(KeyModifiers::CONTROL) && ev.code == KeyCode::Char('c') {
        return Some(Input::Quit);
    }

    let input = match ev.code {
        KeyCode::Char('w') | KeyCode::Up => Input::Game(Command::Direction(Direction::Up)),
        KeyCode::Char('a') | KeyCode::Left => Input::Game(Command::Direction(Direction::Left)),
        KeyCode::Char('s') | KeyCode::Down => Input::Game(Command::Direction(Direction::Down)),
        KeyCode::Char('d') | KeyCode::Right => Input::Game(Command::Direction(Direction::Right)),
        KeyCode::Esc | KeyCode::Char('p') | KeyCode::Char(' ') => Input::Game(Command::TogglePause),
        KeyCode::Char('r') | KeyCode::Enter => Input::Game(Command::Restart),
        KeyCode::Char('m') => Input::ToggleSound,
        KeyCode::Char('h') => Input::ToggleHaptics,
        KeyCode::Char('q') => Input::Quit,
        KeyCode::Char(c @ '1'..='4') => Input::SelectProfile(ProfileId::from_index(c as u8 - b'0')?),
        _ => return None,
    };
    Some(input)
}

fn head_char(direction: Direction) -> char {
    match direction {
        Direction::Up => '^',
        Direction::Down => 'v',
        Direction::Left => '<',
        Direction::Right => '>',
    }
}

/// Terminal size of the bordered board, or `None` when it cannot be
/// addressed at all.
fn board_size(config: &GameConfig) -> Option<Coords> {
    let width = TermInt::try_from(config.width.checked_add(2)?).ok()?;
    let height = TermInt::try_from(config.height.checked_add(2)?).ok()?;
    Some((width, height))
}

/// Grid cell to terminal position, inside the one-character border.
fn screen_pos(cell: Cell) -> Coords {
    ((cell.x + 1) as TermInt, (cell.y + 1) as TermInt)
}

/// Draws frames incrementally: only cells that changed since the previous
/// frame are printed.
pub struct TermPresenter {
    term: TermManager,
    board: Coords,
    drawn_snake: Vec<Cell>,
    drawn_food: Option<Cell>,
    last_status: Option<Status>,
}

impl TermPresenter {
    pub fn new(term: TermManager, board: Coords) -> Self {
        TermPresenter { term, board, drawn_snake: vec![], drawn_food: None, last_status: None }
    }

    fn draw(&mut self, frame: &Frame<'_>) -> crossterm::Result<()> {
        if self.last_status.is_none() || matches!(frame.status, Status::Countdown { .. }) {
            self.term.hide_message()?;
            for cell in std::mem::take(&mut self.drawn_snake) {
                self.term.print_at(screen_pos(cell), ' ')?;
            }
            self.term.draw_borders(self.board)?;
        }

        for &cell in &self.drawn_snake {
            if !frame.snake.contains(&cell) {
                self.term.print_at(screen_pos(cell), ' ')?;
            }
        }
        if let Some(old) = self.drawn_food {
            if Some(old) != frame.food && !frame.snake.contains(&old) {
                self.term.print_at(screen_pos(old), ' ')?;
            }
        }

        let dead = matches!(frame.status, Status::GameOver { won: false });
        for (i, &cell) in frame.snake.iter().enumerate() {
            let ch = match (dead, i) {
                (true, _) => DEAD_SNAKE_CHAR,
                (false, 0) => head_char(frame.direction),
                _ => SNAKE_BODY_CHAR,
            };
            self.term.print_at(screen_pos(cell), ch)?;
        }
        if let Some(food) = frame.food {
            self.term.print_at(screen_pos(food), FOOD_CHAR)?;
        }
        self.drawn_snake = frame.snake.to_vec();
        self.drawn_food = frame.food;

        let status_line = format!(
            " Score {:<5} Best {:<5} {} (phase {}) {:<8}",
            frame.score,
            frame.high_score,
            frame.profile,
            frame.phase + 1,
            if matches!(frame.status, Status::Running { grace: true }) { "CAREFUL!" } else { "" },
        );
        self.term.print_str_at((0, self.board.1), &status_line)?;

        if self.last_status != Some(frame.status) {
            self.show_status(frame)?;
            self.last_status = Some(frame.status);
        }
        self.term.flush()
    }

    fn show_status(&mut self, frame: &Frame<'_>) -> crossterm::Result<()> {
        match frame.status {
            Status::Countdown { remaining } => self.term.show_message(self.board, &[&remaining.to_string()]),
            Status::Running { .. } => self.term.hide_message(),
            Status::Paused { .. } => self.term.show_message(self.board, &["Paused", "Esc to resume", "Ctrl+C to quit"]),
            Status::GameOver { won } => {
                let score = format!("Score: {}", frame.score);
                self.term.show_message(self.board, &[
                    if won { "You won!" } else { "Game over!" },
                    &score,
                    "",
                    "R to play again,",
                    "or Ctrl+C to quit.",
                ])
            }
        }
    }
}

impl Presenter for TermPresenter {
    fn render(&mut self, frame: &Frame<'_>) {
        if let Err(e) = self.draw(frame) {
            warn!("failed to draw frame: {}", e);
        }
    }
}

/// Rings the terminal bell for sound cues. There is no vibration motor on a
/// terminal, so haptic cues only show up in the log.
pub struct TermEffects;

impl TermEffects {
    fn cue(&self, what: &str, cue: Cue) {
        if cue.sound {
            let mut out = std::io::stdout();
            let res = crossterm::queue!(out, crossterm::style::Print('\u{7}'));
            if let Err(e) = res {
                warn!("bell failed: {}", e);
            }
        }
        if cue.haptic {
            debug!("haptic pulse: {}", what);
        }
    }
}

impl Effects for TermEffects {
    fn on_eat(&mut self, cue: Cue) {
        self.cue("eat", cue);
    }

    fn on_collision(&mut self, cue: Cue) {
        self.cue("collision", cue);
    }

    fn on_game_over(&mut self, cue: Cue) {
        self.cue("game over", cue);
    }

    fn on_new_record(&mut self, cue: Cue) {
        info!("new record");
        self.cue("new record", cue);
    }
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = TermManager::restore() {
            warn!("failed to restore terminal: {}", e);
        }
    }
}

pub struct App {
    config: GameConfig,
    /// Session settings, CLI overrides included.
    settings: Settings,
    /// What is written back when a toggle changes.
    persisted: Settings,
    settings_store: JsonSettingsStore,
    scores: JsonScoreStore,
}

impl App {
    pub fn new(
        config: GameConfig,
        settings: Settings,
        persisted: Settings,
        settings_store: JsonSettingsStore,
        scores: JsonScoreStore,
    ) -> Self {
        App { config, settings, persisted, settings_store, scores }
    }

    pub fn run(mut self) -> Result<()> {
        self.config.validate()?;

        let mut term = TermManager::new().context("Failed to read terminal size")?;
        let (tw, th) = term.size();
        // One row below the board for the status line.
        let board = match board_size(&self.config) {
            Some((bw, bh)) if bw <= tw && bh < th => (bw, bh),
            _ => bail!(
                "a {}x{} grid does not fit this {}x{} terminal",
                self.config.width,
                self.config.height,
                tw,
                th
            ),
        };

        term.setup().context("Failed to set up terminal")?;
        let _guard = TerminalGuard;

        let collab = Collaborators::headless()
            .with_effects(TermEffects)
            .with_scores(self.scores.clone())
            .with_presenter(TermPresenter::new(term, board))
            .with_spawner(RandomSpawner::new());
        let mut game = Game::new(self.config.clone(), &self.settings, collab)?;

        info!("entering game loop");
        loop {
            let timeout = game.until_next_tick().map_or(IDLE_POLL, |t| t.min(IDLE_POLL));
            if let Some(ev) = TermManager::next_key(timeout).context("Failed to read input")? {
                match map_key(&ev) {
                    Some(Input::Quit) => break,
                    Some(input) => self.apply(&mut game, input),
                    None => {}
                }
            }
            game.advance();
        }

        info!("quitting with score {}", game.score());
        Ok(())
    }

    fn apply(&mut self, game: &mut Game, input: Input) {
        match input {
            Input::Game(command) => game.handle(command),
            Input::ToggleSound => {
                let on = !game.settings().sound_enabled;
                game.set_sound_enabled(on);
                self.persisted.sound_enabled = on;
                self.save_settings();
            }
            Input::ToggleHaptics => {
                let on = !game.settings().haptics_enabled;
                game.set_haptics_enabled(on);
                self.persisted.haptics_enabled = on;
                self.save_settings();
            }
            Input::SelectProfile(profile) => {
                game.select_profile(profile);
                self.persisted.speed_profile = profile;
                self.save_settings();
            }
            Input::Quit => {}
        }
    }

    fn save_settings(&self) {
        if let Err(e) = self.settings_store.save(&self.persisted) {
            warn!("could not save settings: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent { code, modifiers: KeyModifiers::empty() }
    }

    #[test]
    fn arrows_and_wasd_steer() {
        for (code, dir) in [
            (KeyCode::Up, Direction::Up),
            (KeyCode::Char('a'), Direction::Left),
            (KeyCode::Char('s'), Direction::Down),
            (KeyCode::Right, Direction::Right),
        ] {
            assert_eq!(map_key(&key(code)), Some(Input::Game(Command::Direction(dir))));
        }
    }

    #[test]
    fn ctrl_c_quits() {
        let ev = KeyEvent { code: KeyCode::Char('c'), modifiers: KeyModifiers::CONTROL };
        assert_eq!(map_key(&ev), Some(Input::Quit));
        assert_eq!(map_key(&key(KeyCode::Char('c'))), None);
    }

    #[test]
    fn number_keys_pick_profiles() {
        assert_eq!(map_key(&key(KeyCode::Char('3'))), Some(Input::SelectProfile(ProfileId::Fast)));
        assert_eq!(map_key(&key(KeyCode::Char('5'))), None);
    }

    #[test]
    fn board_size_includes_the_border() {
        assert_eq!(board_size(&GameConfig::default()), Some((29, 44)));
        assert_eq!(board_size(&GameConfig::new(65536, 40)), None);
        assert_eq!(board_size(&GameConfig::new(i32::MAX, 40)), None);
    }

    #[test]
    fn cells_sit_inside_the_border() {
        assert_eq!(screen_pos(Cell::new(0, 0)), (1, 1));
        assert_eq!(screen_pos(Cell::new(26, 41)), (27, 42));
    }
}
