use std::io::{stdout, Stdout, Write};
use std::time::Duration;

use crossterm::event::{poll, read, Event, KeyEvent};
use crossterm::terminal::{ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue, style, terminal};

pub type TermInt = u16;
pub type Coords = (TermInt, TermInt);

/// Raw-mode terminal with a shadow copy of what has been printed, so a popup
/// message can be taken down again without redrawing the board.
pub struct TermManager {
    width: TermInt,
    height: TermInt,
    stdout: Stdout,
    screen: Vec<char>,
    current_msg: Option<Message>,
}

struct Message {
    top_left: Coords,
    width: TermInt,
    height: TermInt,
}

impl TermManager {
    pub fn new() -> crossterm::Result<Self> {
        let (width, height) = terminal::size()?;
        let screen = vec![' '; width as usize * height as usize];
        Ok(TermManager { width, height, stdout: stdout(), screen, current_msg: None })
    }

    pub fn size(&self) -> Coords {
        (self.width, self.height)
    }

    pub fn setup(&mut self) -> crossterm::Result<()> {
        execute!(self.stdout, EnterAlternateScreen)?;
        terminal::enable_raw_mode()?;
        execute!(self.stdout, cursor::Hide, cursor::DisableBlinking)?;
        self.clear()
    }

    /// Undoes `setup`. Works without a manager so it can run from a drop
    /// guard after the manager has been handed away.
    pub fn restore() -> crossterm::Result<()> {
        let mut out = stdout();
        terminal::disable_raw_mode()?;
        execute!(out, cursor::Show, cursor::EnableBlinking, LeaveAlternateScreen)
    }

    /// Waits up to `timeout` for a key press.
    pub fn next_key(timeout: Duration) -> crossterm::Result<Option<KeyEvent>> {
        if poll(timeout)? {
            if let Event::Key(ev) = read()? {
                return Ok(Some(ev));
            }
        }
        Ok(None)
    }

    pub fn draw_borders(&mut self, (width, height): Coords) -> crossterm::Result<()> {
        let (end_x, end_y) = (width - 1, height - 1);

        for x in 0..width {
            let ch = if x == 0 || x == end_x { '+' } else { '-' };
            self.print_at((x, 0), ch)?;
            self.print_at((x, end_y), ch)?;
        }
        for y in 1..end_y {
            self.print_at((0, y), '|')?;
            self.print_at((end_x, y), '|')?;
        }
        Ok(())
    }

    /// Pops up `lines` in a box centred on the `area` anchored at the top-left
    /// corner of the screen.
    pub fn show_message(&mut self, area: Coords, lines: &[&str]) -> crossterm::Result<()> {
        self.hide_message()?;

        let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let msg_width = (widest + 2) as TermInt;
        let msg_height = (lines.len() + 2) as TermInt;
        let top_left = centred(area, (msg_width, msg_height));

        for y_diff in 0..msg_height {
            let text = match y_diff {
                0 => "",
                d if d == msg_height - 1 => "",
                d => lines[d as usize - 1],
            };
            let padded = format!("{: ^width$}", text, width = msg_width as usize);
            for (x_diff, ch) in padded.chars().enumerate() {
                self.print_unsaved((top_left.0 + x_diff as TermInt, top_left.1 + y_diff), ch)?;
            }
        }

        self.current_msg = Some(Message { top_left, width: msg_width, height: msg_height });
        Ok(())
    }

    pub fn hide_message(&mut self) -> crossterm::Result<()> {
        let msg = match self.current_msg.take() {
            Some(msg) => msg,
            None => return Ok(()),
        };

        for y in msg.top_left.1..msg.top_left.1 + msg.height {
            for x in msg.top_left.0..msg.top_left.0 + msg.width {
                if let Some(&ch) = self.screen.get(self.index((x, y))) {
                    self.print_unsaved((x, y), ch)?;
                }
            }
        }
        Ok(())
    }

    pub fn print_at(&mut self, pos: Coords, ch: char) -> crossterm::Result<()> {
        let idx = self.index(pos);
        if let Some(slot) = self.screen.get_mut(idx) {
            *slot = ch;
        }
        // A popup covers this cell; it shows up once the popup is hidden.
        if self.covered(pos) {
            return Ok(());
        }
        self.print_unsaved(pos, ch)
    }

    pub fn print_str_at(&mut self, pos: Coords, text: &str) -> crossterm::Result<()> {
        for (i, ch) in text.chars().enumerate() {
            let x = pos.0 + i as TermInt;
            if x >= self.width {
                break;
            }
            self.print_at((x, pos.1), ch)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> crossterm::Result<()> {
        execute!(self.stdout, terminal::Clear(ClearType::All))?;
        self.screen = vec![' '; self.width as usize * self.height as usize];
        self.current_msg = None;
        Ok(())
    }

    pub fn flush(&mut self) -> crossterm::Result<()> {
        self.stdout.flush()?;
        Ok(())
    }

    ///////////////////////////////////////////////////////////////////////////

    fn index(&self, (x, y): Coords) -> usize {
        self.width as usize * y as usize + x as usize
    }

    fn covered(&self, (x, y): Coords) -> bool {
        self.current_msg.as_ref().map_or(false, |m| {
            (m.top_left.0..m.top_left.0 + m.width).contains(&x)
                && (m.top_left.1..m.top_left.1 + m.height).contains(&y)
        })
    }

    fn print_unsaved(&mut self, pos: Coords, ch: char) -> crossterm::Result<()> {
        if pos.0 >= self.width || pos.1 >= self.height {
            return Ok(());
        }
        queue!(self.stdout, cursor::MoveTo(pos.0, pos.1), style::Print(ch))
    }
}

fn centred((area_w, area_h): Coords, (width, height): Coords) -> Coords {
    ((area_w / 2).saturating_sub(width / 2), (area_h / 2).saturating_sub(height / 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popups_centre_on_the_board() {
        assert_eq!(centred((29, 44), (12, 5)), (8, 20));
        assert_eq!(centred((10, 4), (20, 7)), (0, 0));
    }
}
