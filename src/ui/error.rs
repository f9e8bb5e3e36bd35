//! Full-screen error display for failures before the waveform view opens.

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};
use std::io::{self, Stdout};
use std::time::Duration;

/// Red screen with a centered title and message. Any key dismisses it.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    restored: bool,
}

impl ErrorScreen {
    /// Creates a new error screen and enters alternate screen mode.
    ///
    /// # Errors
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(ErrorScreen {
            terminal,
            restored: false,
        })
    }

    /// Shows `title` and `message` until a key is pressed.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn show_error(&mut self, title: &str, message: &str) -> anyhow::Result<()> {
        let background = Color::Rgb(200, 0, 0);
        let text = Style::default().fg(Color::White).bg(background);

        loop {
            self.terminal.draw(|frame| {
                let area = frame.area();
                frame.buffer_mut().set_style(area, Style::default().bg(background));

                let mut lines = vec![
                    Line::from(Span::styled(title, text.add_modifier(Modifier::BOLD))),
                    Line::default(),
                ];
                lines.extend(message.lines().map(|l| Line::from(Span::styled(l, text))));
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    "press any key",
                    text.add_modifier(Modifier::DIM),
                )));

                let width = area.width * 8 / 10;
                let height = (lines.len() as u16).min(area.height);
                let centered = Rect {
                    x: area.x + (area.width - width) / 2,
                    y: area.y + (area.height - height) / 2,
                    width,
                    height,
                };

                let paragraph = Paragraph::new(lines)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });
                frame.render_widget(paragraph, centered);
            })?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Restores the terminal and exits alternate screen mode.
    ///
    /// # Errors
    /// - If raw mode cannot be disabled
    /// - If the cursor cannot be shown
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Shows an error screen and restores the terminal afterwards.
///
/// # Errors
/// - If the terminal cannot be driven
pub fn show_error_screen(title: &str, message: &str) -> anyhow::Result<()> {
    let mut screen = ErrorScreen::new()?;
    screen.show_error(title, message)?;
    screen.cleanup()
}
