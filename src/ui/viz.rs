//! Terminal user interface for the live waveform view.
//!
//! Draws each render frame as a Braille line chart with the warning and
//! critical bands layered on top, plus a one-line status footer. Input is
//! translated into `ViewCommand`s for the event loop to act on.

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph},
};
use std::io::{stdout, Stdout};
use std::time::Duration;

use super::plot::{decimate, vertical_line, DOTS_PER_CELL};
use crate::config::Palette;
use crate::render::{DisplaySurface, RenderFrame};

/// Colors cycled through by the wave and background color keys.
pub const COLOR_CYCLE: [Color; 8] = [
    Color::Green,
    Color::White,
    Color::Yellow,
    Color::Red,
    Color::Cyan,
    Color::Magenta,
    Color::Blue,
    Color::Black,
];

/// User input command in the waveform view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewCommand {
    /// Nothing to do (timeout or unbound key)
    Continue,
    /// Start or stop capture (Space / Enter)
    ToggleCapture,
    /// Leave the view (q / Escape / Ctrl+C)
    Quit,
    /// Change gain by whole steps (+ / -)
    Gain(i32),
    /// Change time zoom by whole steps (] / [)
    Zoom(i32),
    /// Change vertical padding by whole steps (Up / Down)
    Padding(i32),
    ToggleBanding,
    ToggleCursor,
    CycleWaveColor,
    CycleBackgroundColor,
    /// Restore gain, zoom and padding to their configured values
    Reset,
}

/// What the footer shows besides the chart.
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    pub capturing: bool,
    /// A session was started and is waiting for its first block.
    pub starting: bool,
    pub device: String,
    pub sample_rate: u32,
    pub amplitude: f32,
    pub zoom: f32,
    pub padding: f32,
    pub banding: bool,
    pub cursor: bool,
    /// Last error or end-of-stream notice.
    pub notice: Option<String>,
}

/// Terminal UI for the live waveform.
pub struct VizTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    palette: Palette,
    status: StatusLine,
    restored: bool,
}

impl VizTui {
    /// Creates a new TUI instance and enters alternate screen mode.
    ///
    /// # Errors
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    /// - If the terminal cannot be initialized
    pub fn new(palette: Palette) -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;

        Ok(VizTui {
            terminal,
            palette,
            status: StatusLine::default(),
            restored: false,
        })
    }

    pub fn set_status(&mut self, status: StatusLine) {
        self.status = status;
    }

    pub fn cycle_wave_color(&mut self) {
        self.palette.wave = next_color(self.palette.wave);
        tracing::debug!("Wave color: {:?}", self.palette.wave);
    }

    pub fn cycle_background_color(&mut self) {
        self.palette.background = next_color(self.palette.background);
        tracing::debug!("Background color: {:?}", self.palette.background);
    }

    /// Waits up to `timeout` for a key and maps it to a command.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self, timeout: Duration) -> anyhow::Result<ViewCommand> {
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                let command = command_for_key(key);
                if command != ViewCommand::Continue {
                    tracing::debug!("Key {:?}: {:?}", key.code, command);
                }
                return Ok(command);
            }
        }
        Ok(ViewCommand::Continue)
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

impl DisplaySurface for VizTui {
    fn present(&mut self, frame: &RenderFrame) -> anyhow::Result<()> {
        let palette = self.palette;
        let status = &self.status;

        self.terminal.draw(|f| {
            let area = f.area();
            let footer_height = 1;

            let chart_area = Rect {
                height: area.height.saturating_sub(footer_height),
                ..area
            };
            let footer_area = Rect {
                y: area.y + area.height.saturating_sub(footer_height),
                height: footer_height.min(area.height),
                ..area
            };

            let columns = chart_area.width as usize * DOTS_PER_CELL;
            let base = decimate(&frame.base, columns);
            let warning = decimate(&frame.warning, columns);
            let critical = decimate(&frame.critical, columns);
            let cursor = frame.cursor.map(|x| vertical_line(x, frame.y_range));

            let mut datasets = vec![Dataset::default()
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(palette.wave))
                .data(&base)];
            if !warning.is_empty() {
                datasets.push(
                    Dataset::default()
                        .marker(Marker::Braille)
                        .graph_type(GraphType::Scatter)
                        .style(Style::default().fg(palette.warning))
                        .data(&warning),
                );
            }
            if !critical.is_empty() {
                datasets.push(
                    Dataset::default()
                        .marker(Marker::Braille)
                        .graph_type(GraphType::Scatter)
                        .style(Style::default().fg(palette.critical))
                        .data(&critical),
                );
            }
            if let Some(cursor) = &cursor {
                datasets.push(
                    Dataset::default()
                        .marker(Marker::Braille)
                        .graph_type(GraphType::Line)
                        .style(Style::default().fg(palette.wave).add_modifier(Modifier::DIM))
                        .data(cursor),
                );
            }

            let (x_min, x_max) = frame.x_range();
            let (y_min, y_max) = frame.y_range;
            let chart = Chart::new(datasets)
                .style(Style::default().bg(palette.background))
                .x_axis(Axis::default().bounds([x_min, x_max.max(1.0)]))
                .y_axis(Axis::default().bounds([y_min as f64, y_max as f64]));
            f.render_widget(chart, chart_area);

            let footer = Paragraph::new(footer_line(status, &palette))
                .style(Style::default().fg(Color::Gray).bg(Color::Black));
            f.render_widget(footer, footer_area);
        })?;

        Ok(())
    }
}

impl Drop for VizTui {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Maps a key press to a view command. Releases and repeats on platforms
/// that report them are ignored.
pub fn command_for_key(key: KeyEvent) -> ViewCommand {
    if key.kind != KeyEventKind::Press {
        return ViewCommand::Continue;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => ViewCommand::Quit,
        KeyCode::Char('q') | KeyCode::Esc => ViewCommand::Quit,
        KeyCode::Char(' ') | KeyCode::Enter => ViewCommand::ToggleCapture,
        KeyCode::Char('+') | KeyCode::Char('=') => ViewCommand::Gain(1),
        KeyCode::Char('-') => ViewCommand::Gain(-1),
        KeyCode::Char(']') => ViewCommand::Zoom(1),
        KeyCode::Char('[') => ViewCommand::Zoom(-1),
        KeyCode::Up => ViewCommand::Padding(1),
        KeyCode::Down => ViewCommand::Padding(-1),
        KeyCode::Char('b') => ViewCommand::ToggleBanding,
        KeyCode::Char('c') => ViewCommand::ToggleCursor,
        KeyCode::Char('w') => ViewCommand::CycleWaveColor,
        KeyCode::Char('g') => ViewCommand::CycleBackgroundColor,
        KeyCode::Char('r') => ViewCommand::Reset,
        _ => ViewCommand::Continue,
    }
}

/// Next entry of `COLOR_CYCLE`; colors outside the cycle restart it.
pub fn next_color(current: Color) -> Color {
    let next = COLOR_CYCLE
        .iter()
        .position(|&c| c == current)
        .map_or(0, |i| (i + 1) % COLOR_CYCLE.len());
    COLOR_CYCLE[next]
}

fn footer_line<'a>(status: &'a StatusLine, palette: &Palette) -> Line<'a> {
    let indicator = if status.capturing {
        Span::styled("● ", Style::default().fg(Color::Red))
    } else if status.starting {
        Span::styled("◌ ", Style::default().fg(Color::Yellow))
    } else {
        Span::styled("■ ", Style::default().fg(Color::DarkGray))
    };

    let mut spans = vec![
        indicator,
        Span::raw(status.device.as_str()),
        Span::raw(format!(
            " / {} Hz / gain x{:.1} / zoom x{:.1} / pad {:.2}",
            status.sample_rate, status.amplitude, status.zoom, status.padding
        )),
    ];
    if status.banding {
        spans.push(Span::raw(" / "));
        spans.push(Span::styled("bands", Style::default().fg(palette.warning)));
    }
    if status.cursor {
        spans.push(Span::raw(" / cursor"));
    }
    if let Some(notice) = &status.notice {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            notice.as_str(),
            Style::default().fg(Color::Black).bg(palette.critical),
        ));
    }
    Line::from(spans)
}
