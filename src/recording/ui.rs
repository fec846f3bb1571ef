//! Recorder screen: live level waveform, elapsed time and the save prompts.

use crate::config::AudioQuality;
use crate::recording::format_duration;
use crate::recording::visualizations::{level_percent, LevelHistory};
use crate::ui::Palette;
use anyhow::Result;
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Sparkline},
};
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

/// Reference level (dBFS) that reads as a full meter.
const REFERENCE_LEVEL_DB: f32 = -20.0;
const SAMPLE_INTERVAL: Duration = Duration::from_millis(50);
const PEAK_HOLD: Duration = Duration::from_secs(3);

/// User input during recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderCommand {
    /// No key pressed
    Continue,
    /// Stop and keep the recording (Enter)
    Save,
    /// Stop and discard (Escape, 'q', Ctrl+C)
    Cancel,
    /// Space
    TogglePause,
}

/// What the recorder screen shows on one frame.
pub struct RecorderView<'a> {
    pub elapsed_secs: u32,
    pub paused: bool,
    /// Latest input samples, -1.0..=1.0
    pub samples: &'a [f32],
    pub quality: AudioQuality,
}

/// Full-screen recorder.
pub struct RecorderTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    history: LevelHistory,
    last_sample_time: Instant,
    peak_hold: u8,
    peak_hold_time: Instant,
    palette: Palette,
    cleaned_up: bool,
}

impl RecorderTui {
    /// Enters the alternate screen.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized
    pub fn new(palette: Palette) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        let width = usize::from(terminal.size()?.width);
        let now = Instant::now();

        Ok(Self {
            terminal,
            history: LevelHistory::new(width),
            last_sample_time: now,
            peak_hold: 0,
            peak_hold_time: now,
            palette,
            cleaned_up: false,
        })
    }

    /// Draws one frame.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(&mut self, view: &RecorderView<'_>) -> Result<()> {
        let level = if view.paused {
            0
        } else {
            level_percent(view.samples, REFERENCE_LEVEL_DB)
        };
        if !view.paused && self.last_sample_time.elapsed() >= SAMPLE_INTERVAL {
            self.history.push(level);
            self.last_sample_time = Instant::now();
        }
        if level > self.peak_hold || self.peak_hold_time.elapsed() >= PEAK_HOLD {
            self.peak_hold = level;
            self.peak_hold_time = Instant::now();
        }

        let width = usize::from(self.terminal.size()?.width);
        self.history.resize(width);

        let palette = self.palette;
        let history = &self.history;
        let peak = if view.paused { 0 } else { self.peak_hold };

        self.terminal.draw(|frame| {
            let area = frame.area();
            let [wave_area, mirror_area, footer_area] = Layout::vertical([
                Constraint::Percentage(60),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .areas(area);

            frame.render_widget(
                Sparkline::default()
                    .data(history.values())
                    .max(80)
                    .style(Style::default().bg(palette.bg).fg(palette.fg)),
                wave_area,
            );

            let mirrored: Vec<u64> = history
                .values()
                .iter()
                .map(|&v| 100_u64.saturating_sub(v))
                .collect();
            frame.render_widget(
                Sparkline::default()
                    .data(&mirrored)
                    .max(80)
                    .style(Style::default().bg(palette.accent).fg(palette.bg)),
                mirror_area,
            );

            let indicator = if view.paused {
                Span::styled("⏸ ", Style::default().fg(palette.paused))
            } else {
                Span::styled("● ", Style::default().fg(palette.alert_bg))
            };
            let footer = Line::from(vec![
                indicator,
                Span::raw(format_duration(u64::from(view.elapsed_secs))),
                Span::raw(format!(" / {level}% / peak {peak}% / {}", view.quality)),
                Span::styled(
                    "   space pause, ↵ save, esc discard",
                    Style::default().fg(palette.muted),
                ),
            ]);
            frame.render_widget(
                Paragraph::new(footer).style(Style::default().fg(palette.accent).bg(palette.bg)),
                footer_area,
            );
        })?;
        Ok(())
    }

    /// Polls for one key press.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self) -> Result<RecorderCommand> {
        if !event::poll(SAMPLE_INTERVAL)? {
            return Ok(RecorderCommand::Continue);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(RecorderCommand::Continue);
        };
        Ok(recorder_command(key))
    }

    /// Asks whether to keep the finished recording. Enter or 'y' keeps it.
    ///
    /// # Errors
    /// - If rendering or event reading fails
    pub fn confirm_save(&mut self, elapsed_secs: u32) -> Result<bool> {
        let palette = self.palette;
        let question = format!(
            "Save this {} recording? (Y/n)",
            format_duration(u64::from(elapsed_secs))
        );
        loop {
            self.terminal.draw(|frame| {
                let area = centered(frame.area(), 3);
                frame.render_widget(
                    Paragraph::new(question.as_str())
                        .alignment(Alignment::Center)
                        .style(Style::default().fg(palette.fg).bg(palette.bg))
                        .block(Block::default().borders(Borders::ALL).title(" Save ")),
                    area,
                );
            })?;

            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => return Ok(true),
                    KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => return Ok(false),
                    _ => {}
                }
            }
        }
    }

    /// Lets the user edit the recording name. `None` keeps `default_name`.
    ///
    /// # Errors
    /// - If rendering or event reading fails
    pub fn prompt_name(&mut self, default_name: &str) -> Result<Option<String>> {
        let palette = self.palette;
        let mut input = Input::new(default_name.to_string());
        loop {
            self.terminal.draw(|frame| {
                let area = centered(frame.area(), 3);
                let block = Block::default()
                    .borders(Borders::ALL)
                    .title(" Name (↵ save, esc keep default) ");
                let inner = block.inner(area);
                frame.render_widget(
                    Paragraph::new(input.value())
                        .style(Style::default().fg(palette.fg).bg(palette.bg))
                        .block(block),
                    area,
                );
                frame.set_cursor_position(Position::new(
                    inner.x + input.visual_cursor() as u16,
                    inner.y,
                ));
            })?;

            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Enter => {
                        let name = input.value().trim();
                        return Ok((!name.is_empty() && name != default_name).then(|| name.to_string()));
                    }
                    KeyCode::Esc => return Ok(None),
                    _ => {
                        input.handle_event(&Event::Key(key));
                    }
                }
            }
        }
    }

    /// Restores the terminal.
    ///
    /// # Errors
    /// - If terminal mode cannot be restored
    pub fn cleanup(&mut self) -> Result<()> {
        if self.cleaned_up {
            return Ok(());
        }
        self.cleaned_up = true;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for RecorderTui {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

fn recorder_command(key: KeyEvent) -> RecorderCommand {
    match key.code {
        KeyCode::Enter => {
            tracing::debug!("Enter pressed: saving recording");
            RecorderCommand::Save
        }
        KeyCode::Char('q') | KeyCode::Esc => {
            tracing::debug!("Escape or 'q' pressed: discarding recording");
            RecorderCommand::Cancel
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            tracing::debug!("Ctrl+C pressed: discarding recording");
            RecorderCommand::Cancel
        }
        KeyCode::Char(' ') => RecorderCommand::TogglePause,
        _ => RecorderCommand::Continue,
    }
}

/// A full-width band of `height` rows in the vertical middle of `area`.
fn centered(area: Rect, height: u16) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height),
        Constraint::Fill(1),
    ])
    .areas(area);
    let [_, band, _] = Layout::horizontal([
        Constraint::Percentage(15),
        Constraint::Percentage(70),
        Constraint::Percentage(15),
    ])
    .areas(middle);
    band
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(recorder_command(key(KeyCode::Enter)), RecorderCommand::Save);
        assert_eq!(recorder_command(key(KeyCode::Esc)), RecorderCommand::Cancel);
        assert_eq!(recorder_command(key(KeyCode::Char('q'))), RecorderCommand::Cancel);
        assert_eq!(recorder_command(key(KeyCode::Char(' '))), RecorderCommand::TogglePause);
        assert_eq!(recorder_command(key(KeyCode::Char('x'))), RecorderCommand::Continue);
        assert_eq!(
            recorder_command(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            RecorderCommand::Cancel
        );
    }

    #[test]
    fn centered_band_fits_inside_area() {
        let area = Rect::new(0, 0, 100, 30);
        let band = centered(area, 3);
        assert_eq!(band.height, 3);
        assert!(band.y > 0 && band.y + band.height < area.height);
        assert_eq!(band.width, 70);
    }
}
