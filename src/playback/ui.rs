//! Player screen: progress, volume and transport keys.

use crate::playback::session::PlaybackState;
use crate::recording::format_duration;
use crate::ui::Palette;
use anyhow::Result;
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, LineGauge, Padding, Paragraph},
};
use std::io::{stdout, Stdout};
use std::time::Duration;

/// User input in the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Continue,
    TogglePlay,
    SeekBack,
    SeekForward,
    VolumeUp,
    VolumeDown,
    Close,
}

/// What the player shows on one frame.
pub struct PlayerView<'a> {
    pub name: &'a str,
    pub state: &'a PlaybackState,
    pub current_time: f64,
    pub duration: Option<f64>,
    pub is_playing: bool,
    pub volume: f32,
}

/// Full-screen player.
pub struct PlayerTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    palette: Palette,
    cleaned_up: bool,
}

impl PlayerTui {
    /// Enters the alternate screen.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized
    pub fn new(palette: Palette) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self {
            terminal,
            palette,
            cleaned_up: false,
        })
    }

    /// Draws one frame.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(&mut self, view: &PlayerView<'_>) -> Result<()> {
        let palette = self.palette;
        self.terminal.draw(|frame| {
            let area = frame.area();
            let outer = Block::default()
                .padding(Padding::uniform(1))
                .style(Style::default().fg(palette.fg).bg(palette.bg));
            frame.render_widget(&outer, area);

            let [title_area, status_area, progress_area, volume_area, _, footer_area] =
                Layout::vertical([
                    Constraint::Length(2),
                    Constraint::Length(2),
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Min(0),
                    Constraint::Length(1),
                ])
                .areas(outer.inner(area));

            frame.render_widget(
                Paragraph::new(Line::styled(view.name, Style::default().fg(palette.accent).bold())),
                title_area,
            );

            let status = match view.state {
                PlaybackState::Idle => Span::raw("No recording selected"),
                PlaybackState::Loading => Span::raw("Loading audio..."),
                PlaybackState::Ready if view.is_playing => Span::raw("▶ Playing"),
                PlaybackState::Ready => Span::styled("⏸ Paused", Style::default().fg(palette.paused)),
                PlaybackState::Failed(message) => Span::styled(
                    message.as_str(),
                    Style::default().fg(palette.alert_fg).bg(palette.alert_bg),
                ),
            };
            frame.render_widget(Paragraph::new(Line::from(status)), status_area);

            let duration = view.duration.unwrap_or(0.0);
            let label = format!(
                "{} / {}",
                format_duration(view.current_time as u64),
                view.duration
                    .map(|d| format_duration(d.round() as u64))
                    .unwrap_or_else(|| "--:--".to_string())
            );
            frame.render_widget(
                LineGauge::default()
                    .block(Block::default().borders(Borders::ALL).title(" Position "))
                    .filled_style(Style::default().fg(palette.accent))
                    .unfilled_style(Style::default().fg(palette.muted))
                    .label(label)
                    .ratio(progress_ratio(view.current_time, duration)),
                progress_area,
            );

            frame.render_widget(
                LineGauge::default()
                    .block(Block::default().borders(Borders::ALL).title(" Volume "))
                    .filled_style(Style::default().fg(palette.fg))
                    .unfilled_style(Style::default().fg(palette.muted))
                    .label(format!("{:>3}%", (view.volume * 100.0).round() as u32))
                    .ratio(f64::from(view.volume.clamp(0.0, 1.0))),
                volume_area,
            );

            frame.render_widget(
                Paragraph::new("space play/pause, ←→ seek 5s, ↑↓ volume, esc/q close")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(palette.muted)),
                footer_area,
            );
        })?;
        Ok(())
    }

    /// Polls for one key press.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self) -> Result<PlayerCommand> {
        if !event::poll(Duration::from_millis(100))? {
            return Ok(PlayerCommand::Continue);
        }
        match event::read()? {
            Event::Key(key) => Ok(player_command(key)),
            _ => Ok(PlayerCommand::Continue),
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

impl Drop for PlayerTui {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

fn player_command(key: KeyEvent) -> PlayerCommand {
    match key.code {
        KeyCode::Char(' ') | KeyCode::Char('k') => PlayerCommand::TogglePlay,
        KeyCode::Left => PlayerCommand::SeekBack,
        KeyCode::Right => PlayerCommand::SeekForward,
        KeyCode::Up => PlayerCommand::VolumeUp,
        KeyCode::Down => PlayerCommand::VolumeDown,
        KeyCode::Char('q') | KeyCode::Esc => PlayerCommand::Close,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => PlayerCommand::Close,
        _ => PlayerCommand::Continue,
    }
}

fn progress_ratio(current: f64, duration: f64) -> f64 {
    if duration <= 0.0 {
        0.0
    } else {
        (current / duration).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_keys_seek_and_adjust_volume() {
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(player_command(key(KeyCode::Left)), PlayerCommand::SeekBack);
        assert_eq!(player_command(key(KeyCode::Right)), PlayerCommand::SeekForward);
        assert_eq!(player_command(key(KeyCode::Up)), PlayerCommand::VolumeUp);
        assert_eq!(player_command(key(KeyCode::Down)), PlayerCommand::VolumeDown);
        assert_eq!(player_command(key(KeyCode::Char(' '))), PlayerCommand::TogglePlay);
        assert_eq!(player_command(key(KeyCode::Esc)), PlayerCommand::Close);
    }

    #[test]
    fn progress_is_bounded() {
        assert_eq!(progress_ratio(5.0, 0.0), 0.0);
        assert_eq!(progress_ratio(5.0, 10.0), 0.5);
        assert_eq!(progress_ratio(15.0, 10.0), 1.0);
    }
}
