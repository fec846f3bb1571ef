//! Speaker screen shown while text is read aloud.

use crate::speech::provider::SpeechProvider;
use crate::speech::session::SpeechState;
use crate::ui::Palette;
use anyhow::Result;
use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Padding, Paragraph, Wrap},
};
use std::io::{stdout, Stdout};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerCommand {
    Continue,
    TogglePause,
    /// Speak the same text again from the start
    Restart,
    Close,
}

pub struct SpeakerView<'a> {
    pub text: &'a str,
    pub state: SpeechState,
    pub provider: Option<SpeechProvider>,
    pub voice: Option<&'a str>,
    /// Set when the requested provider failed over to the system voice
    pub notice: Option<&'a str>,
}

pub struct SpeakerTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    palette: Palette,
    cleaned_up: bool,
}

impl SpeakerTui {
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

    pub fn render(&mut self, view: &SpeakerView<'_>) -> Result<()> {
        let palette = self.palette;
        self.terminal.draw(|frame| {
            let area = frame.area();
            let outer = Block::default()
                .padding(Padding::uniform(1))
                .style(Style::default().fg(palette.fg).bg(palette.bg));
            frame.render_widget(&outer, area);

            let [status_area, notice_area, text_area, footer_area] = Layout::vertical([
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .areas(outer.inner(area));

            let state = match view.state {
                SpeechState::Speaking => Span::styled("▶ Speaking", Style::default().fg(palette.accent).bold()),
                SpeechState::Paused => Span::styled("⏸ Paused", Style::default().fg(palette.paused).bold()),
                SpeechState::Idle => Span::styled("■ Finished", Style::default().fg(palette.muted)),
            };
            let mut status = vec![state];
            if let Some(provider) = view.provider {
                status.push(Span::raw(format!("  {}", provider.name())));
            }
            if let Some(voice) = view.voice {
                status.push(Span::styled(format!(" · {voice}"), Style::default().fg(palette.muted)));
            }
            frame.render_widget(Paragraph::new(Line::from(status)), status_area);

            if let Some(notice) = view.notice {
                frame.render_widget(
                    Paragraph::new(notice).style(Style::default().fg(palette.alert_fg).bg(palette.alert_bg)),
                    notice_area,
                );
            }

            frame.render_widget(
                Paragraph::new(view.text)
                    .wrap(Wrap { trim: true })
                    .block(Block::default().borders(Borders::ALL).title(" Text ")),
                text_area,
            );

            frame.render_widget(
                Paragraph::new("space pause/resume, r restart, esc/q stop")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(palette.muted)),
                footer_area,
            );
        })?;
        Ok(())
    }

    pub fn handle_input(&mut self) -> Result<SpeakerCommand> {
        if !event::poll(Duration::from_millis(100))? {
            return Ok(SpeakerCommand::Continue);
        }
        match event::read()? {
            Event::Key(key) => Ok(speaker_command(key)),
            _ => Ok(SpeakerCommand::Continue),
        }
    }

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

impl Drop for SpeakerTui {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

fn speaker_command(key: KeyEvent) -> SpeakerCommand {
    match key.code {
        KeyCode::Char(' ') | KeyCode::Char('p') => SpeakerCommand::TogglePause,
        KeyCode::Char('r') => SpeakerCommand::Restart,
        KeyCode::Char('q') | KeyCode::Esc => SpeakerCommand::Close,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => SpeakerCommand::Close,
        _ => SpeakerCommand::Continue,
    }
}
