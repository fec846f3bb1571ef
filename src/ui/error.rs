//! Full-screen error message, dismissed with any key.

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Paragraph, Wrap},
};
use std::io::{self, Stdout};

use super::Palette;

/// Error screen in the theme's alert colors.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    palette: Palette,
    cleaned_up: bool,
}

impl ErrorScreen {
    /// Creates a new error screen and enters alternate screen mode.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new(palette: Palette) -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(ErrorScreen {
            terminal,
            palette,
            cleaned_up: false,
        })
    }

    /// Displays an error message on a full alert-colored screen.
    ///
    /// Blocks until a key is pressed.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn show_error(&mut self, error_message: &str) -> anyhow::Result<()> {
        let Palette {
            alert_bg, alert_fg, ..
        } = self.palette;
        loop {
            self.terminal.draw(|frame| {
                let area = frame.area();
                let style = Style::default().fg(alert_fg).bg(alert_bg);
                frame.render_widget(Block::default().style(style), area);

                let [_, message_area, hint_area] = Layout::vertical([
                    Constraint::Percentage(45),
                    Constraint::Min(1),
                    Constraint::Length(2),
                ])
                .areas(area);
                let [_, message_area, _] = Layout::horizontal([
                    Constraint::Percentage(10),
                    Constraint::Percentage(80),
                    Constraint::Percentage(10),
                ])
                .areas(message_area);

                let message = Paragraph::new(Line::styled(error_message, style.bold()))
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });
                frame.render_widget(message, message_area);

                let hint = Paragraph::new("press any key")
                    .alignment(Alignment::Center)
                    .style(style);
                frame.render_widget(hint, hint_area);
            })?;

            if event::poll(std::time::Duration::from_millis(100))? {
                if let Event::Key(_) = event::read()? {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if self.cleaned_up {
            return Ok(());
        }
        self.cleaned_up = true;
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
