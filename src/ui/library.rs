//! Interactive browser over the recording library.
//!
//! Shows recordings newest-last with date and duration, optionally narrowed by
//! a case-insensitive name filter (`/`). A selection is handed back to the
//! caller as a [`LibraryAction`]; the viewer itself never touches the store.

use crate::recording::{format_duration, Recording};
use crate::ui::Palette;
use anyhow::Result;
use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, HighlightSpacing, List, ListItem, ListState, Padding, Paragraph},
};
use std::io::{self, Stdout};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

/// What the user chose in the library browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryAction {
    Play(String),
    Rename { id: String, name: String },
    Delete(String),
    Exit,
}

enum Mode {
    Browse,
    /// Typing a name filter after `/`
    Filter,
    Rename(Input),
    ConfirmDelete,
}

/// Indices of the recordings whose name contains `term`, ignoring case.
pub fn filter_recordings(recordings: &[Recording], term: &str) -> Vec<usize> {
    let term = term.to_lowercase();
    recordings
        .iter()
        .enumerate()
        .filter(|(_, r)| r.name.to_lowercase().contains(&term))
        .map(|(i, _)| i)
        .collect()
}

/// Browsing state, kept apart from the terminal.
struct LibraryState {
    recordings: Vec<Recording>,
    /// Indices into `recordings` that pass the filter, in list order
    visible: Vec<usize>,
    list_state: ListState,
    mode: Mode,
    filter: Input,
    status: Option<String>,
}

impl LibraryState {
    fn new(recordings: Vec<Recording>, selected: Option<usize>, filter: &str, status: Option<String>) -> Self {
        let mut state = Self {
            recordings,
            visible: Vec::new(),
            list_state: ListState::default(),
            mode: Mode::Browse,
            filter: Input::new(filter.to_string()),
            status,
        };
        state.refilter(selected);
        state
    }

    /// Recomputes the visible rows, keeping recording `keep` selected if it is
    /// still shown and falling back to the newest visible one.
    fn refilter(&mut self, keep: Option<usize>) {
        self.visible = filter_recordings(&self.recordings, self.filter.value());
        let position = keep
            .and_then(|index| self.visible.iter().position(|&v| v == index))
            .or_else(|| self.visible.len().checked_sub(1));
        self.list_state.select(position);
    }

    fn selected_index(&self) -> Option<usize> {
        self.list_state
            .selected()
            .and_then(|position| self.visible.get(position))
            .copied()
    }

    fn selected(&self) -> Option<&Recording> {
        self.selected_index().and_then(|i| self.recordings.get(i))
    }

    fn clear_filter(&mut self) {
        let keep = self.selected_index();
        self.filter.reset();
        self.refilter(keep);
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<LibraryAction> {
        self.status = None;
        match &mut self.mode {
            Mode::Browse => match key.code {
                KeyCode::Esc if !self.filter.value().is_empty() => {
                    self.clear_filter();
                    None
                }
                KeyCode::Char('q') | KeyCode::Esc => Some(LibraryAction::Exit),
                KeyCode::Char('/') => {
                    self.mode = Mode::Filter;
                    None
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    self.list_state.select_previous();
                    None
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.list_state.select_next();
                    None
                }
                KeyCode::Enter => self.selected().map(|r| LibraryAction::Play(r.id.clone())),
                KeyCode::Char('r') => {
                    if let Some(name) = self.selected().map(|r| r.name.clone()) {
                        self.mode = Mode::Rename(Input::new(name));
                    }
                    None
                }
                KeyCode::Char('d') | KeyCode::Delete => {
                    if self.selected().is_some() {
                        self.mode = Mode::ConfirmDelete;
                    }
                    None
                }
                _ => None,
            },
            Mode::Filter => {
                match key.code {
                    KeyCode::Enter => self.mode = Mode::Browse,
                    KeyCode::Esc => {
                        self.mode = Mode::Browse;
                        self.clear_filter();
                    }
                    KeyCode::Up => self.list_state.select_previous(),
                    KeyCode::Down => self.list_state.select_next(),
                    _ => {
                        let keep = self.selected_index();
                        self.filter.handle_event(&Event::Key(key));
                        self.refilter(keep);
                    }
                }
                None
            }
            Mode::Rename(input) => match key.code {
                KeyCode::Enter => {
                    let name = input.value().trim().to_string();
                    self.mode = Mode::Browse;
                    if name.is_empty() {
                        return None;
                    }
                    self.selected().map(|r| LibraryAction::Rename {
                        id: r.id.clone(),
                        name,
                    })
                }
                KeyCode::Esc => {
                    self.mode = Mode::Browse;
                    None
                }
                _ => {
                    input.handle_event(&Event::Key(key));
                    None
                }
            },
            Mode::ConfirmDelete => {
                self.mode = Mode::Browse;
                match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => {
                        self.selected().map(|r| LibraryAction::Delete(r.id.clone()))
                    }
                    _ => None,
                }
            }
        }
    }
}

/// Scrollable, filterable list of recordings.
pub struct LibraryViewer {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    state: LibraryState,
    palette: Palette,
    cleaned_up: bool,
}

impl LibraryViewer {
    /// Enters the alternate screen with recording `selected` (if any)
    /// highlighted and `filter` applied.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized
    pub fn new(
        recordings: Vec<Recording>,
        selected: Option<usize>,
        filter: &str,
        palette: Palette,
        status: Option<String>,
    ) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        Ok(Self {
            terminal,
            state: LibraryState::new(recordings, selected, filter, status),
            palette,
            cleaned_up: false,
        })
    }

    /// Current name filter, so a reopened viewer can keep it.
    pub fn filter(&self) -> &str {
        self.state.filter.value()
    }

    /// Runs until the user picks an action or leaves.
    pub fn run(&mut self) -> Result<LibraryAction> {
        tracing::debug!("Library viewer opened with {} recordings", self.state.recordings.len());

        let action = loop {
            self.draw()?;

            match event::read()? {
                Event::Key(key) => {
                    if let Some(action) = self.state.handle_key(key) {
                        break action;
                    }
                }
                Event::Mouse(mouse) if matches!(self.state.mode, Mode::Browse | Mode::Filter) => match mouse.kind {
                    MouseEventKind::ScrollUp => self.state.list_state.select_previous(),
                    MouseEventKind::ScrollDown => self.state.list_state.select_next(),
                    _ => {}
                },
                _ => {}
            }
        };

        self.cleanup()?;
        Ok(action)
    }

    fn draw(&mut self) -> Result<()> {
        let palette = self.palette;
        let selected_name = self.state.selected().map(|r| r.name.clone()).unwrap_or_default();
        let LibraryState {
            recordings,
            visible,
            list_state,
            mode,
            filter,
            status,
        } = &mut self.state;
        let status = status.clone();
        let filter_term = filter.value().to_string();
        let show_filter = matches!(mode, Mode::Filter) || !filter_term.is_empty();

        self.terminal.draw(|frame| {
            let area = frame.area();
            let outer = Block::default()
                .padding(Padding::uniform(1))
                .style(Style::default().fg(palette.fg).bg(palette.bg));
            frame.render_widget(&outer, area);
            let inner = outer.inner(area);

            let [filter_area, list_area, prompt_area, footer_area] = Layout::vertical([
                Constraint::Length(if show_filter { 1 } else { 0 }),
                Constraint::Min(0),
                Constraint::Length(if matches!(mode, Mode::Rename(_) | Mode::ConfirmDelete) { 3 } else { 0 }),
                Constraint::Length(1),
            ])
            .areas(inner);

            if show_filter {
                let color = if matches!(mode, Mode::Filter) { palette.accent } else { palette.muted };
                frame.render_widget(
                    Paragraph::new(format!("/{filter_term}")).style(Style::default().fg(color)),
                    filter_area,
                );
                if matches!(mode, Mode::Filter) {
                    frame.set_cursor_position(Position::new(
                        filter_area.x + 1 + filter.visual_cursor() as u16,
                        filter_area.y,
                    ));
                }
            }

            let items: Vec<ListItem> = visible
                .iter()
                .filter_map(|&i| recordings.get(i))
                .map(|recording| {
                    let meta = Line::styled(
                        format!(
                            "{}  {}",
                            recording.date.format("%Y-%m-%d %H:%M"),
                            format_duration(u64::from(recording.duration))
                        ),
                        Style::default().fg(palette.muted),
                    );
                    let name = Line::styled(recording.name.clone(), Style::default().fg(palette.fg));
                    ListItem::new(vec![name, meta])
                })
                .collect();

            let title = if filter_term.is_empty() {
                format!(" Recordings ({}) ", recordings.len())
            } else {
                format!(" Recordings ({} of {}) ", visible.len(), recordings.len())
            };
            let list = List::new(items)
                .block(Block::default().title(title).borders(Borders::ALL))
                .highlight_style(Style::default().bg(palette.highlight).fg(palette.accent))
                .highlight_symbol("> ")
                .highlight_spacing(HighlightSpacing::Always);
            frame.render_stateful_widget(list, list_area, list_state);

            match mode {
                Mode::Browse | Mode::Filter => {}
                Mode::Rename(input) => {
                    let block = Block::default().title(" Rename ").borders(Borders::ALL);
                    frame.render_widget(&block, prompt_area);
                    let input_inner = block.inner(prompt_area);
                    frame.render_widget(
                        Paragraph::new(input.value()).style(Style::default().fg(palette.fg)),
                        input_inner,
                    );
                    frame.set_cursor_position(Position::new(
                        input_inner.x + input.visual_cursor() as u16,
                        input_inner.y,
                    ));
                }
                Mode::ConfirmDelete => {
                    let block = Block::default().title(" Delete ").borders(Borders::ALL);
                    let question = Paragraph::new(format!("Delete \"{selected_name}\"? (y/N)"))
                        .style(Style::default().fg(palette.alert_fg).bg(palette.alert_bg))
                        .block(block);
                    frame.render_widget(question, prompt_area);
                }
            }

            let footer = status.unwrap_or_else(|| {
                if recordings.is_empty() {
                    "No recordings yet. Run 'voxmemo record' to make one. esc/q exit".to_string()
                } else if matches!(mode, Mode::Filter) {
                    "type to filter, ↵ done, esc clear".to_string()
                } else if visible.is_empty() {
                    format!("No recordings match \"{filter_term}\". esc clears the filter")
                } else {
                    "↑↓ select, ↵ play, / filter, r rename, d delete, esc/q exit".to_string()
                }
            });
            frame.render_widget(
                Paragraph::new(footer)
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(palette.muted)),
                footer_area,
            );
        })?;
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.cleaned_up {
            return Ok(());
        }
        self.cleaned_up = true;
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        self.terminal.show_cursor()?;
        tracing::debug!("Library viewer closed");
        Ok(())
    }
}

impl Drop for LibraryViewer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use ratatui::crossterm::event::KeyModifiers;

    fn recording(id: &str, name: &str) -> Recording {
        Recording {
            id: id.to_string(),
            name: name.to_string(),
            duration: 5,
            date: Local::now(),
            url: String::new(),
        }
    }

    fn library() -> Vec<Recording> {
        vec![
            recording("a", "Standup Notes"),
            recording("b", "Grocery list"),
            recording("c", "standup follow-up"),
        ]
    }

    fn press(state: &mut LibraryState, code: KeyCode) -> Option<LibraryAction> {
        state.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(state: &mut LibraryState, text: &str) {
        for c in text.chars() {
            press(state, KeyCode::Char(c));
        }
    }

    #[test]
    fn filter_matches_names_ignoring_case() {
        let recordings = library();
        assert_eq!(filter_recordings(&recordings, "STANDUP"), vec![0, 2]);
        assert_eq!(filter_recordings(&recordings, "list"), vec![1]);
        assert_eq!(filter_recordings(&recordings, ""), vec![0, 1, 2]);
        assert!(filter_recordings(&recordings, "podcast").is_empty());
    }

    #[test]
    fn typing_after_slash_narrows_the_list() {
        let mut state = LibraryState::new(library(), None, "", None);
        assert_eq!(state.selected().map(|r| r.id.as_str()), Some("c"));

        press(&mut state, KeyCode::Char('/'));
        type_text(&mut state, "grocery");
        assert_eq!(state.visible, vec![1]);
        assert_eq!(state.selected().map(|r| r.id.as_str()), Some("b"));

        press(&mut state, KeyCode::Enter);
        assert_eq!(press(&mut state, KeyCode::Enter), Some(LibraryAction::Play("b".to_string())));
    }

    #[test]
    fn filter_keys_do_not_trigger_browse_actions() {
        let mut state = LibraryState::new(library(), None, "", None);
        press(&mut state, KeyCode::Char('/'));
        type_text(&mut state, "dq");
        assert!(matches!(state.mode, Mode::Filter));
        assert_eq!(state.filter.value(), "dq");
        assert!(state.selected().is_none());
    }

    #[test]
    fn escape_clears_filter_before_exiting() {
        let mut state = LibraryState::new(library(), Some(0), "standup", None);
        assert_eq!(state.visible, vec![0, 2]);
        assert_eq!(state.selected().map(|r| r.id.as_str()), Some("a"));

        assert_eq!(press(&mut state, KeyCode::Esc), None);
        assert_eq!(state.visible, vec![0, 1, 2]);
        assert_eq!(state.selected().map(|r| r.id.as_str()), Some("a"));
        assert_eq!(press(&mut state, KeyCode::Esc), Some(LibraryAction::Exit));
    }

    #[test]
    fn delete_confirmation_acts_on_filtered_selection() {
        let mut state = LibraryState::new(library(), None, "standup", None);
        press(&mut state, KeyCode::Char('d'));
        assert_eq!(
            press(&mut state, KeyCode::Char('y')),
            Some(LibraryAction::Delete("c".to_string()))
        );
    }
}
