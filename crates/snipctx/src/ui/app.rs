//! Application loop for the TUI.

use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Paragraph;

use crate::app::export::{ExportOptions, ExportOutcome, Exporter};
use crate::app::outline::SymbolProvider;
use crate::app::selection::SelectionStore;
use crate::app::tokens::TokenEstimator;
use crate::domain::model::Document;
use crate::infra::config::Config;
use crate::infra::symbols::PythonOutline;
use crate::infra::watch::DocumentWatcher;
use crate::ui::components::preview::Preview;
use crate::ui::components::structure_list::{StructureList, StructureListState};
use crate::ui::components::summary::Summary;

/// Interactive host around the selection store: renders the outline, routes
/// keys to refresh/toggle/copy, and redraws on store notifications.
pub struct UiApp {
    path: PathBuf,
    config: Config,
}

impl UiApp {
    pub fn new(path: PathBuf, config: Config) -> Self {
        Self { path, config }
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to initialize terminal")?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode().ok();
        execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
        terminal.show_cursor().ok();

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        let mut document = load_document(&self.path)?;
        let provider = PythonOutline::for_path(&self.path);
        let provider_ref: Option<&dyn SymbolProvider> =
            provider.as_ref().map(|p| p as &dyn SymbolProvider);

        let mut store = SelectionStore::new();
        let dirty = Rc::new(Cell::new(false));
        let subscription = store.subscribe({
            let dirty = dirty.clone();
            move |_| dirty.set(true)
        });
        store.refresh(Some(&document), provider_ref);

        let mut list_state = StructureListState::from_store(&store);
        dirty.set(false);

        let estimator = TokenEstimator::from_config(&self.config);
        let exporter = Exporter::new()?;
        let structure_list = StructureList;
        let preview = Preview::new();
        let mut summary = Summary::new();
        update_summary(&store, &document, &estimator, &mut summary);

        let watcher = match DocumentWatcher::new(&self.path) {
            Ok(watcher) => Some(watcher),
            Err(err) => {
                tracing::warn!(error = %err, "file watching disabled");
                None
            }
        };

        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_owned();
        let title = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string());
        let mut status = format!("{} structures discovered", list_state.rows().len());

        loop {
            terminal.draw(|frame| {
                draw_ui(
                    frame,
                    &self.config,
                    &structure_list,
                    &list_state,
                    &preview,
                    &summary,
                    &document,
                    &extension,
                    &title,
                    &status,
                );
            })?;

            if event::poll(Duration::from_millis(150))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    let bindings = &self.config.keybindings;

                    if key_matches(&bindings.quit, &key) {
                        break;
                    } else if key_matches(&bindings.up, &key) {
                        list_state.select_previous();
                    } else if key_matches(&bindings.down, &key) {
                        list_state.select_next();
                    } else if key_matches(&bindings.toggle, &key) {
                        if let Some(row) = list_state.selected_row() {
                            let identity = row.identity.clone();
                            store.toggle(&identity);
                        }
                    } else if key_matches(&bindings.refresh, &key) {
                        match load_document(&self.path) {
                            Ok(next) => {
                                document = next;
                                store.refresh(Some(&document), provider_ref);
                                status = "Outline refreshed".into();
                            }
                            Err(err) => {
                                // Keep the previous list untouched on a
                                // failed reload.
                                status = format!("Reload failed: {err}");
                            }
                        }
                    } else if key_matches(&bindings.copy, &key) {
                        status = copy_selection(&exporter, &store, &document, &estimator);
                    }
                }
            }

            if let Some(watcher) = &watcher {
                if watcher.poll() {
                    match load_document(&self.path) {
                        Ok(next) => {
                            document = next;
                            store.refresh(Some(&document), provider_ref);
                            status = "File changed, outline refreshed".into();
                        }
                        Err(err) => {
                            status = format!("Reload failed: {err}");
                        }
                    }
                }
            }

            if dirty.replace(false) {
                list_state.rebuild(&store);
                update_summary(&store, &document, &estimator, &mut summary);
            }
        }

        store.unsubscribe(subscription);
        Ok(())
    }
}

fn load_document(path: &Path) -> Result<Document> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Document::new(String::from_utf8_lossy(&raw).into_owned()))
}

/// Extracted text of every checked structure, labeled by name.
fn checked_sections(store: &SelectionStore, document: &Document) -> Vec<(String, String)> {
    store
        .checked()
        .into_iter()
        .filter_map(|item| {
            document
                .slice(item.span)
                .map(|text| (item.name.clone(), text.to_owned()))
        })
        .collect()
}

fn update_summary(
    store: &SelectionStore,
    document: &Document,
    estimator: &TokenEstimator,
    summary: &mut Summary,
) {
    let sections = checked_sections(store, document);
    if sections.is_empty() {
        summary.clear();
    } else {
        summary.update(estimator.summarize(&sections));
    }
}

fn copy_selection(
    exporter: &Exporter,
    store: &SelectionStore,
    document: &Document,
    estimator: &TokenEstimator,
) -> String {
    let sections = checked_sections(store, document);
    let token_summary = (!sections.is_empty()).then(|| estimator.summarize(&sections));
    let options = ExportOptions {
        copy_to_clipboard: true,
        output_path: None,
    };

    match exporter.export(store, document, token_summary.as_ref(), &options) {
        Ok(ExportOutcome::NothingSelected) => "No structures checked".into(),
        Ok(ExportOutcome::Delivered(result)) if result.copied_to_clipboard => {
            format!("Copied {} structure(s) to clipboard", result.structures)
        }
        Ok(ExportOutcome::Delivered(_)) => "Clipboard unavailable".into(),
        Err(err) => format!("Export failed: {err}"),
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_ui(
    frame: &mut ratatui::Frame<'_>,
    config: &Config,
    structure_list: &StructureList,
    list_state: &StructureListState,
    preview: &Preview,
    summary: &Summary,
    document: &Document,
    extension: &str,
    title: &str,
    status: &str,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(layout[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(7)])
        .split(main[1]);

    structure_list.render(frame, main[0], list_state, &config.display, true, title);
    preview.render(
        frame,
        right[0],
        document,
        list_state.selected_row(),
        extension,
        &config.defaults.theme,
        config.defaults.preview_max_lines,
    );
    summary.render(frame, right[1]);

    let status_line = Paragraph::new(status.to_owned()).style(Style::default().fg(Color::Cyan));
    frame.render_widget(status_line, layout[1]);

    let bindings = &config.keybindings;
    let help = format!(
        "{} toggle · {} copy · {} refresh · {} quit",
        bindings.toggle, bindings.copy, bindings.refresh, bindings.quit
    );
    let help_line = Paragraph::new(help).style(
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM),
    );
    frame.render_widget(help_line, layout[2]);
}

/// Match a configured binding such as `space`, `q`, `up`, or `ctrl+c`
/// against a key event.
fn key_matches(binding: &str, key: &KeyEvent) -> bool {
    let binding = binding.trim().to_ascii_lowercase();
    let (want_ctrl, name) = match binding.strip_prefix("ctrl+") {
        Some(rest) => (true, rest.to_owned()),
        None => (false, binding),
    };
    if want_ctrl != key.modifiers.contains(KeyModifiers::CONTROL) {
        return false;
    }

    match name.as_str() {
        "space" => key.code == KeyCode::Char(' '),
        "up" => key.code == KeyCode::Up,
        "down" => key.code == KeyCode::Down,
        "enter" => key.code == KeyCode::Enter,
        "esc" => key.code == KeyCode::Esc,
        single if single.chars().count() == 1 => {
            let expected = single.chars().next().unwrap_or_default();
            matches!(key.code, KeyCode::Char(c) if c.to_ascii_lowercase() == expected)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn matches_plain_character_bindings() {
        assert!(key_matches("q", &press(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(!key_matches("q", &press(KeyCode::Char('x'), KeyModifiers::NONE)));
    }

    #[test]
    fn matches_named_keys() {
        assert!(key_matches("space", &press(KeyCode::Char(' '), KeyModifiers::NONE)));
        assert!(key_matches("up", &press(KeyCode::Up, KeyModifiers::NONE)));
        assert!(key_matches("down", &press(KeyCode::Down, KeyModifiers::NONE)));
    }

    #[test]
    fn ctrl_bindings_require_the_modifier() {
        assert!(key_matches(
            "ctrl+c",
            &press(KeyCode::Char('c'), KeyModifiers::CONTROL)
        ));
        assert!(!key_matches("ctrl+c", &press(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!key_matches("c", &press(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }
}
