//! Checkbox list of discovered structures.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::app::selection::SelectionStore;
use crate::domain::model::{Span as SourceSpan, Structure, StructureKind};
use crate::infra::config::Display;

/// One visible row in the structure list.
#[derive(Debug, Clone)]
pub struct Row {
    pub identity: String,
    pub name: String,
    pub kind: StructureKind,
    pub signature: Option<String>,
    pub checked: bool,
    pub depth: usize,
    pub span: SourceSpan,
}

/// Maintains the navigable state of the structure list.
///
/// Rebuilt from the store after every change notification; the cursor is
/// re-anchored by identity so it survives refreshes when possible.
#[derive(Debug, Default, Clone)]
pub struct StructureListState {
    rows: Vec<Row>,
    selected: usize,
}

impl StructureListState {
    pub fn from_store(store: &SelectionStore) -> Self {
        let mut state = Self::default();
        state.rebuild(store);
        state
    }

    pub fn rebuild(&mut self, store: &SelectionStore) {
        let anchor = self.rows.get(self.selected).map(|row| row.identity.clone());

        self.rows.clear();
        flatten(store.items(), 0, &mut self.rows);

        self.selected = anchor
            .and_then(|identity| self.rows.iter().position(|row| row.identity == identity))
            .unwrap_or(0)
            .min(self.rows.len().saturating_sub(1));
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.rows.get(self.selected)
    }

    pub fn selected_index(&self) -> Option<usize> {
        (!self.rows.is_empty()).then_some(self.selected)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn flatten(items: &[Structure], depth: usize, out: &mut Vec<Row>) {
    for item in items {
        out.push(Row {
            identity: item.identity.clone(),
            name: item.name.clone(),
            kind: item.kind,
            signature: item.signature.clone(),
            checked: item.checked,
            depth,
            span: item.span,
        });
        flatten(&item.children, depth + 1, out);
    }
}

fn kind_tag(kind: StructureKind) -> (&'static str, Color) {
    match kind {
        StructureKind::Class => ("C", Color::Yellow),
        StructureKind::Function => ("F", Color::Cyan),
        StructureKind::Method => ("M", Color::Green),
        StructureKind::Unknown => ("?", Color::DarkGray),
    }
}

/// Ratatui component rendering the checkbox list.
#[derive(Debug, Default)]
pub struct StructureList;

impl StructureList {
    pub fn render(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        state: &StructureListState,
        display: &Display,
        has_focus: bool,
        title: &str,
    ) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Structures · {title}"));
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        if state.is_empty() {
            let placeholder = Paragraph::new("No structures discovered").style(
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            );
            frame.render_widget(placeholder, inner);
            return;
        }

        let mut items = Vec::with_capacity(state.rows().len());
        for row in state.rows() {
            let mut spans = Vec::new();
            spans.push(Span::raw("  ".repeat(row.depth)));
            spans.push(Span::styled(
                if row.checked { "[x] " } else { "[ ] " },
                Style::default().fg(if row.checked {
                    Color::Cyan
                } else {
                    Color::Gray
                }),
            ));

            if display.show_kinds {
                let (tag, color) = kind_tag(row.kind);
                spans.push(Span::styled(format!("{tag} "), Style::default().fg(color)));
            }

            let mut name_style = Style::default();
            if row.checked {
                name_style = name_style.add_modifier(Modifier::BOLD);
            }
            spans.push(Span::styled(row.name.clone(), name_style));

            if display.show_signatures {
                if let Some(signature) = &row.signature {
                    spans.push(Span::styled(
                        signature.clone(),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
            }

            items.push(ListItem::new(Line::from(spans)));
        }

        let highlight_style = if has_focus {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Gray)
                .add_modifier(Modifier::BOLD)
        };

        let list = List::new(items)
            .block(Block::default())
            .highlight_style(highlight_style)
            .highlight_symbol("▸ ");

        let mut list_state = ListState::default();
        if let Some(selected) = state.selected_index() {
            list_state.select(Some(selected));
        }
        frame.render_stateful_widget(list, inner, &mut list_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use crate::domain::model::Document;

    fn store_for(text: &str) -> SelectionStore {
        let document = Document::new(text);
        let mut store = SelectionStore::new();
        store.refresh(Some(&document), None);
        store
    }

    #[test]
    fn rebuild_keeps_cursor_on_the_same_identity() {
        let mut store = store_for("def a():\n    pass\ndef b():\n    pass\n");
        let mut state = StructureListState::from_store(&store);
        state.select_next();
        let anchored = state.selected_row().unwrap().identity.clone();

        store.toggle(&anchored);
        state.rebuild(&store);
        assert_eq!(state.selected_row().unwrap().identity, anchored);
        assert!(state.selected_row().unwrap().checked);
    }

    #[test]
    fn cursor_clamps_when_rows_shrink() {
        let store = store_for("def a():\n    pass\ndef b():\n    pass\n");
        let mut state = StructureListState::from_store(&store);
        state.select_next();

        let shrunk = store_for("def only():\n    pass\n");
        state.rebuild(&shrunk);
        assert_eq!(state.selected_row().unwrap().name, "only");
    }

    #[test]
    fn renders_checkbox_list() {
        let mut store = store_for("class Foo:\n    pass\ndef bar():\n    pass\n");
        let identity = store.items()[0].identity.clone();
        store.toggle(&identity);

        let state = StructureListState::from_store(&store);
        let backend = TestBackend::new(50, 10);
        let mut terminal = Terminal::new(backend).unwrap();

        terminal
            .draw(|frame| {
                let area = frame.size();
                StructureList.render(frame, area, &state, &Display::default(), true, "demo.py");
            })
            .unwrap();
    }

    #[test]
    fn renders_placeholder_when_empty() {
        let store = SelectionStore::new();
        let state = StructureListState::from_store(&store);
        let backend = TestBackend::new(40, 5);
        let mut terminal = Terminal::new(backend).unwrap();

        terminal
            .draw(|frame| {
                let area = frame.size();
                StructureList.render(frame, area, &state, &Display::default(), false, "empty");
            })
            .unwrap();
    }
}
