//! Selection summary component.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};

use crate::app::tokens::{SectionTokenEstimate, SelectionTokenSummary};

/// Displays aggregated selection statistics including token usage.
#[derive(Debug, Default)]
pub struct Summary {
    latest: Option<SelectionTokenSummary>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored summary with fresh data from the estimator.
    pub fn update(&mut self, summary: SelectionTokenSummary) {
        self.latest = Some(summary);
    }

    /// Clear the rendered state when the selection empties.
    pub fn clear(&mut self) {
        self.latest = None;
    }

    pub fn render(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default().title("Selection").borders(Borders::ALL);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        match &self.latest {
            Some(summary) => self.render_summary(frame, inner, summary),
            None => {
                let placeholder = Paragraph::new("Nothing checked")
                    .wrap(Wrap { trim: true })
                    .style(Style::default().fg(Color::DarkGray));
                frame.render_widget(placeholder, inner);
            }
        }
    }

    fn render_summary(&self, frame: &mut Frame<'_>, area: Rect, summary: &SelectionTokenSummary) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(1)])
            .split(area);

        let header = Paragraph::new(header_lines(summary)).wrap(Wrap { trim: true });
        frame.render_widget(header, layout[0]);

        let items = build_item_list(&summary.items);
        let list = List::new(items).block(Block::default());
        frame.render_widget(list, layout[1]);
    }
}

fn header_lines(summary: &SelectionTokenSummary) -> Vec<Line<'static>> {
    let usage_ratio = if summary.token_budget == 0 {
        0.0
    } else {
        summary.total_tokens as f64 / summary.token_budget as f64
    };
    let over_budget =
        summary.token_budget != 0 && summary.total_tokens as u32 >= summary.token_budget;
    let status_color = if over_budget {
        Color::Red
    } else if usage_ratio >= 0.9 {
        Color::Yellow
    } else {
        Color::Green
    };

    vec![
        Line::from(vec![
            Span::styled("Model", Style::default().fg(Color::Gray)),
            Span::raw(": "),
            Span::styled(
                format!("{} · {}", summary.model.provider(), summary.model.as_str()),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        Line::from(vec![
            Span::styled("Usage", Style::default().fg(Color::Gray)),
            Span::raw(": "),
            Span::styled(
                format!("{} tokens", summary.total_tokens),
                Style::default().fg(status_color),
            ),
            Span::raw(format!(
                " / {} · {} chars",
                summary.token_budget, summary.total_characters
            )),
        ]),
    ]
}

fn build_item_list(items: &[SectionTokenEstimate]) -> Vec<ListItem<'static>> {
    items
        .iter()
        .map(|item| {
            let line = Line::from(vec![
                Span::raw(item.label.clone()),
                Span::styled(
                    format!(" – {} tokens", item.tokens),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            ListItem::new(line)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use crate::app::tokens::{TokenEstimator, TokenModel};

    #[test]
    fn renders_empty_state_without_summary() {
        let backend = TestBackend::new(40, 5);
        let mut terminal = Terminal::new(backend).unwrap();
        let summary = Summary::new();
        terminal
            .draw(|frame| {
                let area = frame.size();
                summary.render(frame, area);
            })
            .unwrap();
    }

    #[test]
    fn renders_summary_with_items() {
        let backend = TestBackend::new(60, 8);
        let mut terminal = Terminal::new(backend).unwrap();
        let mut summary = Summary::new();

        let estimator = TokenEstimator::new(TokenModel::CharacterFallback);
        let sections = vec![("alpha".to_owned(), "def alpha():\n    pass".to_owned())];
        summary.update(estimator.summarize(&sections));

        terminal
            .draw(|frame| {
                let area = frame.size();
                summary.render(frame, area);
            })
            .unwrap();
    }
}
