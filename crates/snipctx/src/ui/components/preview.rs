//! Preview pane for the selected structure's source span.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::domain::model::Document;
use crate::infra::highlight::{HighlightLine, Highlighter};
use crate::ui::components::structure_list::Row;

/// Renders a syntax highlighted excerpt of the currently selected structure.
#[derive(Debug, Default)]
pub struct Preview {
    highlighter: Highlighter,
}

impl Preview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        document: &Document,
        row: Option<&Row>,
        extension: &str,
        theme: &str,
        max_lines: usize,
    ) {
        let block = Block::default().borders(Borders::ALL).title("Preview");
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let Some(row) = row else {
            self.render_notice(frame, inner, "Nothing selected");
            return;
        };

        let Some(text) = document.slice(row.span) else {
            // The span is stale against the live document; the next refresh
            // will rebuild the list.
            self.render_notice(frame, inner, "Span is stale, refresh pending");
            return;
        };

        let mut lines: Vec<String> = text.lines().map(str::to_owned).collect();
        let truncated = max_lines > 0 && lines.len() > max_lines;
        if truncated {
            lines.truncate(max_lines);
        }

        let highlighted = self.highlighter.highlight(extension, &lines, theme);
        let mut rendered: Vec<Line<'_>> = highlighted.lines.iter().map(to_line).collect();
        if truncated {
            rendered.push(Line::from(Span::styled(
                "…",
                Style::default().fg(Color::DarkGray),
            )));
        }

        frame.render_widget(Paragraph::new(rendered), inner);
    }

    fn render_notice(&self, frame: &mut Frame<'_>, area: Rect, notice: &str) {
        let paragraph = Paragraph::new(notice.to_owned()).style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );
        frame.render_widget(paragraph, area);
    }
}

fn to_line(line: &HighlightLine) -> Line<'static> {
    let spans = line
        .spans
        .iter()
        .map(|span| {
            let mut style = Style::default();
            if let Some(color) = span.foreground {
                style = style.fg(Color::Rgb(color.r, color.g, color.b));
            }
            if span.bold {
                style = style.add_modifier(Modifier::BOLD);
            }
            if span.italic {
                style = style.add_modifier(Modifier::ITALIC);
            }
            Span::styled(span.content.clone(), style)
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}
