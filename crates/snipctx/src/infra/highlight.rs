//! Syntax highlighting for the preview pane, built on syntect.

use once_cell::sync::Lazy;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Style as SyntectStyle, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

const DEFAULT_THEME: &str = "base16-ocean.dark";

static ASSETS: Lazy<(SyntaxSet, ThemeSet)> =
    Lazy::new(|| (SyntaxSet::load_defaults_newlines(), ThemeSet::load_defaults()));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// One styled run of text within a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub content: String,
    pub foreground: Option<RgbColor>,
    pub bold: bool,
    pub italic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightLine {
    pub spans: Vec<HighlightSpan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightMode {
    Highlighted,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightResult {
    pub lines: Vec<HighlightLine>,
    pub mode: HighlightMode,
}

impl HighlightResult {
    pub fn plain(lines: &[String]) -> Self {
        HighlightResult {
            lines: lines
                .iter()
                .map(|line| HighlightLine {
                    spans: vec![HighlightSpan {
                        content: line.clone(),
                        foreground: None,
                        bold: false,
                        italic: false,
                    }],
                })
                .collect(),
            mode: HighlightMode::Plain,
        }
    }
}

/// Highlights preview lines using the bundled syntax and theme sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct Highlighter;

impl Highlighter {
    pub fn new() -> Self {
        Self
    }

    /// Highlight `lines` as the language matching `extension`, degrading to
    /// plain text for unknown languages or highlighter errors.
    pub fn highlight(&self, extension: &str, lines: &[String], theme: &str) -> HighlightResult {
        let (syntax_set, _) = &*ASSETS;
        let Some(syntax) = syntax_set.find_syntax_by_extension(extension) else {
            return HighlightResult::plain(lines);
        };

        match highlight_with(syntax, lines, resolve_theme(theme)) {
            Ok(highlighted) => HighlightResult {
                lines: highlighted,
                mode: HighlightMode::Highlighted,
            },
            Err(err) => {
                tracing::warn!(error = %err, extension, "highlight failed");
                HighlightResult::plain(lines)
            }
        }
    }
}

fn highlight_with(
    syntax: &SyntaxReference,
    lines: &[String],
    theme: &Theme,
) -> anyhow::Result<Vec<HighlightLine>> {
    let (syntax_set, _) = &*ASSETS;
    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut result = Vec::with_capacity(lines.len());
    for line in lines {
        let segments = highlighter.highlight_line(line, syntax_set)?;
        let spans = segments.into_iter().map(convert_segment).collect();
        result.push(HighlightLine { spans });
    }
    Ok(result)
}

fn resolve_theme(requested: &str) -> &'static Theme {
    let (_, theme_set) = &*ASSETS;
    theme_set
        .themes
        .get(requested)
        .or_else(|| {
            tracing::debug!(requested, "theme not found, using default");
            theme_set.themes.get(DEFAULT_THEME)
        })
        .or_else(|| theme_set.themes.values().next())
        .expect("syntect default themes are non-empty")
}

fn convert_segment((style, text): (SyntectStyle, &str)) -> HighlightSpan {
    let foreground = (style.foreground.a != 0).then_some(RgbColor {
        r: style.foreground.r,
        g: style.foreground.g,
        b: style.foreground.b,
    });
    HighlightSpan {
        content: text.to_owned(),
        foreground,
        bold: style.font_style.contains(FontStyle::BOLD),
        italic: style.font_style.contains(FontStyle::ITALIC),
    }
}
