//! Built-in symbol discovery for Python-like sources.
//!
//! Plays the role an editor's language-aware symbol backend would: an
//! indentation-based outline with body-wide spans and methods nested under
//! their class. Documents it does not understand yield an empty outline and
//! the declaration fallback takes over.

use std::path::Path;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::app::outline::SymbolProvider;
use crate::domain::model::{Document, Position, Span, SymbolKind, SymbolNode};

static DEF_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*(?P<kw>class|def)\s+(?P<name>\w+)").expect("definition pattern")
});

static CONST_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<name>[A-Z][A-Z0-9_]*)\s*=").expect("constant pattern"));

/// Indentation-based outline provider for Python sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonOutline;

impl PythonOutline {
    /// The provider for a path, when its extension is one we understand.
    pub fn for_path(path: &Path) -> Option<Self> {
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext, "py" | "pyi"));
        supported.then_some(Self)
    }
}

impl SymbolProvider for PythonOutline {
    fn symbols(&self, document: &Document) -> Result<Vec<SymbolNode>> {
        let lines = index_lines(document.text());
        let mut cursor = 0usize;
        let nodes = parse_block(&lines, &mut cursor, None, false);
        tracing::debug!(count = nodes.len(), "python outline built");
        Ok(nodes)
    }
}

struct LineInfo<'a> {
    text: &'a str,
    indent: usize,
    chars: usize,
    blank: bool,
}

fn index_lines(text: &str) -> Vec<LineInfo<'_>> {
    text.lines()
        .map(|line| {
            let trimmed = line.trim_start();
            LineInfo {
                text: line,
                indent: line.chars().count() - trimmed.chars().count(),
                chars: line.chars().count(),
                blank: trimmed.is_empty(),
            }
        })
        .collect()
}

fn parse_block(
    lines: &[LineInfo<'_>],
    cursor: &mut usize,
    parent_indent: Option<usize>,
    inside_class: bool,
) -> Vec<SymbolNode> {
    let mut nodes = Vec::new();

    while *cursor < lines.len() {
        let line = &lines[*cursor];
        if line.blank {
            *cursor += 1;
            continue;
        }
        if let Some(parent) = parent_indent {
            if line.indent <= parent {
                break;
            }
        }

        if let Some(captures) = DEF_LINE.captures(line.text) {
            let declared_at = *cursor;
            let indent = line.indent;
            let is_class = &captures["kw"] == "class";
            let name = captures["name"].to_owned();

            *cursor += 1;
            let children = parse_block(lines, cursor, Some(indent), is_class);

            let end_line = last_nonblank(lines, declared_at, *cursor);
            let span = Span::new(
                Position::new(declared_at, indent),
                Position::new(end_line, lines[end_line].chars),
            );
            let kind = if is_class {
                SymbolKind::Class
            } else if inside_class {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            };

            nodes.push(SymbolNode {
                name,
                kind,
                span,
                children,
            });
            continue;
        }

        if parent_indent.is_none() {
            if let Some(captures) = CONST_LINE.captures(line.text) {
                nodes.push(SymbolNode {
                    name: captures["name"].to_owned(),
                    kind: SymbolKind::Variable,
                    span: Span::new(
                        Position::new(*cursor, 0),
                        Position::new(*cursor, line.chars),
                    ),
                    children: Vec::new(),
                });
            }
        }

        *cursor += 1;
    }

    nodes
}

fn last_nonblank(lines: &[LineInfo<'_>], start: usize, end: usize) -> usize {
    (start..end.min(lines.len()))
        .rev()
        .find(|idx| !lines[*idx].blank)
        .unwrap_or(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline(text: &str) -> Vec<SymbolNode> {
        PythonOutline.symbols(&Document::new(text)).unwrap()
    }

    #[test]
    fn provider_is_selected_by_extension() {
        assert!(PythonOutline::for_path(Path::new("demo.py")).is_some());
        assert!(PythonOutline::for_path(Path::new("stubs.pyi")).is_some());
        assert!(PythonOutline::for_path(Path::new("main.rs")).is_none());
        assert!(PythonOutline::for_path(Path::new("README")).is_none());
    }

    #[test]
    fn methods_nest_under_their_class() {
        let nodes = outline(
            "class Greeter:\n    def greet(self, name):\n        return name\n\n    def wave(self):\n        pass\n",
        );
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind, SymbolKind::Class);
        assert_eq!(nodes[0].children.len(), 2);
        assert!(
            nodes[0]
                .children
                .iter()
                .all(|child| child.kind == SymbolKind::Method)
        );
    }

    #[test]
    fn top_level_defs_are_functions() {
        let nodes = outline("def alpha():\n    return 1\n\ndef beta():\n    return 2\n");
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|node| node.kind == SymbolKind::Function));
    }

    #[test]
    fn nested_def_inside_def_is_a_function() {
        let nodes = outline("def outer():\n    def inner():\n        pass\n    return inner\n");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].children.len(), 1);
        assert_eq!(nodes[0].children[0].kind, SymbolKind::Function);
    }

    #[test]
    fn spans_cover_the_whole_body() {
        let doc = Document::new("def alpha():\n    return 1\n\nprint(alpha())\n");
        let nodes = PythonOutline.symbols(&doc).unwrap();
        assert_eq!(
            doc.slice(nodes[0].span),
            Some("def alpha():\n    return 1")
        );
    }

    #[test]
    fn trailing_blank_lines_stay_out_of_the_span() {
        let doc = Document::new("class Foo:\n    def bar(self):\n        pass\n\n\n");
        let nodes = PythonOutline.symbols(&doc).unwrap();
        let text = doc.slice(nodes[0].span).unwrap();
        assert!(text.ends_with("pass"));
    }

    #[test]
    fn module_constants_are_reported_as_variables() {
        let nodes = outline("LIMIT = 10\n\ndef alpha():\n    pass\n");
        assert_eq!(nodes[0].kind, SymbolKind::Variable);
        assert_eq!(nodes[0].name, "LIMIT");
        assert_eq!(nodes[1].kind, SymbolKind::Function);
    }

    #[test]
    fn unindented_code_after_a_body_ends_the_block() {
        let nodes = outline("def alpha():\n    pass\nprint(1)\ndef beta():\n    pass\n");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].name, "beta");
    }
}
