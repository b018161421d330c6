//! Domain models for documents, discovered structures, and symbol outlines.

use std::fmt;

/// Zero-based line/column location. Columns count Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Source range between two positions, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Category of a selectable structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureKind {
    Class,
    Function,
    Method,
    Unknown,
}

impl StructureKind {
    /// Stable identifier used in identities and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            StructureKind::Class => "class",
            StructureKind::Function => "function",
            StructureKind::Method => "method",
            StructureKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered code structure plus its selection state.
///
/// The full structure list is rebuilt on every scan; `checked` is the only
/// field carried across scans, and only when the identity recurs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Structure {
    /// Deterministic key, unique within one scan result.
    pub identity: String,
    pub name: String,
    pub kind: StructureKind,
    /// Valid only against the document version of the most recent scan.
    pub span: Span,
    /// First parenthesized group found inside the structure's own span.
    pub signature: Option<String>,
    pub checked: bool,
    /// Nested structures, present only when the discovery backend nests.
    pub children: Vec<Structure>,
}

impl Structure {
    /// Identity derived from name, kind, and start position. Two structures
    /// cannot share a start position, which makes this unique per scan.
    pub fn identity_for(name: &str, kind: StructureKind, start: Position) -> String {
        format!("{}:{}:{}:{}", name, kind.as_str(), start.line, start.column)
    }
}

/// Symbol categories reported by a discovery backend. Wider than
/// [`StructureKind`]: non-qualifying nodes are traversed, not emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Class,
    Function,
    Method,
    Module,
    Variable,
    Other,
}

impl SymbolKind {
    /// The structure kind this symbol qualifies as, if any.
    pub fn as_structure_kind(&self) -> Option<StructureKind> {
        match self {
            SymbolKind::Class => Some(StructureKind::Class),
            SymbolKind::Function => Some(StructureKind::Function),
            SymbolKind::Method => Some(StructureKind::Method),
            SymbolKind::Module | SymbolKind::Variable | SymbolKind::Other => None,
        }
    }
}

/// A named span reported by a symbol-discovery backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolNode {
    pub name: String,
    pub kind: SymbolKind,
    pub span: Span,
    pub children: Vec<SymbolNode>,
}

/// In-memory snapshot of the active document's text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    text: String,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Byte offset of a position, or `None` when the position lies outside
    /// the document. The position one past the final character is valid.
    pub fn offset_at(&self, position: Position) -> Option<usize> {
        let mut line = 0usize;
        let mut column = 0usize;
        for (idx, ch) in self.text.char_indices() {
            if line == position.line && column == position.column {
                return Some(idx);
            }
            if ch == '\n' {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        (line == position.line && column == position.column).then_some(self.text.len())
    }

    /// Position of a byte offset. Offsets past the end clamp to the final
    /// position.
    pub fn position_at(&self, offset: usize) -> Position {
        let mut line = 0usize;
        let mut column = 0usize;
        for (idx, ch) in self.text.char_indices() {
            if idx >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        Position::new(line, column)
    }

    /// The exact substring delimited by `span`: no trimming, no
    /// normalization. `None` when either endpoint falls outside the document.
    pub fn slice(&self, span: Span) -> Option<&str> {
        let start = self.offset_at(span.start)?;
        let end = self.offset_at(span.end)?;
        if start > end {
            return None;
        }
        self.text.get(start..end)
    }
}
