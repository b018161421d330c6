//! Outline discovery and reconciliation.
//!
//! A scan turns the current document into a fresh list of [`Structure`]s,
//! matching each against the previous list by identity so user selections
//! survive re-scans of a mutating document.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::errors::DomainError;
use crate::domain::model::{Document, Span, Structure, StructureKind, SymbolNode};

/// Declaration heuristic used when no symbol backend is available. Matches
/// `class Name:` / `def name(...):` style declarations; the span covers the
/// matched declaration text only.
static DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:class|def)\s+(\w+)(?:\(.*?\))?:").expect("declaration pattern"));

static PAREN_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").expect("paren pattern"));

/// Source of named spans for a document.
///
/// Implementations may nest children (methods inside a class). An empty
/// result means the document is not supported and the declaration fallback
/// takes over for that scan.
pub trait SymbolProvider {
    fn symbols(&self, document: &Document) -> Result<Vec<SymbolNode>>;
}

/// Run one full discovery pass: query the provider when present, fall back
/// to the declaration scan on failure or an empty result, and carry checked
/// state over from `previous` by identity.
pub fn discover(
    document: &Document,
    previous: &[Structure],
    provider: Option<&dyn SymbolProvider>,
) -> Vec<Structure> {
    let symbols = provider.and_then(|p| match p.symbols(document) {
        Ok(nodes) => Some(nodes),
        Err(err) => {
            tracing::warn!(error = %err, "symbol provider failed, using declaration fallback");
            None
        }
    });
    scan(document, previous, symbols.as_deref())
}

/// Build the current structure list from a symbol tree or, in its absence,
/// from the declaration fallback. Ordering is document order (start position,
/// ties by discovery order) and is deterministic for identical input.
pub fn scan(
    document: &Document,
    previous: &[Structure],
    symbols: Option<&[SymbolNode]>,
) -> Vec<Structure> {
    let mut seen = HashSet::new();
    let mut items = match symbols {
        Some(nodes) if !nodes.is_empty() => from_symbols(document, nodes, &mut seen),
        _ => from_declarations(document, &mut seen),
    };

    let mut carried = HashMap::new();
    collect_checked(previous, &mut carried);
    apply_checked(&mut items, &carried);
    items
}

/// The exact substring of the document delimited by `span`.
pub fn extract_text(document: &Document, span: Span) -> Result<String, DomainError> {
    document
        .slice(span)
        .map(str::to_owned)
        .ok_or(DomainError::SpanOutOfRange)
}

fn from_symbols(
    document: &Document,
    nodes: &[SymbolNode],
    seen: &mut HashSet<String>,
) -> Vec<Structure> {
    let mut items = Vec::new();
    for node in nodes {
        // Recurse first so qualifying descendants of an unqualified wrapper
        // are still captured.
        let children = from_symbols(document, &node.children, seen);

        let Some(kind) = node.kind.as_structure_kind() else {
            items.extend(children);
            continue;
        };

        let identity = Structure::identity_for(&node.name, kind, node.span.start);
        if !seen.insert(identity.clone()) {
            items.extend(children);
            continue;
        }

        items.push(Structure {
            identity,
            name: node.name.clone(),
            kind,
            span: node.span,
            signature: signature_of(document, node.span, kind),
            checked: false,
            children,
        });
    }
    // Stable sort: ties keep discovery order.
    items.sort_by_key(|item| item.span.start);
    items
}

fn from_declarations(document: &Document, seen: &mut HashSet<String>) -> Vec<Structure> {
    let mut items = Vec::new();
    for captures in DECLARATION.captures_iter(document.text()) {
        let matched = captures.get(0).expect("whole match");
        let name = captures.get(1).expect("name group").as_str();
        let kind = if matched.as_str().starts_with("class") {
            StructureKind::Class
        } else {
            StructureKind::Function
        };

        let span = Span::new(
            document.position_at(matched.start()),
            document.position_at(matched.end()),
        );
        let identity = Structure::identity_for(name, kind, span.start);
        if !seen.insert(identity.clone()) {
            continue;
        }

        items.push(Structure {
            identity,
            name: name.to_owned(),
            kind,
            span,
            signature: signature_of(document, span, kind),
            checked: false,
            children: Vec::new(),
        });
    }
    items
}

/// Re-scan the structure's own span for the first parenthesized group.
/// Failure degrades only this structure's signature, never the whole scan.
fn signature_of(document: &Document, span: Span, kind: StructureKind) -> Option<String> {
    if !matches!(kind, StructureKind::Function | StructureKind::Method) {
        return None;
    }
    let Some(text) = document.slice(span) else {
        tracing::debug!("signature extraction skipped: span outside document");
        return None;
    };
    PAREN_GROUP.find(text).map(|m| m.as_str().to_owned())
}

fn collect_checked(items: &[Structure], out: &mut HashMap<String, bool>) {
    for item in items {
        out.insert(item.identity.clone(), item.checked);
        collect_checked(&item.children, out);
    }
}

fn apply_checked(items: &mut [Structure], carried: &HashMap<String, bool>) {
    for item in items {
        item.checked = carried.get(&item.identity).copied().unwrap_or(false);
        apply_checked(&mut item.children, carried);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Position, SymbolKind};
    use anyhow::anyhow;

    struct FailingProvider;

    impl SymbolProvider for FailingProvider {
        fn symbols(&self, _document: &Document) -> Result<Vec<SymbolNode>> {
            Err(anyhow!("backend unavailable"))
        }
    }

    fn sample_document() -> Document {
        Document::new("class Foo:\n    pass\n\n\n\ndef bar(a, b):\n    return a\n")
    }

    fn node(name: &str, kind: SymbolKind, span: Span, children: Vec<SymbolNode>) -> SymbolNode {
        SymbolNode {
            name: name.to_owned(),
            kind,
            span,
            children,
        }
    }

    #[test]
    fn initial_scan_is_ordered_and_unchecked() {
        let doc = sample_document();
        let items = scan(&doc, &[], None);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Foo");
        assert_eq!(items[0].kind, StructureKind::Class);
        assert_eq!(items[1].name, "bar");
        assert_eq!(items[1].kind, StructureKind::Function);
        assert!(items.iter().all(|item| !item.checked));
    }

    #[test]
    fn scan_is_deterministic() {
        let doc = sample_document();
        let first = scan(&doc, &[], None);
        let second = scan(&doc, &[], None);
        assert_eq!(first, second);
    }

    #[test]
    fn checked_state_survives_unrelated_edits() {
        let doc = sample_document();
        let mut items = scan(&doc, &[], None);
        items[0].checked = true;

        // Appending below both declarations shifts neither start position.
        let edited = Document::new(format!("{}\n# trailing comment\n", doc.text()));
        let rescanned = scan(&edited, &items, None);
        assert!(rescanned[0].checked);
        assert!(!rescanned[1].checked);
    }

    #[test]
    fn line_shift_resets_checked_state() {
        // Identity includes the start position, so an insertion above the
        // structure produces a new identity and the selection is lost. This
        // asserts the documented behavior.
        let doc = sample_document();
        let mut items = scan(&doc, &[], None);
        items[0].checked = true;

        let shifted = Document::new(format!("\n{}", doc.text()));
        let rescanned = scan(&shifted, &items, None);
        assert_eq!(rescanned[0].name, "Foo");
        assert!(!rescanned[0].checked);
    }

    #[test]
    fn declaration_span_covers_exactly_the_match() {
        let doc = sample_document();
        let items = scan(&doc, &[], None);
        assert_eq!(extract_text(&doc, items[0].span).unwrap(), "class Foo:");
        assert_eq!(
            extract_text(&doc, items[1].span).unwrap(),
            "def bar(a, b):"
        );
    }

    #[test]
    fn fallback_extracts_signatures_for_functions_only() {
        let doc = sample_document();
        let items = scan(&doc, &[], None);
        assert_eq!(items[0].signature, None);
        assert_eq!(items[1].signature.as_deref(), Some("(a, b)"));
    }

    #[test]
    fn symbol_walk_keeps_nesting_and_hoists_through_wrappers() {
        let doc = Document::new("module wrapper\nclass Foo:\n    def bar(self):\n        pass\n");
        let method_span = Span::new(Position::new(2, 4), Position::new(3, 12));
        let class_span = Span::new(Position::new(1, 0), Position::new(3, 12));
        let wrapper_span = Span::new(Position::new(0, 0), Position::new(3, 12));

        let tree = vec![node(
            "wrapper",
            SymbolKind::Module,
            wrapper_span,
            vec![node(
                "Foo",
                SymbolKind::Class,
                class_span,
                vec![node("bar", SymbolKind::Method, method_span, Vec::new())],
            )],
        )];

        let items = scan(&doc, &[], Some(&tree));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Foo");
        assert_eq!(items[0].children.len(), 1);
        assert_eq!(items[0].children[0].name, "bar");
        assert_eq!(items[0].children[0].kind, StructureKind::Method);
    }

    #[test]
    fn method_inside_unqualified_wrapper_is_still_emitted() {
        let doc = Document::new("x\ndef lonely():\n    pass\n");
        let span = Span::new(Position::new(1, 0), Position::new(2, 8));
        let tree = vec![node(
            "wrapper",
            SymbolKind::Other,
            Span::new(Position::new(0, 0), Position::new(2, 8)),
            vec![node("lonely", SymbolKind::Function, span, Vec::new())],
        )];

        let items = scan(&doc, &[], Some(&tree));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "lonely");
    }

    #[test]
    fn duplicate_identities_keep_the_first_occurrence() {
        let doc = Document::new("def twice():\n    pass\n");
        let span = Span::new(Position::new(0, 0), Position::new(1, 8));
        let tree = vec![
            node("twice", SymbolKind::Function, span, Vec::new()),
            node("twice", SymbolKind::Function, span, Vec::new()),
        ];
        let items = scan(&doc, &[], Some(&tree));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn empty_symbol_result_falls_back_to_declarations() {
        let doc = sample_document();
        let items = scan(&doc, &[], Some(&[]));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn provider_failure_falls_back_to_declarations() {
        let doc = sample_document();
        let items = discover(&doc, &[], Some(&FailingProvider));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Foo");
    }

    #[test]
    fn bad_symbol_span_degrades_signature_not_scan() {
        let doc = Document::new("def short():\n    pass\n");
        let bogus = Span::new(Position::new(40, 0), Position::new(41, 0));
        let tree = vec![node("ghost", SymbolKind::Function, bogus, Vec::new())];
        let items = scan(&doc, &[], Some(&tree));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].signature, None);
    }

    #[test]
    fn checked_carry_reaches_nested_children() {
        let doc = Document::new("class Foo:\n    def bar(self):\n        pass\n");
        let method_span = Span::new(Position::new(1, 4), Position::new(2, 12));
        let class_span = Span::new(Position::new(0, 0), Position::new(2, 12));
        let tree = vec![node(
            "Foo",
            SymbolKind::Class,
            class_span,
            vec![node("bar", SymbolKind::Method, method_span, Vec::new())],
        )];

        let mut items = scan(&doc, &[], Some(&tree));
        items[0].children[0].checked = true;

        let rescanned = scan(&doc, &items, Some(&tree));
        assert!(!rescanned[0].checked);
        assert!(rescanned[0].children[0].checked);
    }

    #[test]
    fn extract_text_is_exact_for_stale_spans() {
        let doc = Document::new("short\n");
        let stale = Span::new(Position::new(9, 0), Position::new(9, 5));
        assert_eq!(extract_text(&doc, stale), Err(DomainError::SpanOutOfRange));
    }
}
