use std::fs;

use snipctx::app::export::{ExportOptions, ExportOutcome, Exporter};
use snipctx::app::selection::SelectionStore;
use snipctx::app::tokens::{TokenEstimator, TokenModel};
use snipctx::domain::model::Document;
use snipctx::infra::symbols::PythonOutline;

fn refreshed_store(document: &Document) -> SelectionStore {
    let mut store = SelectionStore::new();
    store.refresh(Some(document), Some(&PythonOutline));
    store
}

fn toggle_by_name(store: &mut SelectionStore, name: &str) {
    let identity = store
        .items()
        .iter()
        .flat_map(flatten)
        .find(|item| item.name == name)
        .map(|item| item.identity.clone())
        .expect("structure exists");
    assert!(store.toggle(&identity));
}

fn flatten(
    item: &snipctx::domain::model::Structure,
) -> Vec<&snipctx::domain::model::Structure> {
    let mut out = vec![item];
    for child in &item.children {
        out.extend(flatten(child));
    }
    out
}

#[test]
fn scan_toggle_export_roundtrip() {
    let document = Document::new("def alpha():\n    return 1\n\ndef beta():\n    return 2\n");
    let mut store = refreshed_store(&document);

    toggle_by_name(&mut store, "alpha");
    toggle_by_name(&mut store, "beta");

    let payload = store.export_selected(&document);
    insta::assert_snapshot!(payload, @r"
    def alpha():
        return 1

    def beta():
        return 2
    ");
}

#[test]
fn method_selection_exports_the_exact_body() {
    let document = Document::new("class Greeter:\n    def greet(self, name):\n        return name\n");
    let mut store = refreshed_store(&document);

    toggle_by_name(&mut store, "greet");

    assert_eq!(
        store.export_selected(&document),
        "def greet(self, name):\n        return name"
    );
}

#[test]
fn checked_state_survives_an_append_only_edit() {
    let document = Document::new("def alpha():\n    return 1\n\ndef beta():\n    return 2\n");
    let mut store = refreshed_store(&document);
    toggle_by_name(&mut store, "alpha");

    let edited = Document::new(format!("{}\n# trailing note\n", document.text()));
    store.refresh(Some(&edited), Some(&PythonOutline));

    let checked: Vec<_> = store.checked().iter().map(|s| s.name.clone()).collect();
    assert_eq!(checked, vec!["alpha"]);
}

#[test]
fn leading_insertion_resets_checked_state() {
    // Identity is position sensitive: shifting a structure down one line
    // produces a new identity and drops the selection.
    let document = Document::new("def alpha():\n    return 1\n");
    let mut store = refreshed_store(&document);
    toggle_by_name(&mut store, "alpha");

    let shifted = Document::new(format!("\n{}", document.text()));
    store.refresh(Some(&shifted), Some(&PythonOutline));

    assert!(store.checked().is_empty());
}

#[test]
fn markdown_export_includes_token_summary() {
    let document = Document::new("def alpha():\n    return 1\n");
    let mut store = refreshed_store(&document);
    toggle_by_name(&mut store, "alpha");

    let estimator = TokenEstimator::new(TokenModel::CharacterFallback);
    let sections = vec![("alpha".to_owned(), store.export_selected(&document))];
    let summary = estimator.summarize(&sections);

    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("context.md");
    let options = ExportOptions {
        copy_to_clipboard: false,
        output_path: Some(output.clone()),
    };

    let exporter = Exporter::new().unwrap();
    let outcome = exporter
        .export(&store, &document, Some(&summary), &options)
        .unwrap();
    assert!(matches!(outcome, ExportOutcome::Delivered(_)));

    let written = fs::read_to_string(output).unwrap();
    assert!(written.contains("## function alpha"));
    assert!(written.contains("Token usage:"));
    assert!(written.contains("def alpha():"));
}
