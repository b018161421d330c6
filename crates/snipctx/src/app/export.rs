//! Export assembly and delivery.
//!
//! The clipboard always receives the exact blank-line join produced by the
//! selection store; the optional file output is an annotated markdown
//! rendering of the same sections.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use minijinja::Environment;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::app::outline;
use crate::app::selection::SelectionStore;
use crate::app::tokens::SelectionTokenSummary;
use crate::domain::model::Document;
use crate::infra::clipboard::Clipboard;

/// Runtime options controlling export behavior.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub copy_to_clipboard: bool,
    pub output_path: Option<PathBuf>,
}

/// What happened to an export request. Callers surface a distinct message
/// per variant: "copied" is not the same as "nothing selected".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    NothingSelected,
    Delivered(ExportResult),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    /// The exact joined text, as handed to the clipboard.
    pub payload: String,
    pub structures: usize,
    pub copied_to_clipboard: bool,
    pub output_path: Option<PathBuf>,
}

/// Renders and delivers the checked selection.
pub struct Exporter {
    env: Environment<'static>,
    clipboard: Mutex<Clipboard>,
}

impl Exporter {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("clipped_markdown", MARKDOWN_TEMPLATE)
            .map_err(|err| anyhow!("failed to register markdown template: {err}"))?;
        Ok(Self {
            env,
            clipboard: Mutex::new(Clipboard::new()),
        })
    }

    /// Deliver the checked selection per `options`. The clipboard hand-off
    /// is fire-and-forget: a failure is logged and reflected in the result,
    /// never fatal.
    pub fn export(
        &self,
        store: &SelectionStore,
        document: &Document,
        summary: Option<&SelectionTokenSummary>,
        options: &ExportOptions,
    ) -> Result<ExportOutcome> {
        let structures = store.checked().len();
        if structures == 0 {
            return Ok(ExportOutcome::NothingSelected);
        }

        let payload = store.export_selected(document);
        if payload.is_empty() {
            return Ok(ExportOutcome::NothingSelected);
        }

        let mut copied_to_clipboard = false;
        if options.copy_to_clipboard {
            match self.clipboard.lock().unwrap().copy(&payload) {
                Ok(()) => copied_to_clipboard = true,
                Err(err) => tracing::warn!(error = %err, "clipboard hand-off failed"),
            }
        }

        if let Some(path) = &options.output_path {
            let rendered = self.render_markdown(store, document, summary)?;
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create export directory: {}", parent.display())
                    })?;
                }
            }
            fs::write(path, rendered)
                .with_context(|| format!("failed to write export to {}", path.display()))?;
        }

        Ok(ExportOutcome::Delivered(ExportResult {
            payload,
            structures,
            copied_to_clipboard,
            output_path: options.output_path.clone(),
        }))
    }

    /// Markdown rendering of the checked sections with per-structure
    /// headings and fenced code blocks.
    pub fn render_markdown(
        &self,
        store: &SelectionStore,
        document: &Document,
        summary: Option<&SelectionTokenSummary>,
    ) -> Result<String> {
        let context = build_context(store, document, summary)?;
        let template = self
            .env
            .get_template("clipped_markdown")
            .expect("template registered in new()");
        template
            .render(&context)
            .map_err(|err| anyhow!("failed to render markdown export: {err}"))
    }
}

fn build_context(
    store: &SelectionStore,
    document: &Document,
    summary: Option<&SelectionTokenSummary>,
) -> Result<TemplateContext> {
    let generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("failed to format export timestamp")?;

    let mut sections = Vec::new();
    for item in store.checked() {
        let contents = match outline::extract_text(document, item.span) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::warn!(identity = %item.identity, error = %err, "skipping stale span");
                continue;
            }
        };
        sections.push(TemplateSection {
            name: item.name.clone(),
            kind: item.kind.as_str(),
            signature: item.signature.clone(),
            start_line: item.span.start.line + 1,
            end_line: item.span.end.line + 1,
            contents,
        });
    }

    let tokens = summary.map(|summary| TemplateTokens {
        model: summary.model.as_str(),
        token_budget: summary.token_budget,
        total_tokens: summary.total_tokens,
        total_characters: summary.total_characters,
    });

    Ok(TemplateContext {
        generated_at,
        sections,
        tokens,
    })
}

#[derive(Serialize)]
struct TemplateContext {
    generated_at: String,
    sections: Vec<TemplateSection>,
    tokens: Option<TemplateTokens>,
}

#[derive(Serialize)]
struct TemplateSection {
    name: String,
    kind: &'static str,
    signature: Option<String>,
    start_line: usize,
    end_line: usize,
    contents: String,
}

#[derive(Serialize)]
struct TemplateTokens {
    model: &'static str,
    token_budget: u32,
    total_tokens: usize,
    total_characters: usize,
}

const MARKDOWN_TEMPLATE: &str = r#"# Clipped Structures

Generated at: {{ generated_at }}

{% if tokens %}
Token usage: {{ tokens.total_tokens }} / {{ tokens.token_budget }} ({{ tokens.model }}), {{ tokens.total_characters }} characters.
{% endif %}

{% for section in sections %}
## {{ section.kind }} {{ section.name }}{% if section.signature %}{{ section.signature }}{% endif %}

_Lines {{ section.start_line }}-{{ section.end_line }}_

```text
{{ section.contents }}
```

{% endfor %}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn checked_store(text: &str) -> (SelectionStore, Document) {
        let document = Document::new(text);
        let mut store = SelectionStore::new();
        store.refresh(Some(&document), None);
        let identities: Vec<_> = store
            .items()
            .iter()
            .map(|item| item.identity.clone())
            .collect();
        for identity in identities {
            store.toggle(&identity);
        }
        (store, document)
    }

    #[test]
    fn nothing_selected_is_its_own_outcome() {
        let document = Document::new("def alpha():\n    pass\n");
        let mut store = SelectionStore::new();
        store.refresh(Some(&document), None);

        let exporter = Exporter::new().unwrap();
        let outcome = exporter
            .export(&store, &document, None, &ExportOptions::default())
            .unwrap();
        assert_eq!(outcome, ExportOutcome::NothingSelected);
    }

    #[test]
    fn delivered_payload_is_the_exact_join() {
        let (store, document) = checked_store("def a():\n    pass\ndef b():\n    pass\n");
        let exporter = Exporter::new().unwrap();
        let outcome = exporter
            .export(&store, &document, None, &ExportOptions::default())
            .unwrap();

        let ExportOutcome::Delivered(result) = outcome else {
            panic!("expected delivery");
        };
        assert_eq!(result.payload, "def a():\n\ndef b():");
        assert_eq!(result.structures, 2);
        assert!(!result.copied_to_clipboard);
    }

    #[test]
    fn markdown_render_lists_each_section() {
        let (store, document) = checked_store("class Foo:\n    pass\ndef bar(a):\n    pass\n");
        let exporter = Exporter::new().unwrap();
        let rendered = exporter.render_markdown(&store, &document, None).unwrap();

        assert!(rendered.contains("# Clipped Structures"));
        assert!(rendered.contains("## class Foo"));
        assert!(rendered.contains("## function bar(a)"));
        assert!(rendered.contains("class Foo:"));
        assert!(rendered.contains("_Lines 1-1_"));
    }

    #[test]
    fn export_writes_markdown_file() {
        let (store, document) = checked_store("def alpha():\n    pass\n");
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("nested/context.md");

        let exporter = Exporter::new().unwrap();
        let options = ExportOptions {
            copy_to_clipboard: false,
            output_path: Some(output.clone()),
        };
        let outcome = exporter.export(&store, &document, None, &options).unwrap();

        assert!(matches!(outcome, ExportOutcome::Delivered(_)));
        let written = fs::read_to_string(output).unwrap();
        assert!(written.contains("def alpha()"));
    }
}
