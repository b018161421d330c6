use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use snipctx::app::export::{ExportOptions, ExportOutcome, Exporter};
use snipctx::app::outline::SymbolProvider;
use snipctx::app::selection::SelectionStore;
use snipctx::app::tokens::TokenEstimator;
use snipctx::domain::model::{Document, Structure};
use snipctx::infra::config::Config;
use snipctx::infra::symbols::PythonOutline;
use snipctx::ui::app::UiApp;

#[derive(Parser)]
#[command(
    name = "snipctx",
    version,
    about = "Browse a file's code structures and copy checked ones as prompt context"
)]
struct Cli {
    /// Source file to outline
    file: PathBuf,

    /// Print the discovered outline and exit
    #[arg(long)]
    list: bool,

    /// With --list, emit the outline as JSON
    #[arg(long, requires = "list")]
    json: bool,

    /// Structure names to check before exporting
    #[arg(long, value_delimiter = ',')]
    names: Vec<String>,

    /// Print the export payload to stdout and exit
    #[arg(long)]
    print: bool,

    /// Copy the export payload to the system clipboard and exit
    #[arg(long)]
    clipboard: bool,

    /// Render an annotated markdown export to this path and exit
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn headless(&self) -> bool {
        self.list || self.print || self.clipboard || self.output.is_some()
    }
}

fn main() -> Result<()> {
    snipctx::init();
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "failed to load configuration, using defaults");
        Config::default()
    });

    if cli.headless() {
        headless(&cli, &config)
    } else {
        UiApp::new(cli.file.clone(), config).run()
    }
}

fn headless(cli: &Cli, config: &Config) -> Result<()> {
    let raw =
        fs::read(&cli.file).with_context(|| format!("failed to read {}", cli.file.display()))?;
    let document = Document::new(String::from_utf8_lossy(&raw).into_owned());

    let provider = PythonOutline::for_path(&cli.file);
    let provider_ref: Option<&dyn SymbolProvider> =
        provider.as_ref().map(|p| p as &dyn SymbolProvider);

    let mut store = SelectionStore::new();
    store.refresh(Some(&document), provider_ref);

    if cli.list {
        return print_outline(&store, cli.json);
    }

    for name in &cli.names {
        let mut identities = Vec::new();
        collect_by_name(store.items(), name, &mut identities);
        if identities.is_empty() {
            eprintln!("warning: no structure named '{name}'");
        }
        for identity in identities {
            store.toggle(&identity);
        }
    }

    let options = ExportOptions {
        copy_to_clipboard: cli.clipboard,
        output_path: cli.output.clone(),
    };

    // Token counting only matters for the annotated markdown output.
    let summary = options.output_path.as_ref().map(|_| {
        let estimator = TokenEstimator::from_config(config);
        let sections: Vec<(String, String)> = store
            .checked()
            .into_iter()
            .filter_map(|item| {
                document
                    .slice(item.span)
                    .map(|text| (item.name.clone(), text.to_owned()))
            })
            .collect();
        estimator.summarize(&sections)
    });

    let exporter = Exporter::new()?;
    match exporter.export(&store, &document, summary.as_ref(), &options)? {
        ExportOutcome::NothingSelected => {
            eprintln!("No structures selected");
        }
        ExportOutcome::Delivered(result) => {
            if cli.print {
                println!("{}", result.payload);
            }
            if result.copied_to_clipboard {
                eprintln!("Copied {} structure(s) to clipboard", result.structures);
            }
            if let Some(path) = &result.output_path {
                eprintln!("Wrote {}", path.display());
            }
        }
    }
    Ok(())
}

fn print_outline(store: &SelectionStore, json: bool) -> Result<()> {
    if json {
        let mut rows = Vec::new();
        collect_rows(store.items(), 0, &mut rows);
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("failed to serialize outline")?
        );
        return Ok(());
    }

    print_items(store.items(), 0);
    Ok(())
}

fn print_items(items: &[Structure], depth: usize) {
    for item in items {
        let signature = item.signature.as_deref().unwrap_or("");
        println!(
            "{}{} {}{}  [{}-{}]",
            "  ".repeat(depth),
            item.kind.as_str(),
            item.name,
            signature,
            item.span.start.line + 1,
            item.span.end.line + 1,
        );
        print_items(&item.children, depth + 1);
    }
}

#[derive(Serialize)]
struct OutlineRow {
    name: String,
    kind: &'static str,
    identity: String,
    start_line: usize,
    start_column: usize,
    end_line: usize,
    signature: Option<String>,
    depth: usize,
}

fn collect_rows(items: &[Structure], depth: usize, out: &mut Vec<OutlineRow>) {
    for item in items {
        out.push(OutlineRow {
            name: item.name.clone(),
            kind: item.kind.as_str(),
            identity: item.identity.clone(),
            start_line: item.span.start.line + 1,
            start_column: item.span.start.column,
            end_line: item.span.end.line + 1,
            signature: item.signature.clone(),
            depth,
        });
        collect_rows(&item.children, depth + 1, out);
    }
}

fn collect_by_name(items: &[Structure], name: &str, out: &mut Vec<String>) {
    for item in items {
        if item.name == name {
            out.push(item.identity.clone());
        }
        collect_by_name(&item.children, name, out);
    }
}
