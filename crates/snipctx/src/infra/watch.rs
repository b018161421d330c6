//! File change notifications driving outline refresh.

use std::path::Path;
use std::sync::mpsc::{self, Receiver};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Watches a single document and surfaces change ticks on a channel.
///
/// The stand-in for the editor's document-change notifications: the host
/// loop drains the ticks and triggers a refresh for each batch.
pub struct DocumentWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<()>,
}

impl DocumentWatcher {
    pub fn new(path: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let mut watcher =
            notify::recommended_watcher(move |event: notify::Result<Event>| match event {
                Ok(event)
                    if matches!(
                        event.kind,
                        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                    ) =>
                {
                    let _ = tx.send(());
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "document watcher error"),
            })
            .context("failed to initialize document watcher")?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", path.display()))?;

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Drain pending ticks; `true` when at least one change arrived since
    /// the previous poll.
    pub fn poll(&self) -> bool {
        let mut changed = false;
        while self.rx.try_recv().is_ok() {
            changed = true;
        }
        changed
    }
}
