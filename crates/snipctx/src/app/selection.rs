//! Selection state and change notification.
//!
//! The store owns the live structure list exclusively: every scan replaces it
//! wholesale, and checkbox flips go through [`SelectionStore::toggle`]. A
//! small explicit subscriber registry notifies the presentation layer; it is
//! created with the store and torn down when the store drops.

use std::fmt;

use crate::app::outline::{self, SymbolProvider};
use crate::domain::model::{Document, Structure};

/// Change notification emitted by [`SelectionStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The whole list was rebuilt; redraw everything.
    Reloaded,
    /// A single structure's checked flag flipped.
    Toggled { identity: String, checked: bool },
}

/// Handle returned by [`SelectionStore::subscribe`].
pub type SubscriptionId = usize;

type Subscriber = Box<dyn Fn(&StoreEvent)>;

/// Holds the reconciled structure list and its selection state.
#[derive(Default)]
pub struct SelectionStore {
    items: Vec<Structure>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: SubscriptionId,
}

impl fmt::Debug for SelectionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionStore")
            .field("items", &self.items.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current structure list, in document order.
    pub fn items(&self) -> &[Structure] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Register a change listener; returns the id needed to unsubscribe.
    pub fn subscribe(&mut self, subscriber: impl Fn(&StoreEvent) + 'static) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Remove a listener. Returns `false` for an unknown id.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Re-scan the document and replace the live list, carrying checked
    /// state over by identity. No document yields an empty list, not an
    /// error. Each refresh reads the list that is live when it starts; the
    /// most recent completion wins by assignment order.
    pub fn refresh(&mut self, document: Option<&Document>, provider: Option<&dyn SymbolProvider>) {
        self.items = match document {
            Some(doc) => outline::discover(doc, &self.items, provider),
            None => Vec::new(),
        };
        self.emit(&StoreEvent::Reloaded);
    }

    /// Flip the checked flag of the structure with this identity. Unknown
    /// identities are a logged no-op: the target may have vanished between
    /// the UI affordance being built and the toggle arriving.
    pub fn toggle(&mut self, identity: &str) -> bool {
        match flip(&mut self.items, identity) {
            Some(checked) => {
                self.emit(&StoreEvent::Toggled {
                    identity: identity.to_owned(),
                    checked,
                });
                true
            }
            None => {
                tracing::debug!(identity, "toggle target not in current outline");
                false
            }
        }
    }

    /// The checked subsequence, flattened in the list's stable order
    /// (parents before their children).
    pub fn checked(&self) -> Vec<&Structure> {
        let mut out = Vec::new();
        collect_checked(&self.items, &mut out);
        out
    }

    /// Extracted text of every checked structure, joined with one blank
    /// line. Empty string when nothing is checked; callers surface that case
    /// with its own message. A structure whose span no longer resolves is
    /// skipped with a warning rather than aborting the export.
    pub fn export_selected(&self, document: &Document) -> String {
        let mut sections = Vec::new();
        for item in self.checked() {
            match outline::extract_text(document, item.span) {
                Ok(text) => sections.push(text),
                Err(err) => {
                    tracing::warn!(identity = %item.identity, error = %err, "skipping stale span");
                }
            }
        }
        sections.join("\n\n")
    }

    fn emit(&self, event: &StoreEvent) {
        for (_, subscriber) in &self.subscribers {
            subscriber(event);
        }
    }
}

fn flip(items: &mut [Structure], identity: &str) -> Option<bool> {
    for item in items {
        if item.identity == identity {
            item.checked = !item.checked;
            return Some(item.checked);
        }
        if let Some(checked) = flip(&mut item.children, identity) {
            return Some(checked);
        }
    }
    None
}

fn collect_checked<'a>(items: &'a [Structure], out: &mut Vec<&'a Structure>) {
    for item in items {
        if item.checked {
            out.push(item);
        }
        collect_checked(&item.children, out);
    }
}
