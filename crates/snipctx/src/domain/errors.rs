//! Domain-specific errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A span no longer fits the document it is resolved against. Spans are
    /// only valid against the document version of the scan that produced them.
    #[error("span does not fit the current document")]
    SpanOutOfRange,
}
