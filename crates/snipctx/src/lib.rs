//! snipctx browses the code structures of a single file, lets the user check
//! a subset of them, and copies the concatenated source of the checked
//! structures to the clipboard as prompt context.

pub mod app;
pub mod domain;
pub mod infra;
pub mod ui;

pub fn init() {
    tracing_subscriber::fmt::init();
}
