//! TUI module for the metaforge console
//!
//! Provides a terminal user interface with:
//! - Conversation pane with the analyzer's questions
//! - Plan pane once the requirements are complete
//! - Input line with history
//! - Status bar with backend and workflow stage

mod app;
mod ui;
mod events;

pub use app::App;
pub use app::run;
