//! # Folio History
//!
//! Undo and redo for documents edited through `folio-transform`.
//!
//! Record every transform applied to the document, tracked or not, so
//! stored events stay valid as the document moves on. See [`History`].

mod config;
mod history;

pub use config::{HistoryConfig, HistoryMeta};
pub use history::History;
