//! Document-model engine for a speech-markup editor.
//!
//! Converts between persisted editor markup, the in-memory document tree and
//! exported speech markup, and drives editing sessions over that tree.

pub mod codec;
pub mod config;
pub mod db;
pub mod editing;
pub mod logging;
pub mod markup;
pub mod model;
pub mod rules;
pub mod service;
pub mod store;

pub use codec::{
    deserialize, deserialize_or_default, export_ssml, serialize, CodecError, CodecResult,
};
pub use config::{ConfigError, EditorConfig, DEFAULT_MARKUP, DEFAULT_STORAGE_KEY};
pub use editing::actions::{apply_mark, EditError, EditResult};
pub use editing::selection::{FixedSelection, Point, Selection, SelectionSource};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::{Block, Document, Inline, InlineVoid, Leaf, TextRun};
pub use model::mark::{Mark, MarkError, MarkKind, MarkSet};
pub use rules::{RuleTable, DEFAULT_RULES};
pub use service::{ChangeListener, ChangeSet, EditorSession, Notice, Outcome, SessionError};
pub use store::{MarkupSink, MarkupSource, SqliteMarkupStore, StoreError, StoreResult};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// One-shot conversion of persisted markup to speech markup.
///
/// Unparseable markup exports as the empty document.
pub fn markup_to_ssml(markup: &str) -> String {
    export_ssml(&deserialize_or_default(Some(markup)))
}

#[cfg(test)]
mod tests {
    use super::{core_version, markup_to_ssml, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn markup_to_ssml_handles_broken_input() {
        assert_eq!(markup_to_ssml("<p>"), "<speak><p></p></speak>");
        assert_eq!(markup_to_ssml("<p>hi</p>"), "<speak><p>hi</p></speak>");
    }
}
