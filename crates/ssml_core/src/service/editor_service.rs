//! Editing session driving the document tree for one editing surface.
//!
//! # Responsibility
//! - Own the current document and swap it wholesale on every edit.
//! - Recompute markup and speech markup once per change and fan them out to
//!   listeners and the optional persistence sink.
//! - Turn selection-gated rejections into user-facing notices.
//!
//! # Invariants
//! - A failed or rejected action leaves the document and caret untouched.
//! - The sink is written before the new document becomes current, so a
//!   storage failure never leaves an unpersisted tree in place.
//! - Listeners only ever observe complete change sets.

use crate::codec::{deserialize, deserialize_or_default, export_ssml, serialize, CodecError};
use crate::config::{ConfigError, EditorConfig};
use crate::editing::actions::{self, EditError};
use crate::editing::selection::{Point, SelectionSource};
use crate::model::document::{Document, InlineVoid};
use crate::model::mark::Mark;
use crate::store::{MarkupSink, MarkupSource, StoreError};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug)]
pub enum SessionError {
    Edit(EditError),
    Codec(CodecError),
    Store(StoreError),
    Config(ConfigError),
    InvalidBreak { seconds: u32, min: u32, max: u32 },
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Edit(err) => write!(f, "{err}"),
            Self::Codec(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::InvalidBreak { seconds, min, max } => {
                write!(f, "break of {seconds}s is outside {min}..={max} seconds")
            }
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Edit(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::InvalidBreak { .. } => None,
        }
    }
}

impl From<EditError> for SessionError {
    fn from(value: EditError) -> Self {
        Self::Edit(value)
    }
}

impl From<CodecError> for SessionError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<ConfigError> for SessionError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Blocking notice shown to the user instead of applying an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub text: String,
}

impl Notice {
    pub fn selection_required() -> Self {
        Self {
            title: "Oops...".to_string(),
            text: "You must have text selected".to_string(),
        }
    }
}

/// Everything derived from one committed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub document: Document,
    pub markup: String,
    pub ssml: String,
}

impl ChangeSet {
    fn derive(document: Document) -> SessionResult<Self> {
        let markup = serialize(&document)?;
        let ssml = export_ssml(&document);
        Ok(Self {
            document,
            markup,
            ssml,
        })
    }
}

/// Result of a user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied(ChangeSet),
    Unchanged,
    Rejected(Notice),
}

/// Observer of committed changes.
pub trait ChangeListener: Send {
    fn on_change(&mut self, change: &ChangeSet);
}

impl<F> ChangeListener for F
where
    F: FnMut(&ChangeSet) + Send,
{
    fn on_change(&mut self, change: &ChangeSet) {
        self(change)
    }
}

/// One editing session over one document.
pub struct EditorSession<S: SelectionSource> {
    current: ChangeSet,
    selection: S,
    config: EditorConfig,
    listeners: Vec<Box<dyn ChangeListener>>,
    sink: Option<Box<dyn MarkupSink>>,
}

impl<S: SelectionSource> EditorSession<S> {
    /// Starts a session from persisted markup.
    ///
    /// Absent markup loads `config.default_markup`; unparseable markup falls
    /// back to the empty document.
    pub fn open(markup: Option<&str>, selection: S, config: EditorConfig) -> SessionResult<Self> {
        config.validate()?;
        let document = match markup {
            Some(markup) => deserialize_or_default(Some(markup)),
            None => deserialize(&config.default_markup)?,
        };
        let current = ChangeSet::derive(document)?;
        info!(
            "event=session_open module=service status=ok blocks={} persisted={}",
            current.document.blocks.len(),
            markup.is_some()
        );
        Ok(Self {
            current,
            selection,
            config,
            listeners: Vec::new(),
            sink: None,
        })
    }

    /// Starts a session from whatever `source` holds under the storage key.
    pub fn restore(
        source: &dyn MarkupSource,
        selection: S,
        config: EditorConfig,
    ) -> SessionResult<Self> {
        let stored = source.read_markup(&config.storage_key)?;
        Self::open(stored.as_deref(), selection, config)
    }

    /// Persists every committed change to `sink`.
    pub fn with_sink(mut self, sink: Box<dyn MarkupSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn add_listener(&mut self, listener: impl ChangeListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn document(&self) -> &Document {
        &self.current.document
    }

    pub fn markup(&self) -> &str {
        &self.current.markup
    }

    pub fn ssml(&self) -> &str {
        &self.current.ssml
    }

    pub fn snapshot(&self) -> &ChangeSet {
        &self.current
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selection(&self) -> &S {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut S {
        &mut self.selection
    }

    /// Toggles `mark` over the current text selection.
    ///
    /// Without a text selection the tree is left alone and a notice is
    /// returned.
    pub fn toggle_mark(&mut self, mark: Mark) -> SessionResult<Outcome> {
        let kind = mark.kind();
        let selection = match self.selection.selection() {
            Some(selection) if self.selection.has_text_selection(self.document()) => selection,
            _ => return Ok(self.reject_without_selection(kind.as_str())),
        };
        match actions::apply_mark(self.document(), &selection, mark) {
            Ok(next) => self.commit(next),
            Err(EditError::SelectionRequired) => Ok(self.reject_without_selection(kind.as_str())),
            Err(err) => Err(err.into()),
        }
    }

    /// Inserts a pause at the caret; `None` uses the configured default.
    pub fn insert_break(&mut self, seconds: Option<u32>) -> SessionResult<Outcome> {
        let seconds = seconds.unwrap_or(self.config.default_break_seconds);
        if !self.config.break_range_contains(seconds) {
            return Err(SessionError::InvalidBreak {
                seconds,
                min: self.config.min_break_seconds,
                max: self.config.max_break_seconds,
            });
        }
        let at = self.selection.insertion_point();
        let (next, caret) =
            actions::insert_inline_void(self.document(), at, InlineVoid::pause(seconds))?;
        self.commit_and_move(next, caret)
    }

    pub fn insert_text(&mut self, text: &str) -> SessionResult<Outcome> {
        let at = self.selection.insertion_point();
        let (next, caret) = actions::insert_text(self.document(), at, text)?;
        self.commit_and_move(next, caret)
    }

    pub fn split_block(&mut self) -> SessionResult<Outcome> {
        let at = self.selection.insertion_point();
        let (next, caret) = actions::split_block(self.document(), at)?;
        self.commit_and_move(next, caret)
    }

    /// Replaces the whole tree, e.g. after an external edit; the caret
    /// returns to the document start.
    pub fn replace_document(&mut self, document: Document) -> SessionResult<Outcome> {
        self.commit_and_move(document.normalize(), Point::default())
    }

    fn reject_without_selection(&self, action: &str) -> Outcome {
        info!(
            "event=action_rejected module=service status=rejected action={} reason=selection_required",
            action
        );
        Outcome::Rejected(Notice::selection_required())
    }

    fn commit_and_move(&mut self, next: Document, caret: Point) -> SessionResult<Outcome> {
        let outcome = self.commit(next)?;
        self.selection.move_to(caret);
        Ok(outcome)
    }

    fn commit(&mut self, next: Document) -> SessionResult<Outcome> {
        if next == self.current.document {
            return Ok(Outcome::Unchanged);
        }
        let change = ChangeSet::derive(next)?;
        self.publish(change.clone())?;
        Ok(Outcome::Applied(change))
    }

    /// Persists, installs and broadcasts `change`.
    fn publish(&mut self, change: ChangeSet) -> SessionResult<()> {
        if let Some(sink) = &self.sink {
            if let Err(err) = sink.write_markup(&self.config.storage_key, &change.markup) {
                warn!(
                    "event=session_commit module=service status=error stage=persist error={}",
                    err
                );
                return Err(err.into());
            }
        }
        self.current = change;
        for listener in &mut self.listeners {
            listener.on_change(&self.current);
        }
        Ok(())
    }
}
