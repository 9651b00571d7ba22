//! FFI use-case API for the Flutter editing surface.
//!
//! # Responsibility
//! - Expose one process-wide editing session to Dart via FRB.
//! - Flatten session outcomes into plain response envelopes.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - Every session call answers with the current markup and speech markup,
//!   so the surface can re-render and persist without a second round trip.
//! - Rejected actions carry a notice and leave the document unchanged.

use log::warn;
use ssml_core::{
    core_version as core_version_inner, init_logging as init_logging_inner,
    markup_to_ssml as markup_to_ssml_inner, ping as ping_inner, EditorConfig, EditorSession,
    FixedSelection, Mark, MarkKind, Outcome, Point, SelectionSource, SessionError,
    SqliteMarkupStore,
};
use std::sync::{Mutex, MutexGuard};

static SESSION: Mutex<Option<EditorSession<FixedSelection>>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// # FFI contract
/// - Idempotent for the same `level + log_dir`.
/// - Returns empty string on success and an error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Converts persisted markup straight to speech markup without a session.
#[flutter_rust_bridge::frb(sync)]
pub fn markup_to_ssml(markup: String) -> String {
    markup_to_ssml_inner(markup.as_str())
}

/// Mark kind labels accepted by `editor_toggle_mark`, in canonical order.
#[flutter_rust_bridge::frb(sync)]
pub fn mark_kinds() -> Vec<String> {
    MarkKind::ALL
        .iter()
        .map(|kind| kind.as_str().to_string())
        .collect()
}

/// Response envelope for editing session calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorResponse {
    /// Whether the call succeeded (a rejected action still counts as ok).
    pub ok: bool,
    /// Whether the document changed.
    pub changed: bool,
    /// Current persisted markup; empty when no session is open.
    pub markup: String,
    /// Current speech markup; empty when no session is open.
    pub ssml: String,
    /// Blocking notice title when the action was rejected.
    pub notice_title: Option<String>,
    /// Blocking notice text when the action was rejected.
    pub notice_text: Option<String>,
    /// Human-readable diagnostics.
    pub message: String,
}

impl EditorResponse {
    fn from_session(session: &EditorSession<FixedSelection>, changed: bool, message: &str) -> Self {
        Self {
            ok: true,
            changed,
            markup: session.markup().to_string(),
            ssml: session.ssml().to_string(),
            notice_title: None,
            notice_text: None,
            message: message.to_string(),
        }
    }

    fn from_outcome(session: &EditorSession<FixedSelection>, outcome: Outcome) -> Self {
        match outcome {
            Outcome::Applied(_) => Self::from_session(session, true, "applied"),
            Outcome::Unchanged => Self::from_session(session, false, "unchanged"),
            Outcome::Rejected(notice) => Self {
                notice_title: Some(notice.title),
                notice_text: Some(notice.text),
                ..Self::from_session(session, false, "rejected")
            },
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            changed: false,
            markup: String::new(),
            ssml: String::new(),
            notice_title: None,
            notice_text: None,
            message: message.into(),
        }
    }
}

/// Opens (or reopens) the editing session.
///
/// Input semantics:
/// - `markup`: persisted markup; when `None` and `db_path` is set, the stored
///   markup is restored instead.
/// - `db_path`: optional SQLite file every change is persisted to.
/// - `config_json`: optional `EditorConfig` JSON; defaults otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_open(
    markup: Option<String>,
    db_path: Option<String>,
    config_json: Option<String>,
) -> EditorResponse {
    let config = match config_json.as_deref().map(EditorConfig::from_json_str) {
        None => EditorConfig::default(),
        Some(Ok(config)) => config,
        Some(Err(err)) => return EditorResponse::failure(format!("editor_open failed: {err}")),
    };

    let opened = match db_path.as_deref().map(str::trim).filter(|path| !path.is_empty()) {
        None => EditorSession::open(markup.as_deref(), FixedSelection::new(), config),
        Some(path) => open_persistent(path, markup.as_deref(), config),
    };

    let session = match opened {
        Ok(session) => session,
        Err(err) => return EditorResponse::failure(format!("editor_open failed: {err}")),
    };
    let mut slot = match lock_session() {
        Ok(slot) => slot,
        Err(response) => return response,
    };
    let response = EditorResponse::from_session(&session, false, "opened");
    *slot = Some(session);
    response
}

fn open_persistent(
    path: &str,
    markup: Option<&str>,
    config: EditorConfig,
) -> Result<EditorSession<FixedSelection>, SessionError> {
    let store = SqliteMarkupStore::open(path)?;
    let session = match markup {
        Some(markup) => EditorSession::open(Some(markup), FixedSelection::new(), config)?,
        None => EditorSession::restore(&store, FixedSelection::new(), config)?,
    };
    Ok(session.with_sink(Box::new(store)))
}

/// Closes the session and returns its final state.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_close() -> EditorResponse {
    let mut slot = match lock_session() {
        Ok(slot) => slot,
        Err(response) => return response,
    };
    match slot.take() {
        Some(session) => EditorResponse::from_session(&session, false, "closed"),
        None => EditorResponse::failure("no editor session is open"),
    }
}

/// Current state without changing anything.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_snapshot() -> EditorResponse {
    with_session(|session| Ok(EditorResponse::from_session(session, false, "snapshot")))
}

/// Mirrors the surface's selection into the session.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_select(
    anchor_block: u32,
    anchor_offset: u32,
    focus_block: u32,
    focus_offset: u32,
) -> EditorResponse {
    with_session(|session| {
        session.selection_mut().select(
            point(anchor_block, anchor_offset),
            point(focus_block, focus_offset),
        );
        Ok(EditorResponse::from_session(session, false, "selected"))
    })
}

/// Collapses the selection to a caret.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_move_caret(block: u32, offset: u32) -> EditorResponse {
    with_session(|session| {
        session.selection_mut().move_to(point(block, offset));
        Ok(EditorResponse::from_session(session, false, "caret moved"))
    })
}

/// Toggles a mark over the selection.
///
/// `label` comes from `mark_kinds`; `value` carries the level, alias or
/// rate the kind needs.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_toggle_mark(label: String, value: Option<String>) -> EditorResponse {
    let Some(kind) = MarkKind::parse_label(&label) else {
        return EditorResponse::failure(format!("unknown mark kind `{}`", label.trim()));
    };
    let mark = match Mark::parse(kind, value.as_deref()) {
        Ok(mark) => mark,
        Err(err) => return EditorResponse::failure(err.to_string()),
    };
    with_session(|session| {
        let outcome = session.toggle_mark(mark)?;
        Ok(EditorResponse::from_outcome(session, outcome))
    })
}

/// Inserts a pause at the caret; `None` uses the configured default.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_insert_break(seconds: Option<u32>) -> EditorResponse {
    with_session(|session| {
        let outcome = session.insert_break(seconds)?;
        Ok(EditorResponse::from_outcome(session, outcome))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn editor_insert_text(text: String) -> EditorResponse {
    with_session(|session| {
        let outcome = session.insert_text(&text)?;
        Ok(EditorResponse::from_outcome(session, outcome))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn editor_split_block() -> EditorResponse {
    with_session(|session| {
        let outcome = session.split_block()?;
        Ok(EditorResponse::from_outcome(session, outcome))
    })
}

fn point(block: u32, offset: u32) -> Point {
    Point::new(block as usize, offset as usize)
}

fn lock_session() -> Result<MutexGuard<'static, Option<EditorSession<FixedSelection>>>, EditorResponse>
{
    SESSION.lock().map_err(|_| {
        warn!("event=ffi_session_lock module=ffi status=error error_code=poisoned");
        EditorResponse::failure("editor session lock poisoned")
    })
}

fn with_session(
    f: impl FnOnce(&mut EditorSession<FixedSelection>) -> Result<EditorResponse, SessionError>,
) -> EditorResponse {
    let mut slot = match lock_session() {
        Ok(slot) => slot,
        Err(response) => return response,
    };
    let Some(session) = slot.as_mut() else {
        return EditorResponse::failure("no editor session is open");
    };
    match f(&mut *session) {
        Ok(response) => response,
        Err(err) => EditorResponse {
            ok: false,
            message: err.to_string(),
            ..EditorResponse::from_session(session, false, "")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, editor_close, editor_insert_break, editor_insert_text, editor_move_caret,
        editor_open, editor_select, editor_snapshot, editor_toggle_mark, init_logging, mark_kinds,
        markup_to_ssml, ping,
    };
    use ssml_core::store::{MarkupSource, SqliteMarkupStore};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn mark_kinds_lists_canonical_order() {
        let kinds = mark_kinds();
        assert_eq!(kinds.first().map(String::as_str), Some("emphasis"));
        assert_eq!(kinds.len(), 8);
    }

    #[test]
    fn markup_to_ssml_exports_without_session() {
        assert_eq!(
            markup_to_ssml("<p>hi</p>".to_string()),
            "<speak><p>hi</p></speak>"
        );
    }

    #[test]
    fn toggle_mark_rejects_unknown_kind_before_touching_session() {
        let response = editor_toggle_mark("whisper".to_string(), None);
        assert!(!response.ok);
        assert!(response.message.contains("whisper"));
    }

    // The session is process-global, so its lifecycle is exercised in one test.
    #[test]
    fn session_lifecycle_persists_every_change() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("editor.sqlite3");
        let db_path_str = db_path.to_str().unwrap().to_string();

        let opened = editor_open(None, Some(db_path_str.clone()), None);
        assert!(opened.ok, "{}", opened.message);
        assert_eq!(opened.markup, "<p></p>");

        let rejected = editor_toggle_mark("cardinal".to_string(), None);
        assert!(rejected.ok);
        assert!(!rejected.changed);
        assert_eq!(rejected.notice_title.as_deref(), Some("Oops..."));

        editor_insert_text("hello".to_string());
        editor_select(0, 0, 0, 5);
        let marked = editor_toggle_mark("emphasis".to_string(), Some("strong".to_string()));
        assert!(marked.changed);
        assert_eq!(
            marked.ssml,
            r#"<speak><p><emphasis level="strong">hello</emphasis></p></speak>"#
        );

        editor_move_caret(0, 5);
        let bad_break = editor_insert_break(Some(42));
        assert!(!bad_break.ok);
        assert_eq!(bad_break.ssml, marked.ssml);

        let store = SqliteMarkupStore::open(&db_path).unwrap();
        assert_eq!(
            store.read_markup("content").unwrap().as_deref(),
            Some(marked.markup.as_str())
        );
        drop(store);

        let closed = editor_close();
        assert!(closed.ok);
        assert!(!editor_snapshot().ok);

        let reopened = editor_open(None, Some(db_path_str), None);
        assert_eq!(reopened.markup, marked.markup);
        editor_close();
    }
}
