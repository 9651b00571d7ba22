//! Use-case services on top of the document model.
//!
//! # Responsibility
//! - Drive editing sessions for hosts (FFI, CLI) without exposing codec or
//!   storage details.

pub mod editor_service;

pub use editor_service::{
    ChangeListener, ChangeSet, EditorSession, Notice, Outcome, SessionError, SessionResult,
};
