//! Conversion passes between persisted markup, the document tree, and
//! speech markup.
//!
//! # Responsibility
//! - `deserialize`: markup string -> document tree.
//! - `serialize`: document tree -> round-trippable markup string.
//! - `export`: document tree -> speech markup string (lossy, one-way).
//!
//! # Invariants
//! - Every pass is pure: it returns a complete result or an error, never a
//!   partially built value.
//! - `deserialize(serialize(doc)) == doc` for normalized documents.

use crate::markup::MarkupError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod deserialize;
pub mod export;
pub mod serialize;

pub use deserialize::{deserialize, deserialize_or_default, deserialize_with};
pub use export::export_ssml;
pub use serialize::{serialize, serialize_markup, serialize_with};

pub type CodecResult<T> = Result<T, CodecError>;

/// Conversion pass errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Persisted markup could not be parsed at all.
    Markup(MarkupError),
    /// No rule in the table renders this node kind.
    Unrepresentable(&'static str),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Markup(err) => write!(f, "{err}"),
            Self::Unrepresentable(kind) => write!(f, "no markup rule renders `{kind}` nodes"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Markup(err) => Some(err),
            Self::Unrepresentable(_) => None,
        }
    }
}

impl From<MarkupError> for CodecError {
    fn from(value: MarkupError) -> Self {
        Self::Markup(value)
    }
}
