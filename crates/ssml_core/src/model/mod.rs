//! Document model for speech markup editing.
//!
//! # Responsibility
//! - Define the block/inline/leaf tree held by an editing session.
//! - Define the closed, validated mark vocabulary applied to leaves.
//!
//! # Invariants
//! - Marks attach to leaves only.
//! - Mark payloads are validated when constructed, never at export time.

pub mod document;
pub mod mark;
