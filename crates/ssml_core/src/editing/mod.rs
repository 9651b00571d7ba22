//! Editing actions driven by the external editing surface.
//!
//! # Responsibility
//! - Express user edits as pure functions from (tree, action) to a new tree.
//! - Consume caret/selection state through the `SelectionSource` capability.
//!
//! # Invariants
//! - Actions never mutate the tree they are given.
//! - Selection-gated actions reject empty selections without a new tree.

pub mod actions;
pub mod selection;
