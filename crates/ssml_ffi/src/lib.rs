//! Flutter-facing bindings for the editor core.

pub mod api;
