//! Immutable animation description shared by every instance that plays it.

/// JSON-backed composition, layer, and marker model.
pub mod model;
