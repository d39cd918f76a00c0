//! Time-varying layer properties.

/// Keyframed and constant property values.
pub mod anim;
/// Easing curves applied between keyframes.
pub mod ease;
