//! Response classification
//!
//! Turns raw response bytes into an envelope, then decides what the
//! orchestrator does next: return, climb a retry ladder, or surface.

mod classifier;
mod taxonomy;

pub use classifier::{ResponseClassifier, Verdict};
pub use taxonomy::{
    is_flood_control, transient_kind, transport_transient_kind, QuietErrors, TransientKind,
};
