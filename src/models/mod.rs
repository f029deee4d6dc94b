//! Data models for stencil.
//!
//! Behavior records are the append-only input, preference snapshots the
//! derived rollup, and template suggestions the per-request output.

mod behavior;
mod preference;
mod suggestion;

pub use behavior::{BehaviorAction, BehaviorRecord, ItemDetails, ItemType, NewBehavior, UserId};
pub use preference::{Complexity, PreferenceSnapshot};
pub use suggestion::{DEFAULT_LIMIT, SuggestionRequest, TemplateSuggestion};
