//! Business logic services.
//!
//! Services sit on top of the storage traits and never surface storage
//! errors to their callers: failures are logged and degrade to a neutral
//! result (`false`, `None`, or default suggestions).

mod preferences;
mod recorder;
mod suggestions;

pub use preferences::{AggregationSettings, PreferenceAggregator, PreferenceTally};
pub use recorder::BehaviorRecorder;
pub use suggestions::{PER_STRATEGY_CAP, POPULAR_REASON, Strategy, SuggestionComposer};
