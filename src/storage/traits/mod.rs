//! Storage traits.

mod behavior;
mod preference;

pub use behavior::BehaviorStore;
pub use preference::PreferenceStore;
