//! Preference snapshots.

use super::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Template complexity tier.
///
/// Variants are declared in tier order, so the derived `Ord` puts
/// `Beginner` first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Entry-level templates.
    #[default]
    Beginner,
    /// Mid-level templates.
    Intermediate,
    /// Advanced templates.
    Advanced,
}

impl Complexity {
    /// Returns all tiers in order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Beginner, Self::Intermediate, Self::Advanced]
    }

    /// Returns the tier as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// Parses a tier from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived summary of a user's recent interests.
///
/// Always recomputed wholesale; never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceSnapshot {
    /// Owner of the snapshot.
    pub user_id: UserId,
    /// Up to five category labels, most preferred first.
    pub preferred_categories: Vec<String>,
    /// Highest-scoring complexity tier.
    pub preferred_complexity: Complexity,
    /// Up to ten tag labels, most preferred first.
    pub preferred_tags: Vec<String>,
    /// When the snapshot was computed (Unix epoch seconds).
    #[serde(rename = "lastActiveTimestamp")]
    pub last_active: u64,
}

impl PreferenceSnapshot {
    /// Returns true when the ranked fields of both snapshots agree.
    ///
    /// Ignores `last_active`, which changes on every recompute.
    #[must_use]
    pub fn same_preferences(&self, other: &Self) -> bool {
        self.user_id == other.user_id
            && self.preferred_categories == other.preferred_categories
            && self.preferred_complexity == other.preferred_complexity
            && self.preferred_tags == other.preferred_tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complexity_parse_roundtrip() {
        for level in Complexity::all() {
            assert_eq!(Complexity::parse(level.as_str()), Some(*level));
        }
        assert_eq!(Complexity::parse("ADVANCED"), Some(Complexity::Advanced));
        assert_eq!(Complexity::parse("expert"), None);
    }

    #[test]
    fn test_complexity_tier_order() {
        assert!(Complexity::Beginner < Complexity::Intermediate);
        assert!(Complexity::Intermediate < Complexity::Advanced);
        assert_eq!(Complexity::default(), Complexity::Beginner);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = PreferenceSnapshot {
            user_id: UserId::new(5),
            preferred_categories: vec!["forms".to_string()],
            preferred_complexity: Complexity::Intermediate,
            preferred_tags: vec!["react".to_string()],
            last_active: 1_700_000_000,
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["userId"], 5);
        assert_eq!(value["preferredCategories"][0], "forms");
        assert_eq!(value["preferredComplexity"], "intermediate");
        assert_eq!(value["preferredTags"][0], "react");
        assert_eq!(value["lastActiveTimestamp"], 1_700_000_000_u64);
    }

    #[test]
    fn test_same_preferences_ignores_timestamp() {
        let a = PreferenceSnapshot {
            user_id: UserId::new(1),
            preferred_categories: vec!["forms".to_string()],
            preferred_complexity: Complexity::Beginner,
            preferred_tags: Vec::new(),
            last_active: 10,
        };
        let b = PreferenceSnapshot {
            last_active: 20,
            ..a.clone()
        };
        assert!(a.same_preferences(&b));
        assert_ne!(a, b);
    }
}
