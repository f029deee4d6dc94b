//! Behavior records and their parts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Creates a new user ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Parses a user ID from a decimal string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        s.trim().parse::<i64>().ok().map(Self)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Kind of action a user performed.
///
/// Actions read back from storage that this build does not recognize are
/// kept as [`BehaviorAction::Other`] so older binaries can still aggregate
/// rows written by newer ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BehaviorAction {
    /// The user looked at an item.
    View,
    /// The user implemented a template into their site.
    Implement,
    /// The user searched.
    Search,
    /// The user favorited an item.
    Favorite,
    /// An action label outside the known set.
    Other(String),
}

impl BehaviorAction {
    /// Returns the known action variants.
    #[must_use]
    pub const fn known() -> &'static [Self] {
        &[Self::View, Self::Implement, Self::Search, Self::Favorite]
    }

    /// Returns the action as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::View => "view",
            Self::Implement => "implement",
            Self::Search => "search",
            Self::Favorite => "favorite",
            Self::Other(label) => label,
        }
    }

    /// Parses one of the known actions.
    ///
    /// Returns `None` for anything else; use [`From<String>`] to keep
    /// unknown labels.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "view" => Some(Self::View),
            "implement" => Some(Self::Implement),
            "search" => Some(Self::Search),
            "favorite" | "favourite" => Some(Self::Favorite),
            _ => None,
        }
    }

    /// Returns true for the four enumerated actions.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Aggregation weight of this action.
    ///
    /// | Action | Weight |
    /// |--------|--------|
    /// | implement | 5 |
    /// | favorite | 4 |
    /// | search | 2 |
    /// | view | 1 |
    /// | anything else | 1 |
    #[must_use]
    pub const fn weight(&self) -> f64 {
        match self {
            Self::Implement => 5.0,
            Self::Favorite => 4.0,
            Self::Search => 2.0,
            Self::View | Self::Other(_) => 1.0,
        }
    }
}

impl fmt::Display for BehaviorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for BehaviorAction {
    fn from(s: String) -> Self {
        Self::parse(&s).unwrap_or(Self::Other(s))
    }
}

impl From<BehaviorAction> for String {
    fn from(action: BehaviorAction) -> Self {
        action.as_str().to_string()
    }
}

/// Type of the item an action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// A website template.
    Template,
    /// A file (search results land here).
    File,
    /// A template category.
    Category,
}

impl ItemType {
    /// Returns the item type as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::File => "file",
            Self::Category => "category",
        }
    }

    /// Parses an item type from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "template" => Some(Self::Template),
            "file" => Some(Self::File),
            "category" => Some(Self::Category),
            _ => None,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detail payload attached to a behavior record.
///
/// The fields the aggregator weighs are typed; every other key is kept in
/// `extra` untouched. Parsing is lenient: a field with the wrong JSON
/// shape is treated as absent instead of failing the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct ItemDetails {
    /// Template category label.
    pub category: Option<String>,
    /// Complexity label (`beginner`, `intermediate`, `advanced`, or unknown).
    pub complexity: Option<String>,
    /// Tag labels; `None` when the payload carried no tag array.
    pub tags: Option<Vec<String>>,
    /// Any other keys.
    pub extra: Map<String, Value>,
}

impl ItemDetails {
    /// Creates empty details.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the complexity label.
    #[must_use]
    pub fn with_complexity(mut self, complexity: impl Into<String>) -> Self {
        self.complexity = Some(complexity.into());
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Returns true when no field or extra key is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.complexity.is_none()
            && self.tags.is_none()
            && self.extra.is_empty()
    }
}

impl From<Value> for ItemDetails {
    fn from(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::default();
        };

        let category = take_string(&mut map, "category");
        let complexity = take_string(&mut map, "complexity");
        let tags = match map.remove("tags") {
            Some(Value::Array(items)) => Some(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            Some(other) => {
                map.insert("tags".to_string(), other);
                None
            },
            None => None,
        };

        Self {
            category,
            complexity,
            tags,
            extra: map,
        }
    }
}

impl From<ItemDetails> for Value {
    fn from(details: ItemDetails) -> Self {
        let mut map = details.extra;
        if let Some(category) = details.category {
            map.insert("category".to_string(), Self::String(category));
        }
        if let Some(complexity) = details.complexity {
            map.insert("complexity".to_string(), Self::String(complexity));
        }
        if let Some(tags) = details.tags {
            map.insert(
                "tags".to_string(),
                Self::Array(tags.into_iter().map(Self::String).collect()),
            );
        }
        Self::Object(map)
    }
}

/// Removes `key` when it holds a string; any other shape stays in `extra`.
fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            map.insert(key.to_string(), other);
            None
        },
        None => None,
    }
}

/// A behavior record about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBehavior {
    /// Owner of the record.
    pub user_id: UserId,
    /// What the user did.
    pub action: BehaviorAction,
    /// What kind of item it was done to.
    pub item_type: ItemType,
    /// Opaque item identifier.
    pub item_id: String,
    /// Detail payload.
    pub item_details: ItemDetails,
}

/// A persisted, immutable behavior record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorRecord {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Owner of the record.
    pub user_id: UserId,
    /// What the user did.
    pub action: BehaviorAction,
    /// What kind of item it was done to.
    pub item_type: ItemType,
    /// Opaque item identifier.
    pub item_id: String,
    /// Detail payload.
    pub item_details: ItemDetails,
    /// Creation time (Unix epoch seconds).
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(BehaviorAction::Implement, 5.0)]
    #[test_case(BehaviorAction::Favorite, 4.0)]
    #[test_case(BehaviorAction::Search, 2.0)]
    #[test_case(BehaviorAction::View, 1.0)]
    #[test_case(BehaviorAction::Other("share".to_string()), 1.0)]
    fn test_action_weight(action: BehaviorAction, expected: f64) {
        assert!((action.weight() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn test_action_keeps_unknown_labels() {
        let action = BehaviorAction::from("share".to_string());
        assert_eq!(action, BehaviorAction::Other("share".to_string()));
        assert_eq!(action.as_str(), "share");
        assert!(!action.is_known());

        assert_eq!(
            BehaviorAction::from("IMPLEMENT".to_string()),
            BehaviorAction::Implement
        );
        assert_eq!(BehaviorAction::parse("share"), None);
    }

    #[test]
    fn test_item_type_parse() {
        assert_eq!(ItemType::parse("template"), Some(ItemType::Template));
        assert_eq!(ItemType::parse(" File "), Some(ItemType::File));
        assert_eq!(ItemType::parse("category"), Some(ItemType::Category));
        assert_eq!(ItemType::parse("page"), None);
    }

    #[test]
    fn test_user_id_parse() {
        assert_eq!(UserId::parse("42"), Some(UserId::new(42)));
        assert_eq!(UserId::parse("abc"), None);
        assert_eq!(UserId::new(9).to_string(), "9");
    }

    #[test]
    fn test_item_details_typed_fields() {
        let details = ItemDetails::from(json!({
            "category": "forms",
            "complexity": "advanced",
            "tags": ["react", "tailwind"],
            "source": "gallery"
        }));

        assert_eq!(details.category.as_deref(), Some("forms"));
        assert_eq!(details.complexity.as_deref(), Some("advanced"));
        assert_eq!(
            details.tags,
            Some(vec!["react".to_string(), "tailwind".to_string()])
        );
        assert_eq!(details.extra.get("source"), Some(&json!("gallery")));
    }

    #[test]
    fn test_item_details_lenient_shapes() {
        let details = ItemDetails::from(json!({
            "category": 12,
            "tags": "react",
        }));

        assert!(details.category.is_none());
        assert!(details.tags.is_none());
        // Wrong shapes are preserved as extra keys rather than dropped
        assert_eq!(details.extra.get("category"), Some(&json!(12)));
        assert_eq!(details.extra.get("tags"), Some(&json!("react")));

        let details = ItemDetails::from(json!({"tags": ["a", 3, "b"]}));
        assert_eq!(details.tags, Some(vec!["a".to_string(), "b".to_string()]));

        assert!(ItemDetails::from(json!("not an object")).is_empty());
    }

    #[test]
    fn test_item_details_serializes_flat() {
        let details = ItemDetails::new()
            .with_category("landing")
            .with_tags(["hero"]);
        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value, json!({"category": "landing", "tags": ["hero"]}));
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = BehaviorRecord {
            id: 1,
            user_id: UserId::new(3),
            action: BehaviorAction::View,
            item_type: ItemType::Template,
            item_id: "basic-form".to_string(),
            item_details: ItemDetails::default(),
            timestamp: 1_700_000_000,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["userId"], json!(3));
        assert_eq!(value["action"], json!("view"));
        assert_eq!(value["itemType"], json!("template"));
        assert_eq!(value["itemId"], json!("basic-form"));
    }
}
