//! Suggestion requests and results.

use serde::{Deserialize, Serialize};

/// Default number of suggestions returned.
pub const DEFAULT_LIMIT: usize = 5;

/// One suggested template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSuggestion {
    /// Suggested template identifier.
    pub template_id: String,
    /// Relative ranking score; only meaningful against other suggestions.
    pub score: f64,
    /// Human-readable provenance.
    pub reason: String,
}

impl TemplateSuggestion {
    /// Creates a new suggestion.
    #[must_use]
    pub fn new(template_id: impl Into<String>, score: f64, reason: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            score,
            reason: reason.into(),
        }
    }
}

/// Parameters for a suggestion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuggestionRequest {
    /// Maximum number of suggestions.
    pub limit: usize,
    /// Run the complexity strategy.
    pub include_complexity: bool,
    /// Run the category strategy.
    pub include_categories: bool,
    /// Run the tag strategy.
    pub include_tags: bool,
}

impl Default for SuggestionRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            include_complexity: true,
            include_categories: true,
            include_tags: true,
        }
    }
}

impl SuggestionRequest {
    /// Creates a request with all strategies enabled.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Enables or disables the complexity strategy.
    #[must_use]
    pub const fn with_complexity(mut self, enabled: bool) -> Self {
        self.include_complexity = enabled;
        self
    }

    /// Enables or disables the category strategy.
    #[must_use]
    pub const fn with_categories(mut self, enabled: bool) -> Self {
        self.include_categories = enabled;
        self
    }

    /// Enables or disables the tag strategy.
    #[must_use]
    pub const fn with_tags(mut self, enabled: bool) -> Self {
        self.include_tags = enabled;
        self
    }

    /// Clamps the limit into `1..=max`.
    #[must_use]
    pub fn clamped(mut self, max: usize) -> Self {
        self.limit = self.limit.clamp(1, max.max(1));
        self
    }
}
