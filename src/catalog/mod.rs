//! Template catalog lookups.
//!
//! Suggestion strategies draw their candidates from a [`TemplateCatalog`].
//! [`StaticCatalog`] carries the built-in default-template table and
//! synthesizes `{label}-template-{n}` ids for categories and tags; a
//! deployment with a real template index implements the trait instead.

use crate::models::Complexity;
use serde::{Deserialize, Serialize};

/// A template the catalog can offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Template identifier.
    pub template_id: String,
    /// Catalog ranking score.
    pub score: f64,
}

impl CatalogEntry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(template_id: impl Into<String>, score: f64) -> Self {
        Self {
            template_id: template_id.into(),
            score,
        }
    }
}

/// Source of candidate templates.
pub trait TemplateCatalog: Send + Sync {
    /// Default templates for a complexity tier, highest score first.
    fn by_complexity(&self, level: Complexity) -> Vec<CatalogEntry>;

    /// Up to `limit` templates in a category, highest score first.
    fn by_category(&self, category: &str, limit: usize) -> Vec<CatalogEntry>;

    /// Up to `limit` templates carrying a tag, highest score first.
    fn by_tag(&self, tag: &str, limit: usize) -> Vec<CatalogEntry>;

    /// Every tiered template, beginner tier first.
    fn all(&self) -> Vec<CatalogEntry> {
        Complexity::all()
            .iter()
            .flat_map(|level| self.by_complexity(*level))
            .collect()
    }
}

const BEGINNER: &[(&str, f64)] = &[
    ("simple-card-component", 0.95),
    ("basic-form", 0.90),
    ("profile-card", 0.85),
    ("notification-banner", 0.80),
    ("button-set", 0.75),
];

const INTERMEDIATE: &[(&str, f64)] = &[
    ("data-table", 0.92),
    ("multi-step-form", 0.88),
    ("dashboard-layout", 0.84),
    ("image-gallery", 0.80),
    ("pricing-table", 0.76),
];

const ADVANCED: &[(&str, f64)] = &[
    ("realtime-dashboard", 0.94),
    ("kanban-board", 0.90),
    ("data-visualization", 0.86),
    ("rich-text-editor", 0.82),
    ("infinite-scroll-feed", 0.78),
];

/// Base score of the first synthesized category template.
const CATEGORY_BASE_SCORE: f64 = 0.70;
/// Base score of the first synthesized tag template.
const TAG_BASE_SCORE: f64 = 0.60;
/// Score step between consecutive synthesized templates.
const SYNTHESIZED_STEP: f64 = 0.05;

/// Built-in catalog.
///
/// Category and tag lookups are stand-ins that synthesize ids; they do not
/// consult any real template index.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCatalog;

impl StaticCatalog {
    /// Creates the built-in catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    #[allow(clippy::cast_precision_loss)]
    fn synthesize(label: &str, limit: usize, base: f64) -> Vec<CatalogEntry> {
        (1..=limit)
            .map(|n| {
                CatalogEntry::new(
                    format!("{label}-template-{n}"),
                    SYNTHESIZED_STEP.mul_add(-((n - 1) as f64), base),
                )
            })
            .collect()
    }
}

impl TemplateCatalog for StaticCatalog {
    fn by_complexity(&self, level: Complexity) -> Vec<CatalogEntry> {
        let table = match level {
            Complexity::Beginner => BEGINNER,
            Complexity::Intermediate => INTERMEDIATE,
            Complexity::Advanced => ADVANCED,
        };
        table
            .iter()
            .map(|(id, score)| CatalogEntry::new(*id, *score))
            .collect()
    }

    fn by_category(&self, category: &str, limit: usize) -> Vec<CatalogEntry> {
        Self::synthesize(category, limit, CATEGORY_BASE_SCORE)
    }

    fn by_tag(&self, tag: &str, limit: usize) -> Vec<CatalogEntry> {
        Self::synthesize(tag, limit, TAG_BASE_SCORE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(entries: &[CatalogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.template_id.as_str()).collect()
    }

    #[test]
    fn test_beginner_defaults_order() {
        let entries = StaticCatalog::new().by_complexity(Complexity::Beginner);
        assert_eq!(
            ids(&entries),
            vec![
                "simple-card-component",
                "basic-form",
                "profile-card",
                "notification-banner",
                "button-set"
            ]
        );
    }

    #[test]
    fn test_tables_are_score_descending() {
        let catalog = StaticCatalog::new();
        for level in Complexity::all() {
            let entries = catalog.by_complexity(*level);
            assert!(
                entries.windows(2).all(|w| w[0].score > w[1].score),
                "{level} table is not score-descending"
            );
        }
    }

    #[test]
    fn test_synthesized_ids() {
        let catalog = StaticCatalog::new();
        let entries = catalog.by_category("forms", 2);
        assert_eq!(ids(&entries), vec!["forms-template-1", "forms-template-2"]);
        assert!((entries[0].score - 0.70).abs() < 1e-9);
        assert!((entries[1].score - 0.65).abs() < 1e-9);

        let entries = catalog.by_tag("react", 2);
        assert_eq!(ids(&entries), vec!["react-template-1", "react-template-2"]);
        assert!((entries[0].score - 0.60).abs() < 1e-9);

        assert!(catalog.by_tag("react", 0).is_empty());
    }

    #[test]
    fn test_all_covers_every_tier() {
        let all = StaticCatalog::new().all();
        assert_eq!(all.len(), 15);
        assert_eq!(all[0].template_id, "simple-card-component");
        assert_eq!(all[14].template_id, "infinite-scroll-feed");
    }
}
