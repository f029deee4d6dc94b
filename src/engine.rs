//! Service context.
//!
//! [`Engine`] wires stores, the catalog, and the three services together
//! once at start-up. Everything inside is cheap to clone and shared by
//! `Arc`, so handlers and middleware hold their own copies.

use crate::Result;
use crate::catalog::{StaticCatalog, TemplateCatalog};
use crate::config::StencilConfig;
use crate::services::{
    AggregationSettings, BehaviorRecorder, PreferenceAggregator, SuggestionComposer,
};
use crate::storage::{StorageFactory, Stores};
use std::sync::Arc;

/// Shared handles to every engine component.
#[derive(Clone)]
pub struct Engine {
    stores: Stores,
    catalog: Arc<dyn TemplateCatalog>,
    recorder: BehaviorRecorder,
    aggregator: PreferenceAggregator,
    composer: SuggestionComposer,
    config: Arc<StencilConfig>,
}

impl Engine {
    /// Opens the engine on the configured database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(config: &StencilConfig) -> Result<Self> {
        let path = config.database_path();
        tracing::info!(path = %path.display(), "Opening stencil database");
        let stores = StorageFactory::create_with_path(&path)?;
        Ok(Self::from_stores(
            stores,
            Arc::new(StaticCatalog::new()),
            config.clone(),
        ))
    }

    /// Creates an engine over in-memory stores (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the stores cannot be initialized.
    pub fn in_memory(config: StencilConfig) -> Result<Self> {
        let stores = StorageFactory::create_in_memory()?;
        Ok(Self::from_stores(
            stores,
            Arc::new(StaticCatalog::new()),
            config,
        ))
    }

    /// Assembles an engine from existing stores and a catalog.
    #[must_use]
    pub fn from_stores(
        stores: Stores,
        catalog: Arc<dyn TemplateCatalog>,
        config: StencilConfig,
    ) -> Self {
        let recorder = BehaviorRecorder::new(stores.behavior.clone());
        let aggregator = PreferenceAggregator::new(
            stores.behavior.clone(),
            stores.preferences.clone(),
            AggregationSettings::from(&config.suggestions),
        );
        let composer = SuggestionComposer::new(
            stores.behavior.clone(),
            stores.preferences.clone(),
            aggregator.clone(),
            catalog.clone(),
        )
        .with_exclusion_window(config.suggestions.exclusion_window)
        .with_lazy_preferences(config.features.lazy_preferences);

        Self {
            stores,
            catalog,
            recorder,
            aggregator,
            composer,
            config: Arc::new(config),
        }
    }

    /// Behavior recorder.
    #[must_use]
    pub const fn recorder(&self) -> &BehaviorRecorder {
        &self.recorder
    }

    /// Preference aggregator.
    #[must_use]
    pub const fn aggregator(&self) -> &PreferenceAggregator {
        &self.aggregator
    }

    /// Suggestion composer.
    #[must_use]
    pub const fn composer(&self) -> &SuggestionComposer {
        &self.composer
    }

    /// Underlying stores.
    #[must_use]
    pub const fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Template catalog.
    #[must_use]
    pub fn catalog(&self) -> &dyn TemplateCatalog {
        self.catalog.as_ref()
    }

    /// Configuration the engine was built with.
    #[must_use]
    pub fn config(&self) -> &StencilConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BehaviorAction, ItemDetails, ItemType, SuggestionRequest, UserId};

    #[test]
    fn test_in_memory_engine_round_trip() {
        let engine = Engine::in_memory(StencilConfig::default()).unwrap();
        let user = UserId::new(3);

        assert!(engine.recorder().record_action(
            user,
            BehaviorAction::Implement,
            ItemType::Template,
            "data-table",
            Some(ItemDetails::new().with_complexity("intermediate")),
        ));

        let snapshot = engine.aggregator().recompute_preferences(user).unwrap();
        assert_eq!(
            snapshot.preferred_complexity,
            crate::models::Complexity::Intermediate
        );

        let suggestions = engine
            .composer()
            .get_suggestions(user, &SuggestionRequest::new(2));
        assert_eq!(suggestions[0].template_id, "multi-step-form");
    }

    #[test]
    fn test_open_creates_database_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StencilConfig::default().with_data_dir(dir.path());
        let engine = Engine::open(&config).unwrap();

        assert!(dir.path().join("stencil.db").exists());
        assert_eq!(engine.config().data_dir, dir.path());
    }
}
