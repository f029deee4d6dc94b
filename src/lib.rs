//! # Stencil
//!
//! Behavior tracking and template suggestions for a website builder.
//!
//! Stencil records what users do with templates (views, implementations,
//! searches, favorites), rolls the recent history up into a per-user
//! preference snapshot, and composes ranked template suggestions from it.
//!
//! ## Components
//!
//! - [`BehaviorRecorder`]: append-only action log
//! - [`PreferenceAggregator`]: weighted rollup of recent actions
//! - [`SuggestionComposer`]: strategy-ordered suggestion lists with fallbacks
//! - [`http::capture_middleware`]: fire-and-forget recording at the HTTP boundary
//!
//! ## Example
//!
//! ```rust,ignore
//! use stencil::{Engine, StencilConfig, SuggestionRequest, UserId};
//!
//! let engine = Engine::open(&StencilConfig::load_default())?;
//! let suggestions = engine
//!     .composer()
//!     .get_suggestions(UserId::new(7), &SuggestionRequest::default());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use thiserror::Error as ThisError;

pub mod catalog;
pub mod config;
pub mod engine;
pub mod http;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use catalog::{CatalogEntry, StaticCatalog, TemplateCatalog};
pub use config::{FeatureFlags, StencilConfig};
pub use engine::Engine;
pub use models::{
    BehaviorAction, BehaviorRecord, Complexity, ItemDetails, ItemType, PreferenceSnapshot,
    SuggestionRequest, TemplateSuggestion, UserId,
};
pub use services::{BehaviorRecorder, PreferenceAggregator, SuggestionComposer};
pub use storage::{BehaviorStore, PreferenceStore};

/// Error type for stencil operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Unknown action or item type, empty item id, malformed JSON |
/// | `OperationFailed` | `SQLite` queries fail, config files cannot be read, server bind fails |
/// | `Unauthorized` | No session user on a route that needs one, bad JWT configuration |
/// | `NotFound` | No preference snapshot exists for the user |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` database operations fail
    /// - Filesystem I/O errors occur
    /// - Configuration cannot be parsed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The caller is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result type alias for stencil operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use stencil::current_timestamp;
///
/// assert!(current_timestamp() > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("unknown action".to_string());
        assert_eq!(err.to_string(), "invalid input: unknown action");

        let err = Error::OperationFailed {
            operation: "append_behavior".to_string(),
            cause: "disk full".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "operation 'append_behavior' failed: disk full"
        );

        let err = Error::NotFound("preferences for user 3".to_string());
        assert_eq!(err.to_string(), "not found: preferences for user 3");
    }
}
