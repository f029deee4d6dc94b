//! Feature flags for optional functionality.

/// Feature flags for controlling optional stencil behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Install the behavior-capture middleware on the template-builder routes.
    pub behavior_capture: bool,
    /// Compute a missing preference snapshot on the first suggestion request.
    pub lazy_preferences: bool,
}

impl FeatureFlags {
    /// Creates feature flags with all features enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            behavior_capture: true,
            lazy_preferences: true,
        }
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::all()
    }
}
