//! Per-frame graph settings.

/// Settings for building and running one frame's render graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    /// Debug label used in logs and observer callbacks.
    pub label: Option<String>,
    /// Warn when a resource is written again before anything read it.
    pub warn_on_write_hazards: bool,
    /// Warn when a usage declares neither read nor write access.
    pub warn_on_empty_access: bool,
}

impl GraphConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Enable or disable write-hazard warnings.
    pub fn with_write_hazard_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_write_hazards = enabled;
        self
    }

    /// Enable or disable empty-access warnings.
    pub fn with_empty_access_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_empty_access = enabled;
        self
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            label: None,
            warn_on_write_hazards: cfg!(debug_assertions),
            warn_on_empty_access: true,
        }
    }
}
