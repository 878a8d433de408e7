//! Preview configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Default mount point handed to the renderer
pub const DEFAULT_MOUNT_POINT: &str = "#storybook-root";

/// Preview controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreviewConfig {
    /// Opaque mount point passed to every render
    pub mount_point: String,

    /// Capacity of the event broadcast channel
    pub event_capacity: usize,

    /// Ask the renderer to remount on a fresh selection
    pub force_remount_on_select: bool,
}

impl PreviewConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// Returns [`ConfigError::Toml`] on malformed input
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Parse from JSON
    ///
    /// # Errors
    /// Returns [`ConfigError::Json`] on malformed input
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    /// With mount point
    #[must_use]
    pub fn with_mount_point(mut self, mount_point: impl Into<String>) -> Self {
        self.mount_point = mount_point.into();
        self
    }

    /// With event channel capacity (at least 1)
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// With remount flag for fresh selections
    #[must_use]
    pub fn with_force_remount_on_select(mut self, force: bool) -> Self {
        self.force_remount_on_select = force;
        self
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            mount_point: DEFAULT_MOUNT_POINT.to_string(),
            event_capacity: 64,
            force_remount_on_select: true,
        }
    }
}
