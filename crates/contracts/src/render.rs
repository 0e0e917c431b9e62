//! Render configuration shared between the acquisition thread and controllers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::SensorVariant;

/// Default manual lower bound
pub const DEFAULT_RANGE_MIN: u16 = 30000;

/// Default manual upper bound
pub const DEFAULT_RANGE_MAX: u16 = 32000;

/// Colormap selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColormapKind {
    Rainbow,
    Grayscale,
    #[default]
    Ironblack,
}

/// Per-frame render configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Sensor variant (decides layout and segment handling)
    pub variant: SensorVariant,

    /// Active colormap
    pub colormap: ColormapKind,

    /// Recompute the lower bound from each frame
    pub auto_range_min: bool,

    /// Recompute the upper bound from each frame
    pub auto_range_max: bool,

    /// Manual lower bound
    pub range_min: u16,

    /// Manual upper bound
    pub range_max: u16,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            variant: SensorVariant::default(),
            colormap: ColormapKind::default(),
            auto_range_min: true,
            auto_range_max: true,
            range_min: DEFAULT_RANGE_MIN,
            range_max: DEFAULT_RANGE_MAX,
        }
    }
}

impl RenderConfig {
    /// Whether either bound is auto-ranged
    pub fn auto_range(&self) -> bool {
        self.auto_range_min || self.auto_range_max
    }

    /// Pin the lower bound (disables auto-ranging of the minimum)
    pub fn use_range_min(&mut self, value: u16) {
        self.auto_range_min = false;
        self.range_min = value;
    }

    /// Pin the upper bound (disables auto-ranging of the maximum)
    pub fn use_range_max(&mut self, value: u16) {
        self.auto_range_max = false;
        self.range_max = value;
    }

    /// Auto-range both bounds
    pub fn use_automatic_range(&mut self) {
        self.auto_range_min = true;
        self.auto_range_max = true;
    }
}

/// Shared, atomically swapped render configuration
///
/// Writers replace the whole record; the acquisition loop clones one snapshot
/// per pass, so a frame never mixes old and new settings.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    inner: Arc<watch::Sender<RenderConfig>>,
}

impl RenderSettings {
    /// Create settings with an initial configuration
    pub fn new(config: RenderConfig) -> Self {
        let (tx, _rx) = watch::channel(config);
        Self {
            inner: Arc::new(tx),
        }
    }

    /// Consistent copy of the current configuration
    pub fn snapshot(&self) -> RenderConfig {
        self.inner.borrow().clone()
    }

    /// Modify the configuration in place; readers see all-or-nothing
    pub fn update(&self, modify: impl FnOnce(&mut RenderConfig)) {
        self.inner.send_modify(modify);
    }

    /// Replace the whole configuration
    pub fn replace(&self, config: RenderConfig) {
        self.inner.send_replace(config);
    }

    /// Receiver that is notified on every change
    pub fn subscribe(&self) -> watch::Receiver<RenderConfig> {
        self.inner.subscribe()
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}
