//! Marker-color region detection: classify, label, select.

mod label;
mod mask;
mod rule;
mod select;

pub use label::{PixelRegion, label_components};
pub use mask::{DetectorConfig, MarkerMask, scan_markers};
pub use rule::{
    ChannelRange, ColorClassRule, ColorPredicate, HsvRange, RgbRange, RulePreset, rgb_to_hsv,
};
pub use select::{Selection, select_largest};

use crate::{MockupError, MockupResult, Raster};

/// Output of one marker-color detection pass.
#[derive(Clone, Debug)]
pub struct MarkerDetection {
    /// Every classified marker pixel, speckle included.
    pub mask: MarkerMask,
    /// Components above the speckle threshold, in scan order.
    pub regions: Vec<PixelRegion>,
}

impl MarkerDetection {
    pub fn total_marker_pixels(&self) -> u64 {
        self.mask.count()
    }

    pub fn largest(&self) -> Option<Selection> {
        select_largest([self.regions.as_slice()])
    }
}

/// Scan + label. Fails with [`MockupError::NoRegionDetected`] when nothing
/// survives the speckle filter.
pub fn detect_regions(
    raster: &Raster,
    rule: &ColorClassRule,
    cfg: &DetectorConfig,
) -> MockupResult<MarkerDetection> {
    rule.validate()?;
    let mask = scan_markers(raster, rule, cfg)?;
    if mask.is_empty() {
        return Err(MockupError::NoRegionDetected);
    }

    let regions = label_components(&mask, cfg.min_region_pixels);
    tracing::debug!(
        regions = regions.len(),
        marker_pixels = mask.count(),
        "labeled marker components"
    );
    if regions.is_empty() {
        return Err(MockupError::NoRegionDetected);
    }
    Ok(MarkerDetection { mask, regions })
}
