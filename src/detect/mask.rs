use rayon::prelude::*;

use crate::{MockupError, MockupResult, Raster, detect::ColorClassRule};

/// Knobs for the marker scan.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Test every Nth pixel in both axes and expand hits to their N×N block.
    pub sample_step: u32,
    /// Components smaller than this (full-resolution pixels) are speckle.
    pub min_region_pixels: u32,
    /// Refuse canvases with more pixels than this.
    pub max_scan_pixels: Option<u64>,
    /// Classify rows on the rayon pool.
    pub parallel: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_step: 1,
            min_region_pixels: 100,
            max_scan_pixels: None,
            parallel: false,
        }
    }
}

/// Flat `width*height` marker classification, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
    count: u64,
}

impl MarkerMask {
    pub fn from_bits(width: u32, height: u32, bits: Vec<bool>) -> MockupResult<Self> {
        if bits.len() != width as usize * height as usize {
            return Err(MockupError::validation(
                "marker mask expects width*height entries",
            ));
        }
        let count = bits.iter().filter(|b| **b).count() as u64;
        Ok(Self {
            width,
            height,
            bits,
            count,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total marker pixels (before speckle filtering).
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.bits[y as usize * self.width as usize + x as usize]
    }

    /// Marker coordinates in row-major order.
    pub fn iter_marked(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let w = self.width as usize;
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .map(move |(i, _)| ((i % w) as u32, (i / w) as u32))
    }
}

/// Classify every (sampled) pixel of `raster` against `rule`.
#[tracing::instrument(skip(raster, rule), fields(width = raster.width(), height = raster.height()))]
pub fn scan_markers(
    raster: &Raster,
    rule: &ColorClassRule,
    cfg: &DetectorConfig,
) -> MockupResult<MarkerMask> {
    if cfg.sample_step == 0 {
        return Err(MockupError::validation("detector sample_step must be >= 1"));
    }
    let (w, h) = (raster.width(), raster.height());
    let pixels = u64::from(w) * u64::from(h);
    if let Some(budget) = cfg.max_scan_pixels
        && pixels > budget
    {
        return Err(MockupError::ScanBudgetExceeded { pixels, budget });
    }

    let step = cfg.sample_step;
    let stride = raster.stride();
    let src = raster.data();
    let mut bits = vec![false; w as usize * h as usize];

    // One sampled row owns the `step` mask rows below it, so bands never overlap.
    let band_rows = step as usize;
    let classify_band = |(band, rows): (usize, &mut [bool])| {
        let y = (band * band_rows) as u32;
        let row = &src[y as usize * stride..(y as usize + 1) * stride];
        let rows_in_band = rows.len() / w as usize;
        let mut x = 0u32;
        while x < w {
            let i = x as usize * 4;
            if rule.matches(row[i], row[i + 1], row[i + 2]) {
                let x_end = (x + step).min(w);
                for dy in 0..rows_in_band {
                    let base = dy * w as usize;
                    rows[base + x as usize..base + x_end as usize].fill(true);
                }
            }
            x += step;
        }
    };

    let band_len = band_rows * w as usize;
    if cfg.parallel {
        bits.par_chunks_mut(band_len)
            .enumerate()
            .for_each(classify_band);
    } else {
        bits.chunks_mut(band_len).enumerate().for_each(classify_band);
    }

    let mask = MarkerMask::from_bits(w, h, bits)?;
    tracing::debug!(marker_pixels = mask.count(), step, "marker scan finished");
    Ok(mask)
}
