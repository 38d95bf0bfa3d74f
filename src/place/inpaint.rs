use crate::{MockupError, MockupResult, Raster, detect::MarkerMask};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct InpaintConfig {
    /// Marker pixels (row-major) whose neighborhoods are sampled.
    pub sample_limit: usize,
    /// Window half-size; 2 gives a 5×5 window.
    pub radius: u32,
    /// Fill used when no non-marker neighbor was seen.
    pub fallback_rgb: [u8; 3],
}

impl Default for InpaintConfig {
    fn default() -> Self {
        Self {
            sample_limit: 100,
            radius: 2,
            fallback_rgb: [255, 255, 255],
        }
    }
}

/// Mean RGB of the non-marker pixels around the first sampled marker pixels.
pub fn surround_color(raster: &Raster, mask: &MarkerMask, cfg: &InpaintConfig) -> Option<[u8; 3]> {
    let (w, h) = (raster.width() as i64, raster.height() as i64);
    let r = i64::from(cfg.radius);
    let mut sum = [0u64; 3];
    let mut n = 0u64;

    for (mx, my) in mask.iter_marked().take(cfg.sample_limit) {
        for dy in -r..=r {
            for dx in -r..=r {
                let (x, y) = (i64::from(mx) + dx, i64::from(my) + dy);
                if x < 0 || y < 0 || x >= w || y >= h {
                    continue;
                }
                let (x, y) = (x as u32, y as u32);
                if mask.get(x, y) {
                    continue;
                }
                let px = raster.pixel(x, y);
                for c in 0..3 {
                    sum[c] += u64::from(px[c]);
                }
                n += 1;
            }
        }
    }

    if n == 0 {
        return None;
    }
    Some([0, 1, 2].map(|c| ((sum[c] + n / 2) / n) as u8))
}

/// Flat-fill every marker pixel with the surround mean so no reference color
/// bleeds past the artwork edges. Returns the fill color. Alpha is untouched.
pub fn erase_markers(
    raster: &mut Raster,
    mask: &MarkerMask,
    cfg: &InpaintConfig,
) -> MockupResult<[u8; 3]> {
    if (mask.width(), mask.height()) != (raster.width(), raster.height()) {
        return Err(MockupError::validation(
            "marker mask dimensions must match the template",
        ));
    }

    let fill = match surround_color(raster, mask, cfg) {
        Some(rgb) => rgb,
        None => {
            tracing::debug!("no non-marker neighbors sampled; using fallback fill");
            cfg.fallback_rgb
        }
    };

    let data = raster.data_mut();
    for (px, marked) in data.chunks_exact_mut(4).zip(mask.bits()) {
        if *marked {
            px[..3].copy_from_slice(&fill);
        }
    }
    tracing::debug!(?fill, pixels = mask.count(), "erased marker pixels");
    Ok(fill)
}
