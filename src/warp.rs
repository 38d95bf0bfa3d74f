//! Inverse-mapped perspective warp with bilinear resampling.

use kurbo::Point;
use rayon::prelude::*;

use crate::{
    MockupError, MockupResult, Raster,
    geometry::{Homography, Quad},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WarpConfig {
    /// Resample destination rows on the rayon pool.
    pub parallel: bool,
}

/// Warped artwork positioned at the quad's (clipped) bounding box; `x`/`y`
/// are the canvas position of its top-left pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct WarpedLayer {
    pub raster: Raster,
    pub x: i32,
    pub y: i32,
}

/// Warp `src` so its corners land on `quad`.
///
/// Every destination pixel center is mapped back through the inverse
/// homography; samples outside `[-0.5, w-0.5) × [-0.5, h-0.5)` stay
/// transparent. `clip` limits the output to a `(width, height)` canvas.
#[tracing::instrument(skip(src, quad), fields(src_w = src.width(), src_h = src.height()))]
pub fn warp_into_quad(
    src: &Raster,
    quad: &Quad,
    clip: Option<(u32, u32)>,
    cfg: &WarpConfig,
) -> MockupResult<WarpedLayer> {
    quad.validate()?;
    let (sw, sh) = (f64::from(src.width()), f64::from(src.height()));
    let source_rect = [
        Point::new(0.0, 0.0),
        Point::new(sw, 0.0),
        Point::new(sw, sh),
        Point::new(0.0, sh),
    ];
    let inverse = Homography::from_correspondences(quad.corners, source_rect)?;

    let b = quad.bounds();
    let (mut x0, mut y0) = (b.x0.floor() as i64, b.y0.floor() as i64);
    let (mut x1, mut y1) = (b.x1.ceil() as i64, b.y1.ceil() as i64);
    if let Some((cw, ch)) = clip {
        x0 = x0.max(0);
        y0 = y0.max(0);
        x1 = x1.min(i64::from(cw));
        y1 = y1.min(i64::from(ch));
    }
    if x1 <= x0 || y1 <= y0 {
        return Err(MockupError::validation(
            "destination quad does not overlap the canvas",
        ));
    }
    let (bw, bh) = ((x1 - x0) as u32, (y1 - y0) as u32);
    let mut out = Raster::transparent(bw, bh)?;

    let sampler = Sampler {
        src,
        inverse,
        origin: (x0 as f64, y0 as f64),
    };
    let stride = out.stride();
    let rows = out.data_mut();
    if cfg.parallel {
        rows.par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| sampler.fill_row(y, row));
    } else {
        rows.chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| sampler.fill_row(y, row));
    }

    tracing::debug!(x = x0, y = y0, width = bw, height = bh, "warped artwork");
    Ok(WarpedLayer {
        raster: out,
        x: x0 as i32,
        y: y0 as i32,
    })
}

struct Sampler<'a> {
    src: &'a Raster,
    inverse: Homography,
    origin: (f64, f64),
}

impl Sampler<'_> {
    fn fill_row(&self, y: usize, row: &mut [u8]) {
        let (sw, sh) = (f64::from(self.src.width()), f64::from(self.src.height()));
        let cy = self.origin.1 + y as f64 + 0.5;
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let center = Point::new(self.origin.0 + x as f64 + 0.5, cy);
            let Some(s) = self.inverse.apply(center) else {
                continue;
            };
            // Pixel-center coordinates in the source.
            let (sx, sy) = (s.x - 0.5, s.y - 0.5);
            if sx < -0.5 || sx >= sw - 0.5 || sy < -0.5 || sy >= sh - 0.5 {
                continue;
            }
            px.copy_from_slice(&bilinear_rgba(self.src, sx as f32, sy as f32));
        }
    }
}

/// Bilinear sample at pixel-center coordinates, clamped to the edges.
///
/// Color is weighted by alpha so transparent texels don't darken edges; alpha
/// itself uses the same weights.
pub fn bilinear_rgba(src: &Raster, x: f32, y: f32) -> [u8; 4] {
    let max_x = (src.width() - 1) as f32;
    let max_y = (src.height() - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(src.width() - 1);
    let y1 = (y0 + 1).min(src.height() - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x1, y0, fx * (1.0 - fy)),
        (x0, y1, (1.0 - fx) * fy),
        (x1, y1, fx * fy),
    ];

    let mut alpha = 0.0f32;
    let mut color = [0.0f32; 3];
    for (tx, ty, w) in taps {
        if w == 0.0 {
            continue;
        }
        let p = src.pixel(tx, ty);
        let wa = w * f32::from(p[3]);
        alpha += wa;
        for c in 0..3 {
            color[c] += wa * f32::from(p[c]);
        }
    }

    if alpha <= 0.0 {
        return [0, 0, 0, 0];
    }
    let a = (alpha / 255.0).clamp(0.0, 1.0);
    [
        (color[0] / alpha).round().clamp(0.0, 255.0) as u8,
        (color[1] / alpha).round().clamp(0.0, 255.0) as u8,
        (color[2] / alpha).round().clamp(0.0, 255.0) as u8,
        (a * 255.0).round() as u8,
    ]
}
