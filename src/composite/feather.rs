use kurbo::Point;

use crate::{MockupError, MockupResult, geometry::Quad};

/// Largest accepted feather; the blur kernel spans `6 * feather_px + 1` taps.
pub const MAX_FEATHER_PX: f32 = 100.0;

/// Single-channel 8-bit coverage plane, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverageMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl CoverageMask {
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> MockupResult<Self> {
        if data.len() != width as usize * height as usize {
            return Err(MockupError::validation(
                "coverage mask expects width*height entries",
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }
}

/// Hard-edged coverage of `quad` over a `width × height` window whose top-left
/// pixel sits at canvas `(x, y)`. A pixel is covered when its center is inside.
pub fn quad_coverage(quad: &Quad, x: i32, y: i32, width: u32, height: u32) -> CoverageMask {
    let mut data = vec![0u8; width as usize * height as usize];
    for (row, line) in data.chunks_exact_mut(width as usize).enumerate() {
        let cy = f64::from(y) + row as f64 + 0.5;
        for (col, v) in line.iter_mut().enumerate() {
            let cx = f64::from(x) + col as f64 + 0.5;
            if quad.contains(Point::new(cx, cy)) {
                *v = 255;
            }
        }
    }
    CoverageMask {
        width,
        height,
        data,
    }
}

/// Soft-edged quad mask: hard coverage blurred with a Gaussian of standard
/// deviation `feather_px`. Zero feather returns the hard mask.
#[tracing::instrument(skip(quad))]
pub fn feathered_quad_mask(
    quad: &Quad,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    feather_px: f32,
) -> MockupResult<CoverageMask> {
    if !feather_px.is_finite() || !(0.0..=MAX_FEATHER_PX).contains(&feather_px) {
        return Err(MockupError::validation(format!(
            "feather_px must be within [0, {MAX_FEATHER_PX}], got {feather_px}"
        )));
    }
    if feather_px == 0.0 {
        return Ok(quad_coverage(quad, x, y, width, height));
    }

    // Blur edges clamp, so rasterize with a margin and crop it off again.
    let radius = (feather_px * 3.0).ceil() as u32;
    let overflow = || MockupError::validation("feathered mask size overflow");
    let margin = radius.checked_mul(2).ok_or_else(overflow)?;
    let pw = width.checked_add(margin).ok_or_else(overflow)?;
    let ph = height.checked_add(margin).ok_or_else(overflow)?;
    let ox = x.checked_sub_unsigned(radius).ok_or_else(overflow)?;
    let oy = y.checked_sub_unsigned(radius).ok_or_else(overflow)?;
    let padded = quad_coverage(quad, ox, oy, pw, ph);
    let blurred = blur_plane(&padded.data, pw, ph, radius, feather_px)?;

    let r = radius as usize;
    let mut data = Vec::with_capacity(width as usize * height as usize);
    for row in blurred.chunks_exact(pw as usize).skip(r).take(height as usize) {
        data.extend_from_slice(&row[r..r + width as usize]);
    }
    Ok(CoverageMask {
        width,
        height,
        data,
    })
}

/// Separable Gaussian blur of an 8-bit plane with a q16 fixed-point kernel.
/// Edges clamp.
pub fn blur_plane(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> MockupResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| MockupError::validation("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(MockupError::validation(
            "blur_plane expects src matching width*height",
        ));
    }
    if radius == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];
    horizontal_pass(src, &mut tmp, width, height, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> MockupResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(MockupError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();
    if sum <= 0.0 {
        return Err(MockupError::validation("gaussian kernel sum is zero"));
    }

    let mut weights: Vec<u32> = Vec::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for wf in weights_f {
        let q = (((wf / sum) * 65536.0).round() as i64).clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Push the rounding residue into the center tap so the kernel sums to 1.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = 0u64;
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                acc += u64::from(kw) * u64::from(src[(y * w + sx) as usize]);
            }
            dst[(y * w + x) as usize] = q16_to_u8(acc);
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u64;
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                acc += u64::from(kw) * u64::from(src[(sy * w + x) as usize]);
            }
            dst[(y * w + x) as usize] = q16_to_u8(acc);
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}
