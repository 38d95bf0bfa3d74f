//! Source-over compositing with blend modes, opacity and coverage masks.

mod blend;
mod feather;

pub use blend::BlendMode;
pub use feather::{
    CoverageMask, MAX_FEATHER_PX, blur_plane, feathered_quad_mask, quad_coverage,
};

use crate::{
    MockupError, MockupResult, Raster,
    foundation::math::{mul_div255_u8, unit_to_u8},
};

/// How a layer is laid over the base.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LayerStyle {
    pub mode: BlendMode,
    pub opacity: f32,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            mode: BlendMode::Normal,
            opacity: 1.0,
        }
    }
}

impl LayerStyle {
    pub fn validate(&self) -> MockupResult<()> {
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(MockupError::validation(format!(
                "opacity must be within [0, 1], got {}",
                self.opacity
            )));
        }
        Ok(())
    }
}

/// Composite `layer` onto `base` with its top-left at canvas `(x, y)`.
///
/// Pixels outside the base are dropped. `mask`, when given, must match the
/// layer size and scales source alpha per pixel. Zero opacity leaves `base`
/// untouched.
#[tracing::instrument(skip(base, layer, mask), fields(w = layer.width(), h = layer.height()))]
pub fn composite_layer(
    base: &mut Raster,
    layer: &Raster,
    x: i32,
    y: i32,
    style: &LayerStyle,
    mask: Option<&CoverageMask>,
) -> MockupResult<()> {
    style.validate()?;
    if let Some(m) = mask
        && (m.width(), m.height()) != (layer.width(), layer.height())
    {
        return Err(MockupError::validation(
            "coverage mask dimensions must match the layer",
        ));
    }
    if style.opacity <= 0.0 {
        return Ok(());
    }

    // Overlap of the layer with the base, in layer coordinates.
    let lx0 = (-i64::from(x)).max(0);
    let ly0 = (-i64::from(y)).max(0);
    let lx1 = i64::from(layer.width()).min(i64::from(base.width()) - i64::from(x));
    let ly1 = i64::from(layer.height()).min(i64::from(base.height()) - i64::from(y));
    if lx1 <= lx0 || ly1 <= ly0 {
        tracing::debug!("layer does not overlap the base");
        return Ok(());
    }

    for ly in ly0..ly1 {
        for lx in lx0..lx1 {
            let (lx, ly) = (lx as u32, ly as u32);
            let src = layer.pixel(lx, ly);
            let coverage = mask.map_or(255, |m| m.get(lx, ly));
            let sa = mul_div255_u8(u16::from(src[3]), u16::from(coverage));
            if sa == 0 {
                continue;
            }
            let (bx, by) = ((i64::from(x) + i64::from(lx)) as u32, (i64::from(y) + i64::from(ly)) as u32);
            let dst = base.pixel(bx, by);
            let alpha = f32::from(sa) / 255.0 * style.opacity;
            base.set_pixel(bx, by, blend_pixel(dst, src, alpha, style.mode));
        }
    }
    Ok(())
}

/// W3C source-over with a blend function, on straight-alpha pixels.
/// `alpha` is the effective source alpha (after coverage and opacity).
pub fn blend_pixel(dst: [u8; 4], src: [u8; 4], alpha: f32, mode: BlendMode) -> [u8; 4] {
    let unit = |v: u8| f32::from(v) / 255.0;
    let ab = unit(dst[3]);
    let cb = [unit(dst[0]), unit(dst[1]), unit(dst[2])];
    let cs = [unit(src[0]), unit(src[1]), unit(src[2])];

    let blended = mode.apply(cb, cs);
    let ao = alpha + ab * (1.0 - alpha);
    if ao <= 0.0 {
        return [0, 0, 0, 0];
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let mixed = (1.0 - ab) * cs[c] + ab * blended[c];
        let co = alpha * mixed + ab * cb[c] * (1.0 - alpha);
        out[c] = unit_to_u8(co / ao);
    }
    out[3] = unit_to_u8(ao);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(w: u32, h: u32) -> Raster {
        let mut r = Raster::transparent(w, h).unwrap();
        for y in 0..h {
            for x in 0..w {
                let v = if (x + y) % 2 == 0 { 240 } else { 30 };
                r.set_pixel(x, y, [v, 255 - v, v / 2, 255]);
            }
        }
        r
    }

    #[test]
    fn zero_opacity_leaves_the_base_untouched() {
        let mut base = checker(8, 8);
        let before = base.clone();
        let layer = Raster::filled(4, 4, [1, 2, 3, 255]).unwrap();
        let style = LayerStyle {
            mode: BlendMode::Multiply,
            opacity: 0.0,
        };
        composite_layer(&mut base, &layer, 2, 2, &style, None).unwrap();
        assert_eq!(base, before);
    }

    #[test]
    fn full_opacity_normal_copies_opaque_artwork() {
        let mut base = checker(8, 8);
        let layer = checker(3, 3);
        let mut layer = layer;
        layer.set_pixel(1, 1, [11, 22, 33, 255]);
        composite_layer(&mut base, &layer, 4, 1, &LayerStyle::default(), None).unwrap();
        assert_eq!(base.pixel(5, 2), [11, 22, 33, 255]);
        for ly in 0..3 {
            for lx in 0..3 {
                assert_eq!(base.pixel(4 + lx, 1 + ly), layer.pixel(lx, ly));
            }
        }
    }

    #[test]
    fn half_alpha_mixes_with_the_base() {
        let mut base = Raster::filled(1, 1, [0, 0, 0, 255]).unwrap();
        let layer = Raster::filled(1, 1, [255, 255, 255, 255]).unwrap();
        let style = LayerStyle {
            mode: BlendMode::Normal,
            opacity: 0.5,
        };
        composite_layer(&mut base, &layer, 0, 0, &style, None).unwrap();
        assert_eq!(base.pixel(0, 0), [128, 128, 128, 255]);
    }

    #[test]
    fn multiply_darkens() {
        let mut base = Raster::filled(1, 1, [200, 100, 50, 255]).unwrap();
        let layer = Raster::filled(1, 1, [128, 255, 0, 255]).unwrap();
        let style = LayerStyle {
            mode: BlendMode::Multiply,
            opacity: 1.0,
        };
        composite_layer(&mut base, &layer, 0, 0, &style, None).unwrap();
        assert_eq!(base.pixel(0, 0), [100, 100, 0, 255]);
    }

    #[test]
    fn over_a_transparent_base_keeps_the_source_color() {
        let mut base = Raster::transparent(1, 1).unwrap();
        let layer = Raster::filled(1, 1, [10, 200, 30, 255]).unwrap();
        let style = LayerStyle {
            mode: BlendMode::Screen,
            opacity: 0.5,
        };
        composite_layer(&mut base, &layer, 0, 0, &style, None).unwrap();
        assert_eq!(base.pixel(0, 0), [10, 200, 30, 128]);
    }

    #[test]
    fn offscreen_parts_are_clipped() {
        let mut base = Raster::filled(4, 4, [0, 0, 0, 255]).unwrap();
        let layer = Raster::filled(4, 4, [255, 0, 0, 255]).unwrap();
        composite_layer(&mut base, &layer, -2, 3, &LayerStyle::default(), None).unwrap();
        assert_eq!(base.pixel(0, 3), [255, 0, 0, 255]);
        assert_eq!(base.pixel(1, 3), [255, 0, 0, 255]);
        assert_eq!(base.pixel(2, 3), [0, 0, 0, 255]);
        assert_eq!(base.pixel(0, 2), [0, 0, 0, 255]);

        let before = base.clone();
        composite_layer(&mut base, &layer, 10, 10, &LayerStyle::default(), None).unwrap();
        assert_eq!(base, before);
    }

    #[test]
    fn mask_scales_alpha_and_must_match_the_layer() {
        let mut base = Raster::filled(2, 1, [0, 0, 0, 255]).unwrap();
        let layer = Raster::filled(2, 1, [255, 255, 255, 255]).unwrap();
        let mask = CoverageMask::from_raw(2, 1, vec![0, 255]).unwrap();
        composite_layer(&mut base, &layer, 0, 0, &LayerStyle::default(), Some(&mask)).unwrap();
        assert_eq!(base.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(base.pixel(1, 0), [255, 255, 255, 255]);

        let wrong = CoverageMask::from_raw(1, 1, vec![255]).unwrap();
        assert!(
            composite_layer(&mut base, &layer, 0, 0, &LayerStyle::default(), Some(&wrong))
                .is_err()
        );
    }

    #[test]
    fn opacity_out_of_range_is_rejected() {
        let mut base = Raster::filled(1, 1, [0, 0, 0, 255]).unwrap();
        let layer = base.clone();
        let style = LayerStyle {
            mode: BlendMode::Normal,
            opacity: 1.5,
        };
        assert!(matches!(
            composite_layer(&mut base, &layer, 0, 0, &style, None),
            Err(MockupError::Validation(_))
        ));
    }
}
