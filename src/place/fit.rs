use kurbo::Rect;

use crate::{MockupError, MockupResult, detect::PixelRegion};

/// How the artwork box relates to the available space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Whole artwork visible; one axis touches the padded bounds.
    #[default]
    Contain,
    /// Padded bounds fully covered; the overflow is clipped.
    Cover,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Contain keeps the whole artwork, cover fills the region.
    pub mode: FitMode,
    /// Interior padding as a fraction of the region size, per side.
    pub padding: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            mode: FitMode::Contain,
            padding: 0.05,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> MockupResult<()> {
        if !self.padding.is_finite() || !(0.0..0.5).contains(&self.padding) {
            return Err(MockupError::validation(format!(
                "fit padding must be within [0, 0.5), got {}",
                self.padding
            )));
        }
        Ok(())
    }
}

/// Integer destination box in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct PixelBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Result of [`fit_artwork`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Exact (fractional) artwork box.
    pub dest: Rect,
    /// Padded region; `Cover` placements are clipped to it.
    pub clip: Rect,
}

// Absorbs float noise like 449.99999999 before flooring.
const SIZE_EPS: f64 = 1e-6;

impl Placement {
    /// Snap to pixels: origin rounded, sizes floored so the box never grows
    /// past the fractional one.
    pub fn pixel_box(&self) -> PixelBox {
        PixelBox {
            x: self.dest.x0.round() as i32,
            y: self.dest.y0.round() as i32,
            width: ((self.dest.width() + SIZE_EPS).floor() as u32).max(1),
            height: ((self.dest.height() + SIZE_EPS).floor() as u32).max(1),
        }
    }
}

impl PixelRegion {
    pub fn rect(&self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x) + f64::from(self.width),
            f64::from(self.y) + f64::from(self.height),
        )
    }
}

/// Aspect-preserving box for `artwork` (w, h) inside `region`, centered.
pub fn fit_artwork(artwork: (u32, u32), region: Rect, cfg: &FitConfig) -> MockupResult<Placement> {
    cfg.validate()?;
    let (aw, ah) = artwork;
    if aw == 0 || ah == 0 {
        return Err(MockupError::validation("artwork width/height must be > 0"));
    }
    let region = region.abs();
    if region.width() <= 0.0 || region.height() <= 0.0 {
        return Err(MockupError::validation("placement region must have positive size"));
    }

    let aspect = f64::from(aw) / f64::from(ah);
    let avail_w = region.width() * (1.0 - 2.0 * cfg.padding);
    let avail_h = region.height() * (1.0 - 2.0 * cfg.padding);
    let avail_aspect = avail_w / avail_h;

    let wider = aspect > avail_aspect;
    let clamp_width = match cfg.mode {
        FitMode::Contain => wider,
        FitMode::Cover => !wider,
    };
    let (w, h) = if clamp_width {
        (avail_w, avail_w / aspect)
    } else {
        (avail_h * aspect, avail_h)
    };

    let center = region.center();
    let dest = Rect::from_center_size(center, (w, h));
    let clip = Rect::from_center_size(center, (avail_w, avail_h));
    Ok(Placement { dest, clip })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_artwork_in_square_region_gets_vertical_margins() {
        let region = Rect::new(0.0, 0.0, 500.0, 500.0);
        let p = fit_artwork((800, 600), region, &FitConfig::default()).unwrap();
        let b = p.pixel_box();
        assert_eq!((b.width, b.height), (450, 337));
        assert_eq!(b.x, 25);
        assert!(b.y > 25);
        assert!(b.y + b.height as i32 <= 475);
        assert!((p.dest.center().x - 250.0).abs() < 1e-9);
        assert!((p.dest.center().y - 250.0).abs() < 1e-9);
    }

    #[test]
    fn aspect_is_preserved_and_box_stays_inside_padding() {
        let cfg = FitConfig::default();
        for (art, region) in [
            ((800, 600), Rect::new(10.0, 20.0, 410.0, 920.0)),
            ((300, 1200), Rect::new(0.0, 0.0, 1000.0, 250.0)),
            ((1, 1), Rect::new(5.0, 5.0, 105.0, 55.0)),
            ((1920, 1080), Rect::new(400.0, 400.0, 600.0, 600.0)),
        ] {
            let p = fit_artwork(art, region, &cfg).unwrap();
            let want = f64::from(art.0) / f64::from(art.1);
            let got = p.dest.width() / p.dest.height();
            assert!((want - got).abs() < 1e-9, "{art:?} in {region:?}");
            let pad_x = region.width() * cfg.padding;
            let pad_y = region.height() * cfg.padding;
            assert!(p.dest.x0 >= region.x0 + pad_x - 1e-9);
            assert!(p.dest.x1 <= region.x1 - pad_x + 1e-9);
            assert!(p.dest.y0 >= region.y0 + pad_y - 1e-9);
            assert!(p.dest.y1 <= region.y1 - pad_y + 1e-9);
            // Exactly one axis is clamped to the available space.
            let touches_w = (p.dest.width() - p.clip.width()).abs() < 1e-9;
            let touches_h = (p.dest.height() - p.clip.height()).abs() < 1e-9;
            assert!(touches_w || touches_h);
        }
    }

    #[test]
    fn cover_fills_the_padded_box() {
        let cfg = FitConfig {
            mode: FitMode::Cover,
            padding: 0.0,
        };
        let p = fit_artwork((800, 600), Rect::new(0.0, 0.0, 500.0, 500.0), &cfg).unwrap();
        assert!((p.dest.height() - 500.0).abs() < 1e-9);
        assert!(p.dest.width() > 500.0);
        assert!(p.dest.x0 <= p.clip.x0 && p.dest.x1 >= p.clip.x1);
        assert!(p.dest.y0 <= p.clip.y0 + 1e-9 && p.dest.y1 >= p.clip.y1 - 1e-9);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let region = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(fit_artwork((0, 5), region, &FitConfig::default()).is_err());
        let bad = FitConfig {
            padding: 0.5,
            ..FitConfig::default()
        };
        assert!(fit_artwork((5, 5), region, &bad).is_err());
        let flat = Rect::new(0.0, 0.0, 10.0, 0.0);
        assert!(fit_artwork((5, 5), flat, &FitConfig::default()).is_err());
    }
}
