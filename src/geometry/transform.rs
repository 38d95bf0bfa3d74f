use kurbo::Point;

use crate::{
    MockupError, MockupResult,
    geometry::{Homography, Quad},
};

/// Nominal (untransformed) layer bounds in document space.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerBounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl LayerBounds {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn rect(&self) -> kurbo::Rect {
        kurbo::Rect::new(self.left, self.top, self.right, self.bottom)
    }

    fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left, self.top),
            Point::new(self.right, self.top),
            Point::new(self.right, self.bottom),
            Point::new(self.left, self.bottom),
        ]
    }
}

/// Layer-local → canvas transform as delivered by the document parser.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformMatrix {
    /// `[c0..c5]`: `x' = c0 x + c1 y + c4`, `y' = c2 x + c3 y + c5`.
    Affine([f64; 6]),
    /// `[h0..h7]` of a homography with `h8 = 1`.
    Perspective([f64; 8]),
}

impl TransformMatrix {
    pub fn coefficients(&self) -> &[f64] {
        match self {
            Self::Affine(c) => c,
            Self::Perspective(h) => h,
        }
    }

    /// Build from a raw coefficient list (6 or 8 values).
    pub fn from_slice(c: &[f64]) -> MockupResult<Self> {
        match c.len() {
            6 => Ok(Self::Affine([c[0], c[1], c[2], c[3], c[4], c[5]])),
            8 => Ok(Self::Perspective([
                c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7],
            ])),
            n => Err(MockupError::unsupported(format!(
                "transform needs 6 or 8 coefficients, got {n}"
            ))),
        }
    }

    fn as_homography(&self) -> MockupResult<Homography> {
        match *self {
            Self::Affine([c0, c1, c2, c3, c4, c5]) => {
                Homography::from_coefficients([c0, c1, c4, c2, c3, c5, 0.0, 0.0])
            }
            Self::Perspective(h) => Homography::from_coefficients(h),
        }
    }
}

/// Map the four nominal corners through `transform` into a validated [`Quad`].
///
/// Non-finite coefficients or corners fail with `UnsupportedTransform` before
/// anything else is looked at.
pub fn extract_quad(bounds: &LayerBounds, transform: &TransformMatrix) -> MockupResult<Quad> {
    if let Some(v) = transform.coefficients().iter().find(|v| !v.is_finite()) {
        return Err(MockupError::unsupported(format!(
            "transform coefficient is not finite ({v})"
        )));
    }
    let nominal = [bounds.left, bounds.top, bounds.right, bounds.bottom];
    if nominal.iter().any(|v| !v.is_finite()) {
        return Err(MockupError::unsupported("layer bounds are not finite"));
    }

    let h = transform.as_homography()?;
    let mut corners = [Point::ZERO; 4];
    for (out, p) in corners.iter_mut().zip(bounds.corners()) {
        *out = h.apply(p).ok_or_else(|| {
            MockupError::unsupported(format!(
                "corner ({}, {}) maps to a non-finite point",
                p.x, p.y
            ))
        })?;
    }

    let quad = Quad { corners };
    quad.validate()?;
    tracing::debug!(corners = ?quad.corners, "extracted destination quad");
    Ok(quad)
}
