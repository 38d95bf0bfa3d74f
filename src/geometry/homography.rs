//! Projective transforms from four point correspondences.
//!
//! Both the layer-transform path and the warper go through [`Homography`], so
//! there is exactly one solver in the crate.

use kurbo::Point;

use crate::{MockupError, MockupResult};

/// 3×3 projective matrix, row-major, normalized so `m[8] == 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    m: [f64; 9],
}

impl Homography {
    pub const IDENTITY: Self = Self {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    /// `x' = (h0 x + h1 y + h2) / (h6 x + h7 y + 1)`,
    /// `y' = (h3 x + h4 y + h5) / (h6 x + h7 y + 1)`.
    pub fn from_coefficients(h: [f64; 8]) -> MockupResult<Self> {
        if let Some(i) = h.iter().position(|v| !v.is_finite()) {
            return Err(MockupError::unsupported(format!(
                "perspective coefficient {i} is not finite ({})",
                h[i]
            )));
        }
        Ok(Self {
            m: [h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0],
        })
    }

    /// Solve for the homography taking `src[i]` to `dst[i]`.
    pub fn from_correspondences(src: [Point; 4], dst: [Point; 4]) -> MockupResult<Self> {
        let mut a = [[0.0f64; 8]; 8];
        let mut b = [0.0f64; 8];

        for i in 0..4 {
            let (x, y) = (src[i].x, src[i].y);
            let (xp, yp) = (dst[i].x, dst[i].y);

            a[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -xp * x, -xp * y];
            b[2 * i] = xp;
            a[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -yp * x, -yp * y];
            b[2 * i + 1] = yp;
        }

        let h = solve_linear_8(a, b)?;
        Self::from_coefficients(h)
    }

    /// Map the unit-less rectangle `(0,0)..(w,h)` onto `dst` (TL, TR, BR, BL).
    pub fn from_rect_to_quad(width: f64, height: f64, dst: [Point; 4]) -> MockupResult<Self> {
        let src = [
            Point::new(0.0, 0.0),
            Point::new(width, 0.0),
            Point::new(width, height),
            Point::new(0.0, height),
        ];
        Self::from_correspondences(src, dst)
    }

    pub fn coefficients(&self) -> [f64; 8] {
        let m = &self.m;
        [m[0], m[1], m[2], m[3], m[4], m[5], m[6], m[7]]
    }

    /// `None` when the point maps to (or near) the line at infinity.
    #[inline]
    pub fn apply(&self, p: Point) -> Option<Point> {
        let m = &self.m;
        let w = m[6] * p.x + m[7] * p.y + m[8];
        if w.abs() < 1e-12 {
            return None;
        }
        let out = Point::new(
            (m[0] * p.x + m[1] * p.y + m[2]) / w,
            (m[3] * p.x + m[4] * p.y + m[5]) / w,
        );
        out.is_finite().then_some(out)
    }
}

/// Solve `a · x = b` for an 8×8 system by Gaussian elimination with partial
/// pivoting.
pub fn solve_linear_8(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> MockupResult<[f64; 8]> {
    const N: usize = 8;

    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    if !scale.is_finite() || scale == 0.0 {
        return Err(MockupError::degenerate("homography system is empty or not finite"));
    }
    let tiny = scale * 1e-12;

    for col in 0..N {
        let mut pivot_row = col;
        let mut pivot_abs = a[col][col].abs();
        for row in (col + 1)..N {
            if a[row][col].abs() > pivot_abs {
                pivot_abs = a[row][col].abs();
                pivot_row = row;
            }
        }
        if pivot_abs < tiny {
            return Err(MockupError::degenerate(
                "homography system is singular (collinear corners?)",
            ));
        }
        if pivot_row != col {
            a.swap(col, pivot_row);
            b.swap(col, pivot_row);
        }

        let pivot = a[col][col];
        for row in (col + 1)..N {
            let factor = a[row][col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for j in col..N {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0f64; N];
    for i in (0..N).rev() {
        let mut sum = b[i];
        for j in (i + 1)..N {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum / a[i][i];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(MockupError::degenerate("homography solution is not finite"));
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
    }

    #[test]
    fn solver_handles_a_known_system() {
        // Diagonal system with a permutation to force pivoting.
        let mut a = [[0.0; 8]; 8];
        for i in 0..8 {
            a[i][7 - i] = (i + 1) as f64;
        }
        let b = [8.0, 14.0, 18.0, 20.0, 20.0, 18.0, 14.0, 8.0];
        let x = solve_linear_8(a, b).unwrap();
        for (i, v) in x.iter().enumerate() {
            let row = 7 - i;
            assert!((v * (row + 1) as f64 - b[row]).abs() < 1e-9);
        }
    }

    #[test]
    fn singular_system_is_degenerate() {
        let a = [[1.0; 8]; 8];
        let err = solve_linear_8(a, [1.0; 8]).unwrap_err();
        assert!(matches!(err, MockupError::DegenerateQuad(_)));
    }

    #[test]
    fn identity_rect_gives_identity() {
        let dst = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(0.0, 5.0),
        ];
        let h = Homography::from_rect_to_quad(10.0, 5.0, dst).unwrap();
        for (a, b) in h.coefficients().iter().zip(Homography::IDENTITY.coefficients()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn perspective_quad_corners_round_trip() {
        let dst = [
            Point::new(120.0, 80.0),
            Point::new(410.0, 100.0),
            Point::new(430.0, 390.0),
            Point::new(90.0, 360.0),
        ];
        let h = Homography::from_rect_to_quad(800.0, 600.0, dst).unwrap();
        let src = [
            Point::new(0.0, 0.0),
            Point::new(800.0, 0.0),
            Point::new(800.0, 600.0),
            Point::new(0.0, 600.0),
        ];
        for (s, d) in src.iter().zip(dst.iter()) {
            assert!(close(h.apply(*s).unwrap(), *d));
        }

        let inv = Homography::from_correspondences(dst, src).unwrap();
        let probe = Point::new(321.0, 123.0);
        let back = inv.apply(h.apply(probe).unwrap()).unwrap();
        assert!(close(back, probe));
    }

    #[test]
    fn collinear_destination_is_degenerate() {
        let dst = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(30.0, 0.0),
        ];
        assert!(Homography::from_rect_to_quad(10.0, 10.0, dst).is_err());
    }

    #[test]
    fn non_finite_coefficients_are_unsupported() {
        let err = Homography::from_coefficients([1.0, 0.0, f64::NAN, 0.0, 1.0, 0.0, 0.0, 0.0])
            .unwrap_err();
        assert!(matches!(err, MockupError::UnsupportedTransform(_)));
    }
}
