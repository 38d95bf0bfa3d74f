use kurbo::{Point, Rect};

use crate::{MockupError, MockupResult};

/// Quads with less absolute area than this (px²) are degenerate.
pub const MIN_QUAD_AREA: f64 = 1.0;

/// Destination quadrilateral `[TL, TR, BR, BL]` in canvas coordinates.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "[[f64; 2]; 4]", into = "[[f64; 2]; 4]")]
pub struct Quad {
    pub corners: [Point; 4],
}

impl From<[[f64; 2]; 4]> for Quad {
    fn from(c: [[f64; 2]; 4]) -> Self {
        Self {
            corners: c.map(|[x, y]| Point::new(x, y)),
        }
    }
}

impl From<Quad> for [[f64; 2]; 4] {
    fn from(q: Quad) -> Self {
        q.corners.map(|p| [p.x, p.y])
    }
}

impl Quad {
    pub fn new(tl: Point, tr: Point, br: Point, bl: Point) -> Self {
        Self {
            corners: [tl, tr, br, bl],
        }
    }

    pub fn from_rect(r: Rect) -> Self {
        Self::new(
            Point::new(r.x0, r.y0),
            Point::new(r.x1, r.y0),
            Point::new(r.x1, r.y1),
            Point::new(r.x0, r.y1),
        )
    }

    /// Shoelace area; positive for TL→TR→BR→BL in y-down canvas space.
    pub fn signed_area(&self) -> f64 {
        let c = &self.corners;
        let mut acc = 0.0;
        for i in 0..4 {
            let (a, b) = (c[i], c[(i + 1) % 4]);
            acc += a.x * b.y - b.x * a.y;
        }
        acc * 0.5
    }

    pub fn bounds(&self) -> Rect {
        let c = &self.corners;
        let mut r = Rect::from_points(c[0], c[1]);
        r = r.union_pt(c[2]);
        r.union_pt(c[3])
    }

    pub fn is_finite(&self) -> bool {
        self.corners.iter().all(|p| p.is_finite())
    }

    /// True when opposite edges cross (a "bow-tie").
    pub fn is_self_intersecting(&self) -> bool {
        let c = &self.corners;
        segments_cross(c[0], c[1], c[2], c[3]) || segments_cross(c[1], c[2], c[3], c[0])
    }

    /// Enforce the quad invariants: finite corners, no crossing edges, area
    /// above [`MIN_QUAD_AREA`].
    pub fn validate(&self) -> MockupResult<()> {
        if !self.is_finite() {
            return Err(MockupError::unsupported("quad corner is not finite"));
        }
        let area = self.signed_area();
        if area.abs() < MIN_QUAD_AREA {
            return Err(MockupError::degenerate(format!(
                "quad area {area:.3} is below {MIN_QUAD_AREA}"
            )));
        }
        if self.is_self_intersecting() {
            return Err(MockupError::degenerate("quad edges cross each other"));
        }
        Ok(())
    }

    /// Even-odd point-in-polygon test.
    pub fn contains(&self, p: Point) -> bool {
        let c = &self.corners;
        let mut inside = false;
        let mut j = 3;
        for i in 0..4 {
            let (a, b) = (c[i], c[j]);
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            corners: self.corners.map(|p| Point::new(p.x + dx, p.y + dy)),
        }
    }
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

// Proper crossings only; shared endpoints and collinear touching don't count.
fn segments_cross(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}
