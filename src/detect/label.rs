use std::collections::VecDeque;

use crate::detect::MarkerMask;

/// Bounding box and population of one 4-connected marker component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub pixel_count: u64,
}

impl PixelRegion {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// `pixel_count / bbox area`; 1.0 for a solid rectangle.
    pub fn fill_ratio(&self) -> f64 {
        self.pixel_count as f64 / self.area() as f64
    }
}

/// Label 4-connected marker components.
///
/// Seeds are taken in row-major order, so the returned regions are in
/// discovery (scan) order and the result never depends on how the mask was
/// produced. Components with fewer than `min_pixels` pixels are dropped.
pub fn label_components(mask: &MarkerMask, min_pixels: u32) -> Vec<PixelRegion> {
    let w = mask.width() as usize;
    let h = mask.height() as usize;
    let bits = mask.bits();
    let mut visited = vec![false; w * h];
    let mut queue = VecDeque::new();
    let mut regions = Vec::new();

    for seed in 0..w * h {
        if !bits[seed] || visited[seed] {
            continue;
        }

        visited[seed] = true;
        queue.push_back(seed);
        let (mut min_x, mut min_y) = (seed % w, seed / w);
        let (mut max_x, mut max_y) = (min_x, min_y);
        let mut count = 0u64;

        while let Some(i) = queue.pop_front() {
            count += 1;
            let (x, y) = (i % w, i / w);
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);

            let mut visit = |n: usize| {
                if bits[n] && !visited[n] {
                    visited[n] = true;
                    queue.push_back(n);
                }
            };
            if y > 0 {
                visit(i - w);
            }
            if x > 0 {
                visit(i - 1);
            }
            if x + 1 < w {
                visit(i + 1);
            }
            if y + 1 < h {
                visit(i + w);
            }
        }

        if count >= u64::from(min_pixels) {
            regions.push(PixelRegion {
                x: min_x as u32,
                y: min_y as u32,
                width: (max_x - min_x + 1) as u32,
                height: (max_y - min_y + 1) as u32,
                pixel_count: count,
            });
        }
    }

    regions
}
