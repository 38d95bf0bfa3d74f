use crate::detect::PixelRegion;

/// Winner of [`select_largest`] plus where it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    /// Index of the candidate list the region came from.
    pub source: usize,
    /// Index within that list (discovery order).
    pub index: usize,
    /// The winning region.
    pub region: PixelRegion,
}

/// Pick the region with the largest `pixel_count` across candidate lists.
///
/// Ties go to the earliest list, then the earliest region in that list. Lists
/// produced by [`label_components`](crate::detect::label_components) are in
/// row-major discovery order, so the choice is stable for identical pixels.
pub fn select_largest<'a, I>(candidates: I) -> Option<Selection>
where
    I: IntoIterator<Item = &'a [PixelRegion]>,
{
    let mut best: Option<Selection> = None;
    for (source, list) in candidates.into_iter().enumerate() {
        for (index, region) in list.iter().enumerate() {
            let better = match &best {
                None => true,
                Some(b) => region.pixel_count > b.region.pixel_count,
            };
            if better {
                best = Some(Selection {
                    source,
                    index,
                    region: *region,
                });
            }
        }
    }
    best
}
