//! Placement strategies and the end-to-end placement call.

use std::fmt;

use image::imageops::FilterType;
use kurbo::Rect;

use crate::{
    MockupError, MockupResult, Raster, StrategyFailure,
    composite::{LayerStyle, composite_layer, feathered_quad_mask},
    detect::{DetectorConfig, MarkerDetection, PixelRegion, Selection, detect_regions},
    geometry::{Quad, extract_quad},
    place::{FitConfig, FitMode, InpaintConfig, erase_markers, fit_artwork},
    raster::OutputFormat,
    template::TemplateSpec,
    warp::{WarpConfig, warp_into_quad},
};

/// How the destination of the artwork is found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Try every concrete strategy; the largest detected area wins.
    Auto,
    /// Flat marker-color region in the template raster.
    MarkerRegion,
    /// Manifest corners, or the smart layer's bounds mapped through its transform.
    QuadTransform,
    /// Smart layer bounds without a transform.
    LayerBounds,
}

impl Strategy {
    /// Order in which [`Strategy::Auto`] attempts strategies; earlier wins ties.
    pub const ATTEMPT_ORDER: [Self; 3] = [Self::MarkerRegion, Self::QuadTransform, Self::LayerBounds];

    pub fn name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::MarkerRegion => "marker-region",
            Self::QuadTransform => "quad-transform",
            Self::LayerBounds => "layer-bounds",
        }
    }

    /// Strategy implied by what the manifest declares.
    pub fn select(spec: &TemplateSpec) -> Self {
        match (spec.declares_marker(), spec.declares_quad()) {
            (true, false) => Self::MarkerRegion,
            (false, true) => Self::QuadTransform,
            _ => Self::Auto,
        }
    }

    /// Locate the artwork destination with this strategy.
    pub fn detect(
        self,
        template: &Raster,
        spec: &TemplateSpec,
        options: &PlacementOptions,
    ) -> MockupResult<Detection> {
        match self {
            Self::Auto => Err(MockupError::validation(
                "auto is resolved by trying the concrete strategies",
            )),
            Self::MarkerRegion => {
                let detection = detect_regions(template, &spec.marker_rule(), &options.detector)?;
                let selection = detection.largest().ok_or(MockupError::NoRegionDetected)?;
                Ok(Detection::Region {
                    detection,
                    selection,
                })
            }
            Self::QuadTransform => {
                if let Some(quad) = spec.corners {
                    quad.validate()?;
                    return Ok(Detection::Quad(quad));
                }
                let node = spec
                    .smart_layer()
                    .and_then(|(tree, id)| tree.get(id))
                    .ok_or_else(|| {
                        MockupError::validation("template declares neither corners nor a smart layer")
                    })?;
                let bounds = node
                    .bounds
                    .ok_or_else(|| MockupError::validation("smart layer has no bounds"))?;
                let transform = node
                    .transform
                    .ok_or_else(|| MockupError::validation("smart layer has no transform"))?;
                Ok(Detection::Quad(extract_quad(&bounds, &transform)?))
            }
            Self::LayerBounds => {
                let bounds = spec
                    .smart_layer()
                    .and_then(|(tree, id)| tree.get(id))
                    .and_then(|node| node.bounds)
                    .ok_or_else(|| MockupError::validation("template has no smart layer bounds"))?;
                let rect = bounds.rect();
                if !(rect.is_finite() && rect.width() > 0.0 && rect.height() > 0.0) {
                    return Err(MockupError::validation(
                        "smart layer bounds must be finite with positive size",
                    ));
                }
                Ok(Detection::Bounds(rect))
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-call configuration.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlacementOptions {
    /// `None` picks a strategy from what the manifest declares.
    pub strategy: Option<Strategy>,
    /// Marker scan settings.
    pub detector: DetectorConfig,
    /// Marker and bounds fitting; manifest `fit`/`padding` take precedence.
    pub fit: FitConfig,
    /// Marker fill settings.
    pub inpaint: InpaintConfig,
    /// Perspective warp settings.
    pub warp: WarpConfig,
}

/// Where one strategy put the artwork.
#[derive(Clone, Debug)]
pub enum Detection {
    Region {
        detection: MarkerDetection,
        selection: Selection,
    },
    Quad(Quad),
    Bounds(Rect),
}

impl Detection {
    pub fn method(&self) -> Strategy {
        match self {
            Self::Region { .. } => Strategy::MarkerRegion,
            Self::Quad(_) => Strategy::QuadTransform,
            Self::Bounds(_) => Strategy::LayerBounds,
        }
    }

    /// Comparable size: marker pixel count, or quad/rect area in px².
    pub fn area(&self) -> f64 {
        match self {
            Self::Region { selection, .. } => selection.region.pixel_count as f64,
            Self::Quad(q) => q.signed_area().abs(),
            Self::Bounds(r) => r.area(),
        }
    }
}

/// Composited image plus what was detected along the way.
#[derive(Clone, Debug)]
pub struct PlacementResult {
    /// Template with the artwork composited in.
    pub image: Raster,
    /// Strategy that produced the image.
    pub method: Strategy,
    /// Strategy asked for, [`Strategy::Auto`] included.
    pub requested: Strategy,
    /// Marker regions above the speckle threshold; 0 when no scan succeeded.
    pub regions_found: usize,
    /// Marker pixels classified by the scan.
    pub total_marker_pixels: u64,
    /// Marker region the artwork went into.
    pub chosen_region: Option<PixelRegion>,
    /// Destination quad for the quad and bounds strategies.
    pub chosen_quad: Option<Quad>,
    /// Strategy failures in auto mode and blend-mode fallbacks.
    pub warnings: Vec<String>,
}

impl PlacementResult {
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            method: self.method,
            requested: self.requested,
            regions_found: self.regions_found,
            total_marker_pixels: self.total_marker_pixels,
            chosen_region: self.chosen_region,
            chosen_quad: self.chosen_quad,
            warnings: self.warnings.clone(),
        }
    }

    pub fn encode(&self, format: OutputFormat) -> MockupResult<Vec<u8>> {
        self.image.encode(format)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub method: Strategy,
    pub requested: Strategy,
    pub regions_found: usize,
    pub total_marker_pixels: u64,
    pub chosen_region: Option<PixelRegion>,
    pub chosen_quad: Option<Quad>,
    pub warnings: Vec<String>,
}

/// Place `artwork` onto `template` as described by `spec`.
#[tracing::instrument(
    skip_all,
    fields(
        artwork_w = artwork.width(),
        artwork_h = artwork.height(),
        template_w = template.width(),
        template_h = template.height()
    )
)]
pub fn place_mockup(
    artwork: &Raster,
    template: &Raster,
    spec: &TemplateSpec,
    options: &PlacementOptions,
) -> MockupResult<PlacementResult> {
    spec.validate()?;
    options.fit.validate()?;

    let requested = options.strategy.unwrap_or_else(|| Strategy::select(spec));
    let mut style_warnings = Vec::new();
    let style = spec.layer_style(&mut style_warnings)?;

    let (candidates, mut failures) = match requested {
        Strategy::Auto => try_all(template, spec, options),
        s => (vec![s.detect(template, spec, options)?], Vec::new()),
    };

    let (regions_found, total_marker_pixels) = candidates
        .iter()
        .find_map(|d| match d {
            Detection::Region { detection, .. } => {
                Some((detection.regions.len(), detection.total_marker_pixels()))
            }
            _ => None,
        })
        .unwrap_or((0, 0));

    // Largest area first; a candidate that fails to render hands over to the next.
    let mut rendered = None;
    for winner in by_area_desc(&candidates) {
        let method = winner.method();
        tracing::info!(%requested, %method, area = winner.area(), "placement target chosen");
        match render(winner, artwork, template, spec, options, &style) {
            Ok(image) => {
                rendered = Some((winner, image));
                break;
            }
            Err(e) if requested == Strategy::Auto => {
                tracing::debug!(%method, error = %e, "render failed");
                failures.push(StrategyFailure {
                    method: method.name().to_owned(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    let Some((winner, image)) = rendered else {
        tracing::warn!(attempts = failures.len(), "all placement methods failed");
        return Err(MockupError::AllMethodsFailed(failures));
    };

    let mut warnings: Vec<String> = failures
        .into_iter()
        .map(|f| format!("{} failed: {}", f.method, f.reason))
        .collect();
    warnings.extend(style_warnings);

    let (chosen_region, chosen_quad) = match winner {
        Detection::Region { selection, .. } => (Some(selection.region), None),
        Detection::Quad(q) => (None, Some(*q)),
        Detection::Bounds(r) => (None, Some(Quad::from_rect(*r))),
    };

    Ok(PlacementResult {
        image,
        method: winner.method(),
        requested,
        regions_found,
        total_marker_pixels,
        chosen_region,
        chosen_quad,
        warnings,
    })
}

/// Run every applicable strategy. Each failure is recorded, never propagated.
fn try_all(
    template: &Raster,
    spec: &TemplateSpec,
    options: &PlacementOptions,
) -> (Vec<Detection>, Vec<StrategyFailure>) {
    let mut found = Vec::new();
    let mut failures = Vec::new();
    for strategy in Strategy::ATTEMPT_ORDER {
        // A declared transform makes the untransformed bounds meaningless.
        if strategy == Strategy::LayerBounds && spec.declares_quad() {
            continue;
        }
        match strategy.detect(template, spec, options) {
            Ok(d) => {
                tracing::debug!(%strategy, area = d.area(), "strategy succeeded");
                found.push(d);
            }
            Err(e) => {
                tracing::debug!(%strategy, error = %e, "strategy failed");
                failures.push(StrategyFailure {
                    method: strategy.name().to_owned(),
                    reason: e.to_string(),
                });
            }
        }
    }
    (found, failures)
}

// Stable sort, so ties keep the earlier strategy.
fn by_area_desc(candidates: &[Detection]) -> Vec<&Detection> {
    let mut ordered: Vec<&Detection> = candidates.iter().collect();
    ordered.sort_by(|a, b| b.area().total_cmp(&a.area()));
    ordered
}

fn render(
    detection: &Detection,
    artwork: &Raster,
    template: &Raster,
    spec: &TemplateSpec,
    options: &PlacementOptions,
    style: &LayerStyle,
) -> MockupResult<Raster> {
    let mut base = template.clone();
    match detection {
        Detection::Region {
            detection,
            selection,
        } => {
            erase_markers(&mut base, &detection.mask, &options.inpaint)?;
            let fit = FitConfig {
                mode: spec.fit.unwrap_or(options.fit.mode),
                padding: spec.padding.unwrap_or(options.fit.padding),
            };
            place_fitted(&mut base, artwork, selection.region.rect(), &fit, style)?;
        }
        Detection::Quad(quad) => {
            let layer = warp_into_quad(
                artwork,
                quad,
                Some((base.width(), base.height())),
                &options.warp,
            )?;
            let mask = if spec.feather_px > 0.0 {
                Some(feathered_quad_mask(
                    quad,
                    layer.x,
                    layer.y,
                    layer.raster.width(),
                    layer.raster.height(),
                    spec.feather_px,
                )?)
            } else {
                None
            };
            composite_layer(&mut base, &layer.raster, layer.x, layer.y, style, mask.as_ref())?;
        }
        Detection::Bounds(rect) => {
            let fit = FitConfig {
                mode: spec.fit.unwrap_or(FitMode::Contain),
                padding: spec.padding.unwrap_or(0.0),
            };
            place_fitted(&mut base, artwork, *rect, &fit, style)?;
        }
    }
    Ok(base)
}

/// Aspect-fit, resample and composite `artwork` into `region`. Cover
/// placements are cropped to the padded region first.
fn place_fitted(
    base: &mut Raster,
    artwork: &Raster,
    region: Rect,
    fit: &FitConfig,
    style: &LayerStyle,
) -> MockupResult<()> {
    let placement = fit_artwork((artwork.width(), artwork.height()), region, fit)?;
    let pb = placement.pixel_box();
    let resized = resize(artwork, pb.width, pb.height);
    tracing::debug!(x = pb.x, y = pb.y, width = pb.width, height = pb.height, "artwork box");

    match fit.mode {
        FitMode::Contain => composite_layer(base, &resized, pb.x, pb.y, style, None),
        FitMode::Cover => {
            let clip = placement.clip;
            let lx0 = (clip.x0.round() as i64 - i64::from(pb.x)).max(0);
            let ly0 = (clip.y0.round() as i64 - i64::from(pb.y)).max(0);
            let lx1 = (clip.x1.round() as i64 - i64::from(pb.x)).min(i64::from(pb.width));
            let ly1 = (clip.y1.round() as i64 - i64::from(pb.y)).min(i64::from(pb.height));
            if lx1 <= lx0 || ly1 <= ly0 {
                return Ok(());
            }
            let cropped = image::imageops::crop_imm(
                &resized.to_image(),
                lx0 as u32,
                ly0 as u32,
                (lx1 - lx0) as u32,
                (ly1 - ly0) as u32,
            )
            .to_image();
            composite_layer(
                base,
                &Raster::from(cropped),
                pb.x + lx0 as i32,
                pb.y + ly0 as i32,
                style,
                None,
            )
        }
    }
}

fn resize(artwork: &Raster, width: u32, height: u32) -> Raster {
    if (artwork.width(), artwork.height()) == (width, height) {
        return artwork.clone();
    }
    Raster::from(image::imageops::resize(
        &artwork.to_image(),
        width,
        height,
        FilterType::CatmullRom,
    ))
}
