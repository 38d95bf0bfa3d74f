//! Template manifests: which image is the background and how the artwork
//! finds its place on it.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    MockupError, MockupResult, Raster,
    composite::{BlendMode, LayerStyle, MAX_FEATHER_PX},
    detect::{ColorClassRule, RulePreset},
    geometry::Quad,
    layers::{DEFAULT_SMART_LAYER, LayerId, LayerTree},
    place::FitMode,
};

/// Marker rule by preset name (`"magenta"`) or spelled out.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum MarkerSpec {
    Preset(RulePreset),
    Rule(ColorClassRule),
}

impl MarkerSpec {
    pub fn rule(&self) -> ColorClassRule {
        match self {
            Self::Preset(p) => ColorClassRule::preset(*p),
            Self::Rule(r) => r.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BlendSpec {
    /// Blend-mode name, matched leniently.
    pub mode: String,
    /// Layer opacity in `[0, 1]`.
    pub opacity: f32,
}

impl Default for BlendSpec {
    fn default() -> Self {
        Self {
            mode: BlendMode::Normal.name().to_owned(),
            opacity: 1.0,
        }
    }
}

impl BlendSpec {
    /// Resolve to a [`LayerStyle`], pushing a warning for unknown mode names.
    pub fn style(&self, warnings: &mut Vec<String>) -> LayerStyle {
        let (mode, warning) = BlendMode::resolve(&self.mode);
        warnings.extend(warning);
        LayerStyle {
            mode,
            opacity: self.opacity,
        }
    }
}

/// Parsed template manifest.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TemplateSpec {
    /// Background image; relative paths resolve against the manifest file.
    pub background: PathBuf,
    /// Marker color rule; magenta when absent.
    #[serde(default)]
    pub marker: Option<MarkerSpec>,
    /// Destination quad `[TL, TR, BR, BL]`.
    #[serde(default)]
    pub corners: Option<Quad>,
    /// Layer tree from an external document parser.
    #[serde(default)]
    pub layers: Option<LayerTree>,
    /// Name of the artwork layer in `layers`.
    #[serde(default)]
    pub smart_layer: Option<String>,
    /// Overrides the smart layer's own opacity and blend mode.
    #[serde(default)]
    pub blend: Option<BlendSpec>,
    /// Gaussian sigma of the quad edge softening; 0 keeps hard edges.
    #[serde(default)]
    pub feather_px: f32,
    /// Overrides the per-call fit mode.
    #[serde(default)]
    pub fit: Option<FitMode>,
    /// Overrides the per-call padding fraction.
    #[serde(default)]
    pub padding: Option<f64>,
}

impl TemplateSpec {
    /// A manifest with just a background; everything else is auto-detected.
    pub fn new(background: impl Into<PathBuf>) -> Self {
        Self {
            background: background.into(),
            marker: None,
            corners: None,
            layers: None,
            smart_layer: None,
            blend: None,
            feather_px: 0.0,
            fit: None,
            padding: None,
        }
    }

    pub fn from_json(json: &str) -> MockupResult<Self> {
        let spec: Self = serde_json::from_str(json).context("parse template manifest JSON")?;
        spec.validate()?;
        Ok(spec)
    }

    /// Read and validate a manifest; `background` is made relative to the
    /// manifest's directory.
    pub fn load(path: &Path) -> MockupResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read template manifest '{}'", path.display()))?;
        let mut spec = Self::from_json(&text)?;
        if spec.background.is_relative() {
            let root = path.parent().unwrap_or_else(|| Path::new("."));
            spec.background = root.join(&spec.background);
        }
        Ok(spec)
    }

    pub fn load_background(&self) -> MockupResult<Raster> {
        let bytes = std::fs::read(&self.background).with_context(|| {
            format!("read template background '{}'", self.background.display())
        })?;
        Raster::decode(&bytes)
    }

    pub fn validate(&self) -> MockupResult<()> {
        if let Some(blend) = &self.blend
            && (!blend.opacity.is_finite() || !(0.0..=1.0).contains(&blend.opacity))
        {
            return Err(MockupError::validation(format!(
                "blend opacity must be within [0, 1], got {}",
                blend.opacity
            )));
        }
        if !self.feather_px.is_finite() || !(0.0..=MAX_FEATHER_PX).contains(&self.feather_px) {
            return Err(MockupError::validation(format!(
                "feather_px must be within [0, {MAX_FEATHER_PX}], got {}",
                self.feather_px
            )));
        }
        if let Some(p) = self.padding
            && (!p.is_finite() || !(0.0..0.5).contains(&p))
        {
            return Err(MockupError::validation(format!(
                "padding must be within [0, 0.5), got {p}"
            )));
        }
        if let Some(marker) = &self.marker {
            marker.rule().validate()?;
        }
        Ok(())
    }

    pub fn declares_marker(&self) -> bool {
        self.marker.is_some()
    }

    /// Explicit corners, or a smart layer carrying a transform.
    pub fn declares_quad(&self) -> bool {
        self.corners.is_some()
            || self
                .smart_layer()
                .and_then(|(tree, id)| tree.get(id))
                .is_some_and(|node| node.transform.is_some())
    }

    pub fn marker_rule(&self) -> ColorClassRule {
        self.marker.as_ref().map(MarkerSpec::rule).unwrap_or_default()
    }

    /// The artwork layer: by `smart_layer` name (default "Your Design Here"),
    /// else the first smart object.
    pub fn smart_layer(&self) -> Option<(&LayerTree, LayerId)> {
        let tree = self.layers.as_ref()?;
        let name = self.smart_layer.as_deref().unwrap_or(DEFAULT_SMART_LAYER);
        tree.resolve_smart_layer(name).map(|id| (tree, id))
    }

    /// Composite style: the manifest's `blend`, else the smart layer's own
    /// opacity/blend mode, else normal at full opacity.
    pub fn layer_style(&self, warnings: &mut Vec<String>) -> MockupResult<LayerStyle> {
        let style = if let Some(blend) = &self.blend {
            blend.style(warnings)
        } else if let Some(node) = self.smart_layer().and_then(|(tree, id)| tree.get(id)) {
            let mode = match node.blend_mode.as_deref() {
                Some(name) => {
                    let (mode, warning) = BlendMode::resolve(name);
                    warnings.extend(warning);
                    mode
                }
                None => BlendMode::Normal,
            };
            LayerStyle {
                mode,
                opacity: node.opacity,
            }
        } else {
            LayerStyle::default()
        };
        style.validate()?;
        Ok(style)
    }
}
