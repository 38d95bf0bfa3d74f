#![forbid(unsafe_code)]

pub mod composite;
pub mod detect;
mod foundation;
pub mod geometry;
pub mod layers;
pub mod pipeline;
pub mod place;
pub mod pool;
pub mod raster;
pub mod template;
pub mod warp;

pub use composite::{BlendMode, LayerStyle, composite_layer};
pub use detect::{ColorClassRule, DetectorConfig, PixelRegion, detect_regions};
pub use foundation::error::{MockupError, MockupResult, StrategyFailure};
pub use geometry::{LayerBounds, Quad, TransformMatrix};
pub use layers::{LayerTree, DEFAULT_SMART_LAYER};
pub use pipeline::{Diagnostics, PlacementOptions, PlacementResult, Strategy, place_mockup};
pub use pool::{PlacementPool, PlacementRequest};
pub use raster::{OutputFormat, Raster};
pub use template::TemplateSpec;
