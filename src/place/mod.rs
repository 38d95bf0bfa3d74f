//! Aspect-fit placement into a detected region and marker erasure.

mod fit;
mod inpaint;

pub use fit::{FitConfig, FitMode, PixelBox, Placement, fit_artwork};
pub use inpaint::{InpaintConfig, erase_markers, surround_color};
