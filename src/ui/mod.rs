//! Terminal UI components.
//!
//! This module contains all drawing code:
//! - [`style`]: Theming, colors and the text style table
//! - `raster`: Render command rasterization into a ratatui buffer
//! - debug overlay and image blitting helpers

pub mod style;

mod images;
mod overlay;
mod raster;

pub use overlay::{DebugInfo, render_debug_overlay};
pub use raster::{Rasterizer, rasterize};
