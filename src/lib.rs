// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. image::ImageCache)
    clippy::module_name_repetitions
)]

//! # mdvis
//!
//! A terminal markdown visualizer.
//!
//! The markdown file is parsed once into a read-only document tree. Every
//! frame the tree is walked again to declare a tree of flexbox boxes, which
//! is laid out, flattened into drawing commands and rasterized into the
//! terminal. Nothing from a frame's layout outlives the frame except scroll
//! offsets, hover state and text measurements.
//!
//! ## Modules
//!
//! - [`document`]: Markdown parsing and the document tree
//! - [`render`]: Block renderer and line packer
//! - [`layout`]: Box tree, layout engine and render commands
//! - [`image`]: Image cache and terminal graphics detection
//! - [`ui`]: Styles, rasterizer and debug overlay
//! - [`app`]: Frame controller, input and the event loop
//! - [`config`]: Saved default flags
//! - [`perf`]: Timing scopes

pub mod app;
pub mod config;
pub mod document;
pub mod image;
pub mod layout;
pub mod perf;
pub mod render;
pub mod ui;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, FrameController, FrameInput, FrameOptions};
    pub use crate::document::DocumentTree;
    pub use crate::layout::{LayoutBuilder, LayoutState, RenderCommand};
}
