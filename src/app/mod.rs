//! Application shell and per-frame control.
//!
//! - [`input`]: crossterm events to [`FrameInput`]
//! - [`scroll`]: hold-to-repeat keyboard scrolling
//! - [`FrameController`]: input, layout and presentation for one frame
//! - [`App::run`]: terminal setup and the main event loop

mod event_loop;
mod frame;
pub mod input;
pub mod scroll;

pub use frame::{
    CELL_WIDTH_PX, FrameController, FrameOptions, MAX_CAPACITY_RETRIES, WHEEL_ROWS, char_budget,
};
pub use input::{Action, FrameInput, KeyboardState, ScrollKey};
pub use scroll::KeyScroller;

use std::path::PathBuf;

use crate::ui::style::{BASE_FONT_SIZE, Palette};

/// Main application struct that owns the terminal and runs the event loop.
#[derive(Debug, Clone)]
pub struct App {
    file_path: PathBuf,
    images_enabled: bool,
    force_half_cell: bool,
    palette: Palette,
    font_size: u16,
    debug: bool,
    truecolor: bool,
}

impl App {
    /// Create a new application for the given file.
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            images_enabled: true,
            force_half_cell: false,
            palette: Palette::default(),
            font_size: BASE_FONT_SIZE,
            debug: false,
            truecolor: true,
        }
    }

    /// Enable or disable inline image rendering.
    pub const fn with_images_enabled(mut self, enabled: bool) -> Self {
        self.images_enabled = enabled;
        self
    }

    /// Force images to render with half-block cells.
    pub const fn with_force_half_cell(mut self, force: bool) -> Self {
        self.force_half_cell = force;
        self
    }

    pub const fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Base font size; sizes the character budget and heading styles.
    pub const fn with_font_size(mut self, size: u16) -> Self {
        self.font_size = size;
        self
    }

    /// Start with the debug overlay visible.
    pub const fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Emit truecolor escapes instead of the xterm-256 palette.
    pub const fn with_truecolor(mut self, enabled: bool) -> Self {
        self.truecolor = enabled;
        self
    }
}

#[cfg(test)]
mod tests;
