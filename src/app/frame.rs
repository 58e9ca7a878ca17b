//! Per-frame orchestration: input, layout declaration and presentation.

use std::num::NonZeroUsize;
use std::time::Instant;

use anyhow::{Result, bail};

use crate::document::DocumentTree;
use crate::image::ImageCache;
use crate::layout::{Layout, LayoutBuilder, LayoutError, LayoutState, RenderCommand, Vector2};
use crate::render::{RenderContext, render_document};
use crate::ui::DebugInfo;
use crate::ui::style::{
    BASE_FONT_SIZE, FONT_STEP, MAX_FONT_SIZE, MIN_FONT_SIZE, Palette, StyleTable,
};

use super::input::{Action, FrameInput};
use super::scroll::KeyScroller;

/// Rows scrolled per mouse wheel notch.
pub const WHEEL_ROWS: f32 = 3.0;
/// Pixel width assumed for one terminal cell when sizing the character budget.
pub const CELL_WIDTH_PX: f32 = 11.0;
/// Capacity doublings attempted before a frame is abandoned.
pub const MAX_CAPACITY_RETRIES: usize = 16;

/// Startup settings for a [`FrameController`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOptions {
    pub palette: Palette,
    pub font_size: u16,
    pub debug: bool,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            font_size: BASE_FONT_SIZE,
            debug: false,
        }
    }
}

/// Character budget for a window `cols` cells wide at `font_size`.
pub fn char_budget(cols: u16, font_size: u16) -> NonZeroUsize {
    let width_px = f32::from(cols) * CELL_WIDTH_PX;
    let glyph_px = (f32::from(font_size) / 2.0).max(1.0);
    NonZeroUsize::new((width_px / glyph_px).floor() as usize).unwrap_or(NonZeroUsize::MIN)
}

/// Owns the document and all cross-frame state.
#[derive(Debug)]
pub struct FrameController {
    tree: DocumentTree,
    images: ImageCache,
    state: LayoutState,
    palette: Palette,
    styles: StyleTable,
    font_size: u16,
    char_budget: NonZeroUsize,
    debug: bool,
    quit: bool,
    scroller: KeyScroller,
    last_frame_ms: f64,
    frames: u64,
}

impl FrameController {
    pub fn new(tree: DocumentTree, images: ImageCache, options: FrameOptions) -> Self {
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(nodes = tree.len(), "document tree:\n{}", tree.dump());
        }
        let font_size = options.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        Self {
            tree,
            images,
            state: LayoutState::new(1.0, 1.0),
            palette: options.palette,
            styles: StyleTable::new(font_size, &options.palette),
            font_size,
            char_budget: NonZeroUsize::MIN,
            debug: options.debug,
            quit: false,
            scroller: KeyScroller::new(),
            last_frame_ms: 0.0,
            frames: 0,
        }
    }

    /// Start from different per-frame layout limits.
    #[must_use]
    pub fn with_layout_capacity(mut self, max_elements: usize, max_measured_text: usize) -> Self {
        self.state.set_max_elements(max_elements);
        self.state.set_max_measured_text(max_measured_text);
        self
    }

    pub const fn font_size(&self) -> u16 {
        self.font_size
    }

    pub const fn char_budget(&self) -> NonZeroUsize {
        self.char_budget
    }

    pub const fn debug(&self) -> bool {
        self.debug
    }

    pub const fn should_quit(&self) -> bool {
        self.quit
    }

    pub const fn palette(&self) -> &Palette {
        &self.palette
    }

    pub const fn state(&self) -> &LayoutState {
        &self.state
    }

    pub const fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    /// Whether another frame is needed even without new input.
    pub fn is_animating(&self, input: &FrameInput) -> bool {
        self.scroller.is_moving() || input.keys.any_held()
    }

    /// Apply one frame of input: actions, window size, pointer and scrolling.
    pub fn apply_input(&mut self, input: &FrameInput) {
        for action in &input.actions {
            self.apply_action(*action);
        }

        let (cols, rows) = input.window;
        self.state.set_dimensions(f32::from(cols), f32::from(rows));
        self.char_budget = char_budget(cols, self.font_size);

        let pointer = input.pointer.map(|(x, y)| Vector2::new(x, y));
        self.state.set_pointer(pointer, input.pointer_down);

        if input.wheel.is_zero() {
            if let Some(delta) = self.scroller.update(&input.keys, f32::from(rows), input.dt) {
                self.state.update_scroll(delta);
            }
        } else {
            self.state.update_scroll(Vector2::new(
                input.wheel.x * WHEEL_ROWS,
                input.wheel.y * WHEEL_ROWS,
            ));
        }
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.quit = true,
            Action::IncreaseFont => self.set_font_size(self.font_size.saturating_add(FONT_STEP)),
            Action::DecreaseFont => self.set_font_size(self.font_size.saturating_sub(FONT_STEP)),
            Action::ResetFont => self.set_font_size(BASE_FONT_SIZE),
            Action::ToggleDebug => self.debug = !self.debug,
            Action::ScrollToTop => {
                self.scroller.stop();
                self.state.scroll_to_top();
            }
            Action::ScrollToBottom => {
                self.scroller.stop();
                self.state.scroll_to_bottom();
            }
        }
    }

    fn set_font_size(&mut self, size: u16) {
        let size = size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        if size != self.font_size {
            tracing::debug!(from = self.font_size, to = size, "font size changed");
            self.font_size = size;
            self.styles = StyleTable::new(size, &self.palette);
        }
    }

    /// Run one frame and hand its commands to `present`.
    ///
    /// The layout is declared, computed and dropped inside this call. A
    /// capacity error grows the exceeded limit and reruns the frame.
    ///
    /// # Errors
    ///
    /// Fails when the image cache is full, when the layout stays over
    /// capacity after every retry, on a structural layout error, or when
    /// `present` fails.
    pub fn frame<F>(&mut self, input: &FrameInput, present: F) -> Result<()>
    where
        F: FnOnce(&[RenderCommand<'_>], &mut ImageCache, Option<&DebugInfo>) -> Result<()>,
    {
        let started = Instant::now();
        self.apply_input(input);
        self.frames += 1;

        for attempt in 0..=MAX_CAPACITY_RETRIES {
            let err = match declare(
                &self.state,
                &self.tree,
                &self.styles,
                &self.palette,
                self.char_budget,
                &mut self.images,
            )? {
                Ok(layout) => match self.state.compute(&layout) {
                    Ok(commands) => {
                        let debug = self.debug.then(|| DebugInfo {
                            elements: layout.len(),
                            commands: commands.len(),
                            char_budget: self.char_budget.get(),
                            font_size: self.font_size,
                            scroll_offset: self.state.root_scroll().map_or(0.0, |c| c.offset.y),
                            frame_ms: self.last_frame_ms,
                            hovered: self
                                .state
                                .hovered_element()
                                .and_then(|id| self.state.bounds(id)),
                            pointer: self.state.pointer(),
                            pointer_down: self.state.pointer_down(),
                        });
                        tracing::debug!(
                            frame = self.frames,
                            elements = layout.len(),
                            commands = commands.len(),
                            budget = self.char_budget.get(),
                            "frame laid out"
                        );
                        present(&commands, &mut self.images, debug.as_ref())?;
                        self.last_frame_ms = started.elapsed().as_secs_f64() * 1000.0;
                        return Ok(());
                    }
                    Err(err) => err,
                },
                Err(err) => err,
            };
            if attempt == MAX_CAPACITY_RETRIES || !self.state.grow_for(&err) {
                bail!("frame {} could not be laid out: {err}", self.frames);
            }
            tracing::warn!(
                attempt,
                max_elements = self.state.max_elements(),
                max_measured_text = self.state.max_measured_text(),
                "layout capacity grown after: {err}"
            );
        }
        bail!("frame {} could not be laid out", self.frames)
    }
}

/// Declare the document's box tree for one frame.
///
/// The outer `Result` carries fatal renderer errors; the inner one carries
/// layout errors that may be retried.
fn declare<'a>(
    state: &LayoutState,
    tree: &'a DocumentTree,
    styles: &StyleTable,
    palette: &Palette,
    char_budget: NonZeroUsize,
    images: &mut ImageCache,
) -> Result<Result<Layout<'a>, LayoutError>> {
    let mut ui = LayoutBuilder::new(state);
    let mut ctx = RenderContext::new(styles, palette, char_budget, images);
    render_document(&mut ctx, &mut ui, tree)?;
    Ok(ui.finish())
}
