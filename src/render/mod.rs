//! Block renderer.
//!
//! Walks the document tree once per frame and declares the box tree for it.
//! Inline content goes through a [`LinePacker`]; each packed row becomes a
//! horizontal box of text runs.

mod packer;

pub use packer::{Fragment, LinePacker, RowSink, TextLine};

use std::num::NonZeroUsize;

use thiserror::Error;

use crate::document::{BlockKind, DocumentTree, NodeId, NodeKind, SpanKind, TextKind};
use crate::image::{ImageCache, ImageCacheError, ImageState};
use crate::layout::{
    Border, BoxConfig, Clip, LayoutBuilder, Padding, Sizing, SizingAxis,
};
use crate::ui::style::{Palette, StyleRole, StyleTable, TextStyle};

/// Name of the outermost scroll container.
pub const MAIN_LAYOUT: &str = "main_layout";

/// Headings and rules take at most this share of the available width.
const WIDE_BLOCK_FRACTION: f32 = 0.95;
/// Images are fitted into this share of the available width.
const IMAGE_WIDTH_FRACTION: f32 = 0.6;
const UNORDERED_MARKER: &str = "‣";
const TASK_OPEN_MARKER: &str = "☐";
const TASK_DONE_MARKER: &str = "☑";
/// Blocks and spans nested deeper than this are not declared.
pub const MAX_NESTING_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Image(#[from] ImageCacheError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListMode {
    #[default]
    None,
    Ordered,
    Unordered,
}

/// List nesting state, saved and restored around each nested list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListState {
    pub mode: ListMode,
    pub next_index: u64,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            mode: ListMode::None,
            next_index: 1,
        }
    }
}

/// Everything the renderer reads or updates while walking one frame.
pub struct RenderContext<'s> {
    pub styles: &'s StyleTable,
    pub palette: &'s Palette,
    pub char_budget: NonZeroUsize,
    pub list: ListState,
    pub images: &'s mut ImageCache,
    /// Pixel size of one terminal cell, for image scaling
    pub cell_px: (u16, u16),
    /// Blocks and spans currently open around the node being rendered
    pub depth: usize,
}

impl<'s> RenderContext<'s> {
    pub fn new(
        styles: &'s StyleTable,
        palette: &'s Palette,
        char_budget: NonZeroUsize,
        images: &'s mut ImageCache,
    ) -> Self {
        let cell_px = images.font_size();
        Self {
            styles,
            palette,
            char_budget,
            list: ListState::default(),
            images,
            cell_px,
            depth: 0,
        }
    }

    /// Run `f` one nesting level deeper, or skip it past [`MAX_NESTING_DEPTH`].
    fn nested(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<(), RenderError>,
    ) -> Result<(), RenderError> {
        if self.depth >= MAX_NESTING_DEPTH {
            tracing::trace!(depth = self.depth, "skipping deeply nested content");
            return Ok(());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn packer<'a>(&self, available: f32) -> LinePacker<'a> {
        let width = available.floor().max(1.0) as usize;
        let budget = NonZeroUsize::new(self.char_budget.get().min(width))
            .unwrap_or(NonZeroUsize::MIN);
        LinePacker::new(budget)
    }

    fn body(&self) -> TextStyle {
        self.styles.get(StyleRole::Body)
    }
}

impl<'a> RowSink<'a> for LayoutBuilder<'a, '_> {
    fn emit_row(&mut self, fragments: &[Fragment<'a>]) {
        self.open(BoxConfig::row());
        for fragment in fragments {
            self.text(fragment.text, fragment.style);
        }
        self.close();
    }
}

/// Declare the whole document inside the main scroll container.
///
/// # Errors
///
/// Fails only when the image cache is full.
pub fn render_document<'a>(
    ctx: &mut RenderContext<'_>,
    ui: &mut LayoutBuilder<'a, '_>,
    tree: &'a DocumentTree,
) -> Result<(), RenderError> {
    let width = ui.state().dimensions().x;
    let padding = Padding::new((width / 6.5).floor(), (width / 7.0).floor(), 2.0, 0.0);
    let available = (width - padding.horizontal()).max(1.0);
    ctx.list = ListState::default();
    ctx.depth = 0;

    ui.open_named(
        MAIN_LAYOUT,
        BoxConfig {
            padding,
            child_gap: 1.0,
            sizing: Sizing {
                width: SizingAxis::grow(),
                height: SizingAxis::grow(),
            },
            background: Some(ctx.palette.background),
            clip: Some(Clip::vertical()),
            ..BoxConfig::column()
        },
    );
    let result = render_flow(ctx, ui, tree, tree.root(), available);
    ui.close();
    result
}

/// Render the children of a container that may mix blocks and inline content.
fn render_flow<'a>(
    ctx: &mut RenderContext<'_>,
    ui: &mut LayoutBuilder<'a, '_>,
    tree: &'a DocumentTree,
    parent: NodeId,
    available: f32,
) -> Result<(), RenderError> {
    let mut packer = ctx.packer(available);
    for child in tree.children(parent) {
        if tree.kind(child).is_block() {
            packer.flush(ui);
            render_block(ctx, ui, tree, child, available)?;
        } else {
            render_inline(ctx, ui, tree, child, None, &mut packer, available)?;
        }
    }
    packer.flush(ui);
    Ok(())
}

fn render_block<'a>(
    ctx: &mut RenderContext<'_>,
    ui: &mut LayoutBuilder<'a, '_>,
    tree: &'a DocumentTree,
    id: NodeId,
    available: f32,
) -> Result<(), RenderError> {
    ctx.nested(|ctx| declare_block(ctx, ui, tree, id, available))
}

fn declare_block<'a>(
    ctx: &mut RenderContext<'_>,
    ui: &mut LayoutBuilder<'a, '_>,
    tree: &'a DocumentTree,
    id: NodeId,
    available: f32,
) -> Result<(), RenderError> {
    let NodeKind::Block(block) = tree.kind(id) else {
        return Ok(());
    };
    match block {
        BlockKind::Document => render_flow(ctx, ui, tree, id, available)?,
        BlockKind::Paragraph => {
            ui.open(BoxConfig {
                sizing: Sizing {
                    width: SizingAxis::grow(),
                    height: SizingAxis::fit(),
                },
                ..BoxConfig::column()
            });
            let result = render_flow(ctx, ui, tree, id, available);
            ui.close();
            result?;
        }
        BlockKind::Heading { level } => {
            let style = ctx.styles.heading(*level);
            let text = tree.text_content(id);
            ui.with_box(
                BoxConfig {
                    sizing: Sizing {
                        width: SizingAxis::grow_max(available * WIDE_BLOCK_FRACTION),
                        height: SizingAxis::fit(),
                    },
                    ..BoxConfig::row()
                },
                |ui| ui.text(text, style),
            );
        }
        BlockKind::HorizontalRule => {
            ui.with_box(
                BoxConfig {
                    sizing: Sizing {
                        width: SizingAxis::grow_max(available * WIDE_BLOCK_FRACTION),
                        height: SizingAxis::Fixed(1.0),
                    },
                    border: Some(Border::top(ctx.palette.blue, 2)),
                    ..BoxConfig::row()
                },
                |_| {},
            );
        }
        BlockKind::CodeBlock { .. } => render_code_block(ctx, ui, tree, id, available),
        BlockKind::Quote => {
            let padding = Padding::new(2.0, 1.0, 1.0, 1.0);
            ui.open(BoxConfig {
                padding,
                child_gap: 1.0,
                sizing: Sizing {
                    width: SizingAxis::grow(),
                    height: SizingAxis::fit(),
                },
                border: Some(Border::left(ctx.palette.pink, 2)),
                ..BoxConfig::column()
            });
            let result = render_flow(ctx, ui, tree, id, shrink(available, padding));
            ui.close();
            result?;
        }
        BlockKind::OrderedList { start } => {
            render_list(ctx, ui, tree, id, available, ListState {
                mode: ListMode::Ordered,
                next_index: *start,
            })?;
        }
        BlockKind::UnorderedList { .. } => {
            render_list(ctx, ui, tree, id, available, ListState {
                mode: ListMode::Unordered,
                next_index: 1,
            })?;
        }
        BlockKind::ListItem { task } => render_list_item(ctx, ui, tree, id, *task, available)?,
        BlockKind::Other(name) => tracing::trace!(block = name, "skipping unsupported block"),
    }
    Ok(())
}

fn render_code_block<'a>(
    ctx: &RenderContext<'_>,
    ui: &mut LayoutBuilder<'a, '_>,
    tree: &'a DocumentTree,
    id: NodeId,
    available: f32,
) {
    let hovered = ui.is_hovered(ui.next_id());
    let background = if hovered {
        ctx.palette.hover
    } else {
        ctx.palette.dark
    };
    let style = ctx.body();
    ui.open(BoxConfig {
        padding: Padding::new(2.0, 2.0, 1.0, 1.0),
        sizing: Sizing {
            width: SizingAxis::fit_max(available),
            height: SizingAxis::fit(),
        },
        background: Some(background),
        clip: Some(Clip::horizontal()),
        ..BoxConfig::column()
    });
    for child in tree.children(id) {
        let Some(text) = tree.kind(child).as_text() else {
            continue;
        };
        for line in text.content.split_inclusive('\n') {
            let line = line.trim_end_matches('\n').trim_end_matches('\r');
            ui.with_box(BoxConfig::row(), |ui| ui.text(line, style));
        }
    }
    ui.close();
}

fn render_list<'a>(
    ctx: &mut RenderContext<'_>,
    ui: &mut LayoutBuilder<'a, '_>,
    tree: &'a DocumentTree,
    id: NodeId,
    available: f32,
    list: ListState,
) -> Result<(), RenderError> {
    let padding = Padding::new(2.0, 0.0, 0.0, 0.0);
    let saved = std::mem::replace(&mut ctx.list, list);
    ui.open(BoxConfig {
        padding,
        sizing: Sizing {
            width: SizingAxis::grow(),
            height: SizingAxis::fit(),
        },
        ..BoxConfig::column()
    });
    let inner = shrink(available, padding);
    let mut result = Ok(());
    for child in tree.children(id) {
        result = render_block(ctx, ui, tree, child, inner);
        if result.is_err() {
            break;
        }
    }
    ui.close();
    ctx.list = saved;
    result
}

fn render_list_item<'a>(
    ctx: &mut RenderContext<'_>,
    ui: &mut LayoutBuilder<'a, '_>,
    tree: &'a DocumentTree,
    id: NodeId,
    task: Option<bool>,
    available: f32,
) -> Result<(), RenderError> {
    const GAP: f32 = 1.0;
    ui.open(BoxConfig {
        child_gap: GAP,
        sizing: Sizing {
            width: SizingAxis::grow(),
            height: SizingAxis::fit(),
        },
        ..BoxConfig::row()
    });

    let bullet = TextStyle {
        color: ctx.palette.pink,
        ..ctx.body()
    };
    let marker_width = match (task, ctx.list.mode) {
        (Some(done), _) => {
            ui.text(if done { TASK_DONE_MARKER } else { TASK_OPEN_MARKER }, bullet);
            1.0
        }
        (None, ListMode::Ordered) => {
            let index = ctx.list.next_index;
            ctx.list.next_index = index.saturating_add(1);
            let label = index.to_string();
            let width = label.chars().count() as f32 + 2.0;
            ui.with_box(
                BoxConfig {
                    padding: Padding::new(1.0, 1.0, 0.0, 0.0),
                    background: Some(ctx.palette.highlight),
                    ..BoxConfig::row()
                },
                |ui| ui.text(label, ctx.styles.get(StyleRole::Bold)),
            );
            width
        }
        (None, ListMode::Unordered | ListMode::None) => {
            ui.text(UNORDERED_MARKER, bullet);
            1.0
        }
    };
    if task.is_some() && ctx.list.mode == ListMode::Ordered {
        ctx.list.next_index = ctx.list.next_index.saturating_add(1);
    }

    ui.open(BoxConfig {
        sizing: Sizing {
            width: SizingAxis::grow(),
            height: SizingAxis::fit(),
        },
        ..BoxConfig::column()
    });
    let content = (available - marker_width - GAP).max(1.0);
    let result = render_flow(ctx, ui, tree, id, content);
    ui.close();
    ui.close();
    result
}

fn render_inline<'a>(
    ctx: &mut RenderContext<'_>,
    ui: &mut LayoutBuilder<'a, '_>,
    tree: &'a DocumentTree,
    id: NodeId,
    style: Option<TextStyle>,
    packer: &mut LinePacker<'a>,
    available: f32,
) -> Result<(), RenderError> {
    match tree.kind(id) {
        NodeKind::Text(text) => {
            let style = style.unwrap_or_else(|| ctx.body());
            match text.kind {
                TextKind::Normal | TextKind::Code => packer.push(&text.content, style, ui),
                TextKind::SoftBreak => packer.push_soft_break(style, ui),
                TextKind::HardBreak => packer.flush(ui),
                TextKind::Html => {}
            }
        }
        NodeKind::Span(SpanKind::Image { src, .. }) => {
            packer.flush(ui);
            render_image(ctx, ui, src, available)?;
        }
        NodeKind::Span(span) => {
            let role = match span {
                SpanKind::Emphasis => StyleRole::Italic,
                SpanKind::Strong => StyleRole::Bold,
                SpanKind::Code => StyleRole::InlineCode,
                SpanKind::Strikethrough => StyleRole::Strikethrough,
                SpanKind::Link { .. } => StyleRole::Link,
                SpanKind::Image { .. } => return Ok(()),
                SpanKind::Other(name) => {
                    tracing::trace!(span = name, "skipping unsupported span");
                    return Ok(());
                }
            };
            // Nested spans keep the outermost style.
            let style = style.unwrap_or_else(|| ctx.styles.get(role));
            ctx.nested(|ctx| {
                for child in tree.children(id) {
                    render_inline(ctx, ui, tree, child, Some(style), packer, available)?;
                }
                Ok(())
            })?;
        }
        NodeKind::Block(_) => render_block(ctx, ui, tree, id, available)?,
    }
    Ok(())
}

fn render_image<'a>(
    ctx: &mut RenderContext<'_>,
    ui: &mut LayoutBuilder<'a, '_>,
    src: &'a str,
    available: f32,
) -> Result<(), RenderError> {
    let handle = ctx.images.resolve(src)?;
    let state = ctx
        .images
        .get(handle)
        .map_or(ImageState::Failed, |entry| entry.state);

    let ImageState::Loaded {
        width_px,
        height_px,
    } = state
    else {
        let style = ctx.styles.get(StyleRole::Italic);
        ui.with_box(BoxConfig::row(), |ui| {
            ui.text(format!("🖼 Image not loaded: {src}"), style);
        });
        return Ok(());
    };

    let (cell_w, cell_h) = ctx.cell_px;
    let content = (available * IMAGE_WIDTH_FRACTION).floor().max(1.0);
    let indent = (content / 6.0).floor();
    let natural_cols = (width_px as f32 / f32::from(cell_w.max(1))).ceil().max(1.0);
    let cols = natural_cols.min((content - indent).max(1.0));
    let rows = (height_px as f32 * (cols / natural_cols) / f32::from(cell_h.max(1)))
        .ceil()
        .max(1.0);

    ui.with_box(
        BoxConfig {
            padding: Padding::new(indent, 0.0, 1.0, 1.0),
            ..BoxConfig::row()
        },
        |ui| {
            ui.with_box(
                BoxConfig {
                    sizing: Sizing {
                        width: SizingAxis::Fixed(cols),
                        height: SizingAxis::Fixed(rows),
                    },
                    image: Some(handle),
                    ..BoxConfig::row()
                },
                |_| {},
            );
        },
    );
    Ok(())
}

fn shrink(available: f32, padding: Padding) -> f32 {
    (available - padding.horizontal()).max(1.0)
}
