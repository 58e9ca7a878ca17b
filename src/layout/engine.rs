//! Taffy bridge.
//!
//! Converts declared elements to taffy styles, runs flexbox layout, and
//! flattens the result into render commands in painter's order.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use taffy::{
    AlignSelf, AvailableSpace, Dimension, FlexDirection, JustifyContent, LengthPercentage, NodeId,
    Overflow, Point, Rect, Size, Style, TaffyTree,
};
use unicode_width::UnicodeWidthChar;

use super::commands::{CommandKind, RenderCommand};
use super::{
    AlignX, BoundingBox, BoxConfig, Clip, DEFAULT_MAX_ELEMENTS, DEFAULT_MAX_MEASURED_TEXT,
    Direction, ElementId, ElementKind, Layout, LayoutError, SizingAxis, Vector2,
};

const TAB_WIDTH: usize = 4;

/// Display width of `text` in cells.
pub fn text_width(text: &str) -> usize {
    text.chars()
        .map(|c| {
            if c == '\t' {
                TAB_WIDTH
            } else {
                c.width().unwrap_or(0)
            }
        })
        .sum()
}

/// Scroll state of one clipping element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollContainer {
    /// Current offset; zero or negative on each axis
    pub offset: Vector2,
    pub viewport: BoundingBox,
    pub content: Vector2,
    pub horizontal: bool,
    pub vertical: bool,
    depth: usize,
}

impl ScrollContainer {
    /// Largest distance the content can move on each axis.
    pub fn max_scroll(&self) -> Vector2 {
        Vector2::new(
            if self.horizontal {
                (self.content.x - self.viewport.width).max(0.0)
            } else {
                0.0
            },
            if self.vertical {
                (self.content.y - self.viewport.height).max(0.0)
            } else {
                0.0
            },
        )
    }

    fn can_scroll(&self, delta: Vector2) -> bool {
        let max = self.max_scroll();
        (delta.x != 0.0 && max.x > 0.0) || (delta.y != 0.0 && max.y > 0.0)
    }

    fn apply(&mut self, delta: Vector2) {
        if self.horizontal {
            self.offset.x += delta.x;
        }
        if self.vertical {
            self.offset.y += delta.y;
        }
        self.clamp();
    }

    fn clamp(&mut self) {
        let max = self.max_scroll();
        self.offset.x = self.offset.x.clamp(-max.x, 0.0);
        self.offset.y = self.offset.y.clamp(-max.y, 0.0);
    }
}

#[derive(Debug, Clone, Copy)]
struct MeasuredText {
    width: f32,
    lines: f32,
    last_used: u64,
}

/// Layout state carried between frames.
#[derive(Debug)]
pub struct LayoutState {
    dimensions: Vector2,
    pointer: Option<Vector2>,
    pointer_down: bool,
    bounds: HashMap<ElementId, BoundingBox>,
    /// Visible part of every element, in declaration order
    hit_boxes: Vec<(ElementId, BoundingBox)>,
    /// Elements under the pointer, outermost first
    hovered: Vec<ElementId>,
    scroll: HashMap<ElementId, ScrollContainer>,
    root: Option<ElementId>,
    measured: HashMap<u64, MeasuredText>,
    frame: u64,
    max_elements: usize,
    max_measured_text: usize,
}

impl LayoutState {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            dimensions: Vector2::new(width, height),
            pointer: None,
            pointer_down: false,
            bounds: HashMap::new(),
            hit_boxes: Vec::new(),
            hovered: Vec::new(),
            scroll: HashMap::new(),
            root: None,
            measured: HashMap::new(),
            frame: 0,
            max_elements: DEFAULT_MAX_ELEMENTS,
            max_measured_text: DEFAULT_MAX_MEASURED_TEXT,
        }
    }

    pub const fn dimensions(&self) -> Vector2 {
        self.dimensions
    }

    pub const fn set_dimensions(&mut self, width: f32, height: f32) {
        self.dimensions = Vector2::new(width, height);
    }

    pub const fn max_elements(&self) -> usize {
        self.max_elements
    }

    pub fn set_max_elements(&mut self, max: usize) {
        self.max_elements = max.max(1);
    }

    pub const fn max_measured_text(&self) -> usize {
        self.max_measured_text
    }

    pub fn set_max_measured_text(&mut self, max: usize) {
        self.max_measured_text = max.max(1);
    }

    /// Double the capacity named by a capacity error.
    ///
    /// Returns `false` for errors that more capacity cannot fix.
    pub fn grow_for(&mut self, err: &LayoutError) -> bool {
        match err {
            LayoutError::ElementCapacityExceeded { capacity } => {
                self.max_elements = capacity.saturating_mul(2);
                true
            }
            LayoutError::TextMeasureCapacityExceeded { capacity } => {
                self.max_measured_text = capacity.saturating_mul(2);
                true
            }
            _ => false,
        }
    }

    /// Update the pointer and recompute hover against the last layout.
    pub fn set_pointer(&mut self, position: Option<Vector2>, down: bool) {
        self.pointer = position;
        self.pointer_down = down;
        self.refresh_hover();
    }

    pub const fn pointer(&self) -> Option<Vector2> {
        self.pointer
    }

    pub const fn pointer_down(&self) -> bool {
        self.pointer_down
    }

    pub fn is_hovered(&self, id: ElementId) -> bool {
        self.hovered.contains(&id)
    }

    /// Innermost element under the pointer.
    pub fn hovered_element(&self) -> Option<ElementId> {
        self.hovered.last().copied()
    }

    /// Bounds of an element in the last computed layout.
    pub fn bounds(&self, id: ElementId) -> Option<BoundingBox> {
        self.bounds.get(&id).copied()
    }

    pub fn scroll_offset(&self, id: ElementId) -> Vector2 {
        self.scroll.get(&id).map_or(Vector2::ZERO, |c| c.offset)
    }

    /// Scroll state of the root element, if it clips.
    pub fn root_scroll(&self) -> Option<&ScrollContainer> {
        self.root.and_then(|id| self.scroll.get(&id))
    }

    /// Move the innermost hovered container that can scroll along `delta`,
    /// falling back to the root container.
    ///
    /// Positive deltas move content towards its start (scrolling up/left).
    pub fn update_scroll(&mut self, delta: Vector2) {
        if delta.is_zero() {
            return;
        }
        let hovered_target = self
            .hovered
            .iter()
            .rev()
            .find(|id| self.scroll.get(*id).is_some_and(|c| c.can_scroll(delta)))
            .copied();
        let target = hovered_target.or_else(|| {
            self.root
                .filter(|id| self.scroll.get(id).is_some_and(|c| c.can_scroll(delta)))
        });
        if let Some(container) = target.and_then(|id| self.scroll.get_mut(&id)) {
            container.apply(delta);
        }
    }

    pub fn scroll_to_top(&mut self) {
        if let Some(container) = self.root.and_then(|id| self.scroll.get_mut(&id)) {
            container.offset.y = 0.0;
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        if let Some(container) = self.root.and_then(|id| self.scroll.get_mut(&id)) {
            container.offset.y = -container.max_scroll().y;
        }
    }

    /// Lay out `layout` and produce its render commands.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::TextMeasureCapacityExceeded`] when the frame holds
    /// more distinct text runs than the measurement cache allows, and
    /// [`LayoutError::Engine`] if taffy rejects the tree.
    pub fn compute<'l>(
        &mut self,
        layout: &'l Layout<'_>,
    ) -> Result<Vec<RenderCommand<'l>>, LayoutError> {
        self.frame += 1;
        let Some(root) = layout.root() else {
            return Ok(Vec::new());
        };
        if layout.len() > self.max_elements {
            return Err(LayoutError::ElementCapacityExceeded {
                capacity: self.max_elements,
            });
        }

        let measured = self.measure_texts(layout)?;

        let mut tree: TaffyTree<usize> = TaffyTree::with_capacity(layout.len());
        let mut nodes = Vec::with_capacity(layout.len());
        for (index, element) in layout.elements().iter().enumerate() {
            let style = self.element_style(layout, index);
            let node = match element.kind {
                ElementKind::Text { .. } => tree.new_leaf_with_context(style, index),
                ElementKind::Box(_) => tree.new_leaf(style),
            }
            .map_err(engine_error)?;
            nodes.push(node);
        }
        for (index, element) in layout.elements().iter().enumerate() {
            for &child in &element.children {
                tree.add_child(nodes[index], nodes[child])
                    .map_err(engine_error)?;
            }
        }

        let available = Size {
            width: AvailableSpace::Definite(self.dimensions.x),
            height: AvailableSpace::Definite(self.dimensions.y),
        };
        tree.compute_layout_with_measure(
            nodes[0],
            available,
            |known, _available, _node, context: Option<&mut usize>, _style| {
                let Some(&mut index) = context else {
                    return Size::ZERO;
                };
                let (width, height) = measured[index].unwrap_or((0.0, 0.0));
                Size {
                    width: known.width.unwrap_or(width),
                    height: known.height.unwrap_or(height),
                }
            },
        )
        .map_err(engine_error)?;

        let window = BoundingBox::new(0.0, 0.0, self.dimensions.x, self.dimensions.y);
        let mut walk = Walk {
            tree: &tree,
            nodes: &nodes,
            layout,
            window,
            commands: Vec::new(),
            bounds: HashMap::with_capacity(layout.len()),
            hit_boxes: Vec::with_capacity(layout.len()),
            containers: Vec::new(),
        };
        walk.visit(0, Vector2::ZERO, 0, window)?;

        let Walk {
            commands,
            bounds,
            hit_boxes,
            containers,
            ..
        } = walk;

        let mut scroll = HashMap::with_capacity(containers.len());
        for found in containers {
            let previous = self.scroll.get(&found.id).map_or(Vector2::ZERO, |c| c.offset);
            let mut container = ScrollContainer {
                offset: previous,
                viewport: found.bounds,
                content: found.content,
                horizontal: found.clip.horizontal,
                vertical: found.clip.vertical,
                depth: found.depth,
            };
            container.clamp();
            scroll.insert(found.id, container);
        }

        self.scroll = scroll;
        self.bounds = bounds;
        self.hit_boxes = hit_boxes;
        self.root = Some(root.id);
        self.refresh_hover();
        let frame = self.frame;
        self.measured.retain(|_, entry| entry.last_used == frame);

        tracing::trace!(
            elements = layout.len(),
            commands = commands.len(),
            "layout computed"
        );
        Ok(commands)
    }

    fn refresh_hover(&mut self) {
        self.hovered.clear();
        if let Some(pointer) = self.pointer {
            self.hovered.extend(
                self.hit_boxes
                    .iter()
                    .filter(|(_, rect)| rect.contains(pointer))
                    .map(|(id, _)| *id),
            );
        }
    }

    fn measure_texts(&mut self, layout: &Layout<'_>) -> Result<Vec<Option<(f32, f32)>>, LayoutError> {
        let frame = self.frame;
        let mut used = 0;
        let mut sizes = Vec::with_capacity(layout.len());
        for element in layout.elements() {
            let ElementKind::Text { text, .. } = &element.kind else {
                sizes.push(None);
                continue;
            };
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            let entry = self
                .measured
                .entry(hasher.finish())
                .or_insert_with(|| measure_text(text));
            if entry.last_used != frame {
                entry.last_used = frame;
                used += 1;
            }
            sizes.push(Some((entry.width, entry.lines)));
        }
        if used > self.max_measured_text {
            return Err(LayoutError::TextMeasureCapacityExceeded {
                capacity: self.max_measured_text,
            });
        }
        Ok(sizes)
    }

    fn element_style(&self, layout: &Layout<'_>, index: usize) -> Style {
        let element = &layout.elements()[index];
        let parent = element
            .parent
            .and_then(|parent| match &layout.elements()[parent].kind {
                ElementKind::Box(config) => Some(config),
                ElementKind::Text { .. } => None,
            });
        let row_parent = parent.is_some_and(|p| p.direction == Direction::LeftToRight);

        let mut style = Style {
            flex_shrink: 0.0,
            ..Style::default()
        };

        let config = match &element.kind {
            ElementKind::Text { .. } => {
                style.align_self = Some(fit_alignment(parent, row_parent));
                return style;
            }
            ElementKind::Box(config) => config,
        };

        style.flex_direction = match config.direction {
            Direction::LeftToRight => FlexDirection::Row,
            Direction::TopToBottom => FlexDirection::Column,
        };
        style.padding = Rect {
            left: LengthPercentage::Length(config.padding.left),
            right: LengthPercentage::Length(config.padding.right),
            top: LengthPercentage::Length(config.padding.top),
            bottom: LengthPercentage::Length(config.padding.bottom),
        };
        style.gap = Size {
            width: LengthPercentage::Length(config.child_gap),
            height: LengthPercentage::Length(config.child_gap),
        };
        if let Some(clip) = config.clip {
            let overflow = |clipped: bool| if clipped { Overflow::Hidden } else { Overflow::Visible };
            style.overflow = Point {
                x: overflow(clip.horizontal),
                y: overflow(clip.vertical),
            };
        }
        if config.direction == Direction::LeftToRight {
            style.justify_content = Some(match config.align_x {
                AlignX::Left => JustifyContent::FlexStart,
                AlignX::Center => JustifyContent::Center,
                AlignX::Right => JustifyContent::FlexEnd,
            });
        }

        let (width, min_width, max_width) = axis_dimensions(config.sizing.width);
        let (height, min_height, max_height) = axis_dimensions(config.sizing.height);
        style.size = Size { width, height };
        style.min_size = Size {
            width: min_width,
            height: min_height,
        };
        style.max_size = Size {
            width: max_width,
            height: max_height,
        };

        if parent.is_none() {
            // The root fills the window on growing axes.
            if matches!(config.sizing.width, SizingAxis::Grow { .. }) {
                style.size.width = Dimension::Length(self.dimensions.x);
            }
            if matches!(config.sizing.height, SizingAxis::Grow { .. }) {
                style.size.height = Dimension::Length(self.dimensions.y);
            }
            return style;
        }

        let (main, cross) = if row_parent {
            (config.sizing.width, config.sizing.height)
        } else {
            (config.sizing.height, config.sizing.width)
        };
        if matches!(main, SizingAxis::Grow { .. }) {
            style.flex_grow = 1.0;
        }
        style.align_self = Some(if matches!(cross, SizingAxis::Grow { .. }) {
            AlignSelf::Stretch
        } else {
            fit_alignment(parent, row_parent)
        });
        style
    }
}

fn measure_text(text: &str) -> MeasuredText {
    let mut width = 0;
    let mut lines = 0;
    for line in text.split('\n') {
        width = width.max(text_width(line));
        lines += 1;
    }
    MeasuredText {
        width: width as f32,
        lines: lines as f32,
        last_used: 0,
    }
}

/// Cross-axis placement of a non-growing child.
fn fit_alignment(parent: Option<&BoxConfig>, row_parent: bool) -> AlignSelf {
    match parent {
        Some(config) if !row_parent => match config.align_x {
            AlignX::Left => AlignSelf::FlexStart,
            AlignX::Center => AlignSelf::Center,
            AlignX::Right => AlignSelf::FlexEnd,
        },
        _ => AlignSelf::FlexStart,
    }
}

fn axis_dimensions(axis: SizingAxis) -> (Dimension, Dimension, Dimension) {
    let min_dim = |min: f32| {
        if min > 0.0 {
            Dimension::Length(min)
        } else {
            Dimension::Auto
        }
    };
    let max_dim = |max: f32| {
        if max.is_finite() {
            Dimension::Length(max.max(0.0))
        } else {
            Dimension::Auto
        }
    };
    match axis {
        SizingAxis::Fit { min, max } | SizingAxis::Grow { min, max } => {
            (Dimension::Auto, min_dim(min), max_dim(max))
        }
        SizingAxis::Fixed(value) => (
            Dimension::Length(value),
            Dimension::Length(value),
            Dimension::Length(value),
        ),
    }
}

fn engine_error(err: taffy::TaffyError) -> LayoutError {
    LayoutError::Engine(err.to_string())
}

struct FoundContainer {
    id: ElementId,
    bounds: BoundingBox,
    content: Vector2,
    clip: Clip,
    depth: usize,
}

struct Walk<'t, 'l, 'a> {
    tree: &'t TaffyTree<usize>,
    nodes: &'t [NodeId],
    layout: &'l Layout<'a>,
    window: BoundingBox,
    commands: Vec<RenderCommand<'l>>,
    bounds: HashMap<ElementId, BoundingBox>,
    hit_boxes: Vec<(ElementId, BoundingBox)>,
    containers: Vec<FoundContainer>,
}

impl<'l> Walk<'_, 'l, '_> {
    fn visit(
        &mut self,
        index: usize,
        origin: Vector2,
        depth: usize,
        visible: BoundingBox,
    ) -> Result<(), LayoutError> {
        let layout = self.layout;
        let element = &layout.elements()[index];
        let computed = self.tree.layout(self.nodes[index]).map_err(engine_error)?;
        let bounds = BoundingBox::new(
            origin.x + computed.location.x,
            origin.y + computed.location.y,
            computed.size.width,
            computed.size.height,
        );
        self.bounds.insert(element.id, bounds);
        if let Some(hit) = bounds.intersection(&visible) {
            self.hit_boxes.push((element.id, hit));
        }
        let on_screen = bounds.intersects(&self.window);

        let config = match &element.kind {
            ElementKind::Text { text, style } => {
                if on_screen {
                    self.push(element.id, bounds, CommandKind::Text {
                        text: text.as_ref(),
                        style: *style,
                    });
                }
                return Ok(());
            }
            ElementKind::Box(config) => config,
        };

        if on_screen {
            if let Some(color) = config.background {
                self.push(element.id, bounds, CommandKind::Rectangle {
                    color,
                    corner_radius: config.corner_radius,
                });
            }
            if let Some(handle) = config.image {
                self.push(element.id, bounds, CommandKind::Image { handle });
            }
        }

        let mut child_origin = Vector2::new(bounds.x, bounds.y);
        let mut child_visible = visible;
        if let Some(clip) = config.clip {
            self.push(element.id, bounds, CommandKind::ScissorStart);
            if clip.horizontal {
                child_origin.x += clip.child_offset.x;
            }
            if clip.vertical {
                child_origin.y += clip.child_offset.y;
            }
            child_visible = visible
                .intersection(&bounds)
                .unwrap_or(BoundingBox::new(bounds.x, bounds.y, 0.0, 0.0));
            let content = self.content_size(element.children.as_slice(), config)?;
            self.containers.push(FoundContainer {
                id: element.id,
                bounds,
                content,
                clip,
                depth,
            });
        }

        for &child in &element.children {
            self.visit(child, child_origin, depth + 1, child_visible)?;
        }

        if config.clip.is_some() {
            self.push(element.id, bounds, CommandKind::ScissorEnd);
        }
        if let Some(border) = config.border {
            if on_screen {
                self.push(element.id, bounds, CommandKind::Border {
                    color: border.color,
                    widths: border.widths,
                    corner_radius: config.corner_radius,
                });
            }
        }
        Ok(())
    }

    fn content_size(&self, children: &[usize], config: &BoxConfig) -> Result<Vector2, LayoutError> {
        let mut extent = Vector2::ZERO;
        for &child in children {
            let computed = self.tree.layout(self.nodes[child]).map_err(engine_error)?;
            extent.x = extent.x.max(computed.location.x + computed.size.width);
            extent.y = extent.y.max(computed.location.y + computed.size.height);
        }
        Ok(Vector2::new(
            extent.x + config.padding.right,
            extent.y + config.padding.bottom,
        ))
    }

    fn push(&mut self, id: ElementId, bounds: BoundingBox, kind: CommandKind<'l>) {
        self.commands.push(RenderCommand { id, bounds, kind });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Border, LayoutBuilder, Padding, Sizing};
    use crate::ui::style::{Palette, StyleRole, StyleTable, TextStyle};

    fn body() -> TextStyle {
        StyleTable::default().get(StyleRole::Body)
    }

    fn main_config() -> BoxConfig {
        BoxConfig {
            sizing: Sizing {
                width: SizingAxis::grow(),
                height: SizingAxis::grow(),
            },
            clip: Some(Clip::vertical()),
            ..BoxConfig::column()
        }
    }

    fn long_document<'a>(state: &LayoutState, rows: usize) -> Layout<'a> {
        let mut ui = LayoutBuilder::new(state);
        ui.with_named_box("main_layout", main_config(), |ui| {
            for i in 0..rows {
                ui.with_box(BoxConfig::row(), |ui| ui.text(format!("row {i}"), body()));
            }
        });
        ui.finish().unwrap()
    }

    #[test]
    fn test_text_width_counts_cells() {
        assert_eq!(text_width("abc"), 3);
        assert_eq!(text_width("\tx"), 5);
        assert_eq!(text_width("日本"), 4);
    }

    #[test]
    fn test_column_stacks_rows() {
        let mut state = LayoutState::new(40.0, 10.0);
        let layout = long_document(&state, 3);
        let commands = state.compute(&layout).unwrap();
        let text_rows: Vec<f32> = commands
            .iter()
            .filter(|c| matches!(c.kind, CommandKind::Text { .. }))
            .map(|c| c.bounds.y)
            .collect();
        assert_eq!(text_rows, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_command_order_wraps_children_in_scissor() {
        let mut state = LayoutState::new(40.0, 10.0);
        let mut ui = LayoutBuilder::new(&state);
        ui.with_box(
            BoxConfig {
                background: Some(Palette::DARK.background),
                border: Some(Border::left(Palette::DARK.pink, 1)),
                ..main_config()
            },
            |ui| ui.text("x", body()),
        );
        let layout = ui.finish().unwrap();
        let names: Vec<_> = state
            .compute(&layout)
            .unwrap()
            .iter()
            .map(|c| c.kind.name())
            .collect();
        assert_eq!(
            names,
            vec!["rectangle", "scissor_start", "text", "scissor_end", "border"]
        );
    }

    #[test]
    fn test_grow_fills_and_fit_max_clamps() {
        let mut state = LayoutState::new(50.0, 10.0);
        let mut ui = LayoutBuilder::new(&state);
        ui.with_box(main_config(), |ui| {
            ui.with_box(
                BoxConfig {
                    sizing: Sizing {
                        width: SizingAxis::grow(),
                        height: SizingAxis::fit(),
                    },
                    ..BoxConfig::row()
                },
                |ui| ui.text("grow", body()),
            );
            ui.with_box(
                BoxConfig {
                    sizing: Sizing {
                        width: SizingAxis::fit_max(5.0),
                        height: SizingAxis::fit(),
                    },
                    padding: Padding::new(1.0, 1.0, 0.0, 0.0),
                    ..BoxConfig::row()
                },
                |ui| ui.text("a long unbroken line", body()),
            );
        });
        let layout = ui.finish().unwrap();
        state.compute(&layout).unwrap();
        let grow = state.bounds(layout.elements()[1].id).unwrap();
        let fit = state.bounds(layout.elements()[3].id).unwrap();
        assert_eq!(grow.width, 50.0);
        assert_eq!(fit.width, 5.0);
        assert_eq!(fit.y, 1.0);
    }

    #[test]
    fn test_offscreen_text_is_culled() {
        let mut state = LayoutState::new(40.0, 5.0);
        let layout = long_document(&state, 20);
        let commands = state.compute(&layout).unwrap();
        let texts = commands
            .iter()
            .filter(|c| matches!(c.kind, CommandKind::Text { .. }))
            .count();
        assert_eq!(texts, 5);
    }

    #[test]
    fn test_root_scroll_is_clamped() {
        let mut state = LayoutState::new(40.0, 10.0);
        let layout = long_document(&state, 30);
        state.compute(&layout).unwrap();

        state.update_scroll(Vector2::new(0.0, -5.0));
        assert_eq!(state.root_scroll().unwrap().offset.y, -5.0);

        state.update_scroll(Vector2::new(0.0, -500.0));
        assert_eq!(state.root_scroll().unwrap().offset.y, -20.0);

        state.update_scroll(Vector2::new(0.0, 500.0));
        assert_eq!(state.root_scroll().unwrap().offset.y, 0.0);
    }

    #[test]
    fn test_scroll_offset_moves_children_next_frame() {
        let mut state = LayoutState::new(40.0, 10.0);
        let layout = long_document(&state, 30);
        state.compute(&layout).unwrap();
        state.scroll_to_bottom();

        let layout = long_document(&state, 30);
        let commands = state.compute(&layout).unwrap();
        let first = commands
            .iter()
            .find_map(|c| match c.kind {
                CommandKind::Text { text, .. } => Some((text, c.bounds.y)),
                _ => None,
            })
            .unwrap();
        assert_eq!(first, ("row 20", 0.0));

        state.scroll_to_top();
        assert_eq!(state.root_scroll().unwrap().offset.y, 0.0);
    }

    #[test]
    fn test_hovered_inner_container_scrolls_first() {
        let mut state = LayoutState::new(20.0, 10.0);
        let build = |state: &LayoutState| {
            let mut ui = LayoutBuilder::new(state);
            ui.with_named_box("main_layout", main_config(), |ui| {
                ui.with_box(
                    BoxConfig {
                        sizing: Sizing {
                            width: SizingAxis::fit_max(10.0),
                            height: SizingAxis::fit(),
                        },
                        clip: Some(Clip::horizontal()),
                        ..BoxConfig::column()
                    },
                    |ui| ui.text("a very long line of code here", body()),
                );
                for _ in 0..30 {
                    ui.with_box(BoxConfig::row(), |ui| ui.text("filler", body()));
                }
            });
            ui.finish().unwrap()
        };
        let layout = build(&state);
        state.compute(&layout).unwrap();
        let code_id = layout.elements()[1].id;

        state.set_pointer(Some(Vector2::new(2.0, 0.0)), false);
        assert!(state.is_hovered(code_id));

        state.update_scroll(Vector2::new(-4.0, 0.0));
        assert_eq!(state.scroll_offset(code_id).x, -4.0);

        // Vertical deltas fall through to the root container.
        state.update_scroll(Vector2::new(0.0, -3.0));
        assert_eq!(state.root_scroll().unwrap().offset.y, -3.0);
        assert_eq!(state.scroll_offset(code_id).y, 0.0);
    }

    #[test]
    fn test_measure_capacity_error_and_growth() {
        let mut state = LayoutState::new(40.0, 10.0);
        state.set_max_measured_text(2);
        let layout = long_document(&state, 3);
        let err = state.compute(&layout).unwrap_err();
        assert_eq!(err, LayoutError::TextMeasureCapacityExceeded { capacity: 2 });
        assert!(state.grow_for(&err));
        assert_eq!(state.max_measured_text(), 4);
        assert!(state.compute(&layout).is_ok());
    }

    #[test]
    fn test_grow_for_ignores_structural_errors() {
        let mut state = LayoutState::new(40.0, 10.0);
        assert!(!state.grow_for(&LayoutError::UnbalancedClose));
    }

    #[test]
    fn test_empty_layout_has_no_commands() {
        let mut state = LayoutState::new(40.0, 10.0);
        assert!(state.compute(&Layout::default()).unwrap().is_empty());
    }
}
