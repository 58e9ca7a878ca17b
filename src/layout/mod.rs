//! Immediate-mode box layout.
//!
//! Each frame the renderer declares a tree of boxes and text runs through a
//! [`LayoutBuilder`]. [`LayoutState::compute`] lays the tree out with taffy's
//! flexbox implementation and flattens it into [`RenderCommand`]s. All units
//! are terminal cells.
//!
//! State that must survive between frames (element bounds for hover tests,
//! scroll offsets, text measurements) lives in [`LayoutState`]; everything
//! declared for a frame lives in the [`Layout`] and is dropped with it.

mod builder;
mod commands;
mod engine;

use std::borrow::Cow;
use std::hash::{DefaultHasher, Hash, Hasher};

use thiserror::Error;

use crate::image::ImageHandle;
use crate::ui::style::{Rgba, TextStyle};

pub use builder::LayoutBuilder;
pub use commands::{CommandKind, RenderCommand};
pub use engine::{LayoutState, ScrollContainer, text_width};

/// Default maximum number of elements per frame.
pub const DEFAULT_MAX_ELEMENTS: usize = 8192;
/// Default maximum number of distinct measured text runs per frame.
pub const DEFAULT_MAX_MEASURED_TEXT: usize = 16384;

/// Errors raised while declaring or computing a layout.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout exceeded its element capacity of {capacity}")]
    ElementCapacityExceeded { capacity: usize },

    #[error("layout exceeded its text measurement capacity of {capacity}")]
    TextMeasureCapacityExceeded { capacity: usize },

    #[error("close() called with no open element")]
    UnbalancedClose,

    #[error("{open} element(s) left open at the end of the frame")]
    UnclosedElements { open: usize },

    #[error("a second top-level element was opened")]
    MultipleRoots,

    #[error("text declared outside of any element")]
    TextOutsideElement,

    #[error("layout engine failure: {0}")]
    Engine(String),
}

/// Stable element identity across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    /// Id derived from a name.
    pub fn named(name: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Id of the `index`-th child of `parent`.
    pub fn child(parent: Self, index: usize) -> Self {
        let mut hasher = DefaultHasher::new();
        parent.0.hash(&mut hasher);
        index.hash(&mut hasher);
        Self(hasher.finish())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Axis-aligned rectangle in cells.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: Vector2) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = (self.y + self.height).min(other.y + other.height);
        (right > x && bottom > y).then(|| Self::new(x, y, right - x, bottom - y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    LeftToRight,
    TopToBottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Padding {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Padding {
    pub const fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }
}

/// How a box is sized along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizingAxis {
    /// Wrap the content, clamped to `min..=max`
    Fit { min: f32, max: f32 },
    /// Fill the remaining space of the parent, clamped to `min..=max`
    Grow { min: f32, max: f32 },
    Fixed(f32),
}

impl SizingAxis {
    pub const fn fit() -> Self {
        Self::Fit {
            min: 0.0,
            max: f32::INFINITY,
        }
    }

    pub const fn fit_max(max: f32) -> Self {
        Self::Fit { min: 0.0, max }
    }

    pub const fn grow() -> Self {
        Self::Grow {
            min: 0.0,
            max: f32::INFINITY,
        }
    }

    pub const fn grow_max(max: f32) -> Self {
        Self::Grow { min: 0.0, max }
    }
}

impl Default for SizingAxis {
    fn default() -> Self {
        Self::fit()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sizing {
    pub width: SizingAxis,
    pub height: SizingAxis,
}

/// Horizontal placement of children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignX {
    #[default]
    Left,
    Center,
    Right,
}

/// Border widths per side. Borders are drawn over the box and take no space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BorderWidths {
    pub left: u16,
    pub right: u16,
    pub top: u16,
    pub bottom: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Border {
    pub color: Rgba,
    pub widths: BorderWidths,
}

impl Border {
    pub const fn left(color: Rgba, width: u16) -> Self {
        Self {
            color,
            widths: BorderWidths {
                left: width,
                right: 0,
                top: 0,
                bottom: 0,
            },
        }
    }

    pub const fn top(color: Rgba, width: u16) -> Self {
        Self {
            color,
            widths: BorderWidths {
                left: 0,
                right: 0,
                top: width,
                bottom: 0,
            },
        }
    }
}

/// Clipping of a box's children, with a scroll offset.
///
/// `child_offset` is filled in by the builder from the scroll state of the
/// element; offsets are zero or negative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Clip {
    pub horizontal: bool,
    pub vertical: bool,
    pub child_offset: Vector2,
}

impl Clip {
    pub const fn horizontal() -> Self {
        Self {
            horizontal: true,
            vertical: false,
            child_offset: Vector2::ZERO,
        }
    }

    pub const fn vertical() -> Self {
        Self {
            horizontal: false,
            vertical: true,
            child_offset: Vector2::ZERO,
        }
    }
}

/// Declaration of one box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxConfig {
    pub direction: Direction,
    pub padding: Padding,
    pub child_gap: f32,
    pub sizing: Sizing,
    pub align_x: AlignX,
    pub background: Option<Rgba>,
    pub corner_radius: f32,
    pub border: Option<Border>,
    pub clip: Option<Clip>,
    pub image: Option<ImageHandle>,
}

impl BoxConfig {
    pub fn row() -> Self {
        Self::default()
    }

    pub fn column() -> Self {
        Self {
            direction: Direction::TopToBottom,
            ..Self::default()
        }
    }
}

/// Payload of a declared element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind<'a> {
    Box(BoxConfig),
    Text { text: Cow<'a, str>, style: TextStyle },
}

/// One declared element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element<'a> {
    pub id: ElementId,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub kind: ElementKind<'a>,
}

/// All declarations of one frame. Element 0 is the root.
///
/// Text is either borrowed from the document or owned by the layout; owned
/// strings are released when the layout is dropped at the end of the frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout<'a> {
    elements: Vec<Element<'a>>,
}

impl<'a> Layout<'a> {
    pub fn elements(&self) -> &[Element<'a>] {
        &self.elements
    }

    pub fn root(&self) -> Option<&Element<'a>> {
        self.elements.first()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn find(&self, id: ElementId) -> Option<&Element<'a>> {
        self.elements.iter().find(|element| element.id == id)
    }

    /// Every text run, in declaration order.
    pub fn texts(&self) -> impl Iterator<Item = (&str, &TextStyle)> {
        self.elements.iter().filter_map(|element| match &element.kind {
            ElementKind::Text { text, style } => Some((text.as_ref(), style)),
            ElementKind::Box(_) => None,
        })
    }

    /// Text runs grouped by their parent element, in declaration order.
    ///
    /// Each wrapped line, heading or code row is one parent, so this recovers
    /// the visual rows of the document.
    pub fn text_rows(&self) -> Vec<String> {
        let mut rows: Vec<(usize, String)> = Vec::new();
        for element in &self.elements {
            if let ElementKind::Text { text, .. } = &element.kind {
                let parent = element.parent.unwrap_or(0);
                match rows.last_mut() {
                    Some((last, row)) if *last == parent => row.push_str(text),
                    _ => rows.push((parent, text.to_string())),
                }
            }
        }
        rows.into_iter().map(|(_, row)| row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_ids_are_stable_and_distinct() {
        let root = ElementId::named("main_layout");
        assert_eq!(ElementId::child(root, 3), ElementId::child(root, 3));
        assert_ne!(ElementId::child(root, 3), ElementId::child(root, 4));
        assert_ne!(ElementId::named("a"), ElementId::named("b"));
    }

    #[test]
    fn test_bounding_box_intersection() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b), Some(BoundingBox::new(5.0, 5.0, 5.0, 5.0)));
        let c = BoundingBox::new(10.0, 0.0, 5.0, 5.0);
        assert!(!a.intersects(&c));
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn test_contains_excludes_far_edge() {
        let a = BoundingBox::new(1.0, 1.0, 2.0, 2.0);
        assert!(a.contains(Vector2::new(1.0, 1.0)));
        assert!(!a.contains(Vector2::new(3.0, 1.0)));
    }
}
