use crate::image::ImageHandle;
use crate::ui::style::{Rgba, TextStyle};

use super::{BorderWidths, BoundingBox, ElementId};

/// A drawing primitive produced by [`super::LayoutState::compute`].
///
/// Text borrows from the frame's [`super::Layout`], so commands cannot be
/// kept past the end of the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderCommand<'l> {
    pub id: ElementId,
    pub bounds: BoundingBox,
    pub kind: CommandKind<'l>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind<'l> {
    Rectangle {
        color: Rgba,
        corner_radius: f32,
    },
    Border {
        color: Rgba,
        widths: BorderWidths,
        corner_radius: f32,
    },
    Text {
        text: &'l str,
        style: TextStyle,
    },
    Image {
        handle: ImageHandle,
    },
    /// Restrict drawing to `bounds` until the matching `ScissorEnd`
    ScissorStart,
    ScissorEnd,
}

impl CommandKind<'_> {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Rectangle { .. } => "rectangle",
            Self::Border { .. } => "border",
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::ScissorStart => "scissor_start",
            Self::ScissorEnd => "scissor_end",
        }
    }
}
