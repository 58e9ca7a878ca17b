//! Draws render commands into a ratatui buffer.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use unicode_width::UnicodeWidthChar;

use crate::image::ImageCache;
use crate::layout::{BorderWidths, BoundingBox, CommandKind, RenderCommand};

use super::images::draw_image;
use super::style::{Palette, Rgba, TextStyle, terminal_color};

const REPLACEMENT: char = '\u{FFFD}';
const PLACEHOLDER_FILL: &str = "░";
const TAB_CELLS: u16 = 4;

/// Cell rectangle with exclusive far edges. May extend past the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct CellRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl CellRect {
    pub fn from_bounds(bounds: &BoundingBox) -> Self {
        let x0 = bounds.x.round() as i32;
        let y0 = bounds.y.round() as i32;
        Self {
            x0,
            y0,
            x1: x0 + bounds.width.round() as i32,
            y1: y0 + bounds.height.round() as i32,
        }
    }

    pub fn from_area(area: Rect) -> Self {
        Self {
            x0: i32::from(area.x),
            y0: i32::from(area.y),
            x1: i32::from(area.right()),
            y1: i32::from(area.bottom()),
        }
    }

    pub fn intersect(self, other: Self) -> Self {
        Self {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1).max(self.x0.max(other.x0)),
            y1: self.y1.min(other.y1).max(self.y0.max(other.y0)),
        }
    }

    pub const fn is_empty(self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    pub const fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    pub fn width(self) -> u16 {
        u16::try_from(self.x1 - self.x0).unwrap_or(0)
    }

    pub fn height(self) -> u16 {
        u16::try_from(self.y1 - self.y0).unwrap_or(0)
    }
}

/// Rasterizes one frame of commands.
///
/// Keeps the RGBA background of every cell so translucent fills and text
/// colors blend with what is underneath.
pub struct Rasterizer<'b> {
    buf: &'b mut Buffer,
    backgrounds: Vec<Rgba>,
    clips: Vec<CellRect>,
    palette: Palette,
    truecolor: bool,
}

impl<'b> Rasterizer<'b> {
    pub fn new(buf: &'b mut Buffer, palette: Palette, truecolor: bool) -> Self {
        let cells = usize::from(buf.area.width) * usize::from(buf.area.height);
        Self {
            buf,
            backgrounds: vec![palette.background; cells],
            clips: Vec::new(),
            palette,
            truecolor,
        }
    }

    /// Clear the buffer to the palette background and draw `commands`.
    pub fn draw(&mut self, commands: &[RenderCommand<'_>], images: &mut ImageCache) {
        let clear = Style::default()
            .bg(self.color(self.palette.background))
            .fg(self.color(self.palette.foreground));
        let area = self.buf.area;
        self.buf.set_style(area, clear);
        for cell in &mut self.buf.content {
            cell.set_symbol(" ");
        }
        self.backgrounds.fill(self.palette.background);
        self.clips.clear();

        for command in commands {
            let rect = CellRect::from_bounds(&command.bounds);
            match &command.kind {
                CommandKind::Rectangle { color, .. } => self.fill(rect, *color),
                CommandKind::Border { color, widths, .. } => self.border(rect, *color, *widths),
                CommandKind::Text { text, style } => self.text(rect, text, *style),
                CommandKind::Image { handle } => {
                    let clip = self.clip().intersect(rect);
                    if clip.is_empty() {
                        continue;
                    }
                    let drawn = images
                        .protocol_mut(*handle)
                        .is_some_and(|protocol| draw_image(self.buf, protocol, rect, clip, self.truecolor));
                    if !drawn {
                        self.placeholder(clip);
                    }
                }
                CommandKind::ScissorStart => {
                    let clip = self.clip().intersect(rect);
                    self.clips.push(clip);
                }
                CommandKind::ScissorEnd => {
                    self.clips.pop();
                }
            }
        }
    }

    fn clip(&self) -> CellRect {
        let screen = CellRect::from_area(self.buf.area);
        self.clips.last().map_or(screen, |clip| clip.intersect(screen))
    }

    fn color(&self, color: Rgba) -> ratatui::style::Color {
        terminal_color(color, self.truecolor)
    }

    fn index(&self, x: i32, y: i32) -> Option<(usize, u16, u16)> {
        let (x, y) = (u16::try_from(x).ok()?, u16::try_from(y).ok()?);
        let area = self.buf.area;
        if x < area.x || y < area.y || x >= area.right() || y >= area.bottom() {
            return None;
        }
        let i = usize::from(y - area.y) * usize::from(area.width) + usize::from(x - area.x);
        Some((i, x, y))
    }

    fn fill(&mut self, rect: CellRect, color: Rgba) {
        let rect = self.clip().intersect(rect);
        for y in rect.y0..rect.y1 {
            for x in rect.x0..rect.x1 {
                let Some((i, cx, cy)) = self.index(x, y) else {
                    continue;
                };
                let blended = color.over(self.backgrounds[i]);
                self.backgrounds[i] = blended;
                let bg = self.color(blended);
                self.buf[(cx, cy)].set_symbol(" ").set_bg(bg);
            }
        }
    }

    fn border(&mut self, rect: CellRect, color: Rgba, widths: BorderWidths) {
        if rect.is_empty() {
            return;
        }
        let glyphs = |width: u16| if width >= 2 { HEAVY } else { LIGHT };
        let (right, bottom) = (rect.x1 - 1, rect.y1 - 1);
        if widths.top > 0 {
            let g = glyphs(widths.top);
            for x in rect.x0..rect.x1 {
                self.glyph(x, rect.y0, g.horizontal, color);
            }
        }
        if widths.bottom > 0 {
            let g = glyphs(widths.bottom);
            for x in rect.x0..rect.x1 {
                self.glyph(x, bottom, g.horizontal, color);
            }
        }
        if widths.left > 0 {
            let g = glyphs(widths.left);
            for y in rect.y0..rect.y1 {
                self.glyph(rect.x0, y, g.vertical, color);
            }
        }
        if widths.right > 0 {
            let g = glyphs(widths.right);
            for y in rect.y0..rect.y1 {
                self.glyph(right, y, g.vertical, color);
            }
        }
        let corner = glyphs(widths.top.max(widths.bottom).max(widths.left).max(widths.right));
        if widths.top > 0 && widths.left > 0 {
            self.glyph(rect.x0, rect.y0, corner.top_left, color);
        }
        if widths.top > 0 && widths.right > 0 {
            self.glyph(right, rect.y0, corner.top_right, color);
        }
        if widths.bottom > 0 && widths.left > 0 {
            self.glyph(rect.x0, bottom, corner.bottom_left, color);
        }
        if widths.bottom > 0 && widths.right > 0 {
            self.glyph(right, bottom, corner.bottom_right, color);
        }
    }

    fn glyph(&mut self, x: i32, y: i32, symbol: &str, color: Rgba) {
        if !self.clip().contains(x, y) {
            return;
        }
        let Some((i, cx, cy)) = self.index(x, y) else {
            return;
        };
        let fg = self.color(color.over(self.backgrounds[i]));
        self.buf[(cx, cy)].set_symbol(symbol).set_fg(fg);
    }

    fn text(&mut self, rect: CellRect, text: &str, style: TextStyle) {
        let clip = self.clip();
        let y = rect.y0;
        let mut x = rect.x0;
        let mut utf8 = [0u8; 4];
        for ch in text.chars() {
            if ch == '\t' {
                x += i32::from(TAB_CELLS);
                continue;
            }
            let ch = if ch.is_control() { REPLACEMENT } else { ch };
            let Some(width) = ch.width().filter(|w| *w > 0) else {
                continue;
            };
            let width = width as i32;
            let fits = clip.contains(x, y) && clip.contains(x + width - 1, y);
            if fits {
                if let Some((i, cx, cy)) = self.index(x, y) {
                    let ratatui_style = style.to_ratatui(self.backgrounds[i], self.truecolor);
                    let cell = &mut self.buf[(cx, cy)];
                    cell.set_symbol(ch.encode_utf8(&mut utf8)).set_style(ratatui_style);
                    for extra in 1..width {
                        if let Some((_, ex, ey)) = self.index(x + extra, y) {
                            self.buf[(ex, ey)].set_symbol(" ");
                        }
                    }
                }
            }
            x += width;
        }
    }

    fn placeholder(&mut self, rect: CellRect) {
        let fg = self.color(self.palette.dim.over(self.palette.background));
        for y in rect.y0..rect.y1 {
            for x in rect.x0..rect.x1 {
                if let Some((_, cx, cy)) = self.index(x, y) {
                    self.buf[(cx, cy)].set_symbol(PLACEHOLDER_FILL).set_fg(fg);
                }
            }
        }
    }
}

struct BoxGlyphs {
    horizontal: &'static str,
    vertical: &'static str,
    top_left: &'static str,
    top_right: &'static str,
    bottom_left: &'static str,
    bottom_right: &'static str,
}

const LIGHT: BoxGlyphs = BoxGlyphs {
    horizontal: "─",
    vertical: "│",
    top_left: "┌",
    top_right: "┐",
    bottom_left: "└",
    bottom_right: "┘",
};

const HEAVY: BoxGlyphs = BoxGlyphs {
    horizontal: "━",
    vertical: "┃",
    top_left: "┏",
    top_right: "┓",
    bottom_left: "┗",
    bottom_right: "┛",
};

/// Clear `buf` and draw `commands` into it.
pub fn rasterize(
    commands: &[RenderCommand<'_>],
    buf: &mut Buffer,
    images: &mut ImageCache,
    palette: &Palette,
    truecolor: bool,
) {
    Rasterizer::new(buf, *palette, truecolor).draw(commands, images);
}
