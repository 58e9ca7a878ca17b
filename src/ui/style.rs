//! Theming and color definitions.
//!
//! Text styles are keyed by a small set of semantic roles and rebuilt whenever
//! the base font size changes. Colors are stored as RGBA and converted to
//! ratatui colors at raster time.

use ratatui::style::{Color, Modifier, Style};

/// Default base font size, in points.
pub const BASE_FONT_SIZE: u16 = 22;
/// Font size change per keypress.
pub const FONT_STEP: u16 = 2;
pub const MIN_FONT_SIZE: u16 = 8;
pub const MAX_FONT_SIZE: u16 = 72;

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Composite `self` over an opaque `under` color.
    pub fn over(self, under: Self) -> Self {
        let alpha = u16::from(self.a);
        let mix = |top: u8, bottom: u8| {
            ((u16::from(top) * alpha + u16::from(bottom) * (255 - alpha) + 127) / 255) as u8
        };
        Self::opaque(mix(self.r, under.r), mix(self.g, under.g), mix(self.b, under.b))
    }

    /// Perceived brightness, 0-255.
    pub fn luma(self) -> f32 {
        (0.2126 * f32::from(self.r)) + (0.7152 * f32::from(self.g)) + (0.0722 * f32::from(self.b))
    }
}

/// Light or dark color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

/// Named colors used by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgba,
    pub foreground: Rgba,
    /// Code block fill
    pub dim: Rgba,
    /// Quote border
    pub pink: Rgba,
    /// Ordered list markers, rules, inline code
    pub blue: Rgba,
    pub orange: Rgba,
    pub border: Rgba,
    pub dark: Rgba,
    /// Code block fill while hovered
    pub hover: Rgba,
    pub highlight: Rgba,
}

impl Palette {
    pub const DARK: Self = Self {
        background: Rgba::opaque(28, 28, 30),
        foreground: Rgba::opaque(230, 230, 230),
        dim: Rgba::new(90, 90, 90, 190),
        pink: Rgba::opaque(235, 120, 175),
        blue: Rgba::new(120, 180, 190, 200),
        orange: Rgba::opaque(230, 140, 50),
        border: Rgba::opaque(60, 60, 60),
        dark: Rgba::opaque(20, 20, 20),
        hover: Rgba::opaque(45, 45, 45),
        highlight: Rgba::opaque(48, 60, 75),
    };

    pub const LIGHT: Self = Self {
        background: Rgba::opaque(250, 250, 250),
        foreground: Rgba::opaque(33, 37, 41),
        dim: Rgba::new(180, 180, 180, 180),
        pink: Rgba::opaque(203, 63, 140),
        blue: Rgba::opaque(38, 139, 210),
        orange: Rgba::opaque(230, 140, 50),
        border: Rgba::opaque(210, 210, 210),
        dark: Rgba::opaque(238, 238, 238),
        hover: Rgba::opaque(230, 230, 230),
        highlight: Rgba::opaque(218, 232, 252),
    };

    pub const fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self::LIGHT,
            Theme::Dark => Self::DARK,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::DARK
    }
}

/// Typeface weight/slant of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontId {
    Regular,
    Italic,
    SemiBold,
    Bold,
    ExtraBold,
}

/// Visual style of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextStyle {
    pub font: FontId,
    pub font_size: u16,
    pub color: Rgba,
    pub underline: bool,
    pub strikethrough: bool,
}

impl TextStyle {
    pub const fn new(font: FontId, font_size: u16, color: Rgba) -> Self {
        Self {
            font,
            font_size,
            color,
            underline: false,
            strikethrough: false,
        }
    }

    /// Convert to a ratatui style over the given cell background.
    pub fn to_ratatui(self, background: Rgba, truecolor: bool) -> Style {
        let mut modifiers = match self.font {
            FontId::Regular => Modifier::empty(),
            FontId::Italic => Modifier::ITALIC,
            FontId::SemiBold | FontId::Bold => Modifier::BOLD,
            FontId::ExtraBold => Modifier::BOLD | Modifier::UNDERLINED,
        };
        if self.underline {
            modifiers |= Modifier::UNDERLINED;
        }
        if self.strikethrough {
            modifiers |= Modifier::CROSSED_OUT;
        }
        Style::default()
            .fg(terminal_color(self.color.over(background), truecolor))
            .add_modifier(modifiers)
    }
}

/// Semantic text roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleRole {
    Body,
    Italic,
    Bold,
    H1,
    H2,
    H3,
    H4,
    H5,
    InlineCode,
    Link,
    Strikethrough,
}

/// Text styles for every role at the current base font size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTable {
    base_font_size: u16,
    body: TextStyle,
    italic: TextStyle,
    bold: TextStyle,
    h1: TextStyle,
    h2: TextStyle,
    h3: TextStyle,
    h4: TextStyle,
    h5: TextStyle,
    inline_code: TextStyle,
    link: TextStyle,
    strikethrough: TextStyle,
}

impl StyleTable {
    pub fn new(base_font_size: u16, palette: &Palette) -> Self {
        let base = base_font_size;
        let fg = palette.foreground;
        Self {
            base_font_size,
            body: TextStyle::new(FontId::Regular, base, fg),
            italic: TextStyle::new(FontId::Italic, base, fg),
            bold: TextStyle::new(FontId::Bold, base, fg),
            h1: TextStyle::new(FontId::ExtraBold, base + 14, fg),
            h2: TextStyle::new(FontId::ExtraBold, base + 12, fg),
            h3: TextStyle::new(FontId::ExtraBold, base + 6, fg),
            h4: TextStyle::new(FontId::Bold, base + 4, fg),
            h5: TextStyle::new(FontId::Italic, base + 2, fg),
            inline_code: TextStyle::new(FontId::Regular, base, palette.blue),
            link: TextStyle {
                underline: true,
                ..TextStyle::new(FontId::Regular, base, palette.blue)
            },
            strikethrough: TextStyle {
                strikethrough: true,
                ..TextStyle::new(FontId::Regular, base, fg)
            },
        }
    }

    pub const fn base_font_size(&self) -> u16 {
        self.base_font_size
    }

    pub const fn get(&self, role: StyleRole) -> TextStyle {
        match role {
            StyleRole::Body => self.body,
            StyleRole::Italic => self.italic,
            StyleRole::Bold => self.bold,
            StyleRole::H1 => self.h1,
            StyleRole::H2 => self.h2,
            StyleRole::H3 => self.h3,
            StyleRole::H4 => self.h4,
            StyleRole::H5 => self.h5,
            StyleRole::InlineCode => self.inline_code,
            StyleRole::Link => self.link,
            StyleRole::Strikethrough => self.strikethrough,
        }
    }

    /// Style for a heading level; levels past 5 share the H5 style.
    pub const fn heading(&self, level: u8) -> TextStyle {
        match level {
            0 | 1 => self.h1,
            2 => self.h2,
            3 => self.h3,
            4 => self.h4,
            _ => self.h5,
        }
    }
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::new(BASE_FONT_SIZE, &Palette::default())
    }
}

/// Pick the background theme for a terminal background color.
pub fn theme_from_rgb(r: u8, g: u8, b: u8) -> Theme {
    if Rgba::opaque(r, g, b).luma() >= 140.0 {
        Theme::Light
    } else {
        Theme::Dark
    }
}

/// Convert an opaque color for the current terminal.
pub fn terminal_color(color: Rgba, truecolor: bool) -> Color {
    if truecolor {
        Color::Rgb(color.r, color.g, color.b)
    } else {
        Color::Indexed(rgb_to_xterm_256(color.r, color.g, color.b))
    }
}

/// Whether terminal output should be treated as truecolor-capable.
pub fn supports_truecolor() -> bool {
    if let Ok(force) = std::env::var("MDVIS_TRUECOLOR") {
        let value = force.to_ascii_lowercase();
        return matches!(value.as_str(), "1" | "true" | "yes" | "on");
    }
    if std::env::var("TERM_PROGRAM")
        .ok()
        .as_deref()
        .is_some_and(|v| v == "Apple_Terminal")
    {
        return false;
    }
    supports_truecolor_from_env(
        std::env::var("COLORTERM").ok().as_deref(),
        std::env::var("TERM").ok().as_deref(),
    )
}

fn supports_truecolor_from_env(colorterm: Option<&str>, term: Option<&str>) -> bool {
    if let Some(ct) = colorterm {
        let lower = ct.to_ascii_lowercase();
        if lower.contains("truecolor") || lower.contains("24bit") {
            return true;
        }
    }
    if let Some(t) = term {
        let lower = t.to_ascii_lowercase();
        if lower.contains("direct") || lower.contains("truecolor") {
            return true;
        }
    }
    false
}

/// Parse a terminal's reply to an OSC 11 background color query.
///
/// Expects `ESC ] 11 ; rgb:RRRR/GGGG/BBBB` terminated by BEL or ST; two-digit
/// components are accepted too.
pub fn parse_osc11_reply(reply: &str) -> Option<(u8, u8, u8)> {
    let start = reply.find("rgb:")?;
    let mut parts = reply[start + 4..].split(['/', '\x07', '\x1b']);
    let r = osc_component(parts.next()?)?;
    let g = osc_component(parts.next()?)?;
    let b = osc_component(parts.next()?)?;
    Some((r, g, b))
}

fn osc_component(raw: &str) -> Option<u8> {
    let hex = raw.trim();
    match hex.len() {
        4.. => hex
            .get(..4)
            .and_then(|h| u16::from_str_radix(h, 16).ok())
            .map(|v| (v >> 8) as u8),
        2 => u8::from_str_radix(hex, 16).ok(),
        _ => None,
    }
}

pub fn rgb_to_xterm_256(r: u8, g: u8, b: u8) -> u8 {
    // Result is always 0-5, fits in u8
    let to_cube = |v: u8| ((u16::from(v) * 5) / 255) as u8;
    let ri = to_cube(r);
    let gi = to_cube(g);
    let bi = to_cube(b);
    16 + (36 * ri) + (6 * gi) + bi
}
