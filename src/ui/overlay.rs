use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Widget};

use crate::layout::{BoundingBox, Vector2};

use super::raster::CellRect;

const PANEL_WIDTH: u16 = 30;

/// Figures shown by the debug panel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DebugInfo {
    pub elements: usize,
    pub commands: usize,
    pub char_budget: usize,
    pub font_size: u16,
    pub scroll_offset: f32,
    pub frame_ms: f64,
    pub hovered: Option<BoundingBox>,
    pub pointer: Option<Vector2>,
    pub pointer_down: bool,
}

impl DebugInfo {
    fn lines(&self) -> Vec<Line<'static>> {
        let label = Style::default().fg(Color::Indexed(245));
        let row = |name: &'static str, value: String| {
            Line::from(vec![
                Span::styled(format!("{name:<10}"), label),
                Span::styled(value, Style::default().add_modifier(Modifier::BOLD)),
            ])
        };
        vec![
            row("elements", self.elements.to_string()),
            row("commands", self.commands.to_string()),
            row("budget", self.char_budget.to_string()),
            row("font", self.font_size.to_string()),
            row("scroll", format!("{:.1}", self.scroll_offset)),
            row("frame", format!("{:.2} ms", self.frame_ms)),
            row("pointer", self.pointer_label()),
        ]
    }

    fn pointer_label(&self) -> String {
        match self.pointer {
            Some(p) if self.pointer_down => format!("{:.0},{:.0} down", p.x, p.y),
            Some(p) => format!("{:.0},{:.0}", p.x, p.y),
            None => "-".to_string(),
        }
    }
}

/// Draw the debug panel in the top-right corner and outline the hovered
/// element.
pub fn render_debug_overlay(info: &DebugInfo, buf: &mut Buffer) {
    let area = buf.area;

    if let Some(bounds) = info.hovered {
        let rect = CellRect::from_bounds(&bounds).intersect(CellRect::from_area(area));
        if let (false, Ok(x), Ok(y)) = (rect.is_empty(), u16::try_from(rect.x0), u16::try_from(rect.y0)) {
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Magenta))
                .render(Rect::new(x, y, rect.width(), rect.height()), buf);
        }
    }

    let lines = info.lines();
    let height = u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_add(2);
    let width = PANEL_WIDTH.min(area.width);
    let panel = Rect::new(
        area.right().saturating_sub(width),
        area.y,
        width,
        height.min(area.height),
    );
    let block = Block::default()
        .title("Debug")
        .borders(Borders::ALL)
        .padding(Padding::horizontal(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));
    Clear.render(panel, buf);
    Paragraph::new(lines).block(block).render(panel, buf);
}
