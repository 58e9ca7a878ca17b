use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::widgets::StatefulWidget;
use ratatui_image::protocol::{StatefulProtocol, StatefulProtocolType};
use ratatui_image::{Resize, StatefulImage};

use super::raster::CellRect;
use super::style::rgb_to_xterm_256;

/// Draw an image whose full extent is `rect`, showing only the part inside
/// `clip`.
///
/// Returns `false` when the protocol cannot show a partial image; the caller
/// draws a placeholder instead.
pub(super) fn draw_image(
    buf: &mut Buffer,
    protocol: &mut StatefulProtocol,
    rect: CellRect,
    clip: CellRect,
    truecolor: bool,
) -> bool {
    let (width, height) = (rect.width(), rect.height());
    if width == 0 || height == 0 {
        return true;
    }

    let halfblocks = matches!(protocol.protocol_type(), StatefulProtocolType::Halfblocks(_));

    if matches!(protocol.protocol_type(), StatefulProtocolType::ITerm2(_)) {
        // iTerm2 stores the payload in a single anchor cell, so row slices of a
        // rendered image are meaningless.
        if clip != rect {
            return false;
        }
        let (Ok(x), Ok(y)) = (u16::try_from(rect.x0), u16::try_from(rect.y0)) else {
            return false;
        };
        StatefulImage::default()
            .resize(Resize::Scale(None))
            .render(Rect::new(x, y, width, height), buf, protocol);
        return true;
    }

    // Render at full size into a scratch buffer, then copy the visible cells.
    let temp_area = Rect::new(0, 0, width, height);
    let mut temp = Buffer::empty(temp_area);
    let resize = if halfblocks {
        // Nearest-neighbor causes strong color aliasing in half-cell mode.
        Resize::Scale(Some(image::imageops::FilterType::CatmullRom))
    } else {
        Resize::Scale(None)
    };
    StatefulImage::default()
        .resize(resize)
        .render(temp_area, &mut temp, protocol);

    if halfblocks && !truecolor {
        for cell in &mut temp.content {
            if let Color::Rgb(r, g, b) = cell.fg {
                cell.fg = Color::Indexed(rgb_to_xterm_256(r, g, b));
            }
            if let Color::Rgb(r, g, b) = cell.bg {
                cell.bg = Color::Indexed(rgb_to_xterm_256(r, g, b));
            }
        }
    }

    for y in clip.y0..clip.y1 {
        for x in clip.x0..clip.x1 {
            let (Ok(src_x), Ok(src_y)) = (u16::try_from(x - rect.x0), u16::try_from(y - rect.y0))
            else {
                continue;
            };
            let (Ok(dst_x), Ok(dst_y)) = (u16::try_from(x), u16::try_from(y)) else {
                continue;
            };
            if src_x >= width || src_y >= height || !buf.area.contains((dst_x, dst_y).into()) {
                continue;
            }
            buf[(dst_x, dst_y)] = temp[(src_x, src_y)].clone();
        }
    }
    true
}
