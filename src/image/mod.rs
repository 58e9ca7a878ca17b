//! Image loading and terminal graphics protocol selection.

mod cache;

pub use cache::{
    DEFAULT_IMAGE_CAPACITY, ImageCache, ImageCacheError, ImageEntry, ImageHandle, ImageState,
};

#[cfg(unix)]
use std::time::Duration;

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use ratatui_image::picker::Picker;
#[cfg(unix)]
use ratatui_image::picker::cap_parser::QueryStdioOptions;

use crate::ui::style::rgb_to_xterm_256;

#[cfg(unix)]
const PICKER_QUERY_TIMEOUT_MS: u64 = 250;

/// Create a picker for terminal image rendering.
///
/// Queries the terminal for its graphics protocol and cell size. Returns
/// `None` when the query fails.
pub fn create_picker(force_half_cell: bool) -> Option<Picker> {
    if force_half_cell {
        tracing::debug!("forcing half-block image protocol");
        return Some(Picker::halfblocks());
    }

    // The stdio query can leave a reader thread stuck on the console input
    // buffer on Windows.
    #[cfg(not(unix))]
    {
        tracing::debug!("using half-block image protocol on this platform");
        return Some(Picker::halfblocks());
    }

    #[cfg(unix)]
    {
        match Picker::from_query_stdio_with_options(query_options()) {
            Ok(picker) => {
                tracing::debug!(
                    term_program = std::env::var("TERM_PROGRAM").unwrap_or_default(),
                    term = std::env::var("TERM").unwrap_or_default(),
                    protocol = ?picker.protocol_type(),
                    font_size = ?picker.font_size(),
                    "terminal graphics detected"
                );
                Some(picker)
            }
            Err(err) => {
                tracing::warn!(%err, "terminal graphics query failed");
                None
            }
        }
    }
}

/// Quantize image RGB channels to the ANSI-256 palette while preserving alpha.
pub fn quantize_to_ansi256(image: &DynamicImage) -> DynamicImage {
    let (width, height) = image.dimensions();
    let mut out = RgbaImage::new(width, height);
    for (x, y, px) in image.to_rgba8().enumerate_pixels() {
        let (r, g, b) = xterm_256_to_rgb(rgb_to_xterm_256(px[0], px[1], px[2]));
        out.put_pixel(x, y, Rgba([r, g, b, px[3]]));
    }
    DynamicImage::ImageRgba8(out)
}

#[cfg(unix)]
fn query_options() -> QueryStdioOptions {
    let mut options = QueryStdioOptions::default();
    options.timeout = Duration::from_millis(PICKER_QUERY_TIMEOUT_MS);
    options
}

/// RGB value of an xterm-256 color cube or grayscale index.
fn xterm_256_to_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        0..=15 => {
            let gray = if index < 8 { 0 } else { 128 };
            (gray, gray, gray)
        }
        16..=231 => {
            let i = index - 16;
            let level = |c: u8| if c == 0 { 0 } else { 55 + c * 40 };
            (level(i / 36), level((i / 6) % 6), level(i % 6))
        }
        232..=255 => {
            let gray = 8 + (index - 232) * 10;
            (gray, gray, gray)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_picker_query_timeout_is_fast() {
        assert_eq!(query_options().timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_forced_half_cell_picker() {
        assert!(create_picker(true).is_some());
    }

    #[test]
    fn test_quantize_to_ansi256_preserves_alpha() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([12, 34, 56, 77])));
        let quantized = quantize_to_ansi256(&image).to_rgba8();
        assert_eq!(quantized.get_pixel(0, 0)[3], 77);
    }

    #[test]
    fn test_cube_round_trip_of_pure_colors() {
        assert_eq!(xterm_256_to_rgb(rgb_to_xterm_256(255, 0, 0)), (255, 0, 0));
        assert_eq!(xterm_256_to_rgb(rgb_to_xterm_256(0, 0, 0)), (0, 0, 0));
    }
}
