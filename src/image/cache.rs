//! Images referenced by the document, loaded on first use.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};
use ratatui_image::picker::{Picker, ProtocolType};
use ratatui_image::protocol::StatefulProtocol;
use thiserror::Error;

use super::quantize_to_ansi256;

/// Maximum number of distinct image sources per document.
pub const DEFAULT_IMAGE_CAPACITY: usize = 256;

/// Cell size assumed when no terminal picker is available.
const DEFAULT_CELL_PX: (u16, u16) = (8, 16);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageCacheError {
    #[error("image cache is full ({capacity} entries)")]
    CapacityExceeded { capacity: usize },
}

/// Index of an entry in an [`ImageCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageHandle(usize);

impl ImageHandle {
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
    Loaded { width_px: u32, height_px: u32 },
    Failed,
}

pub struct ImageEntry {
    pub src: String,
    pub state: ImageState,
    protocol: Option<StatefulProtocol>,
}

impl ImageEntry {
    pub const fn is_loaded(&self) -> bool {
        matches!(self.state, ImageState::Loaded { .. })
    }
}

impl fmt::Debug for ImageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageEntry")
            .field("src", &self.src)
            .field("state", &self.state)
            .field("protocol", &self.protocol.is_some())
            .finish()
    }
}

/// Deduplicated, capacity-bounded image store.
///
/// Entries are keyed by the source string exactly as written in the document
/// and are kept for the lifetime of the cache, including failed loads.
pub struct ImageCache {
    base_dir: PathBuf,
    picker: Option<Picker>,
    truecolor: bool,
    entries: Vec<ImageEntry>,
    by_src: HashMap<String, ImageHandle>,
    capacity: usize,
}

impl ImageCache {
    /// Create a cache resolving relative sources against `base_dir`.
    ///
    /// Without a picker images are still decoded for their dimensions but
    /// drawn as placeholders.
    pub fn new(base_dir: impl Into<PathBuf>, picker: Option<Picker>) -> Self {
        Self::with_capacity(base_dir, picker, DEFAULT_IMAGE_CAPACITY)
    }

    pub fn with_capacity(
        base_dir: impl Into<PathBuf>,
        picker: Option<Picker>,
        capacity: usize,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            picker,
            truecolor: crate::ui::style::supports_truecolor(),
            entries: Vec::new(),
            by_src: HashMap::new(),
            capacity,
        }
    }

    /// Look up `src`, loading it on first encounter.
    ///
    /// # Errors
    ///
    /// Returns [`ImageCacheError::CapacityExceeded`] when `src` is new and the
    /// cache already holds `capacity` entries.
    pub fn resolve(&mut self, src: &str) -> Result<ImageHandle, ImageCacheError> {
        if let Some(&handle) = self.by_src.get(src) {
            return Ok(handle);
        }
        if self.entries.len() >= self.capacity {
            return Err(ImageCacheError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let path = self.resolve_path(src);
        let entry = match image::open(&path) {
            Ok(image) => {
                let (width_px, height_px) = image.dimensions();
                tracing::debug!(src, width_px, height_px, "image loaded");
                ImageEntry {
                    src: src.to_string(),
                    state: ImageState::Loaded {
                        width_px,
                        height_px,
                    },
                    protocol: self.protocol_for(image),
                }
            }
            Err(err) => {
                tracing::warn!(src, path = %path.display(), %err, "image failed to load");
                ImageEntry {
                    src: src.to_string(),
                    state: ImageState::Failed,
                    protocol: None,
                }
            }
        };

        let handle = ImageHandle(self.entries.len());
        self.entries.push(entry);
        self.by_src.insert(src.to_string(), handle);
        Ok(handle)
    }

    pub fn get(&self, handle: ImageHandle) -> Option<&ImageEntry> {
        self.entries.get(handle.0)
    }

    pub fn protocol_mut(&mut self, handle: ImageHandle) -> Option<&mut StatefulProtocol> {
        self.entries
            .get_mut(handle.0)
            .and_then(|entry| entry.protocol.as_mut())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pixel size of one terminal cell.
    pub fn font_size(&self) -> (u16, u16) {
        self.picker
            .as_ref()
            .map_or(DEFAULT_CELL_PX, |picker| {
                let (w, h) = picker.font_size();
                (w.max(1), h.max(1))
            })
    }

    fn resolve_path(&self, src: &str) -> PathBuf {
        let path = Path::new(src);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn protocol_for(&self, image: DynamicImage) -> Option<StatefulProtocol> {
        let picker = self.picker.as_ref()?;
        let halfblocks = matches!(picker.protocol_type(), ProtocolType::Halfblocks);
        let image = if halfblocks && !self.truecolor {
            quantize_to_ansi256(&image)
        } else {
            image
        };
        Some(picker.new_resize_protocol(image))
    }
}

impl fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageCache")
            .field("base_dir", &self.base_dir)
            .field("entries", &self.entries)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, Rgb([0, 0, 255]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_loads_relative_to_base_dir() {
        let dir = tempdir().unwrap();
        write_png(dir.path(), "pic.png", 40, 20);
        let mut cache = ImageCache::new(dir.path(), None);
        let handle = cache.resolve("pic.png").unwrap();
        let entry = cache.get(handle).unwrap();
        assert_eq!(
            entry.state,
            ImageState::Loaded {
                width_px: 40,
                height_px: 20
            }
        );
        assert!(cache.protocol_mut(handle).is_none());
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let dir = tempdir().unwrap();
        write_png(dir.path(), "abs.png", 4, 4);
        let absolute = dir.path().join("abs.png");
        let mut cache = ImageCache::new("/nonexistent", None);
        let handle = cache.resolve(&absolute.to_string_lossy()).unwrap();
        assert!(cache.get(handle).unwrap().is_loaded());
    }

    #[test]
    fn test_missing_image_is_recorded_as_failed() {
        let dir = tempdir().unwrap();
        let mut cache = ImageCache::new(dir.path(), None);
        let handle = cache.resolve("missing.png").unwrap();
        assert_eq!(cache.get(handle).unwrap().state, ImageState::Failed);
    }

    #[test]
    fn test_sources_are_deduplicated() {
        let dir = tempdir().unwrap();
        let mut cache = ImageCache::new(dir.path(), None);
        let first = cache.resolve("a.png").unwrap();
        let second = cache.resolve("a.png").unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let dir = tempdir().unwrap();
        let mut cache = ImageCache::with_capacity(dir.path(), None, 2);
        cache.resolve("a.png").unwrap();
        cache.resolve("b.png").unwrap();
        assert_eq!(
            cache.resolve("c.png"),
            Err(ImageCacheError::CapacityExceeded { capacity: 2 })
        );
        // Known sources still resolve when full.
        assert!(cache.resolve("a.png").is_ok());
    }

    #[test]
    fn test_halfblock_picker_builds_protocol() {
        let dir = tempdir().unwrap();
        write_png(dir.path(), "pic.png", 16, 16);
        let mut cache = ImageCache::new(dir.path(), Some(Picker::halfblocks()));
        let handle = cache.resolve("pic.png").unwrap();
        assert!(cache.protocol_mut(handle).is_some());
        let (w, h) = cache.font_size();
        assert!(w > 0 && h > 0);
    }
}
