// src/photos.rs
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use image::{DynamicImage, RgbaImage};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Longest edge kept after decoding; larger photos are downscaled.
pub const MAX_PHOTO_EDGE: u32 = 1024;

/// Decoded pixels, shared with the renderer without copying.
#[derive(Clone)]
pub struct ImageHandle(Arc<RgbaImage>);

impl ImageHandle {
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn pixels(&self) -> &[u8] {
        self.0.as_raw()
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageHandle({}x{})", self.width(), self.height())
    }
}

#[derive(Debug, Clone)]
pub struct PhotoItem {
    pub id: String,
    pub image: ImageHandle,
    /// Width over height, always positive.
    pub aspect_ratio: f32,
}

impl PhotoItem {
    pub fn from_image(image: DynamicImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::EmptyImage);
        }
        let image = if image.width().max(image.height()) > MAX_PHOTO_EDGE {
            image.thumbnail(MAX_PHOTO_EDGE, MAX_PHOTO_EDGE)
        } else {
            image
        };
        let rgba = image.to_rgba8();
        let aspect_ratio = rgba.width() as f32 / rgba.height() as f32;

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            image: ImageHandle(Arc::new(rgba)),
            aspect_ratio,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_image(image::load_from_memory(bytes)?)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_image(image::open(path.as_ref())?)
    }
}

/// The user's photos. The layout is rebuilt from scratch whenever
/// `generation` changes.
#[derive(Debug, Default)]
pub struct PhotoCollection {
    items: Vec<PhotoItem>,
    generation: u64,
}

impl PhotoCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends photos, returning how many were added.
    pub fn add(&mut self, photos: impl IntoIterator<Item = PhotoItem>) -> usize {
        let before = self.items.len();
        self.items.extend(photos);
        let added = self.items.len() - before;
        if added > 0 {
            self.generation += 1;
        }
        added
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|p| p.id != id);
        let removed = self.items.len() != before;
        if removed {
            self.generation += 1;
        }
        removed
    }

    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.items.clear();
            self.generation += 1;
        }
    }

    pub fn items(&self) -> &[PhotoItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&PhotoItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of decoding one batch of files.
#[derive(Debug, Default)]
pub struct PhotoBatch {
    pub loaded: Vec<PhotoItem>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Decodes photo files off the UI thread.
pub struct PhotoLoader {
    tx: Sender<PhotoBatch>,
    rx: Receiver<PhotoBatch>,
    pending: usize,
}

impl PhotoLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx, pending: 0 }
    }

    pub fn load(&mut self, paths: Vec<PathBuf>) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let tx = self.tx.clone();
        thread::Builder::new()
            .name("photo-decode".to_string())
            .spawn(move || {
                let _ = tx.send(decode_all(&paths));
            })?;
        self.pending += 1;
        Ok(())
    }

    /// Finished batches since the last call.
    pub fn poll(&mut self) -> Vec<PhotoBatch> {
        let batches: Vec<PhotoBatch> = self.rx.try_iter().collect();
        self.pending = self.pending.saturating_sub(batches.len());
        batches
    }

    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }
}

impl Default for PhotoLoader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn decode_all(paths: &[PathBuf]) -> PhotoBatch {
    let mut batch = PhotoBatch::default();
    for path in paths {
        match PhotoItem::open(path) {
            Ok(photo) => {
                info!(path = %path.display(), aspect = photo.aspect_ratio, "photo decoded");
                batch.loaded.push(photo);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping photo");
                batch.failed.push((path.clone(), e.to_string()));
            }
        }
    }
    batch
}
