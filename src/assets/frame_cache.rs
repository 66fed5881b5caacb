use std::sync::Arc;

use crate::assets::decode::PreparedImage;

/// Memo of the most recently decoded frame overlay.
///
/// Holds at most one entry, keyed by frame URL and the raster side it was
/// decoded for (SVG frames depend on it). Storing a new key replaces the entry.
#[derive(Debug, Default)]
pub struct FrameCache {
    entry: Option<CachedFrame>,
    hits: u64,
    decodes: u64,
}

#[derive(Debug)]
struct CachedFrame {
    url: String,
    side_px: u32,
    image: Arc<PreparedImage>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, url: &str, side_px: u32) -> Option<Arc<PreparedImage>> {
        let entry = self.entry.as_ref()?;
        if entry.url != url || entry.side_px != side_px {
            return None;
        }
        self.hits += 1;
        Some(entry.image.clone())
    }

    pub fn store(&mut self, url: &str, side_px: u32, image: Arc<PreparedImage>) {
        if let Some(old) = &self.entry
            && old.url != url
        {
            tracing::debug!(old = %old.url, new = %url, "frame cache entry replaced");
        }
        self.decodes += 1;
        self.entry = Some(CachedFrame {
            url: url.to_string(),
            side_px,
            image,
        });
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn cached_url(&self) -> Option<&str> {
        self.entry.as_ref().map(|e| e.url.as_str())
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn decodes(&self) -> u64 {
        self.decodes
    }
}
