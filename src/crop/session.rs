use crate::{
    assets::{
        decode::decode_image,
        encode::{EncodedImage, encode_jpeg},
        source::SourceImage,
    },
    crop::debounce::Debouncer,
    foundation::core::{Affine, CropOffset, CropRect, Zoom},
    foundation::error::{PipelineError, PipelineResult},
    foundation::settings::PipelineSettings,
    render::raster::{Surface, draw_image, image_paint},
};

/// One interactive adjustment of the crop viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropChange {
    pub offset: CropOffset,
    pub zoom: f64,
    /// Pixel rectangle implied by `offset`/`zoom` against the source's native size.
    pub rect: CropRect,
}

/// What happened to a [`CropChange`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeDisposition {
    /// A commit of this rect is scheduled for the end of the quiet window.
    Scheduled,
    /// Equal to the last committed rect; nothing scheduled, pending timer untouched.
    Duplicate,
}

/// A committed crop: the rect and its 1:1 JPEG raster.
#[derive(Clone, Debug, PartialEq)]
pub struct CroppedImage {
    pub rect: CropRect,
    pub image: EncodedImage,
}

/// Decoded source, ready to be sampled.
#[derive(Clone)]
struct SourceRaster {
    width: u32,
    height: u32,
    paint: vello_cpu::Image,
}

/// Turns a stream of crop adjustments into debounced, deduplicated raster commits.
pub struct CropSession {
    source: SourceImage,
    raster: Option<SourceRaster>,
    offset: CropOffset,
    zoom: Zoom,
    jpeg_quality: u8,
    debouncer: Debouncer<CropRect>,
    last_committed: Option<CropRect>,
    commits: u64,
}

impl CropSession {
    /// Must be called from within a tokio runtime.
    pub fn new(source: SourceImage, settings: &PipelineSettings) -> Self {
        Self {
            source,
            raster: None,
            offset: CropOffset::ZERO,
            zoom: Zoom::default(),
            jpeg_quality: settings.crop_jpeg_quality,
            debouncer: Debouncer::new(settings.debounce_window()),
            last_committed: None,
            commits: 0,
        }
    }

    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    pub fn offset(&self) -> CropOffset {
        self.offset
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn last_committed(&self) -> Option<CropRect> {
        self.last_committed
    }

    /// Number of successful rasterizations so far.
    pub fn commit_count(&self) -> u64 {
        self.commits
    }

    pub fn has_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Native size of the source, once it has been decoded.
    pub fn source_size(&self) -> Option<(u32, u32)> {
        self.raster.as_ref().map(|r| (r.width, r.height))
    }

    pub fn on_crop_change(&mut self, change: CropChange) -> ChangeDisposition {
        self.offset = change.offset;
        self.zoom = Zoom::new(change.zoom);

        if self.last_committed == Some(change.rect) {
            tracing::trace!(rect = ?change.rect, "crop change equals last commit; discarded");
            return ChangeDisposition::Duplicate;
        }
        self.debouncer.schedule(change.rect);
        ChangeDisposition::Scheduled
    }

    /// Back to the initial viewport. The last committed rect stays valid.
    pub fn reset(&mut self) {
        self.offset = CropOffset::ZERO;
        self.zoom = Zoom::default();
    }

    /// Wait for the next settled rect and rasterize it.
    ///
    /// Returns `None` when no commit is pending. A failed commit leaves the
    /// previous committed rect in place.
    pub async fn next_commit(&mut self) -> Option<PipelineResult<CroppedImage>> {
        loop {
            let rect = self.debouncer.settled().await?;
            if self.last_committed == Some(rect) {
                continue;
            }
            return Some(self.rasterize(rect).await);
        }
    }

    /// Commit `rect` right away, superseding any pending timer and any rect that
    /// settled but was not committed yet.
    ///
    /// Returns `Ok(None)` when `rect` equals the last committed rect.
    pub async fn commit_now(&mut self, rect: CropRect) -> PipelineResult<Option<CroppedImage>> {
        self.debouncer.clear();
        if self.last_committed == Some(rect) {
            return Ok(None);
        }
        self.rasterize(rect).await.map(Some)
    }

    #[tracing::instrument(skip(self), fields(source = %self.source.name()))]
    async fn rasterize(&mut self, rect: CropRect) -> PipelineResult<CroppedImage> {
        rect.validate()?;
        let raster = self.source_raster().await?;
        if !rect.fits_within(raster.width, raster.height) {
            tracing::debug!(
                width = raster.width,
                height = raster.height,
                "crop rect extends past the source; uncovered area renders black"
            );
        }

        let quality = self.jpeg_quality;
        let image = tokio::task::spawn_blocking(move || rasterize_crop(&raster.paint, rect, quality))
            .await
            .map_err(|e| PipelineError::Other(anyhow::Error::new(e)))??;

        self.last_committed = Some(rect);
        self.commits += 1;
        tracing::debug!(
            width = image.width,
            height = image.height,
            bytes = image.bytes.len(),
            "crop committed"
        );
        Ok(CroppedImage { rect, image })
    }

    async fn source_raster(&mut self) -> PipelineResult<SourceRaster> {
        if let Some(raster) = &self.raster {
            return Ok(raster.clone());
        }

        let bytes = self.source.bytes().clone();
        let raster = tokio::task::spawn_blocking(move || -> PipelineResult<SourceRaster> {
            let decoded = decode_image(&bytes)?;
            Ok(SourceRaster {
                width: decoded.width,
                height: decoded.height,
                paint: image_paint(&decoded)?,
            })
        })
        .await
        .map_err(|e| PipelineError::Other(anyhow::Error::new(e)))??;

        self.raster = Some(raster.clone());
        Ok(raster)
    }
}

/// Draw `rect` of `source` into a canvas of the rect's size at 1:1 and encode it.
fn rasterize_crop(
    source: &vello_cpu::Image,
    rect: CropRect,
    quality: u8,
) -> PipelineResult<EncodedImage> {
    let (w, h) = rect.pixel_size();
    let mut surface = Surface::new(w, h)?;
    surface.draw(|ctx| draw_image(ctx, source, Affine::translate((-rect.x, -rect.y))))?;
    encode_jpeg(surface.premul_rgba8(), w, h, quality)
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, time::Duration};

    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                image::Rgba([220, 30, 30, 255])
            } else {
                image::Rgba([30, 30, 220, 255])
            }
        });
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn session(width: u32, height: u32) -> CropSession {
        let source = SourceImage::new("photo.png", png_bytes(width, height), usize::MAX).unwrap();
        CropSession::new(source, &PipelineSettings::default())
    }

    fn change(rect: CropRect) -> CropChange {
        CropChange {
            offset: CropOffset::new(3.0, -4.0),
            zoom: 1.5,
            rect,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn committed_bitmap_has_rect_dimensions() {
        let mut s = session(800, 600);
        let rect = CropRect::new(100.0, 50.0, 300.0, 300.0);
        assert_eq!(s.on_crop_change(change(rect)), ChangeDisposition::Scheduled);

        let committed = s.next_commit().await.unwrap().unwrap();
        assert_eq!(committed.rect, rect);
        assert_eq!((committed.image.width, committed.image.height), (300, 300));

        let decoded = image::load_from_memory(&committed.image.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (300, 300));
        assert_eq!(s.source_size(), Some((800, 600)));
    }

    #[tokio::test(start_paused = true)]
    async fn same_rect_twice_rasterizes_once() {
        let mut s = session(64, 64);
        let rect = CropRect::new(0.0, 0.0, 32.0, 32.0);

        s.on_crop_change(change(rect));
        s.next_commit().await.unwrap().unwrap();
        assert_eq!(s.on_crop_change(change(rect)), ChangeDisposition::Duplicate);
        assert!(s.next_commit().await.is_none());
        assert_eq!(s.commit_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn settled_duplicates_are_not_rasterized_again() {
        let mut s = session(64, 64);
        let rect = CropRect::new(0.0, 0.0, 32.0, 32.0);

        // Both settle before either is committed.
        s.on_crop_change(change(rect));
        tokio::time::sleep(Duration::from_millis(350)).await;
        s.on_crop_change(change(rect));
        tokio::time::sleep(Duration::from_millis(350)).await;

        s.next_commit().await.unwrap().unwrap();
        assert!(s.next_commit().await.is_none());
        assert_eq!(s.commit_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_commits_only_the_last_rect() {
        let mut s = session(200, 200);
        for i in 0..8 {
            let rect = CropRect::new(f64::from(i), 0.0, 100.0, 100.0);
            s.on_crop_change(change(rect));
            tokio::time::sleep(Duration::from_millis(30)).await;
        }

        let committed = s.next_commit().await.unwrap().unwrap();
        assert_eq!(committed.rect, CropRect::new(7.0, 0.0, 100.0, 100.0));
        assert!(s.next_commit().await.is_none());
        assert_eq!(s.commit_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn commit_samples_the_requested_region() {
        let mut s = session(100, 50);
        // Right half of the source is blue.
        let committed = s
            .commit_now(CropRect::new(60.0, 0.0, 40.0, 40.0))
            .await
            .unwrap()
            .unwrap();
        let img = image::load_from_memory(&committed.image.bytes)
            .unwrap()
            .to_rgb8();
        let px = img.get_pixel(20, 20).0;
        assert!(px[2] > 180 && px[0] < 80, "expected blue, got {px:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn commit_now_cancels_pending_and_dedups() {
        let mut s = session(64, 64);
        let a = CropRect::new(0.0, 0.0, 16.0, 16.0);
        let b = CropRect::new(8.0, 8.0, 16.0, 16.0);

        s.on_crop_change(change(a));
        assert!(s.commit_now(b).await.unwrap().is_some());
        assert!(!s.has_pending());
        assert!(s.commit_now(b).await.unwrap().is_none());
        assert!(s.next_commit().await.is_none());
        assert_eq!(s.last_committed(), Some(b));
    }

    #[tokio::test(start_paused = true)]
    async fn commit_now_supersedes_settled_rect() {
        let mut s = session(64, 64);
        let a = CropRect::new(0.0, 0.0, 16.0, 16.0);
        let b = CropRect::new(8.0, 8.0, 16.0, 16.0);

        s.on_crop_change(change(a));
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(s.commit_now(b).await.unwrap().is_some());

        assert!(s.next_commit().await.is_none());
        assert_eq!(s.last_committed(), Some(b));
        assert_eq!(s.commit_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn decode_failure_keeps_previous_state() {
        let source = SourceImage::new("broken.png", b"not an image".to_vec(), usize::MAX).unwrap();
        let mut s = CropSession::new(source, &PipelineSettings::default());

        s.on_crop_change(change(CropRect::new(0.0, 0.0, 10.0, 10.0)));
        let err = s.next_commit().await.unwrap().unwrap_err();
        assert!(err.is_decode());
        assert_eq!(s.last_committed(), None);
        assert_eq!(s.commit_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restores_viewport_but_keeps_commit() {
        let mut s = session(64, 64);
        let rect = CropRect::new(0.0, 0.0, 32.0, 32.0);
        s.on_crop_change(CropChange {
            offset: CropOffset::new(12.0, 9.0),
            zoom: 9.0,
            rect,
        });
        assert_eq!(s.zoom().get(), 3.0);
        s.next_commit().await.unwrap().unwrap();

        s.reset();
        assert_eq!(s.offset(), CropOffset::ZERO);
        assert_eq!(s.zoom().get(), 1.0);
        assert_eq!(s.last_committed(), Some(rect));
    }
}
