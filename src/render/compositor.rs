use std::sync::{Arc, Mutex, MutexGuard};

use vello_cpu::kurbo::Shape as _;

use crate::{
    assets::{
        decode::{PreparedImage, decode_frame, decode_image},
        encode::{EncodedImage, encode_png},
        fetch::{AssetFetcher, HttpFetcher},
        frame_cache::FrameCache,
    },
    crop::session::CroppedImage,
    foundation::core::{Affine, DevicePixelRatio},
    foundation::error::{PipelineError, PipelineResult},
    foundation::settings::PipelineSettings,
    model::FrameAsset,
    render::raster::{Surface, affine_to_cpu, draw_image, image_paint},
    wizard::PipelineState,
};

/// Largest physical canvas side a composite is rendered at (about 256 MiB of RGBA8).
pub const MAX_CANVAS_SIDE: u32 = 8192;

/// Final square, circularly-masked, frame-overlaid image.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeResult {
    /// Lossless PNG of the physical canvas.
    pub image: EncodedImage,
    /// Side length of the logical drawing space.
    pub logical_size: u32,
    pub device_pixel_ratio: f64,
}

impl CompositeResult {
    pub fn side(&self) -> u32 {
        self.image.width
    }

    pub fn data_url(&self) -> String {
        self.image.to_data_url()
    }
}

/// Outcome of [`Compositor::regenerate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegenerateOutcome {
    Accepted,
    /// Inputs changed while compositing; the result was discarded.
    Stale,
}

/// Merges a circular-masked photo layer and a frame overlay into one raster.
pub struct Compositor<F = HttpFetcher> {
    fetcher: F,
    logical_size: u32,
    frame_cache: Mutex<FrameCache>,
}

impl Compositor<HttpFetcher> {
    pub fn new(settings: &PipelineSettings) -> PipelineResult<Self> {
        let fetcher = HttpFetcher::new(settings.fetch_timeout())?;
        Self::with_fetcher(fetcher, settings)
    }
}

impl<F: AssetFetcher> Compositor<F> {
    pub fn with_fetcher(fetcher: F, settings: &PipelineSettings) -> PipelineResult<Self> {
        settings.validate()?;
        Ok(Self {
            fetcher,
            logical_size: settings.logical_canvas_size(),
            frame_cache: Mutex::new(FrameCache::new()),
        })
    }

    /// Side of the fixed logical canvas all drawing is expressed in.
    pub fn logical_size(&self) -> u32 {
        self.logical_size
    }

    /// Side of the backing store for `dpr`.
    pub fn physical_size(&self, dpr: DevicePixelRatio) -> u32 {
        (f64::from(self.logical_size) * dpr.get())
            .round()
            .clamp(0.0, f64::from(u32::MAX)) as u32
    }

    /// Drop the memoized frame, e.g. after the frame asset behind a URL changed.
    pub fn invalidate_frame_cache(&self) -> PipelineResult<()> {
        self.cache()?.invalidate();
        Ok(())
    }

    /// `(hits, decodes)` of the frame memo.
    pub fn frame_cache_stats(&self) -> PipelineResult<(u64, u64)> {
        let cache = self.cache()?;
        Ok((cache.hits(), cache.decodes()))
    }

    /// Composite `cropped` under a circular mask with `frame` on top.
    ///
    /// The photo and the frame are loaded concurrently; if either fails nothing is
    /// produced. A physical side above [`MAX_CANVAS_SIDE`] is refused before any
    /// asset is loaded.
    #[tracing::instrument(skip(self, cropped, frame), fields(frame_url = %frame.url))]
    pub async fn composite(
        &self,
        cropped: &CroppedImage,
        frame: &FrameAsset,
        dpr: DevicePixelRatio,
    ) -> PipelineResult<CompositeResult> {
        let logical = self.logical_size;
        let side = self.physical_size(dpr);
        if side == 0 || side > MAX_CANVAS_SIDE {
            return Err(PipelineError::context_unavailable(format!(
                "composite side {side}px is outside 1..={MAX_CANVAS_SIDE}"
            )));
        }

        let (photo, frame_img) =
            tokio::try_join!(decode_photo(&cropped.image), self.load_frame(&frame.url, side))?;

        let dpr_value = dpr.get();
        let image = tokio::task::spawn_blocking(move || {
            let pixels = render_composite(&photo, &frame_img, logical, dpr_value, side)?;
            encode_png(&pixels, side, side)
        })
        .await
        .map_err(|e| PipelineError::Other(anyhow::Error::new(e)))??;

        tracing::debug!(side, bytes = image.bytes.len(), "composite rendered");
        Ok(CompositeResult {
            image,
            logical_size: logical,
            device_pixel_ratio: dpr_value,
        })
    }

    /// Composite the current crop and frame of `state` and store the result.
    ///
    /// Fails with a precondition error when either input is missing. On any
    /// failure the previous composite in `state` is left untouched.
    pub async fn regenerate(
        &self,
        state: &mut PipelineState,
        dpr: DevicePixelRatio,
    ) -> PipelineResult<RegenerateOutcome> {
        let ticket = state.begin_composite()?;
        let result = self.composite(&ticket.cropped, &ticket.frame, dpr).await?;
        if state.complete_composite(ticket.seq, result) {
            Ok(RegenerateOutcome::Accepted)
        } else {
            Ok(RegenerateOutcome::Stale)
        }
    }

    async fn load_frame(&self, url: &str, side: u32) -> PipelineResult<Arc<PreparedImage>> {
        let cached = self.cache()?.get(url, side);
        if let Some(hit) = cached {
            tracing::trace!(url, "frame cache hit");
            return Ok(hit);
        }

        let bytes = self.fetcher.fetch(url).await?;
        let decoded = tokio::task::spawn_blocking(move || decode_frame(&bytes, side))
            .await
            .map_err(|e| PipelineError::Other(anyhow::Error::new(e)))??;
        let decoded = Arc::new(decoded);

        self.cache()?.store(url, side, decoded.clone());
        Ok(decoded)
    }

    fn cache(&self) -> PipelineResult<MutexGuard<'_, FrameCache>> {
        self.frame_cache
            .lock()
            .map_err(|_| PipelineError::Other(anyhow::anyhow!("frame cache lock poisoned")))
    }
}

async fn decode_photo(image: &EncodedImage) -> PipelineResult<Arc<PreparedImage>> {
    let bytes = image.bytes.clone();
    let decoded = tokio::task::spawn_blocking(move || decode_image(&bytes))
        .await
        .map_err(|e| PipelineError::Other(anyhow::Error::new(e)))??;
    Ok(Arc::new(decoded))
}

/// Rasterize into a `side`² surface whose drawing space is `logical`² scaled by `dpr`.
fn render_composite(
    photo: &PreparedImage,
    frame: &PreparedImage,
    logical: u32,
    dpr: f64,
    side: u32,
) -> PipelineResult<Vec<u8>> {
    let mut surface = Surface::new(side, side)?;
    let photo_paint = image_paint(photo)?;
    let frame_paint = image_paint(frame)?;

    let l = f64::from(logical);
    let base = Affine::scale(dpr);
    let radius = l / 2.0;
    let clip = vello_cpu::kurbo::Circle::new((radius, radius), radius).to_path(0.1);

    surface.draw(|ctx| {
        ctx.set_transform(affine_to_cpu(base));
        ctx.push_clip_layer(&clip);
        draw_image(
            ctx,
            &photo_paint,
            base * cover_transform(photo.width, photo.height, l),
        )?;
        ctx.pop_layer();

        let frame_fit = Affine::scale_non_uniform(
            l / f64::from(frame.width),
            l / f64::from(frame.height),
        );
        draw_image(ctx, &frame_paint, base * frame_fit)
    })?;

    Ok(surface.premul_rgba8().to_vec())
}

/// Scale an image uniformly so it covers a `side`² square, centered.
fn cover_transform(width: u32, height: u32, side: f64) -> Affine {
    let (w, h) = (f64::from(width.max(1)), f64::from(height.max(1)));
    let s = (side / w).max(side / h);
    Affine::translate(((side - w * s) / 2.0, (side - h * s) / 2.0)) * Affine::scale(s)
}
