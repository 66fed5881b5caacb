use std::sync::Arc;

use crate::foundation::error::{PipelineError, PipelineResult};

/// Decoded raster in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// SVG frames are rasterized no larger than this on either axis.
const MAX_SVG_DIM: u32 = 16_384;

pub fn decode_image(bytes: &[u8]) -> PipelineResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| PipelineError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

pub fn parse_svg(bytes: &[u8]) -> PipelineResult<usvg::Tree> {
    let opts = usvg::Options::default();
    usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| PipelineError::decode(format!("parse svg tree: {e}")))
}

/// Decode a frame overlay. Raster formats are decoded at native size; SVG frames
/// are rasterized to `side_px` square so they stay crisp at the composite size.
pub fn decode_frame(bytes: &[u8], side_px: u32) -> PipelineResult<PreparedImage> {
    if image::guess_format(bytes).is_ok() {
        return decode_image(bytes);
    }

    let tree = parse_svg(bytes).map_err(|e| {
        PipelineError::decode(format!("frame is neither a raster image nor svg ({e})"))
    })?;
    let side = side_px.clamp(1, MAX_SVG_DIM);
    let rgba8_premul = rasterize_svg_to_premul_rgba8(&tree, side, side)?;
    Ok(PreparedImage {
        width: side,
        height: side,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

pub fn rasterize_svg_to_premul_rgba8(
    tree: &usvg::Tree,
    width: u32,
    height: u32,
) -> PipelineResult<Vec<u8>> {
    let size = tree.size();
    if !(size.width().is_finite() && size.height().is_finite())
        || size.width() <= 0.0
        || size.height() <= 0.0
    {
        return Err(PipelineError::decode("svg has invalid width/height"));
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        PipelineError::context_unavailable(format!("failed to allocate {width}x{height} svg pixmap"))
    })?;

    let sx = (width as f32) / size.width();
    let sy = (height as f32) / size.height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    resvg::render(tree, xform, &mut pixmap.as_mut());
    Ok(pixmap.data().to_vec())
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
