use std::sync::Arc;

use crate::{
    assets::decode::PreparedImage,
    foundation::core::Affine,
    foundation::error::{PipelineError, PipelineResult},
};

/// CPU raster target. Owned exclusively by the operation drawing into it.
pub struct Surface {
    width: u16,
    height: u16,
    pixmap: vello_cpu::Pixmap,
}

impl Surface {
    /// Allocate a transparent surface; zero or oversized dimensions mean no
    /// raster context can be acquired.
    pub fn new(width: u32, height: u32) -> PipelineResult<Self> {
        if width == 0 || height == 0 {
            return Err(PipelineError::context_unavailable(format!(
                "surface must be non-empty, got {width}x{height}"
            )));
        }
        let width_u16: u16 = width
            .try_into()
            .map_err(|_| PipelineError::context_unavailable("surface width exceeds u16"))?;
        let height_u16: u16 = height
            .try_into()
            .map_err(|_| PipelineError::context_unavailable("surface height exceeds u16"))?;

        Ok(Self {
            width: width_u16,
            height: height_u16,
            pixmap: vello_cpu::Pixmap::new(width_u16, height_u16),
        })
    }

    /// Record draw commands into a fresh context and rasterize them onto this surface.
    pub fn draw(
        &mut self,
        f: impl FnOnce(&mut vello_cpu::RenderContext) -> PipelineResult<()>,
    ) -> PipelineResult<()> {
        let mut ctx = vello_cpu::RenderContext::new(self.width, self.height);
        f(&mut ctx)?;
        ctx.flush();
        ctx.render_to_pixmap(&mut self.pixmap);
        Ok(())
    }

    /// Premultiplied RGBA8 pixels, row-major.
    pub fn premul_rgba8(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }
}

/// Fill `(0, 0, w, h)` in image space with `image` under `transform`.
pub fn draw_image(
    ctx: &mut vello_cpu::RenderContext,
    image: &vello_cpu::Image,
    transform: Affine,
) -> PipelineResult<()> {
    let (w, h) = image_paint_size(image)?;
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(affine_to_cpu(transform));
    ctx.set_paint(image.clone());
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
    Ok(())
}

pub fn image_paint(img: &PreparedImage) -> PipelineResult<vello_cpu::Image> {
    let pixmap = image_premul_bytes_to_pixmap(img.rgba8_premul.as_slice(), img.width, img.height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

pub fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> PipelineResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| PipelineError::context_unavailable("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| PipelineError::context_unavailable("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(PipelineError::decode("prepared image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

fn image_paint_size(image: &vello_cpu::Image) -> PipelineResult<(f64, f64)> {
    match &image.image {
        vello_cpu::ImageSource::Pixmap(p) => Ok((f64::from(p.width()), f64::from(p.height()))),
        vello_cpu::ImageSource::OpaqueId(_) => Err(PipelineError::context_unavailable(
            "cpu raster does not support opaque image ids",
        )),
    }
}
