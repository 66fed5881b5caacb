use std::sync::Arc;

use base64::Engine as _;
use image::ImageEncoder as _;

use crate::foundation::error::{PipelineError, PipelineResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EncodedFormat {
    Jpeg,
    Png,
}

impl EncodedFormat {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }
}

/// Fully materialized, encoded raster.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedImage {
    pub format: EncodedFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Arc<Vec<u8>>,
}

impl EncodedImage {
    /// `data:<mime>;base64,<payload>` representation for inline display/download.
    pub fn to_data_url(&self) -> String {
        let payload = base64::engine::general_purpose::STANDARD.encode(self.bytes.as_slice());
        format!("data:{};base64,{payload}", self.format.mime())
    }

    /// Inverse of [`EncodedImage::to_data_url`]. Dimensions are read from the payload.
    pub fn from_data_url(url: &str) -> PipelineResult<Self> {
        let (mime, bytes) = decode_data_url(url)?;
        let format = EncodedFormat::from_mime(&mime).ok_or_else(|| {
            PipelineError::decode(format!("unsupported data url media type '{mime}'"))
        })?;
        let (width, height) = image::ImageReader::new(std::io::Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::decode(format!("sniff data url payload: {e}")))?
            .into_dimensions()
            .map_err(|e| PipelineError::decode(format!("read data url dimensions: {e}")))?;
        Ok(Self {
            format,
            width,
            height,
            bytes: Arc::new(bytes),
        })
    }
}

/// Split a base64 `data:` URL into its media type and decoded payload.
pub fn decode_data_url(url: &str) -> PipelineResult<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| PipelineError::decode("not a data url"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| PipelineError::decode("data url is missing ','"))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| PipelineError::decode("only base64 data urls are supported"))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| PipelineError::decode(format!("data url payload: {e}")))?;
    Ok((mime.to_ascii_lowercase(), bytes))
}

/// Encode premultiplied RGBA8 as baseline JPEG.
///
/// JPEG has no alpha; premultiplied color channels are exactly the pixels
/// composited over black, so they are written as-is.
pub fn encode_jpeg(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> PipelineResult<EncodedImage> {
    check_len(rgba8_premul, width, height)?;
    let rgb: Vec<u8> = rgba8_premul
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .write_image(&rgb, width, height, image::ExtendedColorType::Rgb8)
        .map_err(|e| PipelineError::encode(format!("jpeg: {e}")))?;

    Ok(EncodedImage {
        format: EncodedFormat::Jpeg,
        width,
        height,
        bytes: Arc::new(buf),
    })
}

/// Encode premultiplied RGBA8 as PNG with straight alpha.
pub fn encode_png(rgba8_premul: &[u8], width: u32, height: u32) -> PipelineResult<EncodedImage> {
    check_len(rgba8_premul, width, height)?;
    let mut straight = rgba8_premul.to_vec();
    unpremultiply_rgba8_in_place(&mut straight);

    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new_with_quality(
        &mut buf,
        image::codecs::png::CompressionType::Default,
        image::codecs::png::FilterType::Adaptive,
    )
    .write_image(&straight, width, height, image::ExtendedColorType::Rgba8)
    .map_err(|e| PipelineError::encode(format!("png: {e}")))?;

    Ok(EncodedImage {
        format: EncodedFormat::Png,
        width,
        height,
        bytes: Arc::new(buf),
    })
}

fn check_len(rgba: &[u8], width: u32, height: u32) -> PipelineResult<()> {
    if rgba.len() != width as usize * height as usize * 4 {
        return Err(PipelineError::encode(format!(
            "rgba8 buffer length {} does not match {width}x{height}",
            rgba.len()
        )));
    }
    Ok(())
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u16 * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_data_url_round_trips_dimensions() {
        let px = [0u8, 0, 0, 0].repeat(6);
        let enc = encode_png(&px, 3, 2).unwrap();
        let url = enc.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));

        let back = EncodedImage::from_data_url(&url).unwrap();
        assert_eq!(back, enc);
    }

    #[test]
    fn png_stores_straight_alpha() {
        // 50% red, premultiplied.
        let enc = encode_png(&[128, 0, 0, 128], 1, 1).unwrap();
        let img = image::load_from_memory(&enc.bytes).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 128]);
    }

    #[test]
    fn jpeg_drops_alpha_and_keeps_size() {
        let px = [200u8, 10, 10, 255].repeat(16 * 8);
        let enc = encode_jpeg(&px, 16, 8, 90).unwrap();
        assert_eq!(enc.format, EncodedFormat::Jpeg);
        let img = image::load_from_memory(&enc.bytes).unwrap();
        assert_eq!((img.width(), img.height()), (16, 8));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        assert!(encode_png(&[0, 0, 0], 1, 1).is_err());
    }

    #[test]
    fn malformed_data_urls_fail() {
        assert!(decode_data_url("image/png;base64,AAAA").is_err());
        assert!(decode_data_url("data:image/png,AAAA").is_err());
        assert!(decode_data_url("data:image/png;base64,@@@").is_err());
        assert!(EncodedImage::from_data_url("data:text/plain;base64,aGk=").is_err());
    }
}
