use std::str::FromStr;

use crate::foundation::error::{PipelineError, PipelineResult};

pub use kurbo::{Affine, Rect, Vec2};

/// Pointer offset of the crop viewport, in display units.
pub type CropOffset = Vec2;

/// Pixel-space rectangle inside the source image's native resolution.
///
/// Coordinates may be sub-pixel. Squareness is the caller's responsibility (the
/// interactive cropper locks its aspect to 1:1 before a rect is produced).
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Largest square centered in an image of the given size.
    pub fn centered_square(image_width: u32, image_height: u32) -> Self {
        let side = f64::from(image_width.min(image_height));
        Self {
            x: ((f64::from(image_width) - side) / 2.0).floor(),
            y: ((f64::from(image_height) - side) / 2.0).floor(),
            width: side,
            height: side,
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        let all_finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(PipelineError::validation(
                "crop rect coordinates must be finite",
            ));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(PipelineError::validation(format!(
                "crop rect must have a positive size, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Whole-pixel output size of a 1:1 raster of this rect.
    pub fn pixel_size(&self) -> (u32, u32) {
        (round_px(self.width), round_px(self.height))
    }

    pub fn to_kurbo(self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= f64::from(image_width)
            && self.y + self.height <= f64::from(image_height)
    }
}

fn round_px(v: f64) -> u32 {
    v.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

impl FromStr for CropRect {
    type Err = PipelineError;

    /// Parses `x,y,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PipelineError::validation(format!("invalid crop rect '{s}': {e}")))?;
        let [x, y, width, height] = parts.as_slice() else {
            return Err(PipelineError::validation(format!(
                "crop rect '{s}' must have exactly 4 components (x,y,width,height)"
            )));
        };
        let rect = Self::new(*x, *y, *width, *height);
        rect.validate()?;
        Ok(rect)
    }
}

/// Zoom factor of the crop viewport, always within `[Zoom::MIN, Zoom::MAX]`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct Zoom(f64);

impl Zoom {
    pub const MIN: f64 = 1.0;
    pub const MAX: f64 = 3.0;

    /// Clamp `v` into the supported range; non-finite input maps to `MIN`.
    pub fn new(v: f64) -> Self {
        if !v.is_finite() {
            return Self(Self::MIN);
        }
        Self(v.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

/// Ratio of physical to logical pixels on the target display.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DevicePixelRatio(f64);

impl DevicePixelRatio {
    /// Unknown, non-finite and non-positive ratios fall back to 1.
    pub fn new(v: Option<f64>) -> Self {
        match v {
            Some(r) if r.is_finite() && r > 0.0 => Self(r),
            _ => Self(1.0),
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for DevicePixelRatio {
    fn default() -> Self {
        Self(1.0)
    }
}
