//! uniframes turns an uploaded photo into a circular, frame-overlaid profile picture.
//!
//! # Pipeline overview
//!
//! 1. **Crop**: `SourceImage + CropChange* -> CroppedImage` via [`CropSession`], which debounces
//!    and deduplicates interactive adjustments before rasterizing a 1:1 JPEG of the region.
//! 2. **Composite**: `CroppedImage + FrameAsset -> CompositeResult` via [`Compositor`]; the photo
//!    and frame are loaded concurrently, the photo is clipped to the inscribed circle and the frame
//!    is drawn on top at `base_size × supersample × device_pixel_ratio`.
//! 3. **Export**: `CompositeResult -> DownloadLink` with a name derived from the university.
//!
//! [`PipelineState`] holds the inputs/outputs of a session and the stage predicates a
//! step-by-step UI gates on ([`Wizard`]).
//!
//! Pixels are premultiplied RGBA8 until they are encoded.
#![forbid(unsafe_code)]

mod assets {
    pub mod decode;
    pub mod encode;
    pub mod fetch;
    pub mod frame_cache;
    pub mod source;
}
mod crop {
    pub mod debounce;
    pub mod session;
}
mod export;
mod foundation {
    pub mod core;
    pub mod error;
    pub mod settings;
}
mod model;
mod render {
    pub mod compositor;
    pub mod raster;
}
mod wizard;

pub use assets::decode::{PreparedImage, decode_frame, decode_image};
pub use assets::encode::{EncodedFormat, EncodedImage, decode_data_url, encode_jpeg, encode_png};
pub use assets::fetch::{AssetFetcher, AssetLocation, HttpFetcher};
pub use assets::frame_cache::FrameCache;
pub use assets::source::SourceImage;
pub use crop::debounce::Debouncer;
pub use crop::session::{ChangeDisposition, CropChange, CropSession, CroppedImage};
pub use export::{DownloadLink, PROFILE_PHOTO_SUFFIX, derive_file_name};
pub use foundation::core::{CropOffset, CropRect, DevicePixelRatio, Zoom};
pub use foundation::error::{PipelineError, PipelineResult};
pub use foundation::settings::PipelineSettings;
pub use model::{FrameAsset, University};
pub use render::compositor::{CompositeResult, Compositor, MAX_CANVAS_SIDE, RegenerateOutcome};
pub use wizard::{CompositeTicket, PipelineState, Stage, Wizard};
