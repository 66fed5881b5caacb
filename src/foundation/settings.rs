use std::{path::Path, time::Duration};

use anyhow::Context;

use crate::foundation::error::{PipelineError, PipelineResult};

/// Tunables shared by the crop session, compositor and asset fetcher.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Quiet period before a crop adjustment is committed.
    pub debounce_ms: u64,
    /// JPEG quality (1..=100) of committed crops.
    pub crop_jpeg_quality: u8,
    /// Logical side length of the composite before supersampling.
    pub base_size: u32,
    /// Multiplier applied to `base_size` for the logical composite canvas.
    pub supersample: u32,
    /// Upper bound on uploaded source images.
    pub max_source_bytes: usize,
    /// Timeout for remote frame asset requests.
    pub fetch_timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            crop_jpeg_quality: 90,
            base_size: 400,
            supersample: 3,
            max_source_bytes: 10 * 1024 * 1024,
            fetch_timeout_secs: 30,
        }
    }
}

impl PipelineSettings {
    /// Defaults with `UNIFRAMES_*` environment overrides applied.
    ///
    /// Unparseable or zero values are ignored.
    pub fn from_env() -> Self {
        let mut out = Self::default();
        if let Some(v) = env_u64("UNIFRAMES_DEBOUNCE_MS") {
            out.debounce_ms = v;
        }
        if let Some(v) = env_u64("UNIFRAMES_CROP_JPEG_QUALITY") {
            out.crop_jpeg_quality = v.min(100) as u8;
        }
        if let Some(v) = env_u64("UNIFRAMES_SUPERSAMPLE").and_then(|v| u32::try_from(v).ok()) {
            out.supersample = v;
        }
        if let Some(v) = env_u64("UNIFRAMES_MAX_SOURCE_BYTES").and_then(|v| usize::try_from(v).ok())
        {
            out.max_source_bytes = v;
        }
        if let Some(v) = env_u64("UNIFRAMES_FETCH_TIMEOUT_SECS") {
            out.fetch_timeout_secs = v;
        }
        out
    }

    /// Load settings from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> PipelineResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read settings '{}'", path.display()))?;
        let settings: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse settings '{}'", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.base_size == 0 || self.supersample == 0 {
            return Err(PipelineError::validation(
                "base_size and supersample must be > 0",
            ));
        }
        if !(1..=100).contains(&self.crop_jpeg_quality) {
            return Err(PipelineError::validation(format!(
                "crop_jpeg_quality must be in 1..=100, got {}",
                self.crop_jpeg_quality
            )));
        }
        if self.max_source_bytes == 0 {
            return Err(PipelineError::validation("max_source_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Side length of the fixed logical composite canvas.
    pub fn logical_canvas_size(&self) -> u32 {
        self.base_size.saturating_mul(self.supersample)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&n| n > 0)
}
