use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{
    foundation::error::{PipelineError, PipelineResult},
    render::compositor::CompositeResult,
};

/// Suffix appended to the university name for downloaded composites.
pub const PROFILE_PHOTO_SUFFIX: &str = "profile_photo";

/// `"Stanford University"` + `"profile_photo"` -> `"Stanford_University_profile_photo"`.
///
/// Every run of whitespace in `display_name` becomes one underscore. Nothing else
/// is altered: no trimming, no case change.
pub fn derive_file_name(display_name: &str, suffix: &str) -> String {
    let mut out = String::with_capacity(display_name.len() + suffix.len() + 1);
    let mut in_whitespace = false;
    for c in display_name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
        } else {
            out.push(c);
            in_whitespace = false;
        }
    }
    out.push('_');
    out.push_str(suffix);
    out
}

/// A composite ready to be saved under a derived name.
#[derive(Clone, Debug, PartialEq)]
pub struct DownloadLink {
    pub file_name: String,
    /// Self-contained `data:` URL of the image.
    pub href: String,
    bytes: std::sync::Arc<Vec<u8>>,
}

impl DownloadLink {
    /// Fails only when there is no composite to export yet.
    pub fn prepare(result: Option<&CompositeResult>, display_name: &str) -> PipelineResult<Self> {
        let result = result.ok_or_else(|| {
            PipelineError::precondition("no composite available to export")
        })?;
        let stem = derive_file_name(display_name, PROFILE_PHOTO_SUFFIX);
        Ok(Self {
            file_name: format!("{stem}.{}", result.image.format.extension()),
            href: result.data_url(),
            bytes: result.image.bytes.clone(),
        })
    }

    /// Write the image into `dir` (created if needed) and return the file path.
    pub fn save_in(&self, dir: &Path) -> PipelineResult<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output dir '{}'", dir.display()))?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, self.bytes.as_slice())
            .with_context(|| format!("write '{}'", path.display()))?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "composite saved");
        Ok(path)
    }
}
