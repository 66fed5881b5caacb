use std::sync::Arc;

use crate::foundation::error::{PipelineError, PipelineResult};

/// Raw bytes of an uploaded photo. Decoding is deferred until the first crop
/// commit.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceImage {
    name: String,
    bytes: Arc<Vec<u8>>,
}

impl SourceImage {
    /// Wrap an upload, rejecting empty files and files above `max_bytes`.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, max_bytes: usize) -> PipelineResult<Self> {
        let name = name.into();
        if bytes.is_empty() {
            return Err(PipelineError::validation(format!("'{name}' is empty")));
        }
        if bytes.len() > max_bytes {
            return Err(PipelineError::validation(format!(
                "'{name}' is {} bytes, above the {max_bytes} byte upload limit",
                bytes.len()
            )));
        }
        Ok(Self {
            name,
            bytes: Arc::new(bytes),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &Arc<Vec<u8>> {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Size in mebibytes, as shown next to the selected file.
    pub fn size_mib(&self) -> f64 {
        self.bytes.len() as f64 / (1024.0 * 1024.0)
    }
}
