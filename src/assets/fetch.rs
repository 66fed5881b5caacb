use std::{future::Future, path::PathBuf, time::Duration};

use crate::{
    assets::encode::decode_data_url,
    foundation::error::{PipelineError, PipelineResult},
};

/// Retrieves the raw bytes behind an asset reference.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = PipelineResult<Vec<u8>>> + Send;
}

/// Where an asset reference points to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetLocation {
    Remote(String),
    File(PathBuf),
    Inline(String),
}

impl AssetLocation {
    pub fn parse(url: &str) -> PipelineResult<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(PipelineError::fetch("empty asset url"));
        }
        if url.starts_with("data:") {
            return Ok(Self::Inline(url.to_string()));
        }
        if url.starts_with("https://") || url.starts_with("http://") {
            return Ok(Self::Remote(url.to_string()));
        }
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(Self::File(PathBuf::from(path)));
        }
        if let Some((scheme, _)) = url.split_once("://") {
            return Err(PipelineError::fetch(format!(
                "unsupported asset url scheme '{scheme}'"
            )));
        }
        Ok(Self::File(PathBuf::from(url)))
    }
}

/// Default fetcher: HTTP(S) through `reqwest`, local files through `tokio::fs`,
/// and inline `data:` URLs decoded in place.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> PipelineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::fetch(format!("build http client: {e}")))?;
        Ok(Self { client })
    }

    async fn fetch_remote(&self, url: &str) -> PipelineResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::fetch(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::fetch(format!("GET {url}: http {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::fetch(format!("read body of {url}: {e}")))?;
        Ok(bytes.to_vec())
    }
}

impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> PipelineResult<Vec<u8>> {
        match AssetLocation::parse(url)? {
            AssetLocation::Remote(u) => self.fetch_remote(&u).await,
            AssetLocation::File(path) => tokio::fs::read(&path).await.map_err(|e| {
                PipelineError::fetch(format!("read asset '{}': {e}", path.display()))
            }),
            AssetLocation::Inline(u) => decode_data_url(&u)
                .map(|(_, bytes)| bytes)
                .map_err(|e| PipelineError::fetch(e.to_string())),
        }
    }
}
