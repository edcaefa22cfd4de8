//! Download and share link generation.

use async_trait::async_trait;

use crate::error::{CoreError, CoreResult};
use crate::fs::entry::FileEntry;

/// Builds URLs for a selection of entries.
#[async_trait]
pub trait LinkBuilder: Send + Sync {
    /// A URL that downloads `files`.
    async fn download_link(
        &self,
        files: &[FileEntry],
        gateway_url: &str,
        api_url: &str,
    ) -> CoreResult<String>;

    /// A public URL that shows `files`.
    async fn share_link(&self, files: &[FileEntry]) -> CoreResult<String>;
}

/// Links served straight from a gateway and the node's HTTP API.
///
/// Only single-entry selections are supported. A file downloads through the
/// gateway; a directory downloads as a compressed archive from the API.
#[derive(Debug, Clone)]
pub struct GatewayLinks {
    share_gateway: String,
}

impl GatewayLinks {
    pub fn new(share_gateway: impl Into<String>) -> Self {
        Self {
            share_gateway: share_gateway.into(),
        }
    }
}

fn single(files: &[FileEntry]) -> CoreResult<(&FileEntry, &str)> {
    let entry = match files {
        [entry] => entry,
        [] => return Err(CoreError::Unsupported("empty selection".to_string())),
        _ => {
            return Err(CoreError::Unsupported(format!(
                "links for {} entries",
                files.len()
            )))
        }
    };
    let hash = entry
        .hash()
        .ok_or_else(|| CoreError::InvalidPath(entry.path().to_string()))?;
    Ok((entry, hash))
}

fn trim(url: &str) -> &str {
    url.trim_end_matches('/')
}

#[async_trait]
impl LinkBuilder for GatewayLinks {
    async fn download_link(
        &self,
        files: &[FileEntry],
        gateway_url: &str,
        api_url: &str,
    ) -> CoreResult<String> {
        let (entry, hash) = single(files)?;
        if entry.is_dir() {
            return Ok(format!(
                "{}/api/v0/get?arg={hash}&archive=true&compress=true",
                trim(api_url)
            ));
        }
        Ok(format!(
            "{}/ipfs/{hash}?download=true&filename={}",
            trim(gateway_url),
            urlencoding::encode(entry.name())
        ))
    }

    async fn share_link(&self, files: &[FileEntry]) -> CoreResult<String> {
        let (_, hash) = single(files)?;
        Ok(format!("{}/ipfs/{hash}", trim(&self.share_gateway)))
    }
}
