use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error};

use crate::error::AttachmentFetchError;
use crate::http::Transport;
use crate::utils::{cache_filename, decode_lossy, write_atomic};

/// Resolves attachment URLs to text, caching each file by name on disk.
///
/// Cached entries never expire. Failures are logged and turned into a
/// placeholder string so a broken attachment cannot sink its report.
pub struct AttachmentFetcher {
    transport: Arc<dyn Transport>,
    cache_dir: PathBuf,
}

impl AttachmentFetcher {
    pub fn new(transport: Arc<dyn Transport>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            cache_dir: cache_dir.into(),
        }
    }

    pub async fn fetch(&self, url: &str) -> String {
        match self.try_fetch(url).await {
            Ok(content) => content,
            Err(e) => {
                error!("Error processing attachment {}: {}", url, e);
                placeholder(&e)
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<String, AttachmentFetchError> {
        let path = self.cache_dir.join(cache_filename(url));

        if tokio::fs::try_exists(&path).await? {
            debug!("Attachment cache hit: {}", path.display());
            let bytes = tokio::fs::read(&path).await?;
            return Ok(decode_lossy(&bytes));
        }

        debug!("Reading attachment {}", url);
        let bytes = self.transport.get_bytes(url).await?;
        let content = decode_lossy(&bytes);
        write_atomic(&path, &content).await?;
        Ok(content)
    }
}

fn placeholder(err: &AttachmentFetchError) -> String {
    format!("Error reading attachment: {}", err)
}
