//! Offline download manager over archives already present on disk.

use std::path::{Path, PathBuf};

use tracing::instrument;
use url::Url;

use bionlp_shared::{BioNlpError, Result};

use crate::DownloadManager;
use crate::cache::ArchiveCache;

/// Resolves each URL to `<data_dir>/<last path segment>` and extracts it
/// into the cache, without touching the network.
#[derive(Debug, Clone)]
pub struct LocalDownloadManager {
    data_dir: PathBuf,
    cache: ArchiveCache,
}

impl LocalDownloadManager {
    pub fn new(data_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache: ArchiveCache::new(cache_dir),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Local path expected to hold the archive published at `url`.
    pub fn local_archive(&self, url: &Url) -> Result<PathBuf> {
        let file_name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                BioNlpError::validation(format!("{url}: URL has no file name"))
            })?;
        Ok(self.data_dir.join(file_name))
    }
}

impl DownloadManager for LocalDownloadManager {
    #[instrument(skip(self), fields(url = %url))]
    async fn download_and_extract(&self, url: &Url) -> Result<PathBuf> {
        let archive = self.local_archive(url)?;
        if !archive.is_file() && !self.cache.is_extracted(url) {
            return Err(BioNlpError::io(
                &archive,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("archive for {url} not found in data dir"),
                ),
            ));
        }
        self.cache.extract_cached(url, &archive).await
    }
}
