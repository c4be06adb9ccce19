//! Archive download, caching, and extraction.
//!
//! This crate provides:
//! - [`DownloadManager`] — the capability the corpus adapter needs: URL in,
//!   extracted local directory out
//! - [`HttpDownloadManager`] — fetches archives over HTTP into a cache
//! - [`LocalDownloadManager`] — offline mode over pre-downloaded archives
//! - [`ArchiveCache`] — the on-disk cache layout shared by both

pub mod cache;
pub mod http;
pub mod local;

use std::future::Future;
use std::path::PathBuf;

use bionlp_shared::Result;
use url::Url;

pub use cache::{ArchiveCache, archive_root, extract_tar_gz};
pub use http::HttpDownloadManager;
pub use local::LocalDownloadManager;

/// Resolve an archive URL to a local directory holding its extracted contents.
pub trait DownloadManager {
    /// Download (or locate) the archive at `url`, extract it, and return the
    /// directory the corpus files live in.
    fn download_and_extract(&self, url: &Url) -> impl Future<Output = Result<PathBuf>> + Send;
}

#[cfg(test)]
pub(crate) mod test_support {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    /// Build a gzip-compressed tar archive from `(path, content)` pairs.
    pub(crate) fn tar_gz(entries: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            builder
                .append_data(&mut header, path, content.as_bytes())
                .expect("append tar entry");
        }
        builder
            .into_inner()
            .expect("finish tar")
            .finish()
            .expect("finish gzip")
    }

    pub(crate) fn temp_dir(label: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("bionlp-{label}-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }
}
