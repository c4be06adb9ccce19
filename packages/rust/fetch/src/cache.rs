//! On-disk archive cache and tar.gz extraction.
//!
//! Layout under the cache root, keyed by the SHA-256 of the archive URL:
//! ```text
//! <root>/
//! ├── downloads/<key>            archive bytes
//! ├── extracted/<key>/           unpacked tree
//! └── extracted/<key>.complete   written once extraction succeeded
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};
use url::Url;

use bionlp_shared::{BioNlpError, Result};

/// Cache of downloaded and extracted archives.
#[derive(Debug, Clone)]
pub struct ArchiveCache {
    root: PathBuf,
}

impl ArchiveCache {
    /// Use `root` as the cache directory. Nothing is created until needed.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stable cache key for a URL.
    pub fn key(url: &Url) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_str().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Where the downloaded archive for `url` is stored.
    pub fn archive_path(&self, url: &Url) -> PathBuf {
        self.root.join("downloads").join(Self::key(url))
    }

    /// Where the archive for `url` is extracted.
    pub fn extract_dir(&self, url: &Url) -> PathBuf {
        self.root.join("extracted").join(Self::key(url))
    }

    fn marker_path(&self, url: &Url) -> PathBuf {
        self.root
            .join("extracted")
            .join(format!("{}.complete", Self::key(url)))
    }

    /// Whether `url` has already been extracted successfully.
    pub fn is_extracted(&self, url: &Url) -> bool {
        self.marker_path(url).is_file()
    }

    /// Extract `archive` for `url` unless a completed extraction exists,
    /// and return the corpus directory inside it.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn extract_cached(&self, url: &Url, archive: &Path) -> Result<PathBuf> {
        let dest = self.extract_dir(url);

        if self.is_extracted(url) {
            debug!(path = %dest.display(), "using cached extraction");
            return archive_root(&dest);
        }

        // A previous run may have died half-way through unpacking.
        if dest.exists() {
            std::fs::remove_dir_all(&dest).map_err(|e| BioNlpError::io(&dest, e))?;
        }

        let archive_owned = archive.to_path_buf();
        let dest_owned = dest.clone();
        let extracted =
            tokio::task::spawn_blocking(move || extract_tar_gz(&archive_owned, &dest_owned))
                .await
                .map_err(|e| BioNlpError::Archive(format!("extraction task failed: {e}")))?;
        if let Err(e) = extracted {
            let _ = std::fs::remove_dir_all(&dest);
            return Err(e);
        }

        let marker = self.marker_path(url);
        std::fs::write(&marker, url.as_str()).map_err(|e| BioNlpError::io(&marker, e))?;

        info!(path = %dest.display(), "archive extracted");
        archive_root(&dest)
    }
}

/// Unpack a gzip-compressed tar archive into `dest`.
///
/// Entries that would land outside `dest` are refused by the unpacker.
pub fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| BioNlpError::io(archive, e))?;
    std::fs::create_dir_all(dest).map_err(|e| BioNlpError::io(dest, e))?;

    let mut tar = tar::Archive::new(GzDecoder::new(file));
    tar.unpack(dest).map_err(|e| {
        BioNlpError::Archive(format!("failed to unpack {}: {e}", archive.display()))
    })
}

/// The directory holding the corpus files of an extracted archive.
///
/// Archives usually wrap everything in a single folder; in that case the
/// folder is returned, otherwise `dir` itself.
pub fn archive_root(dir: &Path) -> Result<PathBuf> {
    let mut entries = std::fs::read_dir(dir)
        .map_err(|e| BioNlpError::io(dir, e))?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| BioNlpError::io(dir, e))?;

    if entries.len() == 1 {
        let only = entries.remove(0).path();
        if only.is_dir() {
            return Ok(only);
        }
    }

    Ok(dir.to_path_buf())
}
