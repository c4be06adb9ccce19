//! HTTP-backed download manager.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use url::Url;

use bionlp_shared::{BioNlpError, DownloadConfig, Result};

use crate::DownloadManager;
use crate::cache::ArchiveCache;

/// User-Agent string for archive requests.
const USER_AGENT: &str = concat!("bionlp-adapter/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow for an archive URL.
const MAX_REDIRECTS: usize = 5;

/// Downloads archives over HTTP into an [`ArchiveCache`].
#[derive(Debug, Clone)]
pub struct HttpDownloadManager {
    client: Client,
    cache: ArchiveCache,
    max_archive_bytes: u64,
}

impl HttpDownloadManager {
    /// Create a manager with the given download configuration.
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BioNlpError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            cache: ArchiveCache::new(&config.cache_dir),
            max_archive_bytes: config.max_archive_bytes,
        })
    }

    pub fn cache(&self) -> &ArchiveCache {
        &self.cache
    }

    /// Fetch `url` into the download cache unless it is already there.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn download(&self, url: &Url) -> Result<PathBuf> {
        let path = self.cache.archive_path(url);
        if path.is_file() {
            debug!(path = %path.display(), "archive already downloaded");
            return Ok(path);
        }

        info!("downloading archive");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| BioNlpError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BioNlpError::Network(format!("{url}: HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_archive_bytes {
                return Err(self.too_large(url, len));
            }
        }

        let parent = path
            .parent()
            .ok_or_else(|| BioNlpError::validation("download path has no parent"))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BioNlpError::io(parent, e))?;

        // Write then rename so an interrupted download never looks complete.
        let partial = path.with_extension("part");
        let written = match self.stream_to(url, response, &partial).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&partial, &path)
            .await
            .map_err(|e| BioNlpError::io(&path, e))?;

        info!(bytes = written, path = %path.display(), "archive downloaded");
        Ok(path)
    }

    /// Copy the body into `dest` chunk by chunk, enforcing the size limit
    /// even when the server sent no Content-Length.
    async fn stream_to(
        &self,
        url: &Url,
        mut response: reqwest::Response,
        dest: &Path,
    ) -> Result<u64> {
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| BioNlpError::io(dest, e))?;
        let mut written: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| BioNlpError::Network(format!("{url}: failed to read body: {e}")))?
        {
            written += chunk.len() as u64;
            if written > self.max_archive_bytes {
                return Err(self.too_large(url, written));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| BioNlpError::io(dest, e))?;
        }

        file.flush().await.map_err(|e| BioNlpError::io(dest, e))?;
        Ok(written)
    }

    fn too_large(&self, url: &Url, len: u64) -> BioNlpError {
        BioNlpError::validation(format!(
            "{url}: archive too large ({len} bytes, max {})",
            self.max_archive_bytes
        ))
    }
}

impl DownloadManager for HttpDownloadManager {
    async fn download_and_extract(&self, url: &Url) -> Result<PathBuf> {
        if self.cache.is_extracted(url) {
            return self.cache.extract_cached(url, &self.cache.archive_path(url)).await;
        }
        let archive = self.download(url).await?;
        match self.cache.extract_cached(url, &archive).await {
            Err(e @ BioNlpError::Archive(_)) => {
                // Not an archive (e.g. an HTML error page); fetch it again next time.
                warn!(path = %archive.display(), error = %e, "discarding unreadable download");
                let _ = tokio::fs::remove_file(&archive).await;
                Err(e)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tar_gz, temp_dir};

    fn config(cache_dir: PathBuf, max_archive_bytes: u64) -> DownloadConfig {
        DownloadConfig {
            url_base: Url::parse("http://localhost/").unwrap(),
            cache_dir,
            timeout_secs: 10,
            max_archive_bytes,
        }
    }

    #[tokio::test]
    async fn downloads_extracts_and_caches() {
        let server = wiremock::MockServer::start().await;
        let archive = tar_gz(&[
            ("bionlp09_train/PMID-1.txt", "p53 binds MDM2"),
            ("bionlp09_train/PMID-1.a1", "T1\tProtein 0 3\tp53\n"),
        ]);

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/train.tar.gz"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(archive))
            .expect(1)
            .mount(&server)
            .await;

        let dir = temp_dir("http");
        let manager = HttpDownloadManager::new(&config(dir.clone(), 1024 * 1024)).unwrap();
        let url = Url::parse(&format!("{}/train.tar.gz", server.uri())).unwrap();

        let root = manager.download_and_extract(&url).await.unwrap();
        assert!(root.ends_with("bionlp09_train"));
        assert!(root.join("PMID-1.txt").is_file());

        // Second call is served from the cache; the mock expects one request.
        let again = manager.download_and_extract(&url).await.unwrap();
        assert_eq!(root, again);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn http_error_is_network_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/missing.tar.gz"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = temp_dir("http-404");
        let manager = HttpDownloadManager::new(&config(dir.clone(), 1024)).unwrap();
        let url = Url::parse(&format!("{}/missing.tar.gz", server.uri())).unwrap();

        let err = manager.download_and_extract(&url).await.unwrap_err();
        assert!(matches!(err, BioNlpError::Network(_)));
        assert!(err.to_string().contains("404"));
        assert!(!manager.cache().archive_path(&url).exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn oversize_archive_is_rejected() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/big.tar.gz"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
            .mount(&server)
            .await;

        let dir = temp_dir("http-big");
        let manager = HttpDownloadManager::new(&config(dir.clone(), 1024)).unwrap();
        let url = Url::parse(&format!("{}/big.tar.gz", server.uri())).unwrap();

        let err = manager.download_and_extract(&url).await.unwrap_err();
        assert!(err.to_string().contains("too large"));
        assert!(!manager.cache().archive_path(&url).exists());
        assert!(!manager.cache().archive_path(&url).with_extension("part").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn corrupt_download_surfaces_archive_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/bad.tar.gz"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<html>moved</html>"))
            .mount(&server)
            .await;

        let dir = temp_dir("http-bad");
        let manager = HttpDownloadManager::new(&config(dir.clone(), 1024 * 1024)).unwrap();
        let url = Url::parse(&format!("{}/bad.tar.gz", server.uri())).unwrap();

        let err = manager.download_and_extract(&url).await.unwrap_err();
        assert!(matches!(err, BioNlpError::Archive(_)), "{err}");
        assert!(!manager.cache().is_extracted(&url));
        assert!(!manager.cache().archive_path(&url).exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn recovers_after_corrupt_download() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/flaky.tar.gz"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::path("/flaky.tar.gz"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_bytes(tar_gz(&[("flaky/PMID-2.txt", "IL-2")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = temp_dir("http-flaky");
        let manager = HttpDownloadManager::new(&config(dir.clone(), 1024 * 1024)).unwrap();
        let url = Url::parse(&format!("{}/flaky.tar.gz", server.uri())).unwrap();

        let err = manager.download_and_extract(&url).await.unwrap_err();
        assert!(matches!(err, BioNlpError::Archive(_)), "{err}");

        let root = manager.download_and_extract(&url).await.unwrap();
        assert!(root.ends_with("flaky"));
        assert!(root.join("PMID-2.txt").is_file());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
