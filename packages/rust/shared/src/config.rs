//! Application configuration for the BioNLP corpus adapter.
//!
//! User config lives at `~/.bionlp/bionlp.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BioNlpError, Result};
use crate::types::SchemaKind;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "bionlp.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".bionlp";

/// Directory name under the platform cache dir for downloaded archives.
const CACHE_DIR_NAME: &str = "bionlp";

/// Where the shared-task archives are published.
pub const DEFAULT_URL_BASE: &str =
    "http://www.nactem.ac.uk/GENIA/current/Shared-tasks/BioNLP-ST-2009/";

// ---------------------------------------------------------------------------
// Config structs (matching bionlp.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Archive download settings.
    #[serde(default)]
    pub download: DownloadSettings,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default export directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Default output schema: "source" or "bigbio_kb".
    #[serde(default = "default_schema")]
    pub schema: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            schema: default_schema(),
        }
    }
}

fn default_output_dir() -> String {
    "var/datasets".into()
}
fn default_schema() -> String {
    "source".into()
}

/// `[download]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSettings {
    /// Base URL the three archive names are joined onto.
    #[serde(default = "default_url_base")]
    pub url_base: String,

    /// Cache directory override (defaults to the platform cache dir).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,

    /// HTTP timeout per archive, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Archives larger than this are rejected.
    #[serde(default = "default_max_archive_bytes")]
    pub max_archive_bytes: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            url_base: default_url_base(),
            cache_dir: None,
            timeout_secs: default_timeout_secs(),
            max_archive_bytes: default_max_archive_bytes(),
        }
    }
}

fn default_url_base() -> String {
    DEFAULT_URL_BASE.into()
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_max_archive_bytes() -> u64 {
    256 * 1024 * 1024
}

// ---------------------------------------------------------------------------
// Download config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime download configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Base URL for the corpus archives. Always ends with `/`.
    pub url_base: Url,
    /// Where archives are downloaded and extracted.
    pub cache_dir: PathBuf,
    /// HTTP timeout per archive, in seconds.
    pub timeout_secs: u64,
    /// Upper bound on archive size in bytes.
    pub max_archive_bytes: u64,
}

impl TryFrom<&AppConfig> for DownloadConfig {
    type Error = BioNlpError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let url_base = parse_url_base(&config.download.url_base)?;
        let cache_dir = match &config.download.cache_dir {
            Some(dir) => PathBuf::from(dir),
            None => default_cache_dir()?,
        };

        Ok(Self {
            url_base,
            cache_dir,
            timeout_secs: config.download.timeout_secs,
            max_archive_bytes: config.download.max_archive_bytes,
        })
    }
}

/// Parse and check a base URL: absolute, http(s), trailing slash.
pub fn parse_url_base(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| BioNlpError::config(format!("invalid url_base '{raw}': {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(BioNlpError::config(format!(
            "url_base '{raw}' must use http or https"
        )));
    }
    if !url.path().ends_with('/') {
        return Err(BioNlpError::config(format!(
            "url_base '{raw}' must end with '/'"
        )));
    }

    Ok(url)
}

impl AppConfig {
    /// The configured default schema, validated.
    pub fn default_schema(&self) -> Result<SchemaKind> {
        self.defaults.schema.parse()
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.bionlp/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BioNlpError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.bionlp/bionlp.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Platform cache directory for archives (`~/.cache/bionlp` on Linux).
pub fn default_cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir()
        .ok_or_else(|| BioNlpError::config("could not determine cache directory"))?;
    Ok(base.join(CACHE_DIR_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BioNlpError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        BioNlpError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    config.default_schema()?;
    parse_url_base(&config.download.url_base)?;

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BioNlpError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BioNlpError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BioNlpError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("nactem.ac.uk"));
        assert!(!toml_str.contains("cache_dir"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.schema, "source");
        assert_eq!(parsed.download.timeout_secs, 300);
        assert_eq!(parsed.default_schema().unwrap(), SchemaKind::Source);
    }

    #[test]
    fn config_with_overrides() {
        let toml_str = r#"
[defaults]
schema = "bigbio_kb"

[download]
url_base = "https://mirror.example.org/bionlp09/"
cache_dir = "/tmp/bionlp-cache"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.default_schema().unwrap(), SchemaKind::BigbioKb);

        let download = DownloadConfig::try_from(&config).expect("download config");
        assert_eq!(download.cache_dir, PathBuf::from("/tmp/bionlp-cache"));
        assert_eq!(download.url_base.host_str(), Some("mirror.example.org"));
        assert_eq!(download.max_archive_bytes, 256 * 1024 * 1024);
    }

    #[test]
    fn url_base_validation() {
        assert!(parse_url_base(DEFAULT_URL_BASE).is_ok());

        let err = parse_url_base("https://example.org/no-slash").unwrap_err();
        assert!(err.to_string().contains("must end with '/'"));

        let err = parse_url_base("ftp://example.org/").unwrap_err();
        assert!(err.to_string().contains("http or https"));

        assert!(parse_url_base("not a url").is_err());
    }

    #[test]
    fn load_rejects_unknown_schema() {
        let dir = std::env::temp_dir().join(format!("bionlp-config-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[defaults]\nschema = \"bigbio_qa\"\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("unknown schema"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
