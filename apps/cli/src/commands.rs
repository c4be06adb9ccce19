//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use bionlp_core::pipeline::{BuildConfig, BuildResult, ProgressReporter};
use bionlp_core::{BioNlpSharedTask2009, BuilderConfig};
use bionlp_fetch::{DownloadManager, HttpDownloadManager, LocalDownloadManager};
use bionlp_shared::{
    AppConfig, DownloadConfig, SchemaKind, Split, config_file_path, init_config, load_config,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// bionlp — BioNLP Shared Task 2009 corpus adapter.
#[derive(Parser)]
#[command(
    name = "bionlp",
    version,
    about = "Download the BioNLP Shared Task 2009 corpus and export it as source or bigbio_kb records.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Where archives come from.
#[derive(clap::Args, Clone, Debug, Default)]
pub(crate) struct SourceArgs {
    /// Read archives from this directory instead of downloading them.
    #[arg(long, env = "BIONLP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Cache directory for downloaded and extracted archives.
    #[arg(long, env = "BIONLP_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Base URL of the archives (overrides the config file).
    #[arg(long)]
    pub url_base: Option<String>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Print dataset metadata and the feature schema as JSON.
    Info {
        /// Output schema: source or bigbio_kb (or a full config name).
        #[arg(short, long)]
        schema: Option<String>,
    },

    /// Download and extract the archives, then print each split's directory.
    Splits {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Parse a single brat document and print its record.
    Parse {
        /// Path to the document's `.txt` file.
        file: PathBuf,

        /// Output schema: source or bigbio_kb (or a full config name).
        #[arg(short, long)]
        schema: Option<String>,
    },

    /// Download, convert, and export all splits as JSONL.
    Build {
        /// Output schema: source or bigbio_kb (or a full config name).
        #[arg(short, long)]
        schema: Option<String>,

        /// Output directory (defaults to the config file's output_dir).
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "bionlp=info",
        1 => "bionlp=debug",
        _ => "bionlp=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so JSON records on stdout stay machine-readable.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Info { schema } => cmd_info(schema.as_deref()),
        Command::Splits { source } => cmd_splits(&source).await,
        Command::Parse { file, schema } => cmd_parse(&file, schema.as_deref()),
        Command::Build {
            schema,
            out,
            source,
        } => cmd_build(schema.as_deref(), out.as_deref(), &source).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Resolve `--schema`: accepts `source`, `bigbio_kb`, or a full config name.
fn resolve_schema(flag: Option<&str>, config: &AppConfig) -> Result<SchemaKind> {
    let schema = match flag {
        None => config.default_schema()?,
        Some(name) if name.starts_with(bionlp_core::adapter::DATASET_NAME) => {
            BuilderConfig::by_name(name)?.schema
        }
        Some(name) => name.parse()?,
    };
    Ok(schema)
}

/// Merge config file download settings with CLI overrides.
fn resolve_download(config: &AppConfig, source: &SourceArgs) -> Result<DownloadConfig> {
    let mut merged = config.clone();
    if let Some(base) = &source.url_base {
        merged.download.url_base = base.clone();
    }
    if let Some(dir) = &source.cache_dir {
        merged.download.cache_dir = Some(dir.to_string_lossy().into_owned());
    }
    Ok(DownloadConfig::try_from(&merged)?)
}

/// HTTP or offline archive source, chosen by `--data-dir`.
enum Archives {
    Http(HttpDownloadManager),
    Local(LocalDownloadManager),
}

impl Archives {
    fn new(download: &DownloadConfig, source: &SourceArgs) -> Result<Self> {
        Ok(match &source.data_dir {
            Some(dir) => Self::Local(LocalDownloadManager::new(dir, &download.cache_dir)),
            None => Self::Http(HttpDownloadManager::new(download)?),
        })
    }
}

impl DownloadManager for Archives {
    async fn download_and_extract(&self, url: &Url) -> bionlp_shared::Result<PathBuf> {
        match self {
            Self::Http(m) => m.download_and_extract(url).await,
            Self::Local(m) => m.download_and_extract(url).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_info(schema: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let schema = resolve_schema(schema, &config)?;
    let adapter = BioNlpSharedTask2009::for_schema(schema)?;

    println!("{}", serde_json::to_string_pretty(&adapter.info())?);
    Ok(())
}

async fn cmd_splits(source: &SourceArgs) -> Result<()> {
    let config = load_config()?;
    let download = resolve_download(&config, source)?;
    let archives = Archives::new(&download, source)?;

    let adapter = BioNlpSharedTask2009::new(BuilderConfig::default(), download.url_base.clone());
    let splits = adapter.split_generators(&archives).await?;

    for s in splits {
        println!("{:<10} {:<6} {}", s.name, s.split, s.filepath.display());
    }
    Ok(())
}

fn cmd_parse(file: &Path, schema: Option<&str>) -> Result<()> {
    if file.extension().and_then(|e| e.to_str()) != Some("txt") {
        return Err(eyre!("expected a .txt document, got '{}'", file.display()));
    }

    let config = load_config()?;
    let schema = resolve_schema(schema, &config)?;
    let adapter = BioNlpSharedTask2009::for_schema(schema)?;

    let example = adapter.example_from_file(file)?;
    println!("{}", serde_json::to_string_pretty(&example)?);
    Ok(())
}

async fn cmd_build(schema: Option<&str>, out: Option<&Path>, source: &SourceArgs) -> Result<()> {
    let config = load_config()?;
    let schema = resolve_schema(schema, &config)?;
    let download = resolve_download(&config, source)?;
    let archives = Archives::new(&download, source)?;

    let output_root = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir));

    let build_config = BuildConfig {
        schema,
        output_root,
        url_base: download.url_base.clone(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    info!(
        %schema,
        out = %build_config.output_root.display(),
        offline = source.data_dir.is_some(),
        "building dataset"
    );

    let reporter = CliProgress::new();
    let result = bionlp_core::pipeline::build_dataset(&build_config, &archives, &reporter).await?;

    println!();
    println!("  Dataset exported successfully!");
    println!("  Config:   {}", result.manifest.config_name);
    for split in &result.manifest.splits {
        println!("  {:<9} {} documents", format!("{}:", split.split), split.example_count);
    }
    println!("  Path:     {}", result.dataset_dir.display());
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = config_file_path()?;
    if path.exists() {
        return Err(eyre!("config file already exists at {}", path.display()));
    }
    let path = init_config()?;
    println!("Created {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let download = DownloadConfig::try_from(&config)?;

    println!("# {}", config_file_path()?.display());
    print!("{}", toml::to_string_pretty(&config)?);
    println!("# resolved cache dir: {}", download.cache_dir.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using indicatif spinners/bars.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn split_started(&self, split: Split, documents: usize) {
        self.spinner
            .set_message(format!("Generating {split} ({documents} documents)"));
    }

    fn example_written(&self, document_id: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Writing [{current}/{total}] {document_id}"));
    }

    fn done(&self, _result: &BuildResult) {
        self.spinner.finish_and_clear();
    }
}
