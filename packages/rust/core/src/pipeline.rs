//! End-to-end `build` pipeline: archives → splits → records → JSONL export.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, instrument};
use url::Url;
use uuid::Uuid;

use bionlp_fetch::DownloadManager;
use bionlp_shared::{
    BioNlpError, CURRENT_SCHEMA_VERSION, DatasetManifest, Result, SchemaKind, Split, SplitSummary,
};

use crate::adapter::{BioNlpSharedTask2009, BuilderConfig};
use crate::export::{self, DATASET_INFO_FILE, MANIFEST_FILE, SplitWriter};

/// Configuration for the `build_dataset` pipeline.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Output schema.
    pub schema: SchemaKind,
    /// Root directory; the export lands in `<output_root>/<config_name>/`.
    pub output_root: PathBuf,
    /// Base URL of the corpus archives.
    pub url_base: Url,
    /// Tool version string.
    pub tool_version: String,
}

/// Result of the `build_dataset` pipeline.
#[derive(Debug)]
pub struct BuildResult {
    /// Directory holding the JSONL files and manifest.
    pub dataset_dir: PathBuf,
    /// The manifest that was written.
    pub manifest: DatasetManifest,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a split starts generating.
    fn split_started(&self, split: Split, documents: usize);
    /// Called after each record is written.
    fn example_written(&self, document_id: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &BuildResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn split_started(&self, _split: Split, _documents: usize) {}
    fn example_written(&self, _document_id: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &BuildResult) {}
}

/// Run the full `build` pipeline.
///
/// 1. Resolve splits (download + extract)
/// 2. Generate each split's records and stream them to JSONL
/// 3. Write `dataset_info.json` and `manifest.json`
///
/// Any download, parse or write error aborts the build.
#[instrument(skip_all, fields(schema = %config.schema, out = %config.output_root.display()))]
pub async fn build_dataset<D>(
    config: &BuildConfig,
    dl_manager: &D,
    progress: &dyn ProgressReporter,
) -> Result<BuildResult>
where
    D: DownloadManager + Sync,
{
    let start = Instant::now();
    let created_at = Utc::now();
    let run_id = Uuid::now_v7();

    let builder = BuilderConfig::for_schema(config.schema);
    let adapter = BioNlpSharedTask2009::new(builder.clone(), config.url_base.clone());
    let dataset_dir = config.output_root.join(&builder.name);

    info!(%run_id, config = %builder.name, "starting build pipeline");

    // --- Phase 1: Resolve splits ---
    progress.phase("Downloading archives");
    let generators = adapter.split_generators(dl_manager).await?;

    // --- Phase 2: Generate + write ---
    // The split files are rewritten in place; an older manifest would no
    // longer describe them if this build fails part-way.
    let manifest_path = dataset_dir.join(MANIFEST_FILE);
    if manifest_path.is_file() {
        std::fs::remove_file(&manifest_path).map_err(|e| BioNlpError::io(&manifest_path, e))?;
        debug!(path = %manifest_path.display(), "removed previous manifest");
    }

    let mut summaries = Vec::with_capacity(generators.len());

    for generator in &generators {
        progress.phase(&format!("Generating {} split", generator.name));

        let examples = adapter.generate_examples(&generator.filepath, generator.split)?;
        let total = examples.remaining();
        progress.split_started(generator.name, total);

        let mut writer = SplitWriter::create(&dataset_dir, generator.name)?;
        for item in examples {
            let (index, example) = item?;
            writer.write(&example)?;
            progress.example_written(example.document_id(), index + 1, total);
        }
        let written = writer.finish()?;

        info!(
            split = %generator.name,
            examples = written.example_count,
            "split exported"
        );

        let file = written
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| BioNlpError::validation("split file has no name"))?;

        summaries.push(SplitSummary {
            split: generator.name,
            source_name: generator.split.to_string(),
            file,
            example_count: written.example_count,
            sha256: written.sha256,
        });
    }

    // --- Phase 3: Metadata ---
    progress.phase("Writing metadata");
    std::fs::create_dir_all(&dataset_dir).map_err(|e| BioNlpError::io(&dataset_dir, e))?;
    export::write_json(&dataset_dir.join(DATASET_INFO_FILE), &adapter.info())?;

    let manifest = DatasetManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        run_id,
        config_name: builder.name.clone(),
        schema: config.schema,
        dataset_version: builder.version.to_string(),
        tool_version: config.tool_version.clone(),
        created_at,
        completed_at: Utc::now(),
        splits: summaries,
    };
    export::write_json(&manifest_path, &manifest)?;

    let result = BuildResult {
        dataset_dir,
        manifest,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        %run_id,
        examples = result.manifest.example_count(),
        elapsed_ms = result.elapsed.as_millis(),
        "build pipeline complete"
    );

    Ok(result)
}
