//! The BioNLP Shared Task 2009 corpus adapter.
//!
//! Declares the two builder configs, resolves the train/test/dev archives
//! through a [`DownloadManager`], and turns every `.txt` document of a split
//! into a `source` or `bigbio_kb` record.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use bionlp_brat::{BratDocument, parse_brat_file};
use bionlp_fetch::DownloadManager;
use bionlp_shared::{BioNlpError, DEFAULT_URL_BASE, Result, SchemaKind, Split, parse_url_base};

use crate::features::{Feature, kb_features, source_features};
use crate::kb::{KbDocument, brat_to_kb};

pub const DATASET_NAME: &str = "bionlp_shared_task_2009";
pub const DISPLAY_NAME: &str = "BioNLP 2009";

pub const DESCRIPTION: &str = "\
The BioNLP Shared Task 2009 was organized by GENIA Project and its corpora were curated based
on the annotations of the publicly available GENIA Event corpus and an unreleased (blind) section
of the GENIA Event corpus annotations, used for evaluation.
";

pub const HOMEPAGE: &str = "http://www.geniaproject.org/shared-tasks/bionlp-shared-task-2009";

pub const LICENSE: &str = "GENIA Project License for Annotated Corpora";

pub const CITATION: &str = r#"@inproceedings{kim-etal-2009-overview,
    title = "Overview of {B}io{NLP}{'}09 Shared Task on Event Extraction",
    author = "Kim, Jin-Dong  and
      Ohta, Tomoko  and
      Pyysalo, Sampo  and
      Kano, Yoshinobu  and
      Tsujii, Jun{'}ichi",
    booktitle = "Proceedings of the {B}io{NLP} 2009 Workshop Companion Volume for Shared Task",
    month = jun,
    year = "2009",
    address = "Boulder, Colorado",
    publisher = "Association for Computational Linguistics",
    url = "https://aclanthology.org/W09-1401",
    pages = "1--9",
}
"#;

pub const LANGUAGES: &[&str] = &["English"];

/// Whether the documents are PubMed abstracts.
pub const PUBMED: bool = true;

pub const SOURCE_VERSION: &str = "1.0.0";
pub const BIGBIO_VERSION: &str = "1.0.0";

/// Archive file names under the base URL, per split.
pub const ARCHIVES: [(Split, &str, &str); 3] = [
    (Split::Train, "train", "bionlp09_shared_task_training_data_rev2.tar.gz"),
    (
        Split::Test,
        "test",
        "bionlp09_shared_task_test_data_without_gold_annotation.tar.gz",
    ),
    (Split::Validation, "dev", "bionlp09_shared_task_development_data_rev1.tar.gz"),
];

/// Numbered argument roles collapsed onto their base role in the KB schema.
pub const ROLE_MAPPING: &[(&str, &str)] = &[
    ("Theme2", "Theme"),
    ("Theme3", "Theme"),
    ("Theme4", "Theme"),
    ("Site2", "Site"),
];

/// Tasks the corpus supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Task {
    NamedEntityRecognition,
    EventExtraction,
    CoreferenceResolution,
}

pub const SUPPORTED_TASKS: &[Task] = &[
    Task::NamedEntityRecognition,
    Task::EventExtraction,
    Task::CoreferenceResolution,
];

// ---------------------------------------------------------------------------
// Builder configs
// ---------------------------------------------------------------------------

/// One selectable output configuration of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuilderConfig {
    pub name: String,
    pub version: &'static str,
    pub description: String,
    pub schema: SchemaKind,
    pub subset_id: &'static str,
}

impl BuilderConfig {
    /// The config producing records in `schema`.
    pub fn for_schema(schema: SchemaKind) -> Self {
        let version = match schema {
            SchemaKind::Source => SOURCE_VERSION,
            SchemaKind::BigbioKb => BIGBIO_VERSION,
        };
        let description = match schema {
            SchemaKind::Source => format!("{DATASET_NAME} source schema"),
            SchemaKind::BigbioKb => format!("{DATASET_NAME} BigBio schema"),
        };

        Self {
            name: format!("{DATASET_NAME}_{schema}"),
            version,
            description,
            schema,
            subset_id: DATASET_NAME,
        }
    }

    /// Every registered config, default first.
    pub fn all() -> Vec<Self> {
        vec![
            Self::for_schema(SchemaKind::Source),
            Self::for_schema(SchemaKind::BigbioKb),
        ]
    }

    /// Find a config by its full name, e.g. `bionlp_shared_task_2009_bigbio_kb`.
    pub fn by_name(name: &str) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                let known: Vec<String> = Self::all().into_iter().map(|c| c.name).collect();
                BioNlpError::config(format!(
                    "unknown config '{name}' (expected one of: {})",
                    known.join(", ")
                ))
            })
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self::for_schema(SchemaKind::Source)
    }
}

// ---------------------------------------------------------------------------
// Describe / split types
// ---------------------------------------------------------------------------

/// Static metadata plus the feature schema of the selected config.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub config_name: String,
    pub version: &'static str,
    pub description: &'static str,
    pub features: Feature,
    pub homepage: &'static str,
    pub license: &'static str,
    pub citation: &'static str,
    pub languages: &'static [&'static str],
    pub pubmed: bool,
    pub supported_tasks: &'static [Task],
}

/// A resolved split: its canonical name, corpus name, and local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitGenerator {
    pub name: Split,
    /// Name the corpus itself uses (`train`, `test`, `dev`).
    pub split: &'static str,
    pub filepath: PathBuf,
}

/// A generated record in either schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Example {
    Source(BratDocument),
    Kb(KbDocument),
}

impl Example {
    pub fn document_id(&self) -> &str {
        match self {
            Self::Source(doc) => &doc.document_id,
            Self::Kb(doc) => &doc.document_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// The corpus adapter, bound to one builder config.
#[derive(Debug, Clone)]
pub struct BioNlpSharedTask2009 {
    config: BuilderConfig,
    url_base: Url,
}

impl BioNlpSharedTask2009 {
    /// Adapter for `config` downloading from `url_base` (must end with `/`).
    pub fn new(config: BuilderConfig, url_base: Url) -> Self {
        Self { config, url_base }
    }

    /// Adapter for `schema` using the official download location.
    pub fn for_schema(schema: SchemaKind) -> Result<Self> {
        Ok(Self::new(
            BuilderConfig::for_schema(schema),
            parse_url_base(DEFAULT_URL_BASE)?,
        ))
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn schema(&self) -> SchemaKind {
        self.config.schema
    }

    /// Describe the dataset for the selected config.
    pub fn info(&self) -> DatasetInfo {
        let features = match self.config.schema {
            SchemaKind::Source => source_features(),
            SchemaKind::BigbioKb => kb_features(),
        };

        DatasetInfo {
            config_name: self.config.name.clone(),
            version: self.config.version,
            description: DESCRIPTION,
            features,
            homepage: HOMEPAGE,
            license: LICENSE,
            citation: CITATION,
            languages: LANGUAGES,
            pubmed: PUBMED,
            supported_tasks: SUPPORTED_TASKS,
        }
    }

    /// Archive URL of every split, in train/test/dev order.
    pub fn archive_urls(&self) -> Result<Vec<(Split, &'static str, Url)>> {
        ARCHIVES
            .iter()
            .map(|(split, name, file)| {
                let url = self.url_base.join(file).map_err(|e| {
                    BioNlpError::config(format!("cannot join {file} onto {}: {e}", self.url_base))
                })?;
                Ok((*split, *name, url))
            })
            .collect()
    }

    /// Download and extract all three archives.
    #[instrument(skip_all, fields(config = %self.config.name))]
    pub async fn split_generators<D>(&self, dl_manager: &D) -> Result<Vec<SplitGenerator>>
    where
        D: DownloadManager + Sync,
    {
        let mut generators = Vec::with_capacity(ARCHIVES.len());

        for (name, split, url) in self.archive_urls()? {
            let filepath = dl_manager.download_and_extract(&url).await?;
            info!(%split, path = %filepath.display(), "split resolved");
            generators.push(SplitGenerator {
                name,
                split,
                filepath,
            });
        }

        Ok(generators)
    }

    /// Enumerate the `.txt` documents in `filepath` and return a lazy
    /// iterator of `(index, record)` pairs.
    ///
    /// Files are visited in directory order and parsed one at a time. The
    /// first failure is yielded as an error and ends the iteration.
    #[instrument(skip(self, filepath), fields(config = %self.config.name, path = %filepath.display()))]
    pub fn generate_examples(&self, filepath: &Path, split: &str) -> Result<Examples> {
        let entries = std::fs::read_dir(filepath).map_err(|e| BioNlpError::io(filepath, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| BioNlpError::io(filepath, e))?.path();
            if path.extension() == Some(OsStr::new("txt")) {
                files.push(path);
            }
        }

        debug!(files = files.len(), "documents found");

        Ok(Examples {
            schema: self.config.schema,
            files: files.into_iter(),
            index: 0,
            finished: false,
        })
    }

    /// Build the record for a single `.txt` document.
    pub fn example_from_file(&self, txt_path: &Path) -> Result<Example> {
        load_example(self.config.schema, txt_path)
    }
}

fn load_example(schema: SchemaKind, txt_path: &Path) -> Result<Example> {
    let brat = parse_brat_file(txt_path)?;
    match schema {
        SchemaKind::Source => Ok(Example::Source(brat)),
        SchemaKind::BigbioKb => {
            let mut kb = brat_to_kb(&brat)?;
            standardize_argument_roles(&mut kb);
            kb.id = kb.document_id.clone();
            Ok(Example::Kb(kb))
        }
    }
}

/// Lazily parsed records of one split.
#[derive(Debug)]
pub struct Examples {
    schema: SchemaKind,
    files: std::vec::IntoIter<PathBuf>,
    index: usize,
    finished: bool,
}

impl Examples {
    /// Number of documents not yet visited.
    pub fn remaining(&self) -> usize {
        if self.finished { 0 } else { self.files.len() }
    }
}

impl Iterator for Examples {
    type Item = Result<(usize, Example)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let path = self.files.next()?;
        match load_example(self.schema, &path) {
            Ok(example) => {
                let index = self.index;
                self.index += 1;
                Some(Ok((index, example)))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Role normalization
// ---------------------------------------------------------------------------

/// Base role for a numbered role, or the role itself.
pub fn standardize_role(role: &str) -> &str {
    ROLE_MAPPING
        .iter()
        .find(|(from, _)| *from == role)
        .map(|(_, to)| *to)
        .unwrap_or(role)
}

/// Rewrite every event argument role of `kb` through [`ROLE_MAPPING`].
pub fn standardize_argument_roles(kb: &mut KbDocument) {
    for event in &mut kb.events {
        for argument in &mut event.arguments {
            let base = standardize_role(&argument.role);
            if base != argument.role {
                argument.role = base.to_string();
            }
        }
    }
}
