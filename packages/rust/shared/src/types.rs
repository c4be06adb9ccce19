//! Core domain types shared by the adapter crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BioNlpError;

/// Current schema version for the export manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// SchemaKind
// ---------------------------------------------------------------------------

/// Output schema a builder config produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    /// Mirrors the brat annotation structure.
    Source,
    /// Normalized cross-corpus knowledge-base shape.
    BigbioKb,
}

impl SchemaKind {
    /// Name used in config names and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::BigbioKb => "bigbio_kb",
        }
    }
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SchemaKind {
    type Err = BioNlpError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "source" => Ok(Self::Source),
            "bigbio_kb" => Ok(Self::BigbioKb),
            other => Err(BioNlpError::config(format!(
                "unknown schema '{other}' (expected 'source' or 'bigbio_kb')"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Split
// ---------------------------------------------------------------------------

/// Canonical dataset partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
    Validation,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Test => "test",
            Self::Validation => "validation",
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DatasetManifest
// ---------------------------------------------------------------------------

/// The `manifest.json` written next to the exported split files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Identifier of the export run (UUID v7, time-sortable).
    pub run_id: Uuid,
    /// Builder config name, e.g. `bionlp_shared_task_2009_source`.
    pub config_name: String,
    /// Output schema of every record in the export.
    pub schema: SchemaKind,
    /// Version of the builder config.
    pub dataset_version: String,
    /// Tool version that produced the export.
    pub tool_version: String,
    /// When the export started.
    pub created_at: DateTime<Utc>,
    /// When the export finished.
    pub completed_at: DateTime<Utc>,
    /// One entry per exported split, in generation order.
    pub splits: Vec<SplitSummary>,
}

impl DatasetManifest {
    /// Total number of records across all splits.
    pub fn example_count(&self) -> usize {
        self.splits.iter().map(|s| s.example_count).sum()
    }
}

/// Per-split statistics recorded in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitSummary {
    /// Canonical split.
    pub split: Split,
    /// Split name as used by the corpus (`train`, `test`, `dev`).
    pub source_name: String,
    /// File name of the JSONL export, relative to the manifest.
    pub file: String,
    /// Number of records written.
    pub example_count: usize,
    /// SHA-256 of the JSONL file contents.
    pub sha256: String,
}
