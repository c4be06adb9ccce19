//! Writes generated records and dataset metadata to disk.
//!
//! Layout of one export:
//! ```text
//! <output_root>/<config_name>/
//! ├── dataset_info.json
//! ├── manifest.json
//! ├── train.jsonl
//! ├── test.jsonl
//! └── validation.jsonl
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use bionlp_shared::{BioNlpError, DatasetManifest, Result, Split};

use crate::adapter::Example;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const DATASET_INFO_FILE: &str = "dataset_info.json";

/// Streams one split's records into a JSONL file, hashing as it goes.
pub struct SplitWriter {
    path: PathBuf,
    out: BufWriter<File>,
    hasher: Sha256,
    count: usize,
}

/// What a finished [`SplitWriter`] produced.
#[derive(Debug, Clone)]
pub struct WrittenSplit {
    pub path: PathBuf,
    pub example_count: usize,
    pub sha256: String,
}

impl SplitWriter {
    /// Create (or truncate) `<dir>/<split>.jsonl`.
    pub fn create(dir: &Path, split: Split) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| BioNlpError::io(dir, e))?;
        let path = dir.join(split_file_name(split));
        let file = File::create(&path).map_err(|e| BioNlpError::io(&path, e))?;

        Ok(Self {
            path,
            out: BufWriter::new(file),
            hasher: Sha256::new(),
            count: 0,
        })
    }

    /// Append one record as a single JSON line.
    pub fn write(&mut self, example: &Example) -> Result<()> {
        let mut line = serde_json::to_vec(example).map_err(|e| {
            BioNlpError::validation(format!(
                "failed to serialize {}: {e}",
                example.document_id()
            ))
        })?;
        line.push(b'\n');

        self.out
            .write_all(&line)
            .map_err(|e| BioNlpError::io(&self.path, e))?;
        self.hasher.update(&line);
        self.count += 1;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Flush the file and return its record count and content hash.
    pub fn finish(mut self) -> Result<WrittenSplit> {
        self.out
            .flush()
            .map_err(|e| BioNlpError::io(&self.path, e))?;

        debug!(path = %self.path.display(), count = self.count, "split written");

        Ok(WrittenSplit {
            path: self.path,
            example_count: self.count,
            sha256: format!("{:x}", self.hasher.finalize()),
        })
    }
}

/// `train.jsonl`, `test.jsonl` or `validation.jsonl`.
pub fn split_file_name(split: Split) -> String {
    format!("{split}.jsonl")
}

/// Write any serializable value as pretty JSON.
#[instrument(skip(value), fields(path = %path.display()))]
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        BioNlpError::validation(format!("failed to serialize {}: {e}", path.display()))
    })?;
    std::fs::write(path, json).map_err(|e| BioNlpError::io(path, e))
}

/// Read back the manifest of an export directory.
pub fn read_manifest(dataset_dir: &Path) -> Result<DatasetManifest> {
    let path = dataset_dir.join(MANIFEST_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| BioNlpError::io(&path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        BioNlpError::validation(format!("invalid manifest {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bionlp_brat::parse_brat_str;

    #[test]
    fn split_writer_counts_and_hashes_lines() {
        let dir = std::env::temp_dir().join(format!("bionlp-export-{}", uuid::Uuid::now_v7()));

        let mut writer = SplitWriter::create(&dir, Split::Validation).unwrap();
        for id in ["d1", "d2"] {
            let doc = parse_brat_str(id, "p53", "T1\tProtein 0 3\tp53\n").unwrap();
            writer.write(&Example::Source(doc)).unwrap();
        }
        assert_eq!(writer.count(), 2);
        let written = writer.finish().unwrap();

        assert_eq!(written.path, dir.join("validation.jsonl"));
        assert_eq!(written.example_count, 2);

        let content = std::fs::read_to_string(&written.path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["document_id"], "d1");

        let expected = format!("{:x}", Sha256::digest(content.as_bytes()));
        assert_eq!(written.sha256, expected);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_manifest_reports_missing_file() {
        let err = read_manifest(Path::new("/nonexistent/export")).unwrap_err();
        assert!(matches!(err, BioNlpError::Io { .. }));
    }
}
