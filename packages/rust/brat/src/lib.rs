//! brat standoff annotation parser.
//!
//! A brat document is a `.txt` file holding the raw text plus companion
//! annotation files sharing its stem (`.a1` for given entities, `.a2` for
//! events, `.ann` for everything in one file). This crate reads such a pair
//! into a [`BratDocument`], the record shape of the corpus `source` schema.

mod parser;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use bionlp_shared::{BioNlpError, Result};

/// Annotation file suffixes read for every document, in order.
pub const DEFAULT_ANNOTATION_SUFFIXES: &[&str] = &[".a1", ".a2", ".ann"];

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// One parsed document in the `source` schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BratDocument {
    /// File stem of the `.txt` file (e.g. `PMID-9361029`).
    pub document_id: String,
    /// Full document text.
    pub text: String,
    pub text_bound_annotations: Vec<TextBound>,
    pub events: Vec<Event>,
    pub relations: Vec<Relation>,
    pub equivalences: Vec<Equivalence>,
    pub attributes: Vec<Attribute>,
    pub normalizations: Vec<Normalization>,
}

impl BratDocument {
    /// An empty document with the given id and text.
    pub fn new(document_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// Look up a text-bound annotation by its brat id.
    pub fn text_bound(&self, id: &str) -> Option<&TextBound> {
        self.text_bound_annotations.iter().find(|t| t.id == id)
    }
}

/// A `T` line: a typed span (or spans) of the document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBound {
    pub id: String,
    /// `[start, end)` character offsets, one pair per fragment.
    pub offsets: Vec<[usize; 2]>,
    /// Covered text, one string per fragment.
    pub text: Vec<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

/// An `E` line: an event anchored on a trigger with role-labelled arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub arguments: Vec<Argument>,
    pub id: String,
    /// Id of the text-bound annotation acting as trigger.
    pub trigger: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A single `Role:Id` event argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub ref_id: String,
    pub role: String,
}

/// An `R` line: a typed binary relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub arg1_id: String,
    pub arg2_id: String,
    pub normalized: Vec<DbReference>,
}

/// A link into an external database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbReference {
    pub db_name: String,
    pub db_id: String,
}

/// A `*` line: a group of annotations referring to the same thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equivalence {
    pub id: String,
    pub ref_ids: Vec<String>,
}

/// An `A` or `M` line: a flag or value attached to another annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ref_id: String,
    /// Empty for binary attributes.
    pub value: String,
}

/// An `N` line: a database normalization of another annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ref_id: String,
    pub resource_name: String,
    pub cuid: String,
    /// Optional free text after the reference; `null` when absent.
    #[serde(default)]
    pub text: Option<String>,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse a `.txt` file and its `.a1`/`.a2`/`.ann` companions.
pub fn parse_brat_file(txt_path: &Path) -> Result<BratDocument> {
    parse_brat_file_with(txt_path, DEFAULT_ANNOTATION_SUFFIXES)
}

/// Parse a `.txt` file, reading only the annotation files with `suffixes`.
///
/// Missing annotation files are not an error; a document with no
/// annotations at all yields empty lists.
#[instrument(skip(suffixes), fields(path = %txt_path.display()))]
pub fn parse_brat_file_with(txt_path: &Path, suffixes: &[&str]) -> Result<BratDocument> {
    let document_id = txt_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| {
            BioNlpError::validation(format!("{} has no file name", txt_path.display()))
        })?;

    let text =
        std::fs::read_to_string(txt_path).map_err(|e| BioNlpError::io(txt_path, e))?;

    let mut doc = BratDocument::new(document_id, text);

    for path in annotation_paths(txt_path, suffixes) {
        if !path.is_file() {
            continue;
        }
        let content = std::fs::read_to_string(&path).map_err(|e| BioNlpError::io(&path, e))?;
        parser::parse_annotation_lines(&mut doc, &path, &content)?;
    }

    debug!(
        document_id = %doc.document_id,
        text_bound = doc.text_bound_annotations.len(),
        events = doc.events.len(),
        relations = doc.relations.len(),
        "parsed brat document"
    );

    Ok(doc)
}

/// Parse an in-memory document whose annotations are given as one string.
pub fn parse_brat_str(
    document_id: impl Into<String>,
    text: impl Into<String>,
    annotations: &str,
) -> Result<BratDocument> {
    let mut doc = BratDocument::new(document_id, text);
    let source = PathBuf::from(format!("{}.ann", doc.document_id));
    parser::parse_annotation_lines(&mut doc, &source, annotations)?;
    Ok(doc)
}

/// Companion annotation paths for a text file (`doc.txt` -> `doc.a1`, ...).
fn annotation_paths(txt_path: &Path, suffixes: &[&str]) -> Vec<PathBuf> {
    suffixes
        .iter()
        .map(|suffix| txt_path.with_extension(suffix.trim_start_matches('.')))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from("../../../fixtures/brat").join(name)
    }

    #[test]
    fn parses_fixture_with_a1_and_a2() {
        let doc = parse_brat_file(&fixture("PMID-9361029.txt")).expect("parse fixture");

        assert_eq!(doc.document_id, "PMID-9361029");
        assert!(doc.text.starts_with("Interleukin-10"));

        // Proteins from .a1, triggers from .a2
        let kinds: Vec<&str> = doc
            .text_bound_annotations
            .iter()
            .map(|t| t.kind.as_str())
            .collect();
        assert!(kinds.contains(&"Protein"));
        assert!(kinds.contains(&"Positive_regulation"));
        assert_eq!(doc.events.len(), 3);
        assert_eq!(doc.attributes.len(), 1);
    }

    #[test]
    fn offsets_match_document_text() {
        let doc = parse_brat_file(&fixture("PMID-9361029.txt")).expect("parse fixture");
        let chars: Vec<char> = doc.text.chars().collect();

        for t in &doc.text_bound_annotations {
            for ([start, end], text) in t.offsets.iter().zip(&t.text) {
                let covered: String = chars[*start..*end].iter().collect();
                assert_eq!(&covered, text, "annotation {}", t.id);
            }
        }
    }

    #[test]
    fn text_without_annotations_is_empty_document() {
        let dir = std::env::temp_dir().join(format!("bionlp-brat-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let txt = dir.join("lonely.txt");
        std::fs::write(&txt, "No annotations here.").unwrap();

        let doc = parse_brat_file(&txt).unwrap();
        assert_eq!(doc.document_id, "lonely");
        assert_eq!(doc.text, "No annotations here.");
        assert!(doc.text_bound_annotations.is_empty());
        assert!(doc.events.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_text_file_is_io_error() {
        let err = parse_brat_file(Path::new("/nonexistent/doc.txt")).unwrap_err();
        assert!(matches!(err, BioNlpError::Io { .. }));
    }

    #[test]
    fn custom_suffixes_limit_annotation_files() {
        let doc = parse_brat_file_with(&fixture("PMID-9361029.txt"), &[".a1"]).unwrap();
        assert!(doc.events.is_empty());
        assert!(doc.text_bound_annotations.iter().all(|t| t.kind == "Protein"));
    }

    #[test]
    fn source_record_serializes_type_field() {
        let doc = parse_brat_str("d1", "p53 binds", "T1\tProtein 0 3\tp53\n").unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["text_bound_annotations"][0]["type"], "Protein");
        assert_eq!(json["text_bound_annotations"][0]["offsets"][0][1], 3);
        assert_eq!(json["document_id"], "d1");
    }
}
