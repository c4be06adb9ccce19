//! Line parser for brat standoff annotation files.
//!
//! Each non-empty line is one annotation, tab-separated:
//! - `T1\tProtein 0 5\tIL-10` text-bound (discontinuous: `0 5;9 12`)
//! - `E1\tBinding:T3 Theme:T1 Theme2:T2` event
//! - `R1\tPart-of Arg1:T1 Arg2:T2` relation
//! - `*\tEquiv T1 T2` equivalence
//! - `A1\tNegation E1` / `M1\tSpeculation E2` attribute
//! - `N1\tReference T1 UniProt:P05231\tIL-6` normalization
//! - `#1\tAnnotatorNotes T1\t...` note (ignored)

use std::path::Path;
use std::sync::LazyLock;

use bionlp_shared::{BioNlpError, Result};
use regex::Regex;
use tracing::debug;

use crate::{
    Argument, Attribute, BratDocument, Equivalence, Event, Normalization, Relation, TextBound,
};

/// Matches one `start end` span of a text-bound annotation.
static SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s+(\d+)\s*$").expect("span regex"));

/// Parse every line of one annotation file into `doc`.
///
/// `source` is only used for error messages.
pub(crate) fn parse_annotation_lines(
    doc: &mut BratDocument,
    source: &Path,
    content: &str,
) -> Result<()> {
    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let lineno = i + 1;
        let err = |msg: String| BioNlpError::parse(source, lineno, msg);

        match line.as_bytes()[0] {
            b'T' => doc.text_bound_annotations.push(parse_text_bound(line).map_err(err)?),
            b'E' => doc.events.push(parse_event(line).map_err(err)?),
            b'R' => doc.relations.push(parse_relation(line).map_err(err)?),
            b'*' => doc.equivalences.push(parse_equivalence(line).map_err(err)?),
            b'A' | b'M' => doc.attributes.push(parse_attribute(line).map_err(err)?),
            b'N' => doc.normalizations.push(parse_normalization(line).map_err(err)?),
            b'#' => {}
            _ => debug!(path = %source.display(), line = lineno, "skipping unrecognised annotation line"),
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Per-kind parsers
// ---------------------------------------------------------------------------

type LineResult<T> = std::result::Result<T, String>;

/// Split a line into its id and the annotation body (second tab field).
fn id_and_body(line: &str) -> LineResult<(&str, &str, Option<&str>)> {
    let mut fields = line.splitn(3, '\t');
    let id = fields.next().unwrap_or_default();
    let body = fields
        .next()
        .ok_or_else(|| format!("annotation '{id}' has no tab-separated body"))?;
    Ok((id, body, fields.next()))
}

/// Split `role:ref` (or `Type:Trigger`) at the first colon.
fn role_ref(token: &str) -> LineResult<(&str, &str)> {
    match token.split_once(':') {
        Some((role, id)) if !role.is_empty() && !id.is_empty() => Ok((role, id)),
        _ => Err(format!("expected 'ROLE:ID', found '{token}'")),
    }
}

fn parse_text_bound(line: &str) -> LineResult<TextBound> {
    let (id, body, text) = id_and_body(line)?;
    let text = text.ok_or_else(|| format!("text-bound annotation '{id}' has no text field"))?;

    let (kind, span_str) = body
        .split_once(' ')
        .ok_or_else(|| format!("text-bound annotation '{id}' has no offsets"))?;

    let mut offsets = Vec::new();
    for span in span_str.split(';') {
        let caps = SPAN_RE
            .captures(span)
            .ok_or_else(|| format!("invalid span '{span}' in '{id}'"))?;
        let start: usize = caps[1].parse().map_err(|e| format!("offset in '{id}': {e}"))?;
        let end: usize = caps[2].parse().map_err(|e| format!("offset in '{id}': {e}"))?;
        if start > end {
            return Err(format!("span {start} {end} in '{id}' ends before it starts"));
        }
        offsets.push([start, end]);
    }

    let text = split_fragments(text, &offsets);

    Ok(TextBound {
        id: id.to_string(),
        offsets,
        text,
        kind: kind.to_string(),
    })
}

/// Cut the text of a discontinuous annotation into one chunk per span.
///
/// brat joins fragments with a single space, so each chunk is taken by the
/// span length and any spaces before the next chunk are skipped.
fn split_fragments(text: &str, offsets: &[[usize; 2]]) -> Vec<String> {
    if offsets.len() <= 1 {
        return vec![text.to_string()];
    }

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::with_capacity(offsets.len());
    let mut i = 0;

    for [start, end] in offsets {
        let from = i.min(chars.len());
        i = i.saturating_add(end - start);
        let to = i.min(chars.len());
        chunks.push(chars[from..to].iter().collect());
        while i < chars.len() && chars[i] == ' ' {
            i += 1;
        }
    }

    chunks
}

fn parse_event(line: &str) -> LineResult<Event> {
    let (id, body, _) = id_and_body(line)?;
    let mut tokens = body.split_whitespace();

    let head = tokens
        .next()
        .ok_or_else(|| format!("event '{id}' has no type"))?;
    let (kind, trigger) = role_ref(head)?;

    let arguments = tokens
        .map(|token| {
            role_ref(token).map(|(role, ref_id)| Argument {
                role: role.to_string(),
                ref_id: ref_id.to_string(),
            })
        })
        .collect::<LineResult<Vec<_>>>()?;

    Ok(Event {
        id: id.to_string(),
        kind: kind.to_string(),
        trigger: trigger.to_string(),
        arguments,
    })
}

fn parse_relation(line: &str) -> LineResult<Relation> {
    let (id, body, _) = id_and_body(line)?;
    let tokens: Vec<&str> = body.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(format!("relation '{id}' needs a type and two arguments"));
    }

    let (_, arg1_id) = role_ref(tokens[1])?;
    let (_, arg2_id) = role_ref(tokens[2])?;

    Ok(Relation {
        id: id.to_string(),
        kind: tokens[0].to_string(),
        arg1_id: arg1_id.to_string(),
        arg2_id: arg2_id.to_string(),
        normalized: Vec::new(),
    })
}

fn parse_equivalence(line: &str) -> LineResult<Equivalence> {
    let (id, body, _) = id_and_body(line)?;
    let ref_ids = body
        .split_whitespace()
        .skip(1)
        .map(str::to_string)
        .collect();

    Ok(Equivalence {
        id: id.to_string(),
        ref_ids,
    })
}

fn parse_attribute(line: &str) -> LineResult<Attribute> {
    let (id, body, _) = id_and_body(line)?;
    let tokens: Vec<&str> = body.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(format!("attribute '{id}' needs a type and a target"));
    }

    Ok(Attribute {
        id: id.to_string(),
        kind: tokens[0].to_string(),
        ref_id: tokens[1].to_string(),
        value: tokens.get(2).map(|v| v.to_string()).unwrap_or_default(),
    })
}

fn parse_normalization(line: &str) -> LineResult<Normalization> {
    let (id, body, text) = id_and_body(line)?;
    let tokens: Vec<&str> = body.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(format!(
            "normalization '{id}' needs a type, a target and RESOURCE:ID"
        ));
    }
    let (resource_name, cuid) = role_ref(tokens[2])?;

    Ok(Normalization {
        id: id.to_string(),
        kind: tokens[0].to_string(),
        ref_id: tokens[1].to_string(),
        resource_name: resource_name.to_string(),
        cuid: cuid.to_string(),
        text: text.map(str::to_string),
    })
}
