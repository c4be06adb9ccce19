//! Conversion of parsed brat documents into the knowledge-base schema.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use bionlp_brat::{Argument, BratDocument, DbReference, Relation};
use bionlp_shared::{BioNlpError, Result};

/// One document in the normalized knowledge-base schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbDocument {
    /// Record id; equal to `document_id`.
    pub id: String,
    pub document_id: String,
    pub passages: Vec<Passage>,
    pub entities: Vec<Entity>,
    pub events: Vec<KbEvent>,
    pub coreferences: Vec<Coreference>,
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Vec<String>,
    pub offsets: Vec<[usize; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Vec<String>,
    pub offsets: Vec<[usize; 2]>,
    pub normalized: Vec<DbReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub trigger: Trigger,
    pub arguments: Vec<Argument>,
}

/// Text and offsets of the annotation an event is anchored on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub text: Vec<String>,
    pub offsets: Vec<[usize; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coreference {
    pub id: String,
    pub entity_ids: Vec<String>,
}

/// Map a parsed brat document onto the KB schema.
///
/// All ids are prefixed with `<document_id>_`. Text-bound annotations used
/// as event triggers become triggers, every other one becomes an entity.
/// Relations and equivalence groups are kept only when every member is an
/// entity.
pub fn brat_to_kb(doc: &BratDocument) -> Result<KbDocument> {
    let prefix = format!("{}_", doc.document_id);
    let prefixed = |id: &str| format!("{prefix}{id}");

    let passages = vec![Passage {
        id: format!("{prefix}_text"),
        kind: "abstract".into(),
        text: vec![doc.text.clone()],
        offsets: vec![[0, doc.text.chars().count()]],
    }];

    let mut normalizations: HashMap<&str, Vec<DbReference>> = HashMap::new();
    for n in &doc.normalizations {
        normalizations
            .entry(n.ref_id.as_str())
            .or_default()
            .push(DbReference {
                db_name: n.resource_name.clone(),
                db_id: n.cuid.clone(),
            });
    }

    let mut trigger_ids: HashSet<&str> = HashSet::new();
    let mut events = Vec::with_capacity(doc.events.len());
    for event in &doc.events {
        let trigger = doc.text_bound(&event.trigger).ok_or_else(|| {
            BioNlpError::validation(format!(
                "{}: event {} references unknown trigger {}",
                doc.document_id, event.id, event.trigger
            ))
        })?;
        trigger_ids.insert(trigger.id.as_str());

        events.push(KbEvent {
            id: prefixed(&event.id),
            kind: event.kind.clone(),
            trigger: Trigger {
                text: trigger.text.clone(),
                offsets: trigger.offsets.clone(),
            },
            arguments: event
                .arguments
                .iter()
                .map(|a| Argument {
                    role: a.role.clone(),
                    ref_id: prefixed(&a.ref_id),
                })
                .collect(),
        });
    }

    let entity_anns: Vec<_> = doc
        .text_bound_annotations
        .iter()
        .filter(|t| !trigger_ids.contains(t.id.as_str()))
        .collect();
    let entity_ids: HashSet<&str> = entity_anns.iter().map(|t| t.id.as_str()).collect();

    let entities = entity_anns
        .iter()
        .map(|t| Entity {
            id: prefixed(&t.id),
            kind: t.kind.clone(),
            text: t.text.clone(),
            offsets: t.offsets.clone(),
            normalized: normalizations.get(t.id.as_str()).cloned().unwrap_or_default(),
        })
        .collect();

    let mut relations = Vec::new();
    let mut skipped = Vec::new();
    for r in &doc.relations {
        if entity_ids.contains(r.arg1_id.as_str()) && entity_ids.contains(r.arg2_id.as_str()) {
            relations.push(Relation {
                id: prefixed(&r.id),
                kind: r.kind.clone(),
                arg1_id: prefixed(&r.arg1_id),
                arg2_id: prefixed(&r.arg2_id),
                normalized: Vec::new(),
            });
        } else {
            skipped.push(r.id.as_str());
        }
    }
    if !skipped.is_empty() {
        info!(
            document_id = %doc.document_id,
            ?skipped,
            "relations between non-entities are not representable, skipping"
        );
    }

    let coreferences = doc
        .equivalences
        .iter()
        .enumerate()
        .filter(|(_, eq)| {
            eq.ref_ids
                .iter()
                .all(|id| id.starts_with('T') && entity_ids.contains(id.as_str()))
        })
        .map(|(i, eq)| Coreference {
            id: prefixed(&(i + 1).to_string()),
            entity_ids: eq.ref_ids.iter().map(|id| prefixed(id)).collect(),
        })
        .collect();

    Ok(KbDocument {
        id: doc.document_id.clone(),
        document_id: doc.document_id.clone(),
        passages,
        entities,
        events,
        coreferences,
        relations,
    })
}
