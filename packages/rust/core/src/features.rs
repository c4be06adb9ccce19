//! Declarative feature schemas for the two output shapes.
//!
//! A [`Feature`] tree serializes to the JSON layout dataset hubs use to
//! describe columns: leaves are `{"dtype": .., "_type": "Value"}`, lists are
//! one-element arrays, and structs are objects with ordered fields.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A node of a feature schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    /// Scalar column with a dtype such as `string` or `int64`.
    Value(&'static str),
    /// Variable-length list of the inner feature.
    List(Box<Feature>),
    /// Named fields, in declaration order.
    Struct(Vec<(&'static str, Feature)>),
}

impl Feature {
    /// Field names of a struct feature (empty for anything else).
    pub fn field_names(&self) -> Vec<&'static str> {
        match self {
            Self::Struct(fields) => fields.iter().map(|(name, _)| *name).collect(),
            _ => Vec::new(),
        }
    }

    /// Look up a direct child of a struct feature.
    pub fn field(&self, name: &str) -> Option<&Feature> {
        match self {
            Self::Struct(fields) => fields.iter().find(|(n, _)| *n == name).map(|(_, f)| f),
            _ => None,
        }
    }
}

impl Serialize for Feature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(dtype) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("dtype", dtype)?;
                map.serialize_entry("_type", "Value")?;
                map.end()
            }
            Self::List(inner) => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(inner.as_ref())?;
                seq.end()
            }
            Self::Struct(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, feature) in fields {
                    map.serialize_entry(name, feature)?;
                }
                map.end()
            }
        }
    }
}

fn string() -> Feature {
    Feature::Value("string")
}

fn list(inner: Feature) -> Feature {
    Feature::List(Box::new(inner))
}

fn offsets(dtype: &'static str) -> Feature {
    list(list(Feature::Value(dtype)))
}

fn db_references() -> Feature {
    list(Feature::Struct(vec![("db_name", string()), ("db_id", string())]))
}

/// Schema of the `source` record: the brat structure as parsed.
pub fn source_features() -> Feature {
    Feature::Struct(vec![
        ("document_id", string()),
        ("text", string()),
        (
            "text_bound_annotations",
            list(Feature::Struct(vec![
                ("id", string()),
                ("offsets", offsets("int64")),
                ("text", list(string())),
                ("type", string()),
            ])),
        ),
        (
            "events",
            list(Feature::Struct(vec![
                (
                    "arguments",
                    list(Feature::Struct(vec![("ref_id", string()), ("role", string())])),
                ),
                ("id", string()),
                ("trigger", string()),
                ("type", string()),
            ])),
        ),
        (
            "relations",
            list(Feature::Struct(vec![
                ("id", string()),
                ("type", string()),
                ("arg1_id", string()),
                ("arg2_id", string()),
                ("normalized", db_references()),
            ])),
        ),
        (
            "equivalences",
            list(Feature::Struct(vec![("id", string()), ("ref_ids", list(string()))])),
        ),
        (
            "attributes",
            list(Feature::Struct(vec![
                ("id", string()),
                ("type", string()),
                ("ref_id", string()),
                ("value", string()),
            ])),
        ),
        (
            "normalizations",
            list(Feature::Struct(vec![
                ("id", string()),
                ("type", string()),
                ("ref_id", string()),
                ("resource_name", string()),
                ("cuid", string()),
                ("text", string()),
            ])),
        ),
    ])
}

/// Schema of the normalized knowledge-base record.
pub fn kb_features() -> Feature {
    Feature::Struct(vec![
        ("id", string()),
        ("document_id", string()),
        (
            "passages",
            list(Feature::Struct(vec![
                ("id", string()),
                ("type", string()),
                ("text", list(string())),
                ("offsets", offsets("int32")),
            ])),
        ),
        (
            "entities",
            list(Feature::Struct(vec![
                ("id", string()),
                ("type", string()),
                ("text", list(string())),
                ("offsets", offsets("int32")),
                ("normalized", db_references()),
            ])),
        ),
        (
            "events",
            list(Feature::Struct(vec![
                ("id", string()),
                ("type", string()),
                (
                    "trigger",
                    Feature::Struct(vec![("text", list(string())), ("offsets", offsets("int32"))]),
                ),
                (
                    "arguments",
                    list(Feature::Struct(vec![("role", string()), ("ref_id", string())])),
                ),
            ])),
        ),
        (
            "coreferences",
            list(Feature::Struct(vec![("id", string()), ("entity_ids", list(string()))])),
        ),
        (
            "relations",
            list(Feature::Struct(vec![
                ("id", string()),
                ("type", string()),
                ("arg1_id", string()),
                ("arg2_id", string()),
                ("normalized", db_references()),
            ])),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::path::Path;

    /// Check that `value` has exactly the shape `feature` declares.
    fn conforms(feature: &Feature, value: &Value, at: &str) -> Result<(), String> {
        match (feature, value) {
            (Feature::Value(_), Value::Null) => Ok(()),
            (Feature::Value("string"), Value::String(_)) => Ok(()),
            (Feature::Value("int32" | "int64"), Value::Number(n)) if n.is_u64() => Ok(()),
            (Feature::List(inner), Value::Array(items)) => items
                .iter()
                .enumerate()
                .try_for_each(|(i, item)| conforms(inner, item, &format!("{at}[{i}]"))),
            (Feature::Struct(fields), Value::Object(map)) => {
                let mut declared: Vec<&str> = fields.iter().map(|(n, _)| *n).collect();
                let mut actual: Vec<&str> = map.keys().map(String::as_str).collect();
                declared.sort_unstable();
                actual.sort_unstable();
                if declared != actual {
                    return Err(format!("{at}: fields {actual:?}, declared {declared:?}"));
                }
                fields
                    .iter()
                    .try_for_each(|(name, f)| conforms(f, &map[*name], &format!("{at}.{name}")))
            }
            _ => Err(format!("{at}: {value} does not match {feature:?}")),
        }
    }

    fn fixture_docs() -> Vec<bionlp_brat::BratDocument> {
        ["PMID-9361029.txt", "PMID-10000001.txt"]
            .iter()
            .map(|name| {
                bionlp_brat::parse_brat_file(&Path::new("../../../fixtures/brat").join(name))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn source_records_match_declared_features() {
        let features = source_features();
        for doc in fixture_docs() {
            assert!(!doc.equivalences.is_empty() || !doc.attributes.is_empty());
            let json = serde_json::to_value(&doc).unwrap();
            conforms(&features, &json, &doc.document_id).unwrap();
        }
    }

    #[test]
    fn kb_records_match_declared_features() {
        let features = kb_features();
        for doc in fixture_docs() {
            let kb = crate::kb::brat_to_kb(&doc).unwrap();
            let json = serde_json::to_value(&kb).unwrap();
            conforms(&features, &json, &doc.document_id).unwrap();
        }
    }

    #[test]
    fn source_fields_in_declaration_order() {
        assert_eq!(
            source_features().field_names(),
            vec![
                "document_id",
                "text",
                "text_bound_annotations",
                "events",
                "relations",
                "equivalences",
                "attributes",
                "normalizations",
            ]
        );
    }

    #[test]
    fn kb_fields() {
        let kb = kb_features();
        assert_eq!(
            kb.field_names(),
            vec!["id", "document_id", "passages", "entities", "events", "coreferences", "relations"]
        );
        assert!(matches!(kb.field("events"), Some(Feature::List(_))));
        assert!(kb.field("text").is_none());
    }

    #[test]
    fn serializes_hub_layout() {
        let json = serde_json::to_value(source_features()).unwrap();
        assert_eq!(json["document_id"]["dtype"], "string");
        assert_eq!(json["document_id"]["_type"], "Value");
        assert_eq!(json["text_bound_annotations"][0]["offsets"][0][0]["dtype"], "int64");
        assert_eq!(json["events"][0]["arguments"][0]["role"]["dtype"], "string");
    }
}
