use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ObjectError {
    #[error("YAML block is missing \"apiVersion\", \"kind\", and or \"metadata.name\" values. These values must be provided for each block. Failed block: {0}")]
    MalformedObject(String),

    #[error("failed to deserialize yaml document: {0:?}")]
    YamlDeserializeError(serde_yaml::Error),
}

/// Structural kind of a value. Matching branches on this instead of
/// re-inspecting types at every comparison site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

pub fn value_kind(value: &Value) -> Kind {
    match value {
        Value::Null => Kind::Null,
        Value::Bool(_) => Kind::Boolean,
        Value::Number(_) => Kind::Number,
        Value::String(_) => Kind::String,
        Value::Array(_) => Kind::Array,
        Value::Object(_) => Kind::Object,
    }
}

/// Ensure a parsed document carries the fields needed to uniquely identify
/// a k8s object in the rendered template.
pub fn validate_object(value: &Value) -> Result<(), ObjectError> {
    let has_identity = value.is_object()
        && value.get("apiVersion").is_some()
        && value.get("kind").is_some()
        && find_value(value, "metadata.name").is_some();

    if has_identity {
        Ok(())
    } else {
        Err(ObjectError::MalformedObject(as_yaml(value)))
    }
}

/// Whether two objects denote the same resource: strict equality of
/// `apiVersion`, `kind`, and `metadata.name`. Both sides must already have
/// passed [validate_object].
pub fn same_identity(a: &Value, b: &Value) -> bool {
    a.get("apiVersion") == b.get("apiVersion")
        && a.get("kind") == b.get("kind")
        && find_value(a, "metadata.name") == find_value(b, "metadata.name")
}

/// Whether `expected` is a covered subset of `actual`.
///
/// The relation is asymmetric: every key and every listed element of
/// `expected` must be present and matching in `actual`, while fields of
/// `actual` that `expected` does not mention are ignored. Scalars of the
/// same kind compare by equality; any kind mismatch fails.
pub fn satisfies(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => object_satisfies(actual, expected),
        (Value::Array(actual), Value::Array(expected)) => sequence_satisfies(actual, expected),
        (actual, expected) if value_kind(actual) == value_kind(expected) => actual == expected,
        _ => false,
    }
}

fn object_satisfies(actual: &Map<String, Value>, expected: &Map<String, Value>) -> bool {
    let mut simple_keys = Vec::new();
    for (key, expected_value) in expected {
        let actual_value = match actual.get(key) {
            Some(value) => value,
            None => return false,
        };

        if value_kind(actual_value) != value_kind(expected_value) {
            return false;
        }

        // Mappings and sequences need to be handled separately from the
        // simple subset comparison
        match (actual_value, expected_value) {
            (Value::Object(_), Value::Object(_)) => {
                if !satisfies(actual_value, expected_value) {
                    return false;
                }
            }
            (Value::Array(actual_items), Value::Array(expected_items)) => {
                if !sequence_satisfies(actual_items, expected_items) {
                    return false;
                }
            }
            _ => simple_keys.push(key),
        }
    }

    // The remaining scalar expectations must be a subset of the actual entries
    simple_keys
        .iter()
        .all(|key| actual.get(*key) == expected.get(*key))
}

/// Greedy coverage check over a sequence. Each expected element claims the
/// first actual element satisfying it; a claimed element leaves the
/// candidate pool so it cannot satisfy a second expected element. Unclaimed
/// actual elements are ignored.
///
/// There is no backtracking: an earlier expected element can claim the only
/// candidate a later one would have matched, in which case overlapping
/// expectations report a mismatch even though a different assignment exists.
fn sequence_satisfies(actual: &[Value], expected: &[Value]) -> bool {
    let mut candidates: Vec<&Value> = actual.iter().collect();
    for expected_element in expected {
        match candidates
            .iter()
            .position(|candidate| satisfies(candidate, expected_element))
        {
            Some(found) => {
                candidates.remove(found);
            }
            None => return false,
        }
    }
    true
}

/// Result of looking a fragment up in the rendered object set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// No rendered object shares the fragment's identity triple.
    NoCandidate,
    Satisfied,
    NotSatisfied,
}

/// Find the rendered object with the fragment's identity and check whether
/// it satisfies the fragment. The first identity candidate decides; later
/// objects with the same triple are not consulted.
pub fn find_match(rendered: &[Value], fragment: &Value) -> MatchOutcome {
    for object in rendered {
        if same_identity(object, fragment) {
            debug!(
                "identity candidate found for {:?}/{:?}",
                fragment.get("kind"),
                find_value(fragment, "metadata.name")
            );
            return if satisfies(object, fragment) {
                MatchOutcome::Satisfied
            } else {
                MatchOutcome::NotSatisfied
            };
        }
    }
    MatchOutcome::NoCandidate
}

/// Parse a multi-document yaml stream into json values, discarding empty
/// documents (null, empty mapping, empty sequence).
pub fn parse_documents(text: &str) -> Result<Vec<Value>, ObjectError> {
    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let d = serde_yaml::Value::deserialize(document)
            .map_err(ObjectError::YamlDeserializeError)?;
        let value: Value = serde_yaml::from_value(d).map_err(ObjectError::YamlDeserializeError)?;
        if is_empty_document(&value) {
            continue;
        }
        docs.push(value);
    }
    debug!("parsed {} non-empty yaml documents", docs.len());
    Ok(docs)
}

fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Render a value as yaml for error messages and diagnostic dumps.
pub fn as_yaml(value: &Value) -> String {
    serde_yaml::to_string(value).unwrap_or_else(|_| value.to_string())
}

fn find_value<'a>(resource: &'a Value, dotted_path: &str) -> Option<&'a Value> {
    let mut at = resource;
    for key in dotted_path.split('.') {
        at = at.as_object()?.get(key)?;
    }
    Some(at)
}
