//! Merging of keyed JSON collections.
//!
//! Lists of scalars merge into their deduplicated union. Lists of objects are
//! joined on a natural key, a field that is present, non-empty, scalar and
//! unique in every object of both lists. Objects sharing a key are merged
//! recursively; on scalar conflicts the right-hand side wins.

use crate::node::is_empty_value;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

/// Rank given to keys absent from a [`KeyPriority`].
const DEFAULT_RANK: u32 = 999;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("incompatible collections: no natural key shared by both sides (left: {left:?}, right: {right:?})")]
    IncompatibleCollections { left: Vec<String>, right: Vec<String> },
    #[error("cannot merge a list of scalars with a list of records")]
    MixedLists,
    #[error("type mismatch at key '{key}': left is {left}, right is {right}")]
    TypeMismatch {
        key: String,
        left: &'static str,
        right: &'static str,
    },
}

/// Preference among candidate natural keys; lower rank wins.
#[derive(Debug, Clone, Default)]
pub struct KeyPriority(BTreeMap<String, u32>);

impl KeyPriority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, rank: u32) -> Self {
        self.0.insert(key.into(), rank);
        self
    }

    fn rank(&self, key: &str) -> u32 {
        self.0.get(key).copied().unwrap_or(DEFAULT_RANK)
    }
}

/// Merge two lists. See the module docs for the rules.
pub fn merge(a: &[Value], b: &[Value], priority: &KeyPriority) -> Result<Vec<Value>, MergeError> {
    let a_flat = a.iter().all(is_flat);
    let b_flat = b.iter().all(is_flat);

    if a_flat && b_flat {
        return Ok(union(a, b));
    }
    if a.is_empty() || b.is_empty() {
        return Ok(if a.is_empty() { b.to_vec() } else { a.to_vec() });
    }
    if a_flat || b_flat {
        return Err(MergeError::MixedLists);
    }

    let (Some(a_records), Some(b_records)) = (as_records(a), as_records(b)) else {
        return Err(MergeError::MixedLists);
    };

    let a_keys = natural_keys(&a_records);
    let b_keys = natural_keys(&b_records);
    let mut common: Vec<&String> = a_keys.iter().filter(|k| b_keys.contains(k)).collect();
    common.sort_by_key(|k| priority.rank(k));
    let Some(key) = common.first() else {
        return Err(MergeError::IncompatibleCollections {
            left: a_keys,
            right: b_keys,
        });
    };

    let a_index: HashMap<String, &Map<String, Value>> = a_records
        .iter()
        .map(|r| (index_key(&r[key.as_str()]), *r))
        .collect();
    let b_index: HashSet<String> = b_records
        .iter()
        .map(|r| index_key(&r[key.as_str()]))
        .collect();

    let mut out = Vec::with_capacity(a_records.len() + b_records.len());
    for record in &b_records {
        let merged = match a_index.get(&index_key(&record[key.as_str()])) {
            Some(old) => merge_records(old, record, priority)?,
            None => (*record).clone(),
        };
        out.push(Value::Object(merged));
    }
    for record in &a_records {
        if !b_index.contains(&index_key(&record[key.as_str()])) {
            out.push(Value::Object((*record).clone()));
        }
    }
    Ok(out)
}

/// Merge two objects; `b` wins on scalar conflicts, nested collections are
/// merged recursively.
pub fn merge_records(
    a: &Map<String, Value>,
    b: &Map<String, Value>,
    priority: &KeyPriority,
) -> Result<Map<String, Value>, MergeError> {
    let mut out = b.clone();
    for (key, a_value) in a {
        let Some(b_value) = out.get(key) else {
            out.insert(key.clone(), a_value.clone());
            continue;
        };
        let merged = match (a_value, b_value) {
            (Value::Array(a_list), Value::Array(b_list)) => {
                Value::Array(merge(a_list, b_list, priority)?)
            }
            (Value::Object(a_map), Value::Object(b_map)) => {
                Value::Object(merge_records(a_map, b_map, priority)?)
            }
            (Value::Array(_) | Value::Object(_), other) => {
                return Err(MergeError::TypeMismatch {
                    key: key.clone(),
                    left: kind(a_value),
                    right: kind(other),
                })
            }
            _ => continue,
        };
        out.insert(key.clone(), merged);
    }
    Ok(out)
}

/// Keys usable to join the records of a list: present, truthy, scalar and
/// unique in every record. Returned in key order of the first record.
pub fn natural_keys(records: &[&Map<String, Value>]) -> Vec<String> {
    let Some(first) = records.first() else {
        return Vec::new();
    };
    first
        .keys()
        .filter(|key| {
            let mut seen = HashSet::new();
            records.iter().all(|r| match r.get(key.as_str()) {
                Some(v) => is_flat(v) && is_truthy(v) && seen.insert(index_key(v)),
                None => false,
            })
        })
        .cloned()
        .collect()
}

fn union(a: &[Value], b: &[Value]) -> Vec<Value> {
    let mut seen = HashSet::new();
    a.iter()
        .chain(b)
        .filter(|v| !is_empty_value(v) && seen.insert(index_key(v)))
        .cloned()
        .collect()
}

fn as_records(list: &[Value]) -> Option<Vec<&Map<String, Value>>> {
    list.iter().map(Value::as_object).collect()
}

fn is_flat(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn index_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
