//! Entities extracted from sheet records.
//!
//! Each tagging column becomes an entity whose values are the distinct cells
//! of that column, so intent nodes can match them in user input.

use crate::types::{Entity, EntityValue, Record};
use serde_json::Map;
use std::collections::BTreeSet;

pub const LABELS_ENTITY: &str = "rótulos";
pub const MODIFIER_ENTITY: &str = "modificador";
pub const NOUN_ENTITY: &str = "substantivo";
pub const RECIPIENT_ENTITY: &str = "recipiente";

/// The four tagging entities, sorted by name, with fuzzy matching on.
///
/// Values have `-` replaced by a space; labels are split on `_` first.
pub fn from_records(records: &[Record]) -> Vec<Entity> {
    let mut entities = vec![
        entity(LABELS_ENTITY, records.iter().flat_map(Record::label_list)),
        entity(MODIFIER_ENTITY, records.iter().map(|r| r.modifier.as_str())),
        entity(NOUN_ENTITY, records.iter().map(|r| r.noun.as_str())),
        entity(RECIPIENT_ENTITY, records.iter().map(|r| r.recipient.as_str())),
    ];
    entities.sort_by(|a, b| a.name.cmp(&b.name));
    entities
}

fn entity<'a>(name: &str, cells: impl Iterator<Item = &'a str>) -> Entity {
    let values: BTreeSet<String> = cells
        .map(|c| c.trim().replace('-', " "))
        .filter(|v| !v.is_empty())
        .collect();
    Entity {
        name: name.to_string(),
        values: values.into_iter().map(EntityValue::synonyms).collect(),
        fuzzy_match: true,
        extra: Map::new(),
    }
}
