//! End-to-end skill generation.
//!
//! sheet + prior skill → generated nodes merged with the prior skill's manual
//! nodes → organized → written as a new skill next to the prior one.

use crate::checks::{self, CheckReport};
use crate::config::{Config, ConfigError, DEFAULT_CONFIG_PATH};
use crate::factory::{FactoryError, NodeFactory};
use crate::ids::{is_generated_id, IdMinter};
use crate::merge::{self, KeyPriority, MergeError};
use crate::node::Node;
use crate::organizer::{NodeOrganizer, OrganizerError, OrganizerSettings};
use crate::records::{self, RecordError};
use crate::skill::{self, SkillDocument, SkillFileError};
use crate::{entities, intents};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Records(#[from] RecordError),
    #[error(transparent)]
    Skill(#[from] SkillFileError),
    #[error(transparent)]
    Factory(#[from] FactoryError),
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Organizer(#[from] OrganizerError),
    #[error("merged document does not fit the skill schema: {0}")]
    Schema(#[from] serde_json::Error),
}

/// Outcome of a successful [`generate`] run.
#[derive(Debug, Clone)]
pub struct Generated {
    pub output: PathBuf,
    pub records: usize,
    pub intents: usize,
    pub entities: usize,
    pub nodes: usize,
    pub report: CheckReport,
}

/// Resolve the configuration: `explicit` file if given, else the default
/// config file when present, else defaults. Relative paths resolve against
/// `root`.
pub fn load_config(explicit: Option<&Path>, root: &Path) -> Result<Config, PipelineError> {
    let default_path = root.join(DEFAULT_CONFIG_PATH);
    let mut config = match explicit {
        Some(path) => Config::from_file(path)?,
        None if default_path.exists() => Config::from_file(&default_path)?,
        None => Config::default(),
    };
    config.resolve_paths(root);
    Ok(config)
}

/// Join keys preferred when merging skill collections.
fn key_priority() -> KeyPriority {
    KeyPriority::new()
        .with("dialog_node", 0)
        .with("intent", 0)
        .with("entity", 0)
        .with("value", 0)
        .with("text", 0)
}

/// Run the whole generation and write the new skill.
pub fn generate(config: &Config) -> Result<Generated, PipelineError> {
    let records = records::read_records(&config.sheet_path)?;
    info!(records = records.len(), "records loaded");
    let old = SkillDocument::load(&config.skill_path)?;
    let priority = key_priority();

    let mut intents = merge_as(&old.intents, &intents::from_records(&records), &priority)?;
    info!(intents = intents.len(), "intents merged");

    let mut entities = merge_as(&old.entities, &entities::from_records(&records), &priority)?;
    entities.sort_by(|a, b| a.name.cmp(&b.name));
    info!(entities = entities.len(), "entities merged");

    let minter = IdMinter::from_seed(config.id_seed.as_deref());
    let generated = NodeFactory::new(minter, config.confidence).build(&records)?;
    info!(nodes = generated.len(), "nodes generated");

    let manual: Vec<&Node> = old
        .dialog_nodes
        .iter()
        .filter(|n| !is_generated_id(&n.id))
        .collect();
    let nodes = merge_nodes(&manual, &generated, &priority)?;
    info!(
        manual = manual.len(),
        dropped = old.dialog_nodes.len() - manual.len(),
        nodes = nodes.len(),
        "nodes merged"
    );

    let mut organizer = NodeOrganizer::new(nodes)?;
    organizer.run(&OrganizerSettings {
        intent_limit: config.intent_limit(),
        number_of_hints: config.number_of_hints,
    })?;

    let used: BTreeSet<String> = organizer.intents().into_iter().collect();
    let before = intents.len();
    intents.retain(|intent| used.contains(&intent.code));
    info!(kept = intents.len(), removed = before - intents.len(), "unused intents removed");

    let mut nodes = organizer.into_nodes();
    let report = checks::run(&nodes);
    for node in &mut nodes {
        node.strip_provenance();
    }

    let document = SkillDocument {
        intents,
        entities,
        dialog_nodes: nodes,
        extra: old.extra,
    };
    let output = skill::output_path(&config.skill_path, &config.output_suffix);
    document.save(&output)?;

    info!(
        output = %output.display(),
        finished_at = %chrono::Local::now().format("%H:%M"),
        "skill generated"
    );
    Ok(Generated {
        output,
        records: records.len(),
        intents: document.intents.len(),
        entities: document.entities.len(),
        nodes: document.dialog_nodes.len(),
        report,
    })
}

/// Load a skill and run the structural checks over its nodes.
pub fn check(path: &Path) -> Result<CheckReport, PipelineError> {
    let skill = SkillDocument::load(path)?;
    Ok(checks::run(&skill.dialog_nodes))
}

/// Merge typed collections through their JSON form.
fn merge_as<T>(old: &[T], new: &[T], priority: &KeyPriority) -> Result<Vec<T>, PipelineError>
where
    T: Serialize + DeserializeOwned,
{
    let old = old.iter().map(serde_json::to_value).collect::<Result<Vec<_>, _>>()?;
    let new = new.iter().map(serde_json::to_value).collect::<Result<Vec<_>, _>>()?;
    merge::merge(&old, &new, priority)?
        .into_iter()
        .map(|value| serde_json::from_value(value).map_err(PipelineError::from))
        .collect()
}

/// Merge nodes through their records, so empty fields never override.
fn merge_nodes(
    old: &[&Node],
    new: &[Node],
    priority: &KeyPriority,
) -> Result<Vec<Node>, PipelineError> {
    let old = old
        .iter()
        .map(|n| n.to_record().map(Value::Object))
        .collect::<Result<Vec<_>, _>>()?;
    let new = new
        .iter()
        .map(|n| n.to_record().map(Value::Object))
        .collect::<Result<Vec<_>, _>>()?;
    merge::merge(&old, &new, priority)?
        .into_iter()
        .map(|value| serde_json::from_value(value).map_err(PipelineError::from))
        .collect()
}
