//! Skill document I/O.
//!
//! A skill export is a JSON object with `intents`, `entities` and
//! `dialog_nodes`; every other top-level field (workspace metadata, language,
//! settings) is carried through unchanged.

use crate::node::Node;
use crate::types::{Entity, Intent};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Appended to the input file stem to name the generated skill.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "2";

#[derive(Debug, Error)]
pub enum SkillFileError {
    #[error("failed to access skill file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid skill document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode skill document: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillDocument {
    #[serde(default)]
    pub intents: Vec<Intent>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub dialog_nodes: Vec<Node>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SkillDocument {
    pub fn load(path: &Path) -> Result<Self, SkillFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| SkillFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let skill: Self = serde_json::from_str(&content).map_err(|source| SkillFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            path = %path.display(),
            intents = skill.intents.len(),
            entities = skill.entities.len(),
            nodes = skill.dialog_nodes.len(),
            "skill loaded"
        );
        Ok(skill)
    }

    /// JSON form of the document; nodes drop their empty fields.
    pub fn to_value(&self) -> Result<Value, SkillFileError> {
        let mut document = self.extra.clone();
        document.insert("intents".to_string(), serde_json::to_value(&self.intents)?);
        document.insert("entities".to_string(), serde_json::to_value(&self.entities)?);
        let nodes = self
            .dialog_nodes
            .iter()
            .map(|n| n.to_record().map(Value::Object))
            .collect::<Result<Vec<_>, _>>()?;
        document.insert("dialog_nodes".to_string(), Value::Array(nodes));
        Ok(Value::Object(document))
    }

    /// Write the document to `path`, indented with four spaces.
    pub fn save(&self, path: &Path) -> Result<(), SkillFileError> {
        let mut buffer = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
        self.to_value()?.serialize(&mut serializer)?;
        buffer.push(b'\n');

        let io_error = |source| SkillFileError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = std::fs::File::create(path).map_err(io_error)?;
        file.write_all(&buffer).map_err(io_error)?;
        info!(path = %path.display(), nodes = self.dialog_nodes.len(), "skill saved");
        Ok(())
    }
}

/// `<dir>/<stem><suffix>.<ext>` for an input skill path.
pub fn output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    input.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> Value {
        json!({
            "name": "Amazônia Azul",
            "language": "pt-br",
            "intents": [{"intent": "ajuda", "examples": [{"text": "me ajude"}], "description": ""}],
            "entities": [],
            "dialog_nodes": [
                {"type": "standard", "dialog_node": "Bem-vindo", "conditions": "welcome", "title": ""}
            ],
            "system_settings": {"disambiguation": {"enabled": false}}
        })
    }

    #[test]
    fn output_path_appends_suffix_to_stem() {
        assert_eq!(
            output_path(Path::new("results/skill-Amazônia.json"), "2"),
            PathBuf::from("results/skill-Amazônia2.json")
        );
        assert_eq!(output_path(Path::new("skill"), "-novo"), PathBuf::from("skill-novo"));
    }

    #[test]
    fn unknown_fields_survive_load_and_save() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("skill.json");
        std::fs::write(&input, serde_json::to_string(&sample()).unwrap()).unwrap();

        let skill = SkillDocument::load(&input).unwrap();
        assert_eq!(skill.extra["language"], "pt-br");
        let output = output_path(&input, DEFAULT_OUTPUT_SUFFIX);
        skill.save(&output).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains("\n    \"dialog_nodes\""));
        assert!(text.contains("Amazônia Azul"), "non-ASCII must not be escaped");
        let saved: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(saved["system_settings"]["disambiguation"]["enabled"], false);
        assert_eq!(saved["intents"][0]["examples"][0]["text"], "me ajude");
        assert!(saved["dialog_nodes"][0].get("title").is_none());
    }

    #[test]
    fn invalid_json_reports_path() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.json");
        std::fs::write(&input, "{").unwrap();
        let err = SkillDocument::load(&input).unwrap_err();
        assert!(matches!(err, SkillFileError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }
}
