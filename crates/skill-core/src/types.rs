//! Core types for the skill generator.
//!
//! Dialog-node enumerations, the jump instruction, sheet records and the
//! intent/entity records of a skill document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Dialog node type.
///
/// Generated grouping nodes are `Standard` (the engine only jumps into
/// standard nodes); `Folder` and the remaining variants come from manually
/// authored nodes in a skill export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    #[default]
    Standard,
    Folder,
    EventHandler,
    Frame,
    Slot,
    ResponseCondition,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Folder => "folder",
            Self::EventHandler => "event_handler",
            Self::Frame => "frame",
            Self::Slot => "slot",
            Self::ResponseCondition => "response_condition",
        }
    }
}

/// What the engine does after a node is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    GetUserInput,
    SkipUserInput,
    JumpTo,
    Reprompt,
    SkipSlot,
    SkipAllSlots,
}

impl Behavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetUserInput => "get_user_input",
            Self::SkipUserInput => "skip_user_input",
            Self::JumpTo => "jump_to",
            Self::Reprompt => "reprompt",
            Self::SkipSlot => "skip_slot",
            Self::SkipAllSlots => "skip_all_slots",
        }
    }
}

/// Which part of the jump target is evaluated first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    Condition,
    Client,
    UserInput,
    Body,
}

/// Structured jump instruction (`next_step` of a node).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextStep {
    pub behavior: Behavior,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Selector>,
    /// Jump target. `None` while a generated fallback is still unresolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog_node: Option<String>,
}

impl NextStep {
    /// Continue evaluating the node's children without waiting for input.
    pub fn skip_user_input() -> Self {
        Self {
            behavior: Behavior::SkipUserInput,
            selector: None,
            dialog_node: None,
        }
    }

    /// Jump to the body of `target`.
    pub fn jump_to(target: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::JumpTo,
            selector: Some(Selector::Body),
            dialog_node: Some(target.into()),
        }
    }

    /// Jump placeholder whose target is filled in later.
    pub fn pending_jump() -> Self {
        Self {
            behavior: Behavior::JumpTo,
            selector: Some(Selector::Body),
            dialog_node: None,
        }
    }

    /// Target id if this is a resolved jump.
    pub fn jump_target(&self) -> Option<&str> {
        match self.behavior {
            Behavior::JumpTo => self.dialog_node.as_deref().filter(|t| !t.is_empty()),
            _ => None,
        }
    }
}

/// One row of the question sheet.
///
/// Multi-valued cells keep the sheet's encoding: citations and examples are
/// joined by `--`, labels by `_`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub question: String,
    pub answer: String,
    pub source: String,
    pub intent: String,
    pub labels: String,
    pub modifier: String,
    pub noun: String,
    pub recipient: String,
    pub examples: String,
}

impl Record {
    /// Label segments of the record, in sheet order.
    pub fn label_list(&self) -> Vec<&str> {
        self.labels.split('_').filter(|l| !l.is_empty()).collect()
    }
}

/// Intent of a skill: a classifier label and its training utterances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "intent")]
    pub code: String,
    #[serde(default)]
    pub examples: Vec<Example>,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Training utterance of an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Example {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            extra: Map::new(),
        }
    }
}

/// Entity of a skill: a named set of values matched in user input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "entity")]
    pub name: String,
    #[serde(default)]
    pub values: Vec<EntityValue>,
    #[serde(default)]
    pub fuzzy_match: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One value of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityValue {
    #[serde(rename = "type", default = "EntityValue::default_kind")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EntityValue {
    fn default_kind() -> String {
        "synonyms".to_string()
    }

    pub fn synonyms(value: impl Into<String>) -> Self {
        Self {
            kind: Self::default_kind(),
            value: value.into(),
            synonyms: Vec::new(),
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&NodeType::EventHandler).unwrap(),
            "\"event_handler\""
        );
        assert_eq!(NodeType::Folder.as_str(), "folder");
    }

    #[test]
    fn jump_to_serializes_target() {
        let step = NextStep::jump_to("node_0123456789abcdef");
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "behavior": "jump_to",
                "selector": "body",
                "dialog_node": "node_0123456789abcdef"
            })
        );
        assert_eq!(step.jump_target(), Some("node_0123456789abcdef"));
    }

    #[test]
    fn pending_jump_has_no_target() {
        let step = NextStep::pending_jump();
        assert_eq!(step.jump_target(), None);
        let json = serde_json::to_value(&step).unwrap();
        assert!(json.get("dialog_node").is_none());
    }

    #[test]
    fn skip_user_input_is_not_a_jump() {
        assert_eq!(NextStep::skip_user_input().jump_target(), None);
    }

    #[test]
    fn label_list_skips_empty_segments() {
        let record = Record {
            labels: "oceano__fauna".to_string(),
            ..Record::default()
        };
        assert_eq!(record.label_list(), vec!["oceano", "fauna"]);
    }

    #[test]
    fn intent_keeps_unknown_fields() {
        let json = serde_json::json!({
            "intent": "q1",
            "examples": [{"text": "o que é maré?"}],
            "description": "",
            "created": "2021-11-20"
        });
        let intent: Intent = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(intent.code, "q1");
        assert_eq!(serde_json::to_value(&intent).unwrap(), json);
    }
}
