//! Dialog node tree.
//!
//! A [`Node`] owns its children while the factory builds the tree; the tree is
//! then flattened into the document-order list the skill file stores.

use crate::types::{NextStep, NodeType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

/// Condition of every fallback ("anything else") node.
pub const ANYTHING_ELSE: &str = "anything_else";

/// Keys only used while generating; never written to a skill file.
pub const PROVENANCE_KEYS: [&str; 6] = ["source", "intent", "modifier", "noun", "recipient", "labels"];

static INTENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\S+)").expect("intent pattern is valid"));

/// One dialog state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type", default)]
    pub kind: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<String>,
    #[serde(rename = "dialog_node")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_sibling: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step: Option<NextStep>,

    // Provenance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noun: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,

    /// Fields of manually authored nodes this crate does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    #[serde(skip)]
    pub children: Vec<Node>,
}

impl Node {
    /// Create an empty standard node.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            kind: NodeType::Standard,
            title: None,
            output: None,
            context: None,
            conditions: None,
            id: id.into(),
            parent: None,
            previous_sibling: None,
            next_step: None,
            source: None,
            intent: None,
            modifier: None,
            noun: None,
            recipient: None,
            labels: None,
            extra: Map::new(),
            children: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_conditions(mut self, conditions: impl Into<String>) -> Self {
        self.conditions = Some(conditions.into());
        self
    }

    pub fn with_next_step(mut self, next_step: NextStep) -> Self {
        self.next_step = Some(next_step);
        self
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_labels(mut self, labels: impl Into<String>) -> Self {
        self.labels = Some(labels.into());
        self
    }

    /// Set a single sequential text response.
    pub fn with_text_output(mut self, text: &str) -> Self {
        self.output = Some(json!({
            "generic": [{
                "values": [{"text": text}],
                "response_type": "text",
                "selection_policy": "sequential"
            }]
        }));
        self
    }

    /// Attach `child` as the last child of this node.
    pub fn add_child(&mut self, mut child: Node) {
        child.parent = Some(self.id.clone());
        if let Some(last) = self.children.last() {
            child.previous_sibling = Some(last.id.clone());
        }
        self.children.push(child);
    }

    /// Pre-order traversal: this node, then every descendant.
    pub fn flatten(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Node>) {
        out.push(self);
        for child in &self.children {
            child.collect(out);
        }
    }

    /// Consuming form of [`Node::flatten`]; children are detached.
    pub fn into_flat(self) -> Vec<Node> {
        let mut out = Vec::new();
        self.drain_into(&mut out);
        out
    }

    fn drain_into(mut self, out: &mut Vec<Node>) {
        let children = std::mem::take(&mut self.children);
        out.push(self);
        for child in children {
            child.drain_into(out);
        }
    }

    /// Serialize, dropping every empty or null field.
    pub fn to_record(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(drop_empty(map)),
            other => Err(serde::ser::Error::custom(format!(
                "node {} serialized to {other} instead of an object",
                self.id
            ))),
        }
    }

    pub fn strip_provenance(&mut self) {
        self.source = None;
        self.intent = None;
        self.modifier = None;
        self.noun = None;
        self.recipient = None;
        self.labels = None;
        for key in PROVENANCE_KEYS {
            self.extra.remove(key);
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.conditions.as_deref() == Some(ANYTHING_ELSE)
    }

    /// Intent code referenced by the node's condition (`#code`), if any.
    pub fn intent_code(&self) -> Option<&str> {
        let conditions = self.conditions.as_deref()?;
        INTENT_PATTERN
            .captures(conditions)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    /// Target of a resolved `jump_to` next step.
    pub fn jump_target(&self) -> Option<&str> {
        self.next_step.as_ref().and_then(NextStep::jump_target)
    }

    pub fn conditions_contain(&self, needle: &str) -> bool {
        self.conditions.as_deref().is_some_and(|c| c.contains(needle))
    }
}

/// Remove null, empty-string, empty-array and empty-object values.
pub fn drop_empty(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().filter(|(_, v)| !is_empty_value(v)).collect()
}

pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
