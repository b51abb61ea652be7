//! Dialog node construction from sheet records.
//!
//! Nodes are grouped in four folders, evaluated by the engine in this order:
//!
//! 1. "Sem contexto": intent nodes whose record has no known context,
//! 2. "Contexto": nodes detecting a context label and setting `$contexto`,
//! 3. "Intenção": one subfolder per context holding its intent nodes,
//! 4. "Respostas": answer nodes, matched directly by intent confidence.
//!
//! Intent nodes match modifier/noun/recipient entities and jump to their
//! answer, so classifier confidence is only the last resort. Every scope ends
//! with a fallback node jumping to the next scope.

use crate::ids::IdMinter;
use crate::node::{Node, ANYTHING_ELSE};
use crate::title::{self, TitleError};
use crate::types::{NextStep, Record};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

pub const CONTEXTLESS_FOLDER: &str = "Sem contexto";
pub const CONTEXT_FOLDER: &str = "Contexto";
pub const INTENT_FOLDER: &str = "Intenção";
pub const ANSWER_FOLDER: &str = "Respostas";

/// Condition of the per-answer source node.
pub const SOURCE_CONDITION: &str = "#fonte";
pub const SOURCE_TITLE: &str = "Fonte";
pub const FALLBACK_TITLE: &str = "Anything else";

/// Context variable set by context nodes.
pub const CONTEXT_VARIABLE: &str = "contexto";

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("record {index} (intent '{intent}') cannot be titled: {source}")]
    Title {
        index: usize,
        intent: String,
        #[source]
        source: TitleError,
    },
}

/// Builds the generated part of a skill.
#[derive(Debug)]
pub struct NodeFactory {
    minter: IdMinter,
    confidence: f64,
}

impl NodeFactory {
    pub fn new(minter: IdMinter, confidence: f64) -> Self {
        Self { minter, confidence }
    }

    /// Build every generated node for `records`, flattened in document order.
    ///
    /// Fails on the first record that cannot be titled; nothing is returned
    /// for a partial build.
    pub fn build(&mut self, records: &[Record]) -> Result<Vec<Node>, FactoryError> {
        let mut contextless_folder = self.folder(CONTEXTLESS_FOLDER);
        let mut context_folder = self.folder(CONTEXT_FOLDER);
        let mut intent_folder = self.folder(INTENT_FOLDER);
        let mut answer_folder = self.folder(ANSWER_FOLDER);

        self.add_contexts(records, &mut context_folder, &mut intent_folder);

        for (index, record) in records.iter().enumerate() {
            let contexts = title::contexts(record.label_list());
            let title = title::title(record, &contexts).map_err(|source| FactoryError::Title {
                index,
                intent: record.intent.clone(),
                source,
            })?;

            let mut answer = self.answer_node(record, title, &contexts);
            answer.add_child(self.source_node(record));
            let intent = self.intent_node(record, &answer.id, &contexts);
            answer_folder.add_child(answer);

            let subfolder = intent_folder.children.iter_mut().find(|folder| {
                folder
                    .title
                    .as_deref()
                    .is_some_and(|t| contexts.iter().any(|c| c.to_lowercase() == t.to_lowercase()))
            });
            match subfolder {
                Some(subfolder) => subfolder.add_child(intent),
                None => contextless_folder.add_child(intent),
            }
        }

        self.add_fallbacks(
            &mut contextless_folder,
            &mut context_folder,
            &mut intent_folder,
            &mut answer_folder,
        );

        let nodes: Vec<Node> = [contextless_folder, context_folder, intent_folder, answer_folder]
            .into_iter()
            .flat_map(Node::into_flat)
            .collect();
        debug!(records = records.len(), nodes = nodes.len(), "built generated nodes");
        Ok(nodes)
    }

    /// Grouping node: always entered, evaluates its children right away.
    fn folder(&mut self, title: &str) -> Node {
        Node::new(self.minter.mint())
            .with_title(title)
            .with_conditions("true")
            .with_next_step(NextStep::skip_user_input())
    }

    /// One intent subfolder and one context-setting node per context.
    fn add_contexts(&mut self, records: &[Record], context_folder: &mut Node, intent_folder: &mut Node) {
        let all_contexts = title::contexts(records.iter().flat_map(Record::label_list));
        for context in all_contexts {
            let subfolder = self
                .folder(&title::capitalize(&context))
                .with_conditions(format!("${CONTEXT_VARIABLE}:({context})"))
                .with_labels(context.as_str());

            let mut variables = Map::new();
            variables.insert(CONTEXT_VARIABLE.to_string(), Value::String(context.clone()));
            let context_node = Node::new(self.minter.mint())
                .with_context(variables)
                .with_conditions(format!("@rótulos:({context})"))
                .with_next_step(NextStep::jump_to(subfolder.id.clone()))
                .with_labels(context.as_str());

            intent_folder.add_child(subfolder);
            context_folder.add_child(context_node);
        }
    }

    fn answer_node(&mut self, record: &Record, title: String, contexts: &[String]) -> Node {
        let mut context = Map::new();
        context.insert("other_counter".to_string(), json!(0));

        let mut node = Node::new(self.minter.mint())
            .with_title(title)
            .with_conditions(format!(
                "#{} && intent.confidence > {}",
                record.intent, self.confidence
            ))
            .with_context(context)
            .with_text_output(&record.answer)
            .with_labels(contexts.join("_"));
        node.source = Some(record.source.clone());
        node.intent = Some(record.intent.clone());
        node.modifier = Some(record.modifier.clone());
        node.noun = Some(record.noun.clone());
        node.recipient = Some(record.recipient.clone());
        node
    }

    fn source_node(&mut self, record: &Record) -> Node {
        Node::new(self.minter.mint())
            .with_title(SOURCE_TITLE)
            .with_conditions(SOURCE_CONDITION)
            .with_text_output(&source_text(&record.source))
    }

    fn intent_node(&mut self, record: &Record, answer_id: &str, contexts: &[String]) -> Node {
        let mut node = Node::new(self.minter.mint())
            .with_conditions(entity_condition(record))
            .with_next_step(NextStep::jump_to(answer_id))
            .with_labels(contexts.join("_"));
        node.modifier = Some(record.modifier.clone());
        node.noun = Some(record.noun.clone());
        node.recipient = Some(record.recipient.clone());
        node
    }

    fn fallback(&mut self, next_step: NextStep) -> Node {
        Node::new(self.minter.mint())
            .with_title(FALLBACK_TITLE)
            .with_conditions(ANYTHING_ELSE)
            .with_next_step(next_step)
    }

    /// Close every scope with a fallback:
    /// contextless → context folder, context → intent folder,
    /// each subfolder → intent fallback, intent → answer folder,
    /// answer → root fallback (resolved by the organizer).
    fn add_fallbacks(
        &mut self,
        contextless_folder: &mut Node,
        context_folder: &mut Node,
        intent_folder: &mut Node,
        answer_folder: &mut Node,
    ) {
        let contextless_fallback = self.fallback(NextStep::jump_to(context_folder.id.clone()));
        contextless_folder.add_child(contextless_fallback);

        let context_fallback = self.fallback(NextStep::jump_to(intent_folder.id.clone()));
        context_folder.add_child(context_fallback);

        let intent_fallback = self.fallback(NextStep::jump_to(answer_folder.id.clone()));
        for subfolder in &mut intent_folder.children {
            let subfolder_fallback = self.fallback(NextStep::jump_to(intent_fallback.id.clone()));
            subfolder.add_child(subfolder_fallback);
        }
        intent_folder.add_child(intent_fallback);

        let answer_fallback = self.fallback(NextStep::pending_jump());
        answer_folder.add_child(answer_fallback);
    }
}

/// `@modificador:(m) [&& @substantivo:(n)] [&& @recipiente:(r)]`
pub fn entity_condition(record: &Record) -> String {
    let modifier = record.modifier.replace('-', " ");
    let noun = record.noun.replace('-', " ");
    let recipient = record.recipient.replace('-', " ");

    let mut condition = format!("@modificador:({modifier})");
    if !noun.is_empty() {
        condition.push_str(&format!(" && @substantivo:({noun})"));
    }
    if !recipient.is_empty() {
        condition.push_str(&format!(" && @recipiente:({recipient})"));
    }
    condition
}

/// Response of a source node listing the distinct citations of a record.
pub fn source_text(sources: &str) -> String {
    let mut distinct: Vec<&str> = Vec::new();
    for source in sources.split("--").map(str::trim) {
        if !source.is_empty() && !distinct.contains(&source) {
            distinct.push(source);
        }
    }
    match distinct.len() {
        0 => "Desculpe, não tenho uma fonte específica para essa resposta.".to_string(),
        1 => format!("A fonte dessa resposta é: {}", distinct[0]),
        _ => format!("As fontes dessa resposta são: {}", distinct.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn record(intent: &str, modifier: &str, noun: &str, recipient: &str, labels: &str) -> Record {
        Record {
            question: format!("pergunta {intent}"),
            answer: format!("resposta {intent}"),
            source: "livro--site".to_string(),
            intent: intent.to_string(),
            labels: labels.to_string(),
            modifier: modifier.to_string(),
            noun: noun.to_string(),
            recipient: recipient.to_string(),
            examples: String::new(),
        }
    }

    fn build(records: &[Record]) -> Vec<Node> {
        NodeFactory::new(IdMinter::seeded("test"), 0.7).build(records).unwrap()
    }

    fn by_title<'a>(nodes: &'a [Node], title: &str) -> &'a Node {
        nodes
            .iter()
            .find(|n| n.title.as_deref() == Some(title))
            .unwrap_or_else(|| panic!("no node titled {title}"))
    }

    #[test]
    fn missing_context_and_recipient_aborts() {
        let err = NodeFactory::new(IdMinter::seeded("test"), 0.7)
            .build(&[record("q1", "definição", "maré", "", "")])
            .unwrap_err();
        assert!(matches!(err, FactoryError::Title { index: 0, .. }));
    }

    #[test]
    fn definition_record_builds_answer() {
        let nodes = build(&[record("q1", "definição", "maré", "", "oceano")]);
        let answer = by_title(&nodes, "Definição de maré do oceano?");
        assert_eq!(
            answer.conditions.as_deref(),
            Some("#q1 && intent.confidence > 0.7")
        );
        let answers = by_title(&nodes, ANSWER_FOLDER);
        assert_eq!(answer.parent.as_deref(), Some(answers.id.as_str()));
        assert_eq!(answer.intent.as_deref(), Some("q1"));
    }

    #[test]
    fn answer_has_one_source_child() {
        let nodes = build(&[record("q1", "definição", "maré", "", "oceano")]);
        let answer = by_title(&nodes, "Definição de maré do oceano?");
        let sources: Vec<&Node> = nodes
            .iter()
            .filter(|n| n.parent.as_deref() == Some(answer.id.as_str()))
            .collect();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].conditions.as_deref(), Some(SOURCE_CONDITION));
        let text = &sources[0].output.as_ref().unwrap()["generic"][0]["values"][0]["text"];
        assert_eq!(text, "As fontes dessa resposta são: livro, site");
    }

    #[test]
    fn source_text_variants() {
        assert_eq!(source_text("a--a--"), "A fonte dessa resposta é: a");
        assert_eq!(source_text("a--b"), "As fontes dessa resposta são: a, b");
        assert_eq!(
            source_text(""),
            "Desculpe, não tenho uma fonte específica para essa resposta."
        );
    }

    #[test]
    fn intent_node_goes_to_context_subfolder() {
        let nodes = build(&[
            record("q1", "definição", "maré", "", "oceano"),
            record("q2", "causa", "erosão", "praia", "fauna"),
        ]);
        let subfolder = by_title(&nodes, "Oceano");
        let contextless = by_title(&nodes, CONTEXTLESS_FOLDER);

        let q1_answer = by_title(&nodes, "Definição de maré do oceano?");
        let q1_intent = nodes
            .iter()
            .find(|n| n.jump_target() == Some(q1_answer.id.as_str()))
            .unwrap();
        assert_eq!(q1_intent.parent.as_deref(), Some(subfolder.id.as_str()));
        assert_eq!(
            q1_intent.conditions.as_deref(),
            Some("@modificador:(definição) && @substantivo:(maré)")
        );

        let q2_intent = nodes
            .iter()
            .find(|n| n.conditions_contain("@substantivo:(erosão)"))
            .unwrap();
        assert_eq!(q2_intent.parent.as_deref(), Some(contextless.id.as_str()));
        assert_eq!(
            q2_intent.conditions.as_deref(),
            Some("@modificador:(causa) && @substantivo:(erosão) && @recipiente:(praia)")
        );
    }

    #[test]
    fn context_node_jumps_to_subfolder() {
        let nodes = build(&[record("q1", "definição", "maré", "", "oceano_fauna")]);
        let subfolder = by_title(&nodes, "Oceano");
        assert_eq!(subfolder.conditions.as_deref(), Some("$contexto:(oceano)"));
        let context_node = nodes
            .iter()
            .find(|n| n.conditions.as_deref() == Some("@rótulos:(oceano)"))
            .unwrap();
        assert_eq!(context_node.jump_target(), Some(subfolder.id.as_str()));
        assert_eq!(context_node.context.as_ref().unwrap()["contexto"], "oceano");
        assert!(!nodes.iter().any(|n| n.conditions_contain("fauna")));
    }

    #[test]
    fn fallbacks_cascade_through_scopes() {
        let nodes = build(&[record("q1", "definição", "maré", "", "oceano")]);
        let ids: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let folder_of = |fallback: &Node| ids[fallback.parent.as_deref().unwrap()].title.clone();
        let target_title = |fallback: &Node| {
            fallback
                .jump_target()
                .and_then(|t| ids[t].title.clone())
        };

        for fallback in nodes.iter().filter(|n| n.is_fallback()) {
            match folder_of(fallback).as_deref() {
                Some(CONTEXTLESS_FOLDER) => {
                    assert_eq!(target_title(fallback).as_deref(), Some(CONTEXT_FOLDER));
                }
                Some(CONTEXT_FOLDER) => {
                    assert_eq!(target_title(fallback).as_deref(), Some(INTENT_FOLDER));
                }
                Some(INTENT_FOLDER) => {
                    assert_eq!(target_title(fallback).as_deref(), Some(ANSWER_FOLDER));
                }
                Some("Oceano") => {
                    let target = ids[fallback.jump_target().unwrap()];
                    assert!(target.is_fallback());
                    assert_eq!(folder_of(target).as_deref(), Some(INTENT_FOLDER));
                }
                Some(ANSWER_FOLDER) => assert_eq!(fallback.jump_target(), None),
                other => panic!("unexpected fallback scope {other:?}"),
            }
        }
        assert_eq!(nodes.iter().filter(|n| n.is_fallback()).count(), 5);
    }

    #[test]
    fn generated_nodes_satisfy_tree_invariants() {
        let nodes = build(&[
            record("q1", "definição", "maré", "", "oceano"),
            record("q2", "causa", "erosão", "praia", "brasil"),
            record("q3", "listar", "peixe", "", "oceano"),
        ]);
        let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), nodes.len());
        for node in &nodes {
            assert_ne!(node.parent.as_deref(), Some(node.id.as_str()));
            assert_ne!(node.previous_sibling.as_deref(), Some(node.id.as_str()));
            if let Some(parent) = &node.parent {
                assert!(ids.contains(parent.as_str()));
            }
        }
        let mut heads: HashMap<Option<&str>, usize> = HashMap::new();
        for node in nodes.iter().filter(|n| n.previous_sibling.is_none()) {
            *heads.entry(node.parent.as_deref()).or_default() += 1;
        }
        assert!(heads
            .iter()
            .filter(|(parent, _)| parent.is_some())
            .all(|(_, count)| *count == 1));
    }

    #[test]
    fn folders_come_in_evaluation_order() {
        let nodes = build(&[record("q1", "definição", "maré", "", "oceano")]);
        let roots: Vec<&str> = nodes
            .iter()
            .filter(|n| n.parent.is_none())
            .filter_map(|n| n.title.as_deref())
            .collect();
        assert_eq!(roots, vec![CONTEXTLESS_FOLDER, CONTEXT_FOLDER, INTENT_FOLDER, ANSWER_FOLDER]);
    }
}
