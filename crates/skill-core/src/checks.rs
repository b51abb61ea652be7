//! Structural checks over a final node list.
//!
//! Findings never stop a run; they are logged and returned so the CLI can
//! print them.

use crate::node::Node;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// Kind of a structural finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    DuplicateId,
    EmptyId,
    SelfParent,
    SelfSibling,
    /// A node is the previous sibling of more than one node.
    SiblingCollision,
    /// A sibling level without exactly one chain head, or with a broken chain.
    BrokenChain,
    /// Answers on the same tags and modifier that the entity conditions may
    /// not tell apart.
    PossibleCollision,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateId => "duplicate_id",
            Self::EmptyId => "empty_id",
            Self::SelfParent => "self_parent",
            Self::SelfSibling => "self_sibling",
            Self::SiblingCollision => "sibling_collision",
            Self::BrokenChain => "broken_chain",
            Self::PossibleCollision => "possible_collision",
        }
    }

    /// Whether the finding makes the skill structurally invalid.
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::PossibleCollision)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub kind: CheckKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub nodes: usize,
    pub findings: Vec<Finding>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        !self.findings.iter().any(|f| f.kind.is_error())
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.kind.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| !f.kind.is_error())
    }

    fn push(&mut self, kind: CheckKind, message: String) {
        warn!(kind = kind.as_str(), "{message}");
        self.findings.push(Finding { kind, message });
    }
}

/// Run every check over `nodes`.
pub fn run(nodes: &[Node]) -> CheckReport {
    let mut report = CheckReport {
        nodes: nodes.len(),
        findings: Vec::new(),
    };
    check_ids(nodes, &mut report);
    check_self_references(nodes, &mut report);
    check_sibling_chains(nodes, &mut report);
    check_record_collisions(nodes, &mut report);
    report
}

fn check_ids(nodes: &[Node], report: &mut CheckReport) {
    let mut seen = HashSet::new();
    let mut duplicates = BTreeMap::new();
    for node in nodes {
        if node.id.trim().is_empty() {
            report.push(CheckKind::EmptyId, format!("node titled {:?} has no id", node.title));
        } else if !seen.insert(node.id.as_str()) {
            *duplicates.entry(node.id.as_str()).or_insert(1) += 1;
        }
    }
    for (id, count) in duplicates {
        report.push(CheckKind::DuplicateId, format!("id {id} is used by {count} nodes"));
    }
}

fn check_self_references(nodes: &[Node], report: &mut CheckReport) {
    for node in nodes {
        if node.parent.as_deref() == Some(node.id.as_str()) {
            report.push(CheckKind::SelfParent, format!("node {} is its own parent", node.id));
        }
        if node.previous_sibling.as_deref() == Some(node.id.as_str()) {
            report.push(
                CheckKind::SelfSibling,
                format!("node {} is its own previous sibling", node.id),
            );
        }
    }
}

fn check_sibling_chains(nodes: &[Node], report: &mut CheckReport) {
    let mut followers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for node in nodes {
        if let Some(previous) = node.previous_sibling.as_deref() {
            followers.entry(previous).or_default().push(node.id.as_str());
        }
    }
    for (previous, ids) in &followers {
        if ids.len() > 1 {
            report.push(
                CheckKind::SiblingCollision,
                format!("node {previous} is the previous sibling of {}", ids.join(", ")),
            );
        }
    }

    let mut levels: BTreeMap<Option<&str>, Vec<&Node>> = BTreeMap::new();
    for node in nodes {
        levels.entry(node.parent.as_deref()).or_default().push(node);
    }
    for (parent, siblings) in levels {
        let level = parent.unwrap_or("<root>");
        let heads: Vec<&str> = siblings
            .iter()
            .filter(|n| n.previous_sibling.is_none())
            .map(|n| n.id.as_str())
            .collect();
        let [head] = heads.as_slice() else {
            report.push(
                CheckKind::BrokenChain,
                format!("level {level} has {} chain heads: {}", heads.len(), heads.join(", ")),
            );
            continue;
        };

        let members: HashSet<&str> = siblings.iter().map(|n| n.id.as_str()).collect();
        let mut visited = HashSet::from([*head]);
        let mut current = *head;
        // Step bound: a level's chain is at most as long as the level.
        for _ in 0..siblings.len() {
            let Some(next) = followers
                .get(current)
                .and_then(|ids| ids.iter().copied().find(|id| members.contains(id)))
            else {
                break;
            };
            if !visited.insert(next) {
                break;
            }
            current = next;
        }
        if visited.len() != siblings.len() {
            report.push(
                CheckKind::BrokenChain,
                format!(
                    "level {level}: chain from {head} reaches {} of {} nodes",
                    visited.len(),
                    siblings.len()
                ),
            );
        }
    }
}

/// Group answer nodes by labels and modifier; within a group, answers sharing
/// a noun (or recipient) where one of them lacks the other slot can be
/// matched by the same input.
fn check_record_collisions(nodes: &[Node], report: &mut CheckReport) {
    let mut groups: BTreeMap<(&str, &str), Vec<&Node>> = BTreeMap::new();
    for node in nodes.iter().filter(|n| n.modifier.is_some() && n.intent.is_some()) {
        let labels = node.labels.as_deref().unwrap_or_default();
        let modifier = node.modifier.as_deref().unwrap_or_default();
        groups.entry((labels, modifier)).or_default().push(node);
    }

    for ((labels, modifier), answers) in groups {
        let labels = if labels.is_empty() { "..." } else { labels };
        check_slot_pairs(&answers, labels, modifier, noun, recipient, report);
        check_slot_pairs(&answers, labels, modifier, recipient, noun, report);
    }
}

fn check_slot_pairs(
    answers: &[&Node],
    labels: &str,
    modifier: &str,
    group_by: fn(&Node) -> &str,
    other: fn(&Node) -> &str,
    report: &mut CheckReport,
) {
    let mut by_value: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for answer in answers {
        let value = group_by(answer);
        if !value.is_empty() {
            by_value.entry(value).or_default().push(other(answer));
        }
    }
    for (value, others) in by_value {
        if others.len() > 1 && others.iter().any(|o| o.is_empty()) {
            report.push(
                CheckKind::PossibleCollision,
                format!("#{labels}--{modifier}-{value}-____: {others:?}"),
            );
        }
    }
}

fn noun(node: &Node) -> &str {
    node.noun.as_deref().unwrap_or_default()
}

fn recipient(node: &Node) -> &str {
    node.recipient.as_deref().unwrap_or_default()
}
