//! Reconciliation of manual and generated dialog nodes.
//!
//! Nodes are partitioned by id and condition:
//! - manual: authored in the dialog editor (ids outside the generator scheme),
//! - generated: minted by [`crate::factory::NodeFactory`],
//! - root fallback: the editor's top-level `anything_else` node, always last.
//!
//! [`NodeOrganizer::run`] applies the stages in a fixed order; each stage relies
//! on what the previous ones established. Any stage that removes nodes or
//! changes membership fields ends with [`NodeOrganizer::rebuild`].

use crate::factory::ANSWER_FOLDER;
use crate::ids::is_generated_id;
use crate::node::Node;
use crate::types::NextStep;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Hints written to the help node when none are configured.
pub const DEFAULT_NUMBER_OF_HINTS: usize = 3;

/// Condition fragment identifying the manual welcome node.
pub const WELCOME_CONDITION: &str = "welcome";
/// Condition fragment identifying the manual help node.
pub const HELP_CONDITION: &str = "ajuda";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrganizerError {
    #[error("required node not found: {0}")]
    MissingAnchor(&'static str),
    #[error("manual node order cannot be reconstructed, unreachable nodes: {0:?}")]
    UnorderedNodes(Vec<String>),
}

/// Tunables of [`NodeOrganizer::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizerSettings {
    /// Maximum number of intents in the skill; `None` disables limiting.
    pub intent_limit: Option<usize>,
    pub number_of_hints: usize,
}

impl Default for OrganizerSettings {
    fn default() -> Self {
        Self {
            intent_limit: None,
            number_of_hints: DEFAULT_NUMBER_OF_HINTS,
        }
    }
}

#[derive(Debug)]
pub struct NodeOrganizer {
    manual: Vec<Node>,
    generated: Vec<Node>,
    root_fallback: Vec<Node>,
    answers_folder: String,
}

impl NodeOrganizer {
    /// Partition `nodes`. Fails when the generated answers folder is absent.
    pub fn new(nodes: Vec<Node>) -> Result<Self, OrganizerError> {
        let mut organizer = Self {
            manual: Vec::new(),
            generated: Vec::new(),
            root_fallback: Vec::new(),
            answers_folder: String::new(),
        };
        organizer.separate(nodes)?;
        Ok(organizer)
    }

    fn separate(&mut self, nodes: Vec<Node>) -> Result<(), OrganizerError> {
        let mut manual = Vec::new();
        let mut generated = Vec::new();
        let mut root_fallback = Vec::new();
        for node in nodes {
            if node.parent.is_none() && node.is_fallback() {
                root_fallback.push(node);
            } else if is_generated_id(&node.id) {
                generated.push(node);
            } else {
                manual.push(node);
            }
        }

        let answers_folder = generated
            .iter()
            .find(|n| n.parent.is_none() && n.title.as_deref() == Some(ANSWER_FOLDER))
            .map(|n| n.id.clone())
            .ok_or(OrganizerError::MissingAnchor("answers folder"))?;

        self.manual = manual;
        self.generated = generated;
        self.root_fallback = root_fallback;
        self.answers_folder = answers_folder;
        Ok(())
    }

    /// Concatenate the partitions (manual, generated, root fallback) and
    /// partition them again.
    pub fn rebuild(&mut self) -> Result<(), OrganizerError> {
        let nodes = self.take_all();
        self.separate(nodes)
    }

    fn take_all(&mut self) -> Vec<Node> {
        let mut nodes = std::mem::take(&mut self.manual);
        nodes.append(&mut self.generated);
        nodes.append(&mut self.root_fallback);
        nodes
    }

    /// Every node in document order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.manual
            .iter()
            .chain(&self.generated)
            .chain(&self.root_fallback)
    }

    fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.manual
            .iter_mut()
            .chain(self.generated.iter_mut())
            .chain(self.root_fallback.iter_mut())
    }

    pub fn manual(&self) -> &[Node] {
        &self.manual
    }

    pub fn generated(&self) -> &[Node] {
        &self.generated
    }

    /// Generated answer nodes (children of the answers folder), fallback excluded.
    pub fn answers(&self) -> impl Iterator<Item = &Node> {
        self.generated
            .iter()
            .filter(|n| self.is_answer(n) && !n.is_fallback())
    }

    fn is_answer(&self, node: &Node) -> bool {
        node.parent.as_deref() == Some(self.answers_folder.as_str())
    }

    /// Distinct intent codes referenced by any node, sorted.
    pub fn intents(&self) -> Vec<String> {
        self.nodes()
            .filter_map(Node::intent_code)
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn into_nodes(mut self) -> Vec<Node> {
        self.take_all()
    }

    /// Apply every stage in order.
    pub fn run(&mut self, settings: &OrganizerSettings) -> Result<(), OrganizerError> {
        self.sort_nodes()?;
        self.limit_intents(settings.intent_limit)?;
        self.set_contexts_node()?;
        self.set_help_node(settings.number_of_hints)?;
        self.fix_previous_siblings();
        self.apply_previous_siblings();
        self.point_to_anything_else_node()?;
        Ok(())
    }

    /// Reorder manual nodes the way the editor shows them: a pre-order walk
    /// from the root node along parent and previous-sibling links.
    pub fn sort_nodes(&mut self) -> Result<(), OrganizerError> {
        let ranks = ManualOrder::new(&self.manual).ranks()?;
        let mut ranked: Vec<(usize, Node)> = ranks
            .into_iter()
            .zip(std::mem::take(&mut self.manual))
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);
        self.manual = ranked.into_iter().map(|(_, node)| node).collect();
        self.rebuild()?;
        info!(manual = self.manual.len(), "nodes sorted");
        Ok(())
    }

    /// Keep at most `limit` intents in the skill.
    ///
    /// Intents referenced outside generated answers are fixed. Generated answer
    /// intents are kept in ascending code order until the limit is reached; the
    /// rest are dropped together with their node chains.
    pub fn limit_intents(&mut self, limit: Option<usize>) -> Result<(), OrganizerError> {
        let Some(limit) = limit.filter(|l| *l > 0) else {
            return Ok(());
        };

        let answer_intents: BTreeSet<String> = self
            .answers()
            .filter_map(Node::intent_code)
            .map(str::to_string)
            .collect();
        let fixed = {
            let answer_ids: HashSet<&str> = self.answers().map(|n| n.id.as_str()).collect();
            self.nodes()
                .filter(|n| !answer_ids.contains(n.id.as_str()))
                .filter_map(Node::intent_code)
                .filter(|code| !answer_intents.contains(*code))
                .collect::<BTreeSet<_>>()
                .len()
        };

        let keep = limit.saturating_sub(fixed);
        if answer_intents.len() <= keep {
            debug!(limit, intents = answer_intents.len() + fixed, "intent limit not reached");
            return Ok(());
        }

        let removed: HashSet<&str> = answer_intents.iter().skip(keep).map(String::as_str).collect();
        let seeds: Vec<String> = self
            .answers()
            .filter(|n| n.intent_code().is_some_and(|code| removed.contains(code)))
            .map(|n| n.id.clone())
            .collect();
        let dropped = self.drop_node_chain(seeds);
        self.rebuild()?;
        info!(
            limit,
            fixed,
            kept = keep,
            removed = removed.len(),
            nodes = dropped,
            "intents limited"
        );
        Ok(())
    }

    /// Remove generated nodes in `seeds`, their descendants, and every node
    /// that jumps to a removed node. Returns how many nodes were removed.
    fn drop_node_chain(&mut self, seeds: Vec<String>) -> usize {
        let mut dropped: HashSet<String> = HashSet::new();
        let mut frontier = seeds;
        while let Some(id) = frontier.pop() {
            if !dropped.insert(id.clone()) {
                continue;
            }
            frontier.extend(
                self.generated
                    .iter()
                    .filter(|n| !dropped.contains(&n.id))
                    .filter(|n| n.parent.as_deref() == Some(id.as_str()) || n.jump_target() == Some(id.as_str()))
                    .map(|n| n.id.clone()),
            );
        }
        let before = self.generated.len();
        self.generated.retain(|n| !dropped.contains(&n.id));
        before - self.generated.len()
    }

    /// Store the generated answer titles, keyed by position, in the welcome
    /// node's context so the help node can suggest random questions.
    pub fn set_contexts_node(&mut self) -> Result<(), OrganizerError> {
        let titles: Map<String, Value> = self
            .answers()
            .enumerate()
            .map(|(i, n)| (i.to_string(), Value::String(n.title.clone().unwrap_or_default())))
            .collect();
        let count = titles.len();

        let welcome = self
            .manual
            .iter_mut()
            .find(|n| n.conditions_contain(WELCOME_CONDITION))
            .ok_or(OrganizerError::MissingAnchor("welcome node"))?;
        welcome
            .context
            .get_or_insert_with(Map::new)
            .insert("titles".to_string(), Value::Object(titles));
        info!(titles = count, "contexts set");
        Ok(())
    }

    /// Split the answers into `number_of_hints` equal bands and write one
    /// random-index expression per band into the help node's context.
    pub fn set_help_node(&mut self, number_of_hints: usize) -> Result<(), OrganizerError> {
        let answers = self.answers().count();
        let hints = number_of_hints.max(1);
        let per_hint = answers / hints;
        if per_hint == 0 {
            warn!(answers, hints, "fewer answers than hints, hint bands overlap");
        }
        let per_hint = per_hint.max(1);

        let help = self
            .manual
            .iter_mut()
            .find(|n| n.conditions_contain(HELP_CONDITION))
            .ok_or(OrganizerError::MissingAnchor("help node"))?;
        let context = help.context.get_or_insert_with(Map::new);
        for i in 0..hints {
            context.insert(
                format!("dica{i}"),
                Value::String(format!(
                    "<? new Random().nextInt({per_hint}) +{} ?>",
                    i * per_hint
                )),
            );
        }
        info!(hints, per_hint, "help node set");
        Ok(())
    }

    /// Clear previous-sibling links pointing to nodes that no longer exist.
    pub fn fix_previous_siblings(&mut self) {
        let ids: HashSet<String> = self.nodes().map(|n| n.id.clone()).collect();
        let mut cleared = 0;
        for node in self.nodes_mut() {
            if node.previous_sibling.as_ref().is_some_and(|p| !ids.contains(p)) {
                node.previous_sibling = None;
                cleared += 1;
            }
        }
        debug!(cleared, "dangling previous siblings cleared");
    }

    /// Chain root-level nodes in document order, then give every nested node
    /// without a previous sibling the closest preceding node with the same
    /// parent.
    pub fn apply_previous_siblings(&mut self) {
        let mut previous_root: Option<String> = None;
        let mut last_child: HashMap<String, String> = HashMap::new();
        for node in self.nodes_mut() {
            match node.parent.clone() {
                None => {
                    node.previous_sibling = previous_root.replace(node.id.clone());
                }
                Some(parent) => {
                    if node.previous_sibling.is_none() {
                        node.previous_sibling = last_child.get(&parent).cloned();
                    }
                    last_child.insert(parent, node.id.clone());
                }
            }
        }
        info!("previous siblings fixed");
    }

    /// Point the answers folder's fallback at the root fallback node.
    pub fn point_to_anything_else_node(&mut self) -> Result<(), OrganizerError> {
        let root = self
            .root_fallback
            .first()
            .map(|n| n.id.clone())
            .ok_or(OrganizerError::MissingAnchor("root anything_else node"))?;
        let answers_folder = self.answers_folder.clone();
        let fallback = self
            .generated
            .iter_mut()
            .find(|n| n.parent.as_deref() == Some(answers_folder.as_str()) && n.is_fallback())
            .ok_or(OrganizerError::MissingAnchor("answers anything_else node"))?;
        fallback.next_step = Some(NextStep::jump_to(root));
        info!("answers fallback points to root fallback");
        Ok(())
    }
}

/// Pre-order walk over manual nodes.
struct ManualOrder<'a> {
    nodes: &'a [Node],
    index: HashMap<&'a str, usize>,
    children: HashMap<Option<&'a str>, Vec<usize>>,
    followers: HashMap<&'a str, Vec<usize>>,
    ranks: Vec<Option<usize>>,
}

impl<'a> ManualOrder<'a> {
    fn new(nodes: &'a [Node]) -> Self {
        let mut index = HashMap::new();
        let mut children: HashMap<Option<&str>, Vec<usize>> = HashMap::new();
        let mut followers: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            index.entry(node.id.as_str()).or_insert(i);
            children.entry(node.parent.as_deref()).or_default().push(i);
            if let Some(previous) = node.previous_sibling.as_deref() {
                followers.entry(previous).or_default().push(i);
            }
        }
        Self {
            nodes,
            index,
            children,
            followers,
            ranks: vec![None; nodes.len()],
        }
    }

    /// Rank of every node in the walk. Nodes the walk cannot reach are an error.
    fn ranks(mut self) -> Result<Vec<usize>, OrganizerError> {
        if self.nodes.is_empty() {
            return Ok(Vec::new());
        }
        let root = self
            .nodes
            .iter()
            .position(|n| n.parent.is_none() && n.previous_sibling.is_none() && n.next_step.is_none())
            .ok_or(OrganizerError::MissingAnchor("manual root node"))?;

        self.ranks[root] = Some(0);
        let mut current = root;
        let mut rank = 1;
        while let Some(next) = self.successor(current) {
            self.ranks[next] = Some(rank);
            rank += 1;
            current = next;
        }

        let unordered: Vec<String> = self
            .ranks
            .iter()
            .zip(self.nodes)
            .filter(|(rank, _)| rank.is_none())
            .map(|(_, node)| node.id.clone())
            .collect();
        if !unordered.is_empty() {
            return Err(OrganizerError::UnorderedNodes(unordered));
        }
        Ok(self.ranks.into_iter().flatten().collect())
    }

    /// First child, else next sibling, else the next sibling of the closest
    /// ancestor that has one.
    fn successor(&self, current: usize) -> Option<usize> {
        if let Some(child) = self.first_child(current) {
            return Some(child);
        }
        let mut node = current;
        // Bounded climb: a parent cycle cannot loop forever.
        for _ in 0..self.nodes.len() {
            if let Some(sibling) = self.next_sibling(node) {
                return Some(sibling);
            }
            node = *self.nodes[node].parent.as_deref().and_then(|p| self.index.get(p))?;
        }
        None
    }

    fn first_child(&self, parent: usize) -> Option<usize> {
        let level = self.children.get(&Some(self.nodes[parent].id.as_str()))?;
        level
            .iter()
            .copied()
            .find(|&i| self.ranks[i].is_none() && self.nodes[i].previous_sibling.is_none())
            .or_else(|| self.first_ready(level))
    }

    fn next_sibling(&self, node: usize) -> Option<usize> {
        let follower = self
            .followers
            .get(self.nodes[node].id.as_str())
            .and_then(|f| f.iter().copied().find(|&i| self.ranks[i].is_none()));
        if follower.is_some() {
            return follower;
        }
        let level = self.children.get(&self.nodes[node].parent.as_deref())?;
        let ready = self.first_ready(level);
        if let Some(i) = ready {
            debug!(node = %self.nodes[i].id, "ordering by document position");
        }
        ready
    }

    /// First unranked node of `level` whose previous sibling is missing, dangling
    /// or already ranked.
    fn first_ready(&self, level: &[usize]) -> Option<usize> {
        level.iter().copied().find(|&i| {
            self.ranks[i].is_none()
                && self.nodes[i]
                    .previous_sibling
                    .as_deref()
                    .is_none_or(|p| self.index.get(p).is_none_or(|&j| self.ranks[j].is_some()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ANYTHING_ELSE;

    fn gid(n: u64) -> String {
        format!("node_{n:016x}")
    }

    fn manual(id: &str, parent: Option<&str>, previous: Option<&str>, conditions: &str) -> Node {
        let mut node = Node::new(id).with_title(id).with_conditions(conditions);
        node.parent = parent.map(str::to_string);
        node.previous_sibling = previous.map(str::to_string);
        node
    }

    fn root_fallback(previous: &str) -> Node {
        let mut node = Node::new("Em outros casos").with_conditions(ANYTHING_ELSE);
        node.previous_sibling = Some(previous.to_string());
        node
    }

    /// Welcome, help, two manual intents (one with a child), root fallback.
    fn manual_nodes() -> Vec<Node> {
        vec![
            manual("saudacao", None, Some("ajuda"), "#saudacao"),
            manual("Bem-vindo", None, None, "welcome"),
            manual("resposta-despedida", Some("despedida"), None, "true"),
            manual("despedida", None, Some("saudacao"), "#despedida"),
            manual("ajuda", None, Some("Bem-vindo"), "#ajuda"),
            root_fallback("despedida"),
        ]
    }

    /// Answers folder with one answer + intent node per code, plus the fallback.
    fn generated_nodes(codes: &[&str]) -> Vec<Node> {
        let folder_id = gid(1);
        let mut answers = Node::new(folder_id.clone())
            .with_title(ANSWER_FOLDER)
            .with_conditions("true")
            .with_next_step(NextStep::skip_user_input());
        let mut intents = Node::new(gid(2)).with_title("Sem contexto").with_conditions("true");
        for (i, code) in codes.iter().enumerate() {
            let answer_id = gid(100 + i as u64);
            answers.add_child(
                Node::new(answer_id.clone())
                    .with_title(format!("Pergunta {code}"))
                    .with_conditions(format!("#{code} && intent.confidence > 0.7")),
            );
            intents.add_child(
                Node::new(gid(200 + i as u64))
                    .with_conditions(format!("@modificador:({code})"))
                    .with_next_step(NextStep::jump_to(answer_id)),
            );
        }
        answers.add_child(
            Node::new(gid(3))
                .with_conditions(ANYTHING_ELSE)
                .with_next_step(NextStep::pending_jump()),
        );
        let mut nodes = intents.into_flat();
        nodes.extend(answers.into_flat());
        nodes
    }

    fn organizer(codes: &[&str]) -> NodeOrganizer {
        let mut nodes = manual_nodes();
        nodes.extend(generated_nodes(codes));
        NodeOrganizer::new(nodes).unwrap()
    }

    fn ids(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn separate_partitions_nodes() {
        let organizer = organizer(&["q1"]);
        assert_eq!(organizer.manual().len(), 5);
        assert_eq!(organizer.root_fallback.len(), 1);
        assert!(organizer.generated().iter().all(|n| is_generated_id(&n.id)));
        assert_eq!(organizer.answers().count(), 1);
    }

    #[test]
    fn missing_answers_folder_is_fatal() {
        let err = NodeOrganizer::new(manual_nodes()).unwrap_err();
        assert_eq!(err, OrganizerError::MissingAnchor("answers folder"));
    }

    #[test]
    fn sort_nodes_restores_editor_order() {
        let mut organizer = organizer(&["q1"]);
        organizer.sort_nodes().unwrap();
        assert_eq!(
            ids(organizer.manual()),
            vec!["Bem-vindo", "ajuda", "saudacao", "despedida", "resposta-despedida"]
        );
    }

    #[test]
    fn sort_nodes_climbs_out_of_nested_children() {
        let nodes = vec![
            manual("c", None, Some("b"), "#c"),
            manual("b2", Some("b1"), None, "true"),
            manual("b1", Some("b"), None, "true"),
            manual("b", None, Some("a"), "#b"),
            manual("a", None, None, "welcome"),
        ];
        let ranks = ManualOrder::new(&nodes).ranks().unwrap();
        let mut order: Vec<(usize, &str)> = ranks.into_iter().zip(ids(&nodes)).collect();
        order.sort_unstable();
        let order: Vec<&str> = order.into_iter().map(|(_, id)| id).collect();
        assert_eq!(order, vec!["a", "b", "b1", "b2", "c"]);
    }

    #[test]
    fn sort_nodes_places_dangling_siblings_by_document_order() {
        let nodes = vec![
            manual("a", None, None, "welcome"),
            manual("x", None, Some(&gid(9)), "#x"),
        ];
        let ranks = ManualOrder::new(&nodes).ranks().unwrap();
        assert_eq!(ranks, vec![0, 1]);
    }

    #[test]
    fn sort_nodes_rejects_cycles() {
        let nodes = vec![
            manual("a", None, None, "welcome"),
            manual("b", None, Some("c"), "#b"),
            manual("c", None, Some("b"), "#c"),
        ];
        let err = ManualOrder::new(&nodes).ranks().unwrap_err();
        assert_eq!(err, OrganizerError::UnorderedNodes(vec!["b".to_string(), "c".to_string()]));
    }

    #[test]
    fn sort_nodes_requires_root() {
        let nodes = vec![manual("b", None, Some("a"), "#b")];
        let err = ManualOrder::new(&nodes).ranks().unwrap_err();
        assert_eq!(err, OrganizerError::MissingAnchor("manual root node"));
    }

    #[test]
    fn limit_keeps_lowest_sorted_generated_intents() {
        let mut organizer = organizer(&["q4", "q2", "q3", "q1"]);
        organizer.limit_intents(Some(5)).unwrap();
        assert_eq!(organizer.intents(), vec!["ajuda", "despedida", "q1", "q2", "saudacao"]);

        let answers: Vec<&str> = organizer.answers().filter_map(Node::intent_code).collect();
        assert_eq!(answers, vec!["q2", "q1"]);
        // Intent nodes jumping to removed answers are gone too.
        let jumps = organizer.generated().iter().filter(|n| n.jump_target().is_some()).count();
        assert_eq!(jumps, 2);
    }

    #[test]
    fn limit_removes_answer_descendants() {
        let mut nodes = manual_nodes();
        let mut generated = generated_nodes(&["q1", "q2"]);
        generated.push({
            let mut source = Node::new(gid(500)).with_conditions("#fonte");
            source.parent = Some(gid(101));
            source
        });
        nodes.extend(generated);
        let mut organizer = NodeOrganizer::new(nodes).unwrap();
        // ajuda, despedida, saudacao and fonte are fixed.
        organizer.limit_intents(Some(5)).unwrap();
        assert!(organizer.generated().iter().all(|n| n.id != gid(500)));
        assert!(organizer.generated().iter().all(|n| n.id != gid(101)));
        assert_eq!(organizer.answers().count(), 1);
    }

    #[test]
    fn no_limit_keeps_everything() {
        let mut organizer = organizer(&["q1", "q2", "q3"]);
        organizer.limit_intents(None).unwrap();
        organizer.limit_intents(Some(0)).unwrap();
        organizer.limit_intents(Some(100)).unwrap();
        assert_eq!(organizer.answers().count(), 3);
    }

    #[test]
    fn welcome_node_receives_titles() {
        let mut organizer = organizer(&["q1", "q2"]);
        organizer.set_contexts_node().unwrap();
        let welcome = organizer.manual().iter().find(|n| n.id == "Bem-vindo").unwrap();
        let titles = &welcome.context.as_ref().unwrap()["titles"];
        assert_eq!(titles["0"], "Pergunta q1");
        assert_eq!(titles["1"], "Pergunta q2");
        assert!(titles.get("2").is_none());
    }

    #[test]
    fn help_node_receives_hint_bands() {
        let mut organizer = organizer(&["q1", "q2", "q3", "q4", "q5", "q6"]);
        organizer.set_help_node(3).unwrap();
        let help = organizer.manual().iter().find(|n| n.id == "ajuda").unwrap();
        let context = help.context.as_ref().unwrap();
        assert_eq!(context["dica0"], "<? new Random().nextInt(2) +0 ?>");
        assert_eq!(context["dica1"], "<? new Random().nextInt(2) +2 ?>");
        assert_eq!(context["dica2"], "<? new Random().nextInt(2) +4 ?>");
    }

    #[test]
    fn missing_help_node_is_fatal() {
        let mut nodes: Vec<Node> = manual_nodes().into_iter().filter(|n| n.id != "ajuda").collect();
        nodes.extend(generated_nodes(&["q1"]));
        let mut organizer = NodeOrganizer::new(nodes).unwrap();
        assert_eq!(
            organizer.set_help_node(3).unwrap_err(),
            OrganizerError::MissingAnchor("help node")
        );
    }

    #[test]
    fn previous_siblings_form_linear_chains() {
        let mut organizer = organizer(&["q1", "q2", "q3"]);
        organizer.sort_nodes().unwrap();
        organizer.limit_intents(Some(5)).unwrap();
        organizer.fix_previous_siblings();
        organizer.apply_previous_siblings();

        let nodes: Vec<&Node> = organizer.nodes().collect();
        let mut levels: HashMap<Option<&str>, Vec<&Node>> = HashMap::new();
        for node in &nodes {
            levels.entry(node.parent.as_deref()).or_default().push(node);
        }
        for (parent, siblings) in levels {
            let heads = siblings.iter().filter(|n| n.previous_sibling.is_none()).count();
            assert_eq!(heads, 1, "level {parent:?} must have exactly one head");

            let followers: HashMap<&str, &str> = siblings
                .iter()
                .filter_map(|n| n.previous_sibling.as_deref().map(|p| (p, n.id.as_str())))
                .collect();
            let mut current = siblings.iter().find(|n| n.previous_sibling.is_none()).unwrap().id.as_str();
            let mut visited = 1;
            while let Some(next) = followers.get(current) {
                current = next;
                visited += 1;
            }
            assert_eq!(visited, siblings.len(), "level {parent:?} chain must visit every node");
        }
    }

    #[test]
    fn root_level_ends_with_root_fallback() {
        let mut organizer = organizer(&["q1"]);
        organizer.run(&OrganizerSettings::default()).unwrap();
        let roots: Vec<&str> = organizer
            .nodes()
            .filter(|n| n.parent.is_none())
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(roots.first(), Some(&"Bem-vindo"));
        assert_eq!(roots.last(), Some(&"Em outros casos"));
    }

    #[test]
    fn answers_fallback_points_to_root_fallback() {
        let mut organizer = organizer(&["q1"]);
        organizer.point_to_anything_else_node().unwrap();
        let fallback = organizer.generated().iter().find(|n| n.id == gid(3)).unwrap();
        assert_eq!(fallback.jump_target(), Some("Em outros casos"));
    }

    #[test]
    fn missing_root_fallback_is_fatal() {
        let mut nodes: Vec<Node> = manual_nodes().into_iter().filter(|n| !n.is_fallback()).collect();
        nodes.extend(generated_nodes(&["q1"]));
        let mut organizer = NodeOrganizer::new(nodes).unwrap();
        assert_eq!(
            organizer.point_to_anything_else_node().unwrap_err(),
            OrganizerError::MissingAnchor("root anything_else node")
        );
    }
}
