use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FlowdeckError, Result};
use crate::settings::SettingValue;

/// Default per-node timeout, in seconds.
pub const DEFAULT_TIMEOUT: i64 = 300;
/// Default per-node retry count.
pub const DEFAULT_RETRY_COUNT: i64 = 3;
/// Prefix of every persisted workflow key.
pub const STORE_KEY_PREFIX: &str = "workflow_";

/// A point in either screen or document space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Kind of a workflow node.
///
/// Unknown type strings survive a round trip through `Other` so that documents
/// written by newer editors can still be opened.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Agent,
    Trigger,
    Condition,
    Aggregator,
    Transformer,
    Output,
    #[serde(untagged)]
    Other(String),
}

impl NodeType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Agent => "agent",
            Self::Trigger => "trigger",
            Self::Condition => "condition",
            Self::Aggregator => "aggregator",
            Self::Transformer => "transformer",
            Self::Output => "output",
            Self::Other(name) => name,
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    /// Document-space position of the node's top-left corner.
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: i64,
    #[serde(default = "default_retry_count")]
    pub retry_count: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Category-specific settings, shaped by the agent-config schema.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, SettingValue>,
}

fn default_timeout() -> i64 {
    DEFAULT_TIMEOUT
}

fn default_retry_count() -> i64 {
    DEFAULT_RETRY_COUNT
}

impl NodeRecord {
    /// Create a node with default timeout, retries and no agent binding.
    pub fn new(
        id: impl Into<String>,
        node_type: NodeType,
        label: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            node_type,
            label: label.into(),
            position,
            agent_id: None,
            agent_name: None,
            category_id: None,
            category_name: None,
            timeout: DEFAULT_TIMEOUT,
            retry_count: DEFAULT_RETRY_COUNT,
            tags: vec![],
            description: String::new(),
            settings: BTreeMap::new(),
        }
    }

    /// Build an agent node from a catalog entry, with a freshly generated id.
    pub fn from_agent(agent: &Agent, position: Position) -> Self {
        let mut node = Self::new(
            format!("node-{}", Uuid::new_v4()),
            NodeType::Agent,
            agent.agent_name.clone(),
            position,
        );
        node.agent_id = Some(agent.agent_id.clone());
        node.agent_name = Some(agent.agent_name.clone());
        node.category_id = Some(agent.category_id.clone());
        node.category_name = Some(agent.category_name.clone());
        node
    }

    /// Set the position.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl EdgeRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: format!("edge-{}", Uuid::new_v4()),
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// The serializable graph being edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl WorkflowDocument {
    /// Start an empty document with a new id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            nodes: vec![],
            edges: vec![],
        }
    }

    /// Key under which the document is persisted.
    pub fn store_key(&self) -> String {
        store_key(&self.id)
    }

    pub fn node(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.source == source && e.target == target)
    }

    /// Remove a node and every edge that references it.
    ///
    /// Returns the removed node, or `None` when no node has that id.
    pub fn remove_node(&mut self, id: &str) -> Option<NodeRecord> {
        let idx = self.nodes.iter().position(|n| n.id == id)?;
        let node = self.nodes.remove(idx);
        self.edges.retain(|e| !e.touches(id));
        Some(node)
    }

    /// Drop all nodes and edges, keeping id and metadata.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    /// Check the structural invariants of the graph.
    pub fn validate(&self) -> Result<()> {
        let mut node_ids = HashSet::new();
        for node in &self.nodes {
            if !node_ids.insert(node.id.as_str()) {
                return Err(FlowdeckError::InvalidDocument(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
            if !node.position.is_finite() {
                return Err(FlowdeckError::InvalidDocument(format!(
                    "node '{}' has a non-finite position",
                    node.id
                )));
            }
        }

        let mut edge_ids = HashSet::new();
        for edge in &self.edges {
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(FlowdeckError::InvalidDocument(format!(
                    "duplicate edge id '{}'",
                    edge.id
                )));
            }
            for endpoint in [&edge.source, &edge.target] {
                if !node_ids.contains(endpoint.as_str()) {
                    return Err(FlowdeckError::InvalidDocument(format!(
                        "edge '{}' references missing node '{}'",
                        edge.id, endpoint
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Persistence key for a workflow id.
pub fn store_key(workflow_id: &str) -> String {
    format!("{}{}", STORE_KEY_PREFIX, workflow_id)
}

/// An agent offered by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub agent_name: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: String,
    pub category_name: String,
}

/// The read-only agent catalog, fetched once at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Catalog {
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// An entry shown in the template gallery overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Events published by the designer after each state change.
#[derive(Debug, Clone)]
pub enum DesignerEvent {
    CatalogLoaded { agents: usize, categories: usize },
    NodeAdded { node_id: String },
    NodeUpdated { node_id: String },
    NodeDeleted { node_id: String, edges_removed: usize },
    EdgeAdded { edge_id: String },
    EdgeDeleted { edge_id: String },
    SelectionChanged { node_id: Option<String> },
    Saved { key: String, file: String },
    Exported { file: String },
    Loaded { workflow_id: String },
    Cleared,
    Notice { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_chain() -> WorkflowDocument {
        let mut doc = WorkflowDocument::new("Chain");
        doc.nodes.push(NodeRecord::new("n1", NodeType::Agent, "One", Position::default()));
        doc.nodes.push(NodeRecord::new("n2", NodeType::Agent, "Two", Position::default()));
        doc.nodes.push(NodeRecord::new("n3", NodeType::Output, "Three", Position::default()));
        doc.edges.push(EdgeRecord::new("n1", "n2"));
        doc.edges.push(EdgeRecord::new("n2", "n3"));
        doc.edges.push(EdgeRecord::new("n3", "n1"));
        doc
    }

    #[test]
    fn test_remove_node_cascades_edges() {
        let mut doc = doc_with_chain();
        let removed = doc.remove_node("n2").unwrap();
        assert_eq!(removed.id, "n2");
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.edges.len(), 1);
        assert!(doc.edges.iter().all(|e| !e.touches("n2")));
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_remove_missing_node_is_noop() {
        let mut doc = doc_with_chain();
        assert!(doc.remove_node("nope").is_none());
        assert_eq!(doc.edges.len(), 3);
    }

    #[test]
    fn test_validate_rejects_dangling_edge() {
        let mut doc = doc_with_chain();
        doc.edges.push(EdgeRecord::new("n1", "ghost"));
        let err = doc.validate().unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_validate_rejects_duplicate_ids_and_nan() {
        let mut doc = doc_with_chain();
        doc.nodes.push(NodeRecord::new("n1", NodeType::Agent, "Dup", Position::default()));
        assert!(doc.validate().is_err());

        let mut doc = doc_with_chain();
        doc.nodes[0].position.x = f64::NAN;
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_node_defaults_from_minimal_json() {
        let json = r#"{"id":"n1","type":"trigger","label":"Start","position":{"x":1.5,"y":2}}"#;
        let node: NodeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(node.node_type, NodeType::Trigger);
        assert_eq!(node.timeout, 300);
        assert_eq!(node.retry_count, 3);
        assert!(node.tags.is_empty());
        assert!(node.settings.is_empty());
    }

    #[test]
    fn test_unknown_node_type_is_preserved() {
        let json = r#"{"id":"n1","type":"webhook","label":"Hook","position":{"x":0,"y":0}}"#;
        let node: NodeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(node.node_type, NodeType::Other("webhook".into()));
        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back["type"], "webhook");
    }

    #[test]
    fn test_from_agent_copies_catalog_fields() {
        let agent = Agent {
            agent_id: "a1".into(),
            agent_name: "Analyzer".into(),
            category_id: "c1".into(),
            category_name: "Analysis".into(),
            capabilities: vec!["sql".into()],
        };
        let node = NodeRecord::from_agent(&agent, Position::new(10.0, 20.0));
        assert!(node.id.starts_with("node-"));
        assert_eq!(node.node_type, NodeType::Agent);
        assert_eq!(node.label, "Analyzer");
        assert_eq!(node.agent_id.as_deref(), Some("a1"));
        assert_eq!(node.category_name.as_deref(), Some("Analysis"));
        assert_eq!(node.position, Position::new(10.0, 20.0));
    }

    #[test]
    fn test_store_key() {
        let doc = WorkflowDocument::new("x");
        assert_eq!(doc.store_key(), format!("workflow_{}", doc.id));
    }
}
