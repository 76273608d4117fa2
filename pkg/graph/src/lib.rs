pub mod builder;
pub mod legend;

use std::collections::{BTreeSet, HashMap, HashSet};

// --- Node identity ---

/// Stable identity of a rendered node. The same entity reached through any
/// number of reference paths resolves to one key, and therefore one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    /// `kind` is the subject kind's display form (the legend uses a
    /// placeholder spelling).
    Subject {
        kind: String,
        namespace: String,
        name: String,
    },
    Binding {
        cluster: bool,
        namespace: String,
        name: String,
    },
    /// For cluster roles the namespace slot holds the anchor namespace:
    /// the namespace of the binding the role was reached through, or `""`
    /// when it was reached from cluster scope.
    Role {
        cluster: bool,
        namespace: String,
        name: String,
    },
    /// Rules notes are keyed by the role's own scope.
    Rules { namespace: String, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

// --- Nodes and edges ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleLine {
    pub text: String,
    /// Rendered bold: the line matched an active who-can query.
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeLabel {
    Text(String),
    Rules(Vec<RuleLine>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub key: NodeKey,
    pub label: NodeLabel,
    /// Enclosing namespace cluster; `""` renders at top level.
    pub namespace: String,
    pub exists: bool,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Drawn with the arrowhead at the subject.
    SubjectToBinding,
    BindingToRole,
    RoleToRules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

// --- Graph ---

/// Identity-indexed node/edge store. Nodes are created at most once per
/// key and edges at most once per ordered (from, to) pair, regardless of
/// how often the traversal revisits them.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index: HashMap<NodeKey, NodeId>,
    edge_index: HashSet<(NodeId, NodeId)>,
}

impl Graph {
    /// Insert a node, or return the already-present node with the same key.
    /// Attributes are deterministic functions of the model, so the first
    /// insertion is as good as any.
    pub fn insert(&mut self, node: Node) -> NodeId {
        if let Some(&id) = self.index.get(&node.key) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.index.insert(node.key.clone(), id);
        self.nodes.push(node);
        id
    }

    /// Record an edge unless the ordered pair already has one.
    pub fn edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) {
        if self.edge_index.insert((from, to)) {
            self.edges.push(Edge { from, to, kind });
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, key: &NodeKey) -> Option<&Node> {
        self.index.get(key).map(|id| &self.nodes[id.0])
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Distinct namespaces hosting at least one node, sorted.
    pub fn namespaces(&self) -> BTreeSet<&str> {
        self.nodes
            .iter()
            .filter(|n| !n.namespace.is_empty())
            .map(|n| n.namespace.as_str())
            .collect()
    }
}
