use std::collections::HashMap;

use crate::errors::{ModelError, Result};

/// Arena index of a node within one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(usize);

/// Arena index of an edge within one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeIdx(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub x: i32,
    pub y: i32,
    /// Name of the variable realizing this node
    pub impl_ref: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            x: 0,
            y: 0,
            impl_ref: None,
        }
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn implemented_by(mut self, impl_ref: impl Into<String>) -> Self {
        self.impl_ref = Some(impl_ref.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: String,
    pub source: NodeIdx,
    pub target: NodeIdx,
    pub name: String,
}

/// Transient node/edge graph
///
/// Nodes and edges live in arenas and refer to each other by index. Equality
/// ignores insertion order: two graphs are equal when they hold the same
/// nodes (by id and content) and the same edges (by id, endpoint ids and name).
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    by_id: HashMap<String, NodeIdx>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns `InvalidInput` if a node with the same id exists.
    pub fn add_node(&mut self, node: Node) -> Result<NodeIdx> {
        if self.by_id.contains_key(&node.id) {
            return Err(ModelError::InvalidInput {
                reason: format!("duplicate node id {}", node.id),
            });
        }
        let idx = NodeIdx(self.nodes.len());
        self.by_id.insert(node.id.clone(), idx);
        self.nodes.push(node);
        Ok(idx)
    }

    /// # Errors
    ///
    /// Returns `InvalidInput` if an endpoint index is out of range.
    pub fn add_edge(
        &mut self,
        id: impl Into<String>,
        source: NodeIdx,
        target: NodeIdx,
        name: impl Into<String>,
    ) -> Result<EdgeIdx> {
        if source.0 >= self.nodes.len() || target.0 >= self.nodes.len() {
            return Err(ModelError::InvalidInput {
                reason: "edge endpoint outside of graph".to_string(),
            });
        }
        let idx = EdgeIdx(self.edges.len());
        self.edges.push(Edge {
            id: id.into(),
            source,
            target,
            name: name.into(),
        });
        Ok(idx)
    }

    /// Connect two nodes by id
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if either id is unknown.
    pub fn connect(
        &mut self,
        id: impl Into<String>,
        source: &str,
        target: &str,
        name: impl Into<String>,
    ) -> Result<EdgeIdx> {
        let lookup = |node: &str| {
            self.find_node(node).ok_or_else(|| ModelError::InvalidInput {
                reason: format!("unknown node {}", node),
            })
        };
        let (s, t) = (lookup(source)?, lookup(target)?);
        self.add_edge(id, s, t, name)
    }

    pub fn node(&self, idx: NodeIdx) -> &Node {
        &self.nodes[idx.0]
    }

    pub fn edge(&self, idx: EdgeIdx) -> &Edge {
        &self.edges[idx.0]
    }

    pub fn find_node(&self, id: &str) -> Option<NodeIdx> {
        self.by_id.get(id).copied()
    }

    /// Nodes with their indices, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIdx, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeIdx(i), n))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn out_edges(&self, idx: NodeIdx) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.source == idx)
    }

    pub fn in_edges(&self, idx: NodeIdx) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.target == idx)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn edge_key(&self, edge: &Edge) -> (String, String, String, String) {
        (
            edge.id.clone(),
            self.node(edge.source).id.clone(),
            self.node(edge.target).id.clone(),
            edge.name.clone(),
        )
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        if self.nodes.len() != other.nodes.len() || self.edges.len() != other.edges.len() {
            return false;
        }
        let nodes_match = self.nodes.iter().all(|n| {
            other
                .find_node(&n.id)
                .is_some_and(|idx| other.node(idx) == n)
        });
        let mut mine: Vec<_> = self.edges.iter().map(|e| self.edge_key(e)).collect();
        let mut theirs: Vec<_> = other.edges.iter().map(|e| other.edge_key(e)).collect();
        mine.sort();
        theirs.sort();
        nodes_match && mine == theirs
    }
}

/// Builds graph nodes from decoded wire data
///
/// Lets callers normalize nodes as they are decoded, for example to resolve
/// implementation references against the decision model.
pub trait NodeFactory {
    fn create_node(&self, decoded: Node) -> Node;
}

/// Keeps decoded nodes as they are
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainNodeFactory;

impl NodeFactory for PlainNodeFactory {
    fn create_node(&self, decoded: Node) -> Node {
        decoded
    }
}
