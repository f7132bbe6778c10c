//! Directed acyclic graph (DAG) library for build ordering.
//!
//! This crate provides the graph underneath recipe build planning:
//! - Precedence edges with cycle rejection on insert
//! - Deterministic topological sorting (Kahn's algorithm with a caller-chosen tie-break)
//! - Sorting restricted to a subset of nodes
//! - Ancestor and descendant closures
//!
//! # Example
//!
//! ```
//! use brioche_graph::DAG;
//!
//! let mut dag = DAG::<&str, ()>::new();
//!
//! let binutils = dag.add_node("binutils");
//! let headers = dag.add_node("linux-headers");
//! let gcc = dag.add_node("gcc");
//!
//! // gcc depends on binutils
//! dag.add_edge(binutils, gcc, ()).unwrap();
//!
//! // Ties are broken by the key: names in ascending order
//! let order = dag.topological_sort_by_key(|name| *name).unwrap();
//! assert_eq!(order, vec![binutils, gcc, headers]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

/// Node identifier in the DAG.
///
/// Identifiers are handed out in insertion order and compare in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in insertion order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Error types for DAG operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Cycle detected in the graph.
    ///
    /// From `add_edge` the path is closed: it starts and ends with the same
    /// node, and every consecutive pair is an edge. From a sort it lists the
    /// nodes that could not be placed.
    #[error("Cycle detected in graph: {}", format_path(.0))]
    CycleDetected(Vec<NodeId>),

    /// Node not found
    #[error("Node {0} not found in graph")]
    NodeNotFound(NodeId),
}

fn format_path(path: &[NodeId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result type for DAG operations.
pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Debug, Clone)]
struct Node<N> {
    data: N,
    // this node -> other nodes (they come after)
    outgoing: BTreeSet<NodeId>,
    // other nodes -> this node (they come before)
    incoming: BTreeSet<NodeId>,
}

#[derive(Debug, Clone)]
struct Edge<E> {
    from: NodeId,
    to: NodeId,
    data: E,
}

/// Generic directed acyclic graph (DAG).
///
/// Edges express precedence: an edge `from -> to` means `from` must be
/// processed before `to`. Adjacency is kept in ordered sets so that every
/// traversal visits neighbors in the same order on every run.
#[derive(Debug, Clone)]
pub struct DAG<N, E> {
    nodes: BTreeMap<NodeId, Node<N>>,
    edges: Vec<Edge<E>>,
    next_id: usize,
}

impl<N, E> Default for DAG<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> DAG<N, E> {
    /// Create a new empty DAG.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            next_id: 0,
        }
    }

    /// Add a node to the graph and return its ID.
    pub fn add_node(&mut self, data: N) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        let node = Node {
            data,
            outgoing: BTreeSet::new(),
            incoming: BTreeSet::new(),
        };

        let _ = self.nodes.insert(id, node);
        id
    }

    /// Add a directed edge from `from` to `to` with associated data.
    ///
    /// The edge represents precedence: `from` must be processed before `to`.
    /// If task B depends on task A, call `add_edge(A, B, ...)`. Adding an
    /// edge that already exists is a no-op.
    ///
    /// # Errors
    ///
    /// - `GraphError::NodeNotFound` if either node doesn't exist
    /// - `GraphError::CycleDetected` if the edge would close a cycle; the
    ///   error carries that cycle
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, data: E) -> GraphResult<()> {
        if !self.nodes.contains_key(&from) {
            return Err(GraphError::NodeNotFound(from));
        }
        if !self.nodes.contains_key(&to) {
            return Err(GraphError::NodeNotFound(to));
        }

        if self.nodes[&from].outgoing.contains(&to) {
            return Ok(());
        }

        // If `to` already reaches `from`, the new edge closes the loop
        if let Some(path) = self.path_between(to, from) {
            let mut cycle = Vec::with_capacity(path.len() + 1);
            cycle.push(from);
            cycle.extend(path);
            return Err(GraphError::CycleDetected(cycle));
        }

        self.edges.push(Edge { from, to, data });

        if let Some(from_node) = self.nodes.get_mut(&from) {
            let _ = from_node.outgoing.insert(to);
        }
        if let Some(to_node) = self.nodes.get_mut(&to) {
            let _ = to_node.incoming.insert(from);
        }

        Ok(())
    }

    /// Shortest path from `start` to `end` following edge direction,
    /// including both endpoints.
    fn path_between(&self, start: NodeId, end: NodeId) -> Option<Vec<NodeId>> {
        let mut parents: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            if current == end {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(&parent) = parents.get(&cursor) {
                    path.push(parent);
                    cursor = parent;
                }
                path.reverse();
                return Some(path);
            }

            if let Some(node) = self.nodes.get(&current) {
                for &neighbor in &node.outgoing {
                    if seen.insert(neighbor) {
                        let _ = parents.insert(neighbor, current);
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        None
    }

    /// Get a reference to a node's data.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn node(&self, id: NodeId) -> GraphResult<&N> {
        self.nodes
            .get(&id)
            .map(|node| &node.data)
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Get the data attached to the edge `from -> to`, if that edge exists.
    #[must_use]
    pub fn edge(&self, from: NodeId, to: NodeId) -> Option<&E> {
        self.edges
            .iter()
            .find(|edge| edge.from == from && edge.to == to)
            .map(|edge| &edge.data)
    }

    /// Get all node IDs in insertion order.
    #[must_use]
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// Get the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Get all direct dependencies (incoming edges) of a node.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn dependencies(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        self.nodes
            .get(&id)
            .map(|node| node.incoming.iter().copied().collect())
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Get all direct dependents (outgoing edges) of a node.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn dependents(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        self.nodes
            .get(&id)
            .map(|node| node.outgoing.iter().copied().collect())
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// All nodes that must come before `id` (transitive dependencies),
    /// not including `id` itself.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn ancestors(&self, id: NodeId) -> GraphResult<BTreeSet<NodeId>> {
        self.closure(id, |node| &node.incoming)
    }

    /// All nodes that come after `id` (transitive dependents),
    /// not including `id` itself.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn descendants(&self, id: NodeId) -> GraphResult<BTreeSet<NodeId>> {
        self.closure(id, |node| &node.outgoing)
    }

    fn closure<F>(&self, id: NodeId, neighbors: F) -> GraphResult<BTreeSet<NodeId>>
    where
        F: Fn(&Node<N>) -> &BTreeSet<NodeId>,
    {
        let start = self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))?;

        let mut result = BTreeSet::new();
        let mut stack: Vec<NodeId> = neighbors(start).iter().copied().collect();

        while let Some(current) = stack.pop() {
            if !result.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(neighbors(node).iter().copied());
            }
        }

        Ok(result)
    }

    /// Topological sort using Kahn's algorithm, ties broken by insertion order.
    ///
    /// Returns nodes in dependency order (dependencies before dependents).
    ///
    /// # Errors
    ///
    /// Returns `GraphError::CycleDetected` if the graph contains a cycle.
    pub fn topological_sort(&self) -> GraphResult<Vec<NodeId>> {
        self.kahn(None, |_| ())
    }

    /// Topological sort using Kahn's algorithm.
    ///
    /// Whenever several nodes are ready at once, the one with the smallest
    /// key goes first (insertion order settles equal keys). The result only
    /// depends on the graph and the keys, never on hash iteration order.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::CycleDetected` if the graph contains a cycle.
    pub fn topological_sort_by_key<'a, K, F>(&'a self, key: F) -> GraphResult<Vec<NodeId>>
    where
        K: Ord,
        F: FnMut(&'a N) -> K,
    {
        self.kahn(None, key)
    }

    /// Topological sort of the subgraph induced by `members`.
    ///
    /// Edges to or from nodes outside `members` are ignored. Unknown IDs in
    /// `members` are rejected.
    ///
    /// # Errors
    ///
    /// - `GraphError::NodeNotFound` if a member doesn't exist
    /// - `GraphError::CycleDetected` if the subgraph contains a cycle
    pub fn topological_sort_within<'a, K, F>(
        &'a self,
        members: &BTreeSet<NodeId>,
        key: F,
    ) -> GraphResult<Vec<NodeId>>
    where
        K: Ord,
        F: FnMut(&'a N) -> K,
    {
        if let Some(&missing) = members.iter().find(|id| !self.nodes.contains_key(id)) {
            return Err(GraphError::NodeNotFound(missing));
        }
        self.kahn(Some(members), key)
    }

    fn kahn<'a, K, F>(&'a self, members: Option<&BTreeSet<NodeId>>, mut key: F) -> GraphResult<Vec<NodeId>>
    where
        K: Ord,
        F: FnMut(&'a N) -> K,
    {
        let included = |id: &NodeId| members.is_none_or(|members| members.contains(id));

        let mut in_degree: BTreeMap<NodeId, usize> = BTreeMap::new();
        for (&id, node) in self.nodes.iter().filter(|(id, _)| included(id)) {
            let degree = node.incoming.iter().filter(|dep| included(dep)).count();
            let _ = in_degree.insert(id, degree);
        }

        // Ready set ordered by (key, id)
        let mut ready: BTreeSet<(K, NodeId)> = BTreeSet::new();
        for (&id, &degree) in &in_degree {
            if degree == 0 {
                let _ = ready.insert((key(&self.nodes[&id].data), id));
            }
        }

        let mut result = Vec::with_capacity(in_degree.len());

        while let Some((_, node_id)) = ready.pop_first() {
            result.push(node_id);

            for &neighbor in &self.nodes[&node_id].outgoing {
                if let Some(degree) = in_degree.get_mut(&neighbor) {
                    *degree -= 1;
                    if *degree == 0 {
                        let _ = ready.insert((key(&self.nodes[&neighbor].data), neighbor));
                    }
                }
            }
        }

        if result.len() == in_degree.len() {
            Ok(result)
        } else {
            // Insertion rejects cycles, so this only trips on a corrupted graph
            let stuck: Vec<NodeId> = in_degree
                .into_iter()
                .filter(|&(_, degree)| degree > 0)
                .map(|(id, _)| id)
                .collect();
            Err(GraphError::CycleDetected(stuck))
        }
    }
}
