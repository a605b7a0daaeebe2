//! PipelineGraph: the editable dataflow graph of hash pipeline nodes.
//!
//! [`PipelineGraph`] is the single entry point for constructing and querying
//! pipelines. Nodes live in a petgraph `StableGraph` arena; each data edge is
//! stored exactly once as a [`Wire`] weight, and input/output ports are
//! derived from the node kinds rather than kept as back-pointers.
//!
//! # Identity
//!
//! Node ids come from a counter owned by the graph. `StableGraph` recycles
//! freed indices, so ids are kept separately and mapped to indices through
//! `index`; an id is never handed out twice, even after the node is removed
//! or the graph is saved and reloaded.
//!
//! # Invariants
//!
//! - every input port has at most one incoming edge;
//! - edges leave port 0 of a node kind that has an output;
//! - edges enter a port index below the target kind's arity.
//!
//! Cycles and unconnected inputs are allowed while editing; they are
//! reported by the orderer and the compiler respectively.

use indexmap::IndexMap;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::edge::{Edge, Wire};
use crate::error::CoreError;
use crate::id::NodeId;
use crate::node::{InputPort, Node};
use crate::ops::NodeKind;

/// The pipeline graph container.
///
/// All mutations go through `PipelineGraph` methods so the port invariants
/// hold at every point. Serializes to a flat `{ next_node_id, nodes, edges }`
/// document; loading replays every edge through the same checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GraphFile", into = "GraphFile")]
pub struct PipelineGraph {
    /// Node arena with one wire per data edge.
    graph: StableGraph<Node, Wire, Directed, u32>,
    /// Stable id to arena index, kept in ascending id order.
    index: IndexMap<NodeId, NodeIndex<u32>>,
    /// Next node ID counter
    next_node_id: u32,
}

impl Default for PipelineGraph {
    fn default() -> Self {
        PipelineGraph::new()
    }
}

impl PipelineGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        PipelineGraph {
            graph: StableGraph::new(),
            index: IndexMap::new(),
            next_node_id: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Looks up a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index
            .get(&id)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Returns `true` if the node exists.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// All nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.index
            .values()
            .filter_map(move |&idx| self.graph.node_weight(idx))
    }

    /// All node ids in ascending order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.index.keys().copied().collect()
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns `true` if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the next node ID counter value.
    pub fn next_node_id(&self) -> u32 {
        self.next_node_id
    }

    // -----------------------------------------------------------------------
    // Node methods
    // -----------------------------------------------------------------------

    /// Adds a node of the given kind and returns its fresh id.
    ///
    /// Errors with [`CoreError::IdSpaceExhausted`] once the counter has no
    /// successor; the counter never wraps back onto a used id.
    pub fn add_node(&mut self, kind: NodeKind) -> Result<NodeId, CoreError> {
        let id = NodeId(self.next_node_id);
        self.next_node_id = self
            .next_node_id
            .checked_add(1)
            .ok_or(CoreError::IdSpaceExhausted)?;

        let idx = self.graph.add_node(Node::new(id, kind));
        self.index.insert(id, idx);

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(id)
    }

    /// Removes a node and every edge touching it.
    ///
    /// Returns the removed node. Its id is not reused.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, CoreError> {
        let idx = self
            .index
            .shift_remove(&id)
            .ok_or(CoreError::NodeNotFound { id })?;
        let node = self
            .graph
            .remove_node(idx)
            .ok_or(CoreError::NodeNotFound { id })?;

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(node)
    }

    // -----------------------------------------------------------------------
    // Edge methods
    // -----------------------------------------------------------------------

    /// Connects the output of `source` to input `target_port` of `target`.
    ///
    /// Fails if either node is missing, `source` has no output, the port index
    /// is out of range for `target`'s kind, or the port is already connected.
    pub fn add_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        target_port: u16,
    ) -> Result<Edge, CoreError> {
        self.insert_edge(Edge::new(source, target, target_port))
    }

    fn insert_edge(&mut self, edge: Edge) -> Result<Edge, CoreError> {
        let source_idx = self.node_index(edge.source)?;
        let target_idx = self.node_index(edge.target)?;
        let source = self.graph[source_idx];
        let target = self.graph[target_idx];

        if !source.has_output() || edge.source_port != 0 {
            return Err(CoreError::NoOutputPort {
                node: source.id,
                kind: source.kind,
                port: edge.source_port,
            });
        }
        if usize::from(edge.target_port) >= target.arity() {
            return Err(CoreError::PortOutOfRange {
                node: target.id,
                kind: target.kind,
                port: edge.target_port,
                arity: target.arity(),
            });
        }
        if let Some(existing) = self.input_source(edge.target, edge.target_port) {
            return Err(CoreError::InputOccupied {
                node: edge.target,
                port: edge.target_port,
                source_node: existing,
            });
        }

        self.graph.add_edge(source_idx, target_idx, edge.wire());

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(edge)
    }

    /// Removes the edge entering the given input port.
    ///
    /// Input ports take at most one edge, so the port names the edge.
    pub fn remove_edge(&mut self, target: NodeId, target_port: u16) -> Result<Edge, CoreError> {
        let target_idx = self.node_index(target)?;
        let (edge_idx, source_idx) = self
            .graph
            .edges_directed(target_idx, Direction::Incoming)
            .find(|e| e.weight().target_port == target_port)
            .map(|e| (e.id(), e.source()))
            .ok_or(CoreError::EdgeNotFound {
                node: target,
                port: target_port,
            })?;

        let wire = self
            .graph
            .remove_edge(edge_idx)
            .ok_or(CoreError::EdgeNotFound {
                node: target,
                port: target_port,
            })?;

        Ok(Edge {
            source: self.graph[source_idx].id,
            source_port: wire.source_port,
            target,
            target_port,
        })
    }

    // -----------------------------------------------------------------------
    // Query methods
    // -----------------------------------------------------------------------

    /// The node feeding input `port` of `target`, if connected.
    pub fn input_source(&self, target: NodeId, port: u16) -> Option<NodeId> {
        let idx = *self.index.get(&target)?;
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .find(|e| e.weight().target_port == port)
            .map(|e| self.graph[e.source()].id)
    }

    /// The source feeding each input of `id`, in port order. `None` marks an
    /// unconnected port.
    pub fn input_sources(&self, id: NodeId) -> Result<Vec<Option<NodeId>>, CoreError> {
        let node = self.node(id).ok_or(CoreError::NodeNotFound { id })?;
        Ok(node
            .input_ports()
            .map(|InputPort { node, index }| self.input_source(node, index))
            .collect())
    }

    /// Edges entering `id`, ordered by input port.
    pub fn incoming_edges(&self, id: NodeId) -> Vec<Edge> {
        self.edges_of(id, Direction::Incoming)
    }

    /// Edges leaving `id` (fan-out), ordered by target then port.
    pub fn outgoing_edges(&self, id: NodeId) -> Vec<Edge> {
        self.edges_of(id, Direction::Outgoing)
    }

    /// All edges, sorted.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .index
            .keys()
            .flat_map(|&id| self.edges_of(id, Direction::Incoming))
            .collect();
        edges.sort();
        edges
    }

    fn edges_of(&self, id: NodeId, direction: Direction) -> Vec<Edge> {
        let Some(&idx) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut edges: Vec<Edge> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| Edge {
                source: self.graph[e.source()].id,
                source_port: e.weight().source_port,
                target: self.graph[e.target()].id,
                target_port: e.weight().target_port,
            })
            .collect();
        edges.sort_by_key(|e| (e.target, e.target_port));
        edges
    }

    fn node_index(&self, id: NodeId) -> Result<NodeIndex<u32>, CoreError> {
        self.index
            .get(&id)
            .copied()
            .ok_or(CoreError::NodeNotFound { id })
    }

    // -----------------------------------------------------------------------
    // Graph files
    // -----------------------------------------------------------------------

    /// Serializes the graph as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads a graph from JSON, re-validating every edge.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    // -----------------------------------------------------------------------
    // Debug consistency assertion
    // -----------------------------------------------------------------------

    /// Verifies that the id index and the arena agree and that no input port
    /// has two incoming edges.
    ///
    /// Only called in debug builds (via `cfg(debug_assertions)`).
    #[cfg(debug_assertions)]
    fn assert_consistency(&self) {
        assert_eq!(
            self.index.len(),
            self.graph.node_count(),
            "id index and arena disagree on node count"
        );
        for (&id, &idx) in &self.index {
            let node = self
                .graph
                .node_weight(idx)
                .unwrap_or_else(|| panic!("node {id} maps to a vacant index"));
            assert_eq!(node.id, id, "node {id} stored under the wrong index");
            assert!(id.0 < self.next_node_id, "node {id} is not below the id counter");

            let mut ports: Vec<u16> = self
                .graph
                .edges_directed(idx, Direction::Incoming)
                .map(|e| e.weight().target_port)
                .collect();
            let count = ports.len();
            ports.sort_unstable();
            ports.dedup();
            assert_eq!(ports.len(), count, "node {id} has a doubly connected input");
        }
    }
}

// ---------------------------------------------------------------------------
// Serialized form
// ---------------------------------------------------------------------------

/// On-disk layout of a [`PipelineGraph`].
#[derive(Serialize, Deserialize)]
struct GraphFile {
    /// Absent in hand-written files; defaults to one past the largest id.
    #[serde(default)]
    next_node_id: Option<u32>,
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

impl TryFrom<GraphFile> for PipelineGraph {
    type Error = CoreError;

    fn try_from(file: GraphFile) -> Result<Self, Self::Error> {
        let mut nodes = file.nodes;
        nodes.sort_by_key(|n| n.id);

        let next_node_id = file.next_node_id.unwrap_or_else(|| {
            nodes
                .last()
                .map_or(0, |n| n.id.0.saturating_add(1))
        });

        let mut graph = PipelineGraph {
            graph: StableGraph::new(),
            index: IndexMap::new(),
            next_node_id,
        };

        for node in nodes {
            if node.id.0 >= next_node_id {
                return Err(CoreError::NodeIdOutOfRange {
                    id: node.id,
                    next: next_node_id,
                });
            }
            if graph.index.contains_key(&node.id) {
                return Err(CoreError::DuplicateNodeId { id: node.id });
            }
            let idx = graph.graph.add_node(node);
            graph.index.insert(node.id, idx);
        }

        for edge in file.edges {
            graph.insert_edge(edge)?;
        }

        Ok(graph)
    }
}

impl From<PipelineGraph> for GraphFile {
    fn from(graph: PipelineGraph) -> Self {
        GraphFile {
            next_node_id: Some(graph.next_node_id),
            nodes: graph.nodes().copied().collect(),
            edges: graph.edges(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Input -> Md5 -> Result
    fn build_md5_graph() -> (PipelineGraph, [NodeId; 3]) {
        let mut graph = PipelineGraph::new();
        let input = graph.add_node(NodeKind::Input).unwrap();
        let md5 = graph.add_node(NodeKind::Md5).unwrap();
        let result = graph.add_node(NodeKind::Result).unwrap();
        graph.add_edge(input, md5, 0).unwrap();
        graph.add_edge(md5, result, 0).unwrap();
        (graph, [input, md5, result])
    }

    #[test]
    fn basic_graph_construction() {
        let (graph, [input, md5, result]) = build_md5_graph();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.node_ids(), vec![input, md5, result]);
        assert_eq!(graph.input_source(md5, 0), Some(input));
        assert_eq!(graph.input_source(result, 0), Some(md5));
        assert_eq!(graph.input_sources(input).unwrap(), Vec::<Option<NodeId>>::new());
    }

    #[test]
    fn remove_node_removes_node_and_edges() {
        let (mut graph, [_, md5, result]) = build_md5_graph();

        let removed = graph.remove_node(md5).unwrap();
        assert_eq!(removed.kind, NodeKind::Md5);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.input_sources(result).unwrap(), vec![None]);
    }

    #[test]
    fn ids_are_never_reused() {
        let (mut graph, [_, md5, _]) = build_md5_graph();
        graph.remove_node(md5).unwrap();

        let fresh = graph.add_node(NodeKind::Sha512).unwrap();
        assert_eq!(fresh, NodeId(3));
        assert!(graph.node(md5).is_none());
        assert_eq!(graph.node(fresh).unwrap().kind, NodeKind::Sha512);
    }

    #[test]
    fn occupied_input_is_rejected() {
        let (mut graph, [input, _, result]) = build_md5_graph();

        let err = graph.add_edge(input, result, 0).unwrap_err();
        match err {
            CoreError::InputOccupied { node, port, source_node } => {
                assert_eq!(node, result);
                assert_eq!(port, 0);
                assert_eq!(source_node, NodeId(1));
            }
            other => panic!("expected InputOccupied, got {other:?}"),
        }
    }

    #[test]
    fn port_out_of_range_is_rejected() {
        let (mut graph, [input, md5, _]) = build_md5_graph();
        let err = graph.add_edge(input, md5, 1).unwrap_err();
        assert!(matches!(err, CoreError::PortOutOfRange { port: 1, arity: 1, .. }));
    }

    #[test]
    fn result_has_no_output() {
        let (mut graph, [_, _, result]) = build_md5_graph();
        let sink = graph.add_node(NodeKind::Result).unwrap();
        let err = graph.add_edge(result, sink, 0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::NoOutputPort { kind: NodeKind::Result, .. }
        ));
    }

    #[test]
    fn edge_to_missing_node_errors() {
        let (mut graph, [input, ..]) = build_md5_graph();
        let err = graph.add_edge(input, NodeId(99), 0).unwrap_err();
        assert!(matches!(err, CoreError::NodeNotFound { id: NodeId(99) }));
    }

    #[test]
    fn fan_out_is_allowed() {
        let mut graph = PipelineGraph::new();
        let input = graph.add_node(NodeKind::Input).unwrap();
        let xor = graph.add_node(NodeKind::Xor).unwrap();
        graph.add_edge(input, xor, 0).unwrap();
        graph.add_edge(input, xor, 1).unwrap();

        assert_eq!(graph.outgoing_edges(input).len(), 2);
        assert_eq!(graph.input_sources(xor).unwrap(), vec![Some(input), Some(input)]);
    }

    #[test]
    fn remove_edge_frees_the_port() {
        let (mut graph, [input, md5, result]) = build_md5_graph();

        let removed = graph.remove_edge(result, 0).unwrap();
        assert_eq!(removed, Edge::new(md5, result, 0));
        assert_eq!(graph.input_source(result, 0), None);

        // Port is free again.
        graph.add_edge(input, result, 0).unwrap();
        assert_eq!(graph.input_source(result, 0), Some(input));

        let err = graph.remove_edge(md5, 0).and_then(|_| graph.remove_edge(md5, 0));
        assert!(matches!(err, Err(CoreError::EdgeNotFound { port: 0, .. })));
    }

    #[test]
    fn json_roundtrip_preserves_id_counter() {
        let (mut graph, [_, md5, _]) = build_md5_graph();
        graph.remove_node(md5).unwrap();

        let json = graph.to_json().unwrap();
        let mut back = PipelineGraph::from_json(&json).unwrap();
        assert_eq!(back.node_ids(), graph.node_ids());
        assert_eq!(back.edges(), graph.edges());
        assert_eq!(back.next_node_id(), 3);
        assert_eq!(back.add_node(NodeKind::Md5).unwrap(), NodeId(3));
    }

    #[test]
    fn json_without_counter_uses_max_id() {
        let json = r#"{
            "nodes": [
                {"id": 5, "kind": "Md5"},
                {"id": 2, "kind": "Input"}
            ],
            "edges": [{"source": 2, "target": 5, "target_port": 0}]
        }"#;
        let graph = PipelineGraph::from_json(json).unwrap();
        assert_eq!(graph.next_node_id(), 6);
        assert_eq!(graph.node_ids(), vec![NodeId(2), NodeId(5)]);
        assert_eq!(graph.input_source(NodeId(5), 0), Some(NodeId(2)));
    }

    #[test]
    fn exhausted_id_counter_never_reuses_ids() {
        let json = r#"{"next_node_id": 4294967295, "nodes": [{"id": 0, "kind": "Input"}]}"#;
        let mut graph = PipelineGraph::from_json(json).unwrap();

        for _ in 0..2 {
            let err = graph.add_node(NodeKind::Sha256).unwrap_err();
            assert!(matches!(err, CoreError::IdSpaceExhausted), "got {err:?}");
        }
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.next_node_id(), u32::MAX);
        assert_eq!(graph.node(NodeId(0)).unwrap().kind, NodeKind::Input);
    }

    #[test]
    fn last_id_before_counter_limit_is_handed_out_once() {
        let json = r#"{"next_node_id": 4294967294, "nodes": [{"id": 0, "kind": "Input"}]}"#;
        let mut graph = PipelineGraph::from_json(json).unwrap();

        let id = graph.add_node(NodeKind::Md5).unwrap();
        assert_eq!(id, NodeId(u32::MAX - 1));
        assert!(matches!(graph.add_node(NodeKind::Md5), Err(CoreError::IdSpaceExhausted)));
        assert_eq!(graph.node_ids(), vec![NodeId(0), id]);
    }

    #[test]
    fn json_rejects_doubly_connected_input() {
        let json = r#"{
            "nodes": [
                {"id": 0, "kind": "Input"},
                {"id": 1, "kind": "Input"},
                {"id": 2, "kind": "Md5"}
            ],
            "edges": [
                {"source": 0, "target": 2, "target_port": 0},
                {"source": 1, "target": 2, "target_port": 0}
            ]
        }"#;
        let err = PipelineGraph::from_json(json).unwrap_err();
        assert!(err.to_string().contains("already connected"), "{err}");
    }

    #[test]
    fn json_rejects_duplicate_ids() {
        let json = r#"{"nodes": [{"id": 1, "kind": "Input"}, {"id": 1, "kind": "Md5"}]}"#;
        let err = PipelineGraph::from_json(json).unwrap_err();
        assert!(err.to_string().contains("duplicate node id"), "{err}");
    }
}
