//! Dependency ordering of a pipeline graph.
//!
//! [`topological_order`] lists every node after all nodes feeding it. The
//! walk is a depth-first post-order over input edges, done with an explicit
//! stack so deep pipelines cannot overflow the call stack.
//!
//! Roots are visited in ascending id order and each node's dependencies in
//! input-port order, so the result is a pure function of the graph.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::graph::PipelineGraph;
use crate::id::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current DFS path.
    OnStack,
    /// Emitted.
    Done,
}

struct Frame {
    node: NodeId,
    /// Connected input sources in port order.
    deps: Vec<NodeId>,
    next: usize,
}

impl Frame {
    fn new(graph: &PipelineGraph, node: NodeId) -> Result<Self, CoreError> {
        let deps = graph.input_sources(node)?.into_iter().flatten().collect();
        Ok(Frame {
            node,
            deps,
            next: 0,
        })
    }
}

/// Orders all nodes so that every edge's source precedes its target.
///
/// Unconnected input ports are skipped here; compilation reports them.
///
/// # Errors
///
/// Returns [`CoreError::CyclicGraph`] naming the nodes of the first cycle
/// found, in data-flow order. A self-loop is reported as a one-node cycle.
pub fn topological_order(graph: &PipelineGraph) -> Result<Vec<NodeId>, CoreError> {
    let mut marks: HashMap<NodeId, Mark> = HashMap::with_capacity(graph.node_count());
    let mut order = Vec::with_capacity(graph.node_count());

    for root in graph.node_ids() {
        if marks.contains_key(&root) {
            continue;
        }

        marks.insert(root, Mark::OnStack);
        let mut stack = vec![Frame::new(graph, root)?];

        while let Some(frame) = stack.last_mut() {
            let Some(&dep) = frame.deps.get(frame.next) else {
                let node = frame.node;
                stack.pop();
                marks.insert(node, Mark::Done);
                order.push(node);
                continue;
            };
            frame.next += 1;

            match marks.get(&dep) {
                Some(Mark::Done) => {}
                Some(Mark::OnStack) => return Err(cycle_error(&stack, dep)),
                None => {
                    marks.insert(dep, Mark::OnStack);
                    stack.push(Frame::new(graph, dep)?);
                }
            }
        }
    }

    Ok(order)
}

/// Builds the cycle error from the DFS path. The path runs consumer to
/// producer; the reported cycle runs the other way.
fn cycle_error(stack: &[Frame], repeated: NodeId) -> CoreError {
    let start = stack
        .iter()
        .position(|frame| frame.node == repeated)
        .unwrap_or(0);
    let mut cycle: Vec<NodeId> = stack[start..].iter().map(|frame| frame.node).collect();
    cycle.reverse();
    CoreError::CyclicGraph { cycle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::NodeKind;
    use proptest::prelude::*;
    use proptest::sample::Index;

    fn position(order: &[NodeId], id: NodeId) -> usize {
        order.iter().position(|&n| n == id).unwrap()
    }

    #[test]
    fn empty_graph_has_empty_order() {
        assert_eq!(topological_order(&PipelineGraph::new()).unwrap(), vec![]);
    }

    #[test]
    fn chain_orders_producers_first() {
        let mut graph = PipelineGraph::new();
        // Created sink-first so id order disagrees with data flow.
        let result = graph.add_node(NodeKind::Result).unwrap();
        let md5 = graph.add_node(NodeKind::Md5).unwrap();
        let input = graph.add_node(NodeKind::Input).unwrap();
        graph.add_edge(input, md5, 0).unwrap();
        graph.add_edge(md5, result, 0).unwrap();

        assert_eq!(topological_order(&graph).unwrap(), vec![input, md5, result]);
    }

    #[test]
    fn dependencies_follow_port_order() {
        let mut graph = PipelineGraph::new();
        let xor = graph.add_node(NodeKind::Xor).unwrap();
        let b = graph.add_node(NodeKind::Input).unwrap();
        let a = graph.add_node(NodeKind::Input).unwrap();
        graph.add_edge(a, xor, 0).unwrap();
        graph.add_edge(b, xor, 1).unwrap();

        assert_eq!(topological_order(&graph).unwrap(), vec![a, b, xor]);
    }

    #[test]
    fn unconnected_ports_are_skipped() {
        let mut graph = PipelineGraph::new();
        let input = graph.add_node(NodeKind::Input).unwrap();
        let xor = graph.add_node(NodeKind::Xor).unwrap();
        graph.add_edge(input, xor, 1).unwrap();

        assert_eq!(topological_order(&graph).unwrap(), vec![input, xor]);
    }

    #[test]
    fn shared_producer_appears_once() {
        let mut graph = PipelineGraph::new();
        let input = graph.add_node(NodeKind::Input).unwrap();
        let xor = graph.add_node(NodeKind::Xor).unwrap();
        graph.add_edge(input, xor, 0).unwrap();
        graph.add_edge(input, xor, 1).unwrap();

        assert_eq!(topological_order(&graph).unwrap(), vec![input, xor]);
    }

    #[test]
    fn two_node_cycle_is_reported() {
        let mut graph = PipelineGraph::new();
        let a = graph.add_node(NodeKind::Md5).unwrap();
        let b = graph.add_node(NodeKind::Sha256).unwrap();
        graph.add_edge(a, b, 0).unwrap();
        graph.add_edge(b, a, 0).unwrap();

        match topological_order(&graph).unwrap_err() {
            CoreError::CyclicGraph { cycle } => assert_eq!(cycle, vec![b, a]),
            other => panic!("expected CyclicGraph, got {other:?}"),
        }
    }

    #[test]
    fn self_loop_is_reported() {
        let mut graph = PipelineGraph::new();
        let input = graph.add_node(NodeKind::Input).unwrap();
        let xor = graph.add_node(NodeKind::Xor).unwrap();
        graph.add_edge(input, xor, 0).unwrap();
        graph.add_edge(xor, xor, 1).unwrap();

        match topological_order(&graph).unwrap_err() {
            CoreError::CyclicGraph { cycle } => assert_eq!(cycle, vec![xor]),
            other => panic!("expected CyclicGraph, got {other:?}"),
        }
    }

    #[test]
    fn long_chain_orders_every_node() {
        let mut graph = PipelineGraph::new();
        let mut prev = graph.add_node(NodeKind::Input).unwrap();
        for _ in 0..5_000 {
            let next = graph.add_node(NodeKind::Md5).unwrap();
            graph.add_edge(prev, next, 0).unwrap();
            prev = next;
        }
        let order = topological_order(&graph).unwrap();
        assert_eq!(order.len(), 5_001);
        assert_eq!(order.last(), Some(&prev));
    }

    // Nodes only draw inputs from lower ids, so every generated graph is acyclic.
    fn acyclic_graph() -> impl Strategy<Value = PipelineGraph> {
        let node = (
            any::<Index>(),
            proptest::option::of(any::<Index>()),
            proptest::option::of(any::<Index>()),
        );
        proptest::collection::vec(node, 1..40).prop_map(|specs| {
            let mut graph = PipelineGraph::new();
            let mut producers: Vec<NodeId> = Vec::new();
            for (kind, first, second) in specs {
                let kind = *kind.get(&NodeKind::ALL);
                let id = graph.add_node(kind).unwrap();
                for (port, pick) in [first, second].into_iter().enumerate().take(kind.arity()) {
                    if let (Some(pick), false) = (pick, producers.is_empty()) {
                        let source = *pick.get(&producers);
                        graph.add_edge(source, id, port as u16).unwrap();
                    }
                }
                if kind.has_output() {
                    producers.push(id);
                }
            }
            graph
        })
    }

    proptest! {
        #[test]
        fn order_respects_every_edge(graph in acyclic_graph()) {
            let order = topological_order(&graph).unwrap();
            prop_assert_eq!(order.len(), graph.node_count());
            for edge in graph.edges() {
                prop_assert!(position(&order, edge.source) < position(&order, edge.target));
            }
        }

        #[test]
        fn order_is_deterministic(graph in acyclic_graph()) {
            let reloaded = PipelineGraph::from_json(&graph.to_json().unwrap()).unwrap();
            prop_assert_eq!(
                topological_order(&graph).unwrap(),
                topological_order(&reloaded).unwrap()
            );
        }
    }
}
