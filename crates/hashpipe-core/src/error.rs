//! Core error types for hashpipe-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering graph
//! editing, ordering, and program construction.

use crate::id::{NodeId, SlotId};
use crate::ops::{NodeKind, Opcode};
use thiserror::Error;

/// Core errors produced by the hashpipe-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A node ID was not found in the graph.
    #[error("node not found: NodeId({id})")]
    NodeNotFound { id: NodeId },

    /// Two nodes claim the same ID (only possible when loading a graph file).
    #[error("duplicate node id: NodeId({id})")]
    DuplicateNodeId { id: NodeId },

    /// A loaded node ID is not below the graph's next-id counter.
    #[error("node id {id} is not below the next id counter {next}")]
    NodeIdOutOfRange { id: NodeId, next: u32 },

    /// The node id counter is at `u32::MAX`; no fresh id is left.
    #[error("node id space exhausted")]
    IdSpaceExhausted,

    /// An edge targets an input index the node kind does not declare.
    #[error("node {node} ({kind}) has {arity} input(s), port {port} does not exist")]
    PortOutOfRange {
        node: NodeId,
        kind: NodeKind,
        port: u16,
        arity: usize,
    },

    /// An edge starts at a node kind without an output, or at a port other than 0.
    #[error("node {node} ({kind}) has no output port {port}")]
    NoOutputPort { node: NodeId, kind: NodeKind, port: u16 },

    /// The input port already has an incoming edge.
    #[error("input port {port} of node {node} is already connected to node {source_node}")]
    InputOccupied {
        node: NodeId,
        port: u16,
        source_node: NodeId,
    },

    /// No edge terminates at the given input port.
    #[error("no edge into input port {port} of node {node}")]
    EdgeNotFound { node: NodeId, port: u16 },

    /// The graph contains a dependency cycle; nodes listed in data-flow order.
    #[error("cyclic graph: {}", format_cycle(.cycle))]
    CyclicGraph { cycle: Vec<NodeId> },

    /// An instruction has the wrong number of operands for its opcode.
    #[error("instruction {index} ({opcode}): expected {expected} operand(s), got {actual}")]
    ArityMismatch {
        index: usize,
        opcode: Opcode,
        expected: usize,
        actual: usize,
    },

    /// An instruction's output slot presence disagrees with its opcode.
    #[error("instruction {index} ({opcode}): output slot {}", output_word(.expected))]
    OutputMismatch {
        index: usize,
        opcode: Opcode,
        expected: bool,
    },

    /// A slot is written by more than one instruction.
    #[error("instruction {index}: slot {slot} is already defined")]
    SlotRedefined { index: usize, slot: SlotId },

    /// An instruction reads a slot no earlier instruction defines.
    #[error("instruction {index}: operand {slot} is not defined by an earlier instruction")]
    UndefinedOperand { index: usize, slot: SlotId },

    /// Graph file (de)serialization failure.
    #[error("graph serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn output_word(expected: &bool) -> &'static str {
    if *expected {
        "missing"
    } else {
        "not allowed"
    }
}

fn format_cycle(cycle: &[NodeId]) -> String {
    let mut parts: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
    if let Some(first) = cycle.first() {
        parts.push(first.to_string());
    }
    parts.join(" -> ")
}
