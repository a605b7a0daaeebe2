//! Edge types for the pipeline graph.
//!
//! Inside the graph an edge is stored once, as a [`Wire`] weight between two
//! petgraph nodes. [`Edge`] is the self-contained view handed to callers and
//! written to graph files.

use serde::{Deserialize, Serialize};

use crate::id::NodeId;
use crate::node::InputPort;

/// Edge weight stored in the graph: which output feeds which input.
///
/// Nodes have at most one output, so `source_port` is always 0 for wires the
/// graph accepts; it is kept so that the file format names both ends fully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    pub source_port: u16,
    pub target_port: u16,
}

/// A data edge from a node's output to another node's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Node producing the value.
    pub source: NodeId,
    /// Output port of the source (always 0).
    #[serde(default)]
    pub source_port: u16,
    /// Node consuming the value.
    pub target: NodeId,
    /// Input index of the target.
    pub target_port: u16,
}

impl Edge {
    /// An edge from `source`'s output into input `target_port` of `target`.
    pub fn new(source: NodeId, target: NodeId, target_port: u16) -> Self {
        Edge {
            source,
            source_port: 0,
            target,
            target_port,
        }
    }

    /// The input port this edge terminates at. Unique per graph.
    pub fn input_port(&self) -> InputPort {
        InputPort::new(self.target, self.target_port)
    }

    pub(crate) fn wire(&self) -> Wire {
        Wire {
            source_port: self.source_port,
            target_port: self.target_port,
        }
    }
}
