//! Graph nodes and their port views.
//!
//! A [`Node`] is just an id and a kind; its ports are derived from the kind's
//! arity rather than stored. [`InputPort`] names one input of one node and is
//! how edges are addressed for removal and lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::NodeId;
use crate::ops::NodeKind;

/// A node in the pipeline graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identity, also the number of the node's output slot.
    pub id: NodeId,
    /// What the node computes.
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Node { id, kind }
    }

    /// Number of input ports.
    pub fn arity(&self) -> usize {
        self.kind.arity()
    }

    /// Returns `true` if the node has output port 0.
    pub fn has_output(&self) -> bool {
        self.kind.has_output()
    }

    /// All input ports of this node, in index order.
    pub fn input_ports(&self) -> impl Iterator<Item = InputPort> + '_ {
        (0..self.arity() as u16).map(move |index| InputPort::new(self.id, index))
    }
}

/// One input of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InputPort {
    pub node: NodeId,
    pub index: u16,
}

impl InputPort {
    pub fn new(node: NodeId, index: u16) -> Self {
        InputPort { node, index }
    }
}

impl fmt::Display for InputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.index)
    }
}
