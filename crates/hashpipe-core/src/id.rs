//! Stable ID newtypes for graph entities and program slots.
//!
//! Both IDs are distinct newtype wrappers over `u32`, so a `NodeId` cannot be
//! used where a `SlotId` is expected without an explicit conversion. A node's
//! output slot shares the node's numeric value.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable node identifier. Assigned once at creation and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Variable slot identifier in a compiled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Slots print in the program text spelling, `var-<id>`.
impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var-{}", self.0)
    }
}

// A node's output is stored in the slot with the same number.

impl From<NodeId> for SlotId {
    fn from(id: NodeId) -> Self {
        SlotId(id.0)
    }
}

impl From<SlotId> for NodeId {
    fn from(slot: SlotId) -> Self {
        NodeId(slot.0)
    }
}
