//! Runtime error types for the program interpreter.
//!
//! Every variant names the slot involved and, where it applies, the index of
//! the instruction that was executing.

use hashpipe_core::id::SlotId;
use serde::{Deserialize, Serialize};

/// Runtime errors produced by the interpreter.
///
/// `UnboundSlot` and `SlotRebound` cannot happen for a validated program and
/// indicate an internal defect; the input variants are caller errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RuntimeError {
    #[error("unbound slot: instruction {instruction} reads {slot}, which has no value")]
    UnboundSlot { slot: SlotId, instruction: usize },

    #[error("slot rebound: instruction {instruction} writes {slot} a second time")]
    SlotRebound { slot: SlotId, instruction: usize },

    #[error("missing input binding for {slot}")]
    MissingInputBinding { slot: SlotId },

    #[error("{slot} is not an input slot of the program")]
    UnknownInputSlot { slot: SlotId },

    #[error("internal error: {message}")]
    InternalError { message: String },
}
