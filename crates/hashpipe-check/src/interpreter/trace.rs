//! Execution trace recording for the program interpreter.
//!
//! When tracing is enabled via [`InterpreterConfig::trace_enabled`], the
//! interpreter records a [`TraceEntry`] for every executed instruction.
//!
//! [`InterpreterConfig::trace_enabled`]: super::InterpreterConfig::trace_enabled

use hashpipe_core::id::SlotId;
use hashpipe_core::ops::Opcode;
use serde::{Deserialize, Serialize};

/// A single entry in the execution trace, recording one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Position of the instruction in the program.
    pub index: usize,
    pub opcode: Opcode,
    /// Operand slots read.
    pub inputs: Vec<SlotId>,
    /// Slot written, if any.
    pub output: Option<SlotId>,
    /// Length in bytes of the value written (for `Result`, of the value exposed).
    pub len: usize,
}
