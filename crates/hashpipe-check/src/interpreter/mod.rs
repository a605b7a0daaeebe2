//! Program interpreter over plain byte buffers.
//!
//! Executes a compiled [`Program`] for verification and as the inner loop of
//! the search driver.
//!
//! # Architecture
//!
//! - [`Interpreter`] holds a reference to a [`Program`] and steps through it
//!   one instruction at a time: `Ready -> Running -> (Completed | Error)`.
//! - [`Bindings`] is the per-run slot table; every slot is written once.
//! - [`eval_op`] gives each value-producing opcode its byte semantics.
//! - [`RuntimeError`] names the slot and instruction involved.
//! - [`TraceEntry`] records each instruction when tracing is enabled.
//!
//! # Usage
//!
//! ```ignore
//! let execution = execute(&program, &[(SlotId(0), b"abc")], InterpreterConfig::default())?;
//! for (slot, value) in &execution.results { /* ... */ }
//! ```

pub mod bindings;
pub mod error;
pub mod eval;
pub mod state;
pub mod trace;

pub use bindings::Bindings;
pub use error::RuntimeError;
pub use eval::{eval_op, xor_bytes};
pub use state::{Execution, ExecutionState, Interpreter, InterpreterConfig};
pub use trace::TraceEntry;

use tracing::debug;

use hashpipe_core::id::SlotId;
use hashpipe_core::program::Program;

/// Runs `program` once with the given input buffers.
///
/// # Errors
///
/// Any [`RuntimeError`] that halts the run.
pub fn execute(
    program: &Program,
    inputs: &[(SlotId, &[u8])],
    config: InterpreterConfig,
) -> Result<Execution, RuntimeError> {
    let mut interp = Interpreter::new(program, config);
    interp.start(inputs.iter().map(|&(slot, value)| (slot, value.to_vec())));
    interp.run();
    let execution = interp.into_execution()?;
    debug!(
        instructions = program.len(),
        results = execution.results.len(),
        "program executed"
    );
    Ok(execution)
}
