//! Graph-to-program compiler.
//!
//! Provides two entry points:
//! - [`compile_program`]: emits a [`Program`] for a caller-supplied order.
//! - [`compile`]: orders the graph first, reporting a cycle before any
//!   per-node checking, then compiles.
//!
//! Every node's output slot is the node's own id, and each operand is the
//! slot of whichever node feeds that input port. Per-node problems
//! (unconnected inputs, kinds without an opcode) are all collected and
//! returned together.

pub mod diagnostics;

pub use diagnostics::{CompileDiagnostic, CompileError};

use tracing::debug;

use hashpipe_core::graph::PipelineGraph;
use hashpipe_core::id::{NodeId, SlotId};
use hashpipe_core::program::{Instruction, Program};
use hashpipe_core::{topological_order, CoreError};

/// Orders and compiles a graph in one call.
///
/// # Errors
///
/// [`CompileError::Cyclic`] if the graph has a cycle, otherwise as
/// [`compile_program`].
pub fn compile(graph: &PipelineGraph) -> Result<Program, CompileError> {
    let order = topological_order(graph).map_err(|err| match err {
        CoreError::CyclicGraph { cycle } => CompileError::Cyclic { cycle },
        other => CompileError::Core(other),
    })?;
    compile_program(graph, &order)
}

/// Emits one instruction per node of `order`, in that order.
///
/// Does NOT stop at the first bad node: every unbound input and unsupported
/// kind in the graph ends up in [`CompileError::Invalid`].
pub fn compile_program(graph: &PipelineGraph, order: &[NodeId]) -> Result<Program, CompileError> {
    let mut instructions = Vec::with_capacity(order.len());
    let mut diagnostics = Vec::new();

    for &id in order {
        let node = graph.node(id).ok_or(CoreError::NodeNotFound { id })?;
        let sources = graph.input_sources(id)?;

        let mut bound = true;
        for (index, source) in sources.iter().enumerate() {
            if source.is_none() {
                bound = false;
                diagnostics.push(CompileDiagnostic::UnboundInput {
                    node: id,
                    index: index as u16,
                    kind: node.kind,
                });
            }
        }

        let Some(opcode) = node.kind.opcode() else {
            diagnostics.push(CompileDiagnostic::UnsupportedOperation {
                node: id,
                kind: node.kind,
            });
            continue;
        };

        if bound {
            let inputs = sources.into_iter().flatten().map(SlotId::from);
            let output = node.has_output().then(|| SlotId::from(id));
            instructions.push(Instruction::new(opcode, inputs, output));
        }
    }

    if !diagnostics.is_empty() {
        debug!(count = diagnostics.len(), "compile rejected graph");
        return Err(CompileError::Invalid(diagnostics));
    }

    let program = Program::new(instructions)?;
    debug!(
        nodes = graph.node_count(),
        instructions = program.len(),
        "compiled pipeline"
    );
    Ok(program)
}
