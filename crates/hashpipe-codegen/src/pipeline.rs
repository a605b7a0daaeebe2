//! Graph to host source in one call: compile, load fragments, emit.

use std::fs;
use std::path::Path;
use std::time::Instant;

use hashpipe_core::graph::PipelineGraph;
use hashpipe_core::program::Program;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::emit::emit;
use crate::error::EmitError;
use crate::EmitOptions;

/// Result of a successful [`compile_and_emit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emitted {
    /// The program the source was generated from.
    pub program: Program,
    /// Complete host source.
    pub source: String,
    /// Time taken in milliseconds.
    pub elapsed_ms: u64,
}

impl Emitted {
    /// Writes the host source to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), EmitError> {
        fs::write(path, &self.source).map_err(|err| EmitError::io(path, err))
    }
}

/// Emits host source for an already compiled program.
pub fn generate(program: &Program, options: &EmitOptions) -> Result<String, EmitError> {
    let fragments = options.load_fragments()?;
    Ok(emit(program, &fragments))
}

/// Compiles `graph` and emits host source for it.
///
/// Fragments are loaded before compiling, so a bad fragment directory is
/// reported even for a graph that would not compile.
pub fn compile_and_emit(
    graph: &PipelineGraph,
    options: &EmitOptions,
) -> Result<Emitted, EmitError> {
    let start = Instant::now();

    let fragments = options.load_fragments()?;
    let program = hashpipe_check::compile(graph)?;
    let source = emit(&program, &fragments);

    let elapsed_ms = start.elapsed().as_millis() as u64;
    info!(
        nodes = graph.node_count(),
        instructions = program.len(),
        elapsed_ms,
        "generated host source"
    );
    Ok(Emitted {
        program,
        source,
        elapsed_ms,
    })
}
