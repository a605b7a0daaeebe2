//! Compile diagnostics with node and port context.
//!
//! A compile collects every [`CompileDiagnostic`] it finds instead of stopping
//! at the first, so a single report lists all offending nodes.

use hashpipe_core::id::NodeId;
use hashpipe_core::ops::NodeKind;
use hashpipe_core::CoreError;
use serde::{Deserialize, Serialize};

/// A per-node problem that prevents compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum CompileDiagnostic {
    /// An input port has no incoming edge.
    #[error("unbound input: node {node} ({kind}) input {index} has no incoming edge")]
    UnboundInput {
        /// The node missing an input.
        node: NodeId,
        /// The unconnected input index.
        index: u16,
        /// Kind of the node, for reporting.
        kind: NodeKind,
    },

    /// The node kind has no executable semantics.
    #[error("unsupported operation: node {node} is a {kind}, which cannot be compiled")]
    UnsupportedOperation {
        /// The offending node.
        node: NodeId,
        /// Its kind.
        kind: NodeKind,
    },
}

impl CompileDiagnostic {
    /// The node the diagnostic is about.
    pub fn node(&self) -> NodeId {
        match self {
            CompileDiagnostic::UnboundInput { node, .. }
            | CompileDiagnostic::UnsupportedOperation { node, .. } => *node,
        }
    }
}

/// Errors returned by the program compiler.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The graph has a dependency cycle; no order exists.
    #[error("cyclic graph: {}", format_cycle(.cycle))]
    Cyclic { cycle: Vec<NodeId> },

    /// One or more nodes cannot be compiled.
    #[error("{} compile error(s): {}", .0.len(), format_diagnostics(.0))]
    Invalid(Vec<CompileDiagnostic>),

    /// The graph or the emitted program failed a structural check, for
    /// example an order that is not topological.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl CompileError {
    /// Collected diagnostics, empty for the other variants.
    pub fn diagnostics(&self) -> &[CompileDiagnostic] {
        match self {
            CompileError::Invalid(diagnostics) => diagnostics,
            _ => &[],
        }
    }
}

fn format_cycle(cycle: &[NodeId]) -> String {
    let mut parts: Vec<String> = cycle.iter().map(ToString::to_string).collect();
    if let Some(first) = cycle.first() {
        parts.push(first.to_string());
    }
    parts.join(" -> ")
}

fn format_diagnostics(diagnostics: &[CompileDiagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
