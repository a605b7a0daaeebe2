//! Node kinds and opcodes.
//!
//! Defines the operation vocabulary in two layers:
//! - **[`NodeKind`]**: the full catalog an editor can place on the canvas,
//!   including kinds that have no executable semantics yet.
//! - **[`Opcode`]**: the closed set of operations a compiled program may
//!   contain. Every opcode has both an interpretation rule and a host-code
//!   template; a kind without an opcode cannot be compiled.
//!
//! Names use the editor's spelling (`"Sha-256"`, `"Byte sum"`), which is also
//! the spelling of the program text form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Node kinds
// ---------------------------------------------------------------------------

/// A node kind from the editor's catalog.
///
/// Arity is fixed per kind: sources (`Input`) take no inputs, sinks
/// (`Result`) have no output, binary combiners take two inputs, digests one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Input,
    Result,
    Xor,
    Concat,
    #[serde(rename = "Byte sum")]
    ByteSum,
    Sum,
    #[serde(rename = "Sha-256")]
    Sha256,
    #[serde(rename = "Sha-384")]
    Sha384,
    #[serde(rename = "Sha-512")]
    Sha512,
    Md5,
}

impl NodeKind {
    /// Every kind, in catalog order.
    pub const ALL: [NodeKind; 10] = [
        NodeKind::Input,
        NodeKind::Result,
        NodeKind::Xor,
        NodeKind::Concat,
        NodeKind::ByteSum,
        NodeKind::Sum,
        NodeKind::Sha256,
        NodeKind::Sha384,
        NodeKind::Sha512,
        NodeKind::Md5,
    ];

    /// Number of input ports.
    pub fn arity(self) -> usize {
        match self {
            NodeKind::Input => 0,
            NodeKind::Result
            | NodeKind::Sha256
            | NodeKind::Sha384
            | NodeKind::Sha512
            | NodeKind::Md5 => 1,
            NodeKind::Xor | NodeKind::Concat | NodeKind::ByteSum | NodeKind::Sum => 2,
        }
    }

    /// Returns `true` if the kind produces a value (has output port 0).
    pub fn has_output(self) -> bool {
        !matches!(self, NodeKind::Result)
    }

    /// Returns `true` for source kinds (no inputs).
    pub fn is_source(self) -> bool {
        self.arity() == 0
    }

    /// The opcode this kind compiles to, or `None` if the kind has no
    /// interpretation or code-generation rule.
    pub fn opcode(self) -> Option<Opcode> {
        match self {
            NodeKind::Input => Some(Opcode::Input),
            NodeKind::Result => Some(Opcode::Result),
            NodeKind::Xor => Some(Opcode::Xor),
            NodeKind::Md5 => Some(Opcode::Md5),
            NodeKind::Sha256 => Some(Opcode::Sha256),
            NodeKind::Sha384 => Some(Opcode::Sha384),
            NodeKind::Sha512 => Some(Opcode::Sha512),
            NodeKind::Concat | NodeKind::ByteSum | NodeKind::Sum => None,
        }
    }

    /// Display name in the editor's spelling.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Input => "Input",
            NodeKind::Result => "Result",
            NodeKind::Xor => "Xor",
            NodeKind::Concat => "Concat",
            NodeKind::ByteSum => "Byte sum",
            NodeKind::Sum => "Sum",
            NodeKind::Sha256 => "Sha-256",
            NodeKind::Sha384 => "Sha-384",
            NodeKind::Sha512 => "Sha-512",
            NodeKind::Md5 => "Md5",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a name matches no catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown node kind: '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for NodeKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

/// Closed opcode set of a compiled program.
///
/// Dispatch over this enum is exhaustive everywhere it is consumed, so adding
/// an opcode forces both the interpreter and the emitter to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// Binds an externally supplied buffer. No operands, one output.
    Input,
    /// Exposes its operand as the run's observable output. No output slot.
    Result,
    /// Byte-wise XOR, shorter operand zero-padded at the end.
    Xor,
    Md5,
    Sha256,
    Sha384,
    Sha512,
}

impl Opcode {
    /// Number of operand slots.
    pub fn arity(self) -> usize {
        self.kind().arity()
    }

    /// Returns `true` if instructions with this opcode define an output slot.
    pub fn has_output(self) -> bool {
        self.kind().has_output()
    }

    /// The node kind this opcode mirrors.
    pub fn kind(self) -> NodeKind {
        match self {
            Opcode::Input => NodeKind::Input,
            Opcode::Result => NodeKind::Result,
            Opcode::Xor => NodeKind::Xor,
            Opcode::Md5 => NodeKind::Md5,
            Opcode::Sha256 => NodeKind::Sha256,
            Opcode::Sha384 => NodeKind::Sha384,
            Opcode::Sha512 => NodeKind::Sha512,
        }
    }

    /// Output length in bytes for digest opcodes, `None` otherwise.
    pub fn digest_len(self) -> Option<usize> {
        match self {
            Opcode::Md5 => Some(16),
            Opcode::Sha256 => Some(32),
            Opcode::Sha384 => Some(48),
            Opcode::Sha512 => Some(64),
            Opcode::Input | Opcode::Result | Opcode::Xor => None,
        }
    }

    /// Returns `true` for the cryptographic digest opcodes.
    pub fn is_digest(self) -> bool {
        self.digest_len().is_some()
    }

    /// Name in the program text spelling.
    pub fn name(self) -> &'static str {
        self.kind().name()
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
