//! OpenCL host code generation for hash pipeline programs.
//!
//! The emitter is a textual template consumer of a compiled
//! [`Program`](hashpipe_core::Program): it never executes anything, it only
//! writes the C++ host source that allocates one buffer pair per slot and
//! dispatches one kernel per instruction.
//!
//! # Modules
//!
//! - [`emit`] -- per-instruction allocation and execution fragments
//! - [`fragments`] -- prologue/mid/epilogue text, built-in or from a directory
//! - [`pipeline`] -- graph to host source in one call
//! - [`error`] -- error types

pub mod emit;
pub mod error;
pub mod fragments;
pub mod pipeline;

pub use emit::{emit, kernel_name, sections, Sections};
pub use error::EmitError;
pub use fragments::Fragments;
pub use pipeline::{compile_and_emit, generate, Emitted};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Options controlling host source generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    /// Directory holding `prologue.cpp`, `mid.cpp` and `epilogue.cpp`.
    /// `None` means use the built-in fragments.
    pub fragments: Option<PathBuf>,
}

impl EmitOptions {
    /// Resolves the fragment set these options select.
    pub fn load_fragments(&self) -> Result<Fragments, EmitError> {
        match &self.fragments {
            Some(dir) => Fragments::load(dir),
            None => Ok(Fragments::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_emit_options_use_builtin_fragments() {
        let opts = EmitOptions::default();
        assert!(opts.fragments.is_none());
        assert_eq!(opts.load_fragments().unwrap(), Fragments::builtin());
    }

    #[test]
    fn emit_options_serde_roundtrip() {
        let opts = EmitOptions {
            fragments: Some(PathBuf::from("/opt/hashpipe/fragments")),
        };
        let json = serde_json::to_string(&opts).unwrap();
        let back: EmitOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, opts);

        let empty: EmitOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, EmitOptions::default());
    }
}
