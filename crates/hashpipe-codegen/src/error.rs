//! Emitter error types.

use std::path::PathBuf;

use hashpipe_check::CompileError;

/// Errors that can occur while producing host source.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// A fragment file could not be read or the output could not be written.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The graph did not compile, so there is no program to emit.
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl EmitError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EmitError::Io {
            path: path.into(),
            source,
        }
    }
}
