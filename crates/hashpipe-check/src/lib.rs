//! Compilation, interpretation and search over hash pipeline programs.
//!
//! - [`compile`]: graph to [`Program`](hashpipe_core::Program), all problems
//!   reported at once.
//! - [`interpreter`]: executes a program over byte buffers.
//! - [`search`]: finds an input whose program output equals a target.

pub mod compile;
pub mod interpreter;
pub mod search;

pub use compile::{compile, compile_program, CompileDiagnostic, CompileError};
pub use interpreter::{execute, Execution, Interpreter, InterpreterConfig, RuntimeError};
pub use search::{
    search, CandidateStrategy, Search, SearchBudget, SearchConfig, SearchError, SearchOutcome,
    StopReason,
};
