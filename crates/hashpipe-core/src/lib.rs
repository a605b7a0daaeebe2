pub mod id;
pub mod error;
pub mod ops;
pub mod node;
pub mod edge;
pub mod graph;
pub mod order;
pub mod program;
pub mod text;

// Re-export commonly used types
pub use id::{NodeId, SlotId};
pub use error::CoreError;
pub use ops::{NodeKind, Opcode, UnknownKind};
pub use node::{InputPort, Node};
pub use edge::Edge;
pub use graph::PipelineGraph;
pub use order::topological_order;
pub use program::{Instruction, Operands, Program};
pub use text::{parse_program, ParseError};
