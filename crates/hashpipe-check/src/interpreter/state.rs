//! Interpreter state machine with step-by-step execution.
//!
//! The [`Interpreter`] walks a [`Program`] one instruction per step. The
//! state transitions are `Ready -> Running -> (Completed | Error)`.
//!
//! A program is a straight line, so the program counter is the whole control
//! state; everything else lives in the per-run [`Bindings`] table.

use std::collections::HashMap;

use smallvec::SmallVec;

use hashpipe_core::id::SlotId;
use hashpipe_core::ops::Opcode;
use hashpipe_core::program::{Instruction, Program};

use super::bindings::Bindings;
use super::error::RuntimeError;
use super::eval::eval_op;
use super::trace::TraceEntry;

/// Execution state of the interpreter state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionState {
    /// Ready to start execution (initial state).
    Ready,
    /// Between steps.
    Running,
    /// Every instruction ran.
    Completed,
    /// Execution halted; `index` is the failing instruction, if any.
    Error {
        error: RuntimeError,
        index: Option<usize>,
    },
}

/// Configuration for the interpreter.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct InterpreterConfig {
    /// Whether to record execution traces.
    #[serde(default)]
    pub trace_enabled: bool,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct Execution {
    /// Every slot bound during the run.
    pub bindings: Bindings,
    /// Value of each `Result` sink, in program order.
    pub results: Vec<(SlotId, Vec<u8>)>,
    /// Per-instruction trace, when enabled.
    pub trace: Option<Vec<TraceEntry>>,
}

/// The program interpreter.
pub struct Interpreter<'p> {
    program: &'p Program,
    config: InterpreterConfig,
    state: ExecutionState,
    /// Index of the next instruction.
    pc: usize,
    /// Externally supplied buffers, consumed by `Input` instructions.
    pending_inputs: HashMap<SlotId, Vec<u8>>,
    bindings: Bindings,
    /// Slots exposed by `Result` instructions so far.
    result_slots: Vec<SlotId>,
    trace: Option<Vec<TraceEntry>>,
}

impl<'p> Interpreter<'p> {
    /// Creates a new interpreter in the Ready state.
    pub fn new(program: &'p Program, config: InterpreterConfig) -> Self {
        let trace = config.trace_enabled.then(Vec::new);
        Interpreter {
            program,
            config,
            state: ExecutionState::Ready,
            pc: 0,
            pending_inputs: HashMap::new(),
            bindings: Bindings::with_capacity(program.len()),
            result_slots: Vec::new(),
            trace,
        }
    }

    /// Starts a run with one buffer per `Input` slot.
    ///
    /// Any previous run's bindings are discarded. A binding for a slot that
    /// is not an `Input` of the program puts the interpreter in the Error
    /// state immediately; a missing one is reported when its `Input`
    /// instruction executes.
    pub fn start<I>(&mut self, inputs: I)
    where
        I: IntoIterator<Item = (SlotId, Vec<u8>)>,
    {
        self.reset();
        self.pending_inputs.extend(inputs);

        let input_slots = self.program.input_slots();
        if let Some(&slot) = self
            .pending_inputs
            .keys()
            .filter(|slot| !input_slots.contains(slot))
            .min()
        {
            self.state = ExecutionState::Error {
                error: RuntimeError::UnknownInputSlot { slot },
                index: None,
            };
            return;
        }

        self.state = if self.program.is_empty() {
            ExecutionState::Completed
        } else {
            ExecutionState::Running
        };
    }

    /// Returns to the Ready state, keeping allocations for the next run.
    pub fn reset(&mut self) {
        self.state = ExecutionState::Ready;
        self.pc = 0;
        self.pending_inputs.clear();
        self.bindings.clear();
        self.result_slots.clear();
        if let Some(trace) = &mut self.trace {
            trace.clear();
        }
    }

    /// Advances execution by one instruction and returns the new state.
    pub fn step(&mut self) -> &ExecutionState {
        if self.state != ExecutionState::Running {
            return &self.state;
        }

        let program = self.program;
        let index = self.pc;
        let Some(inst) = program.instructions().get(index) else {
            self.state = ExecutionState::Completed;
            return &self.state;
        };

        match self.exec_instruction(index, inst) {
            Ok(()) => {
                self.pc += 1;
                if self.pc == program.len() {
                    self.state = ExecutionState::Completed;
                }
            }
            Err(error) => {
                self.state = ExecutionState::Error {
                    error,
                    index: Some(index),
                };
            }
        }

        &self.state
    }

    /// Runs execution until Completed or Error.
    pub fn run(&mut self) -> &ExecutionState {
        while self.state == ExecutionState::Running {
            self.step();
        }
        &self.state
    }

    /// Returns the current execution state.
    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Returns the slot bindings of the current (or last) run.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Slots exposed by `Result` instructions executed so far.
    pub fn result_slots(&self) -> &[SlotId] {
        &self.result_slots
    }

    /// Returns the execution trace (if tracing was enabled).
    pub fn trace(&self) -> Option<&[TraceEntry]> {
        self.trace.as_deref()
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Consumes a finished interpreter into its run outcome.
    ///
    /// # Errors
    ///
    /// The halting error if the run failed, or an internal error if the run
    /// never finished.
    pub fn into_execution(self) -> Result<Execution, RuntimeError> {
        match self.state {
            ExecutionState::Completed => {}
            ExecutionState::Error { error, .. } => return Err(error),
            ExecutionState::Ready | ExecutionState::Running => {
                return Err(RuntimeError::InternalError {
                    message: "execution has not finished".into(),
                })
            }
        }

        let results = self
            .result_slots
            .iter()
            .map(|&slot| {
                self.bindings
                    .get(slot)
                    .map(|value| (slot, value.to_vec()))
                    .ok_or(RuntimeError::InternalError {
                        message: format!("result {slot} lost its binding"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Execution {
            bindings: self.bindings,
            results,
            trace: self.trace,
        })
    }

    // -----------------------------------------------------------------------
    // Instruction execution
    // -----------------------------------------------------------------------

    fn exec_instruction(&mut self, index: usize, inst: &Instruction) -> Result<(), RuntimeError> {
        let len = match inst.opcode {
            Opcode::Input => {
                let slot = output_slot(inst, index)?;
                let value = self
                    .pending_inputs
                    .remove(&slot)
                    .ok_or(RuntimeError::MissingInputBinding { slot })?;
                let len = value.len();
                self.bind(slot, value, index)?;
                len
            }
            Opcode::Result => {
                let slot = *inst.inputs.first().ok_or(RuntimeError::InternalError {
                    message: format!("instruction {index}: Result without operand"),
                })?;
                let len = self.operand(slot, index)?.len();
                self.result_slots.push(slot);
                len
            }
            opcode => {
                let value = {
                    let operands = inst
                        .inputs
                        .iter()
                        .map(|&slot| self.operand(slot, index))
                        .collect::<Result<SmallVec<[&[u8]; 2]>, _>>()?;
                    eval_op(opcode, &operands)?
                };
                let len = value.len();
                self.bind(output_slot(inst, index)?, value, index)?;
                len
            }
        };

        if let Some(trace) = &mut self.trace {
            trace.push(TraceEntry {
                index,
                opcode: inst.opcode,
                inputs: inst.inputs.to_vec(),
                output: inst.output,
                len,
            });
        }
        Ok(())
    }

    fn operand(&self, slot: SlotId, instruction: usize) -> Result<&[u8], RuntimeError> {
        self.bindings
            .get(slot)
            .ok_or(RuntimeError::UnboundSlot { slot, instruction })
    }

    fn bind(
        &mut self,
        slot: SlotId,
        value: Vec<u8>,
        instruction: usize,
    ) -> Result<(), RuntimeError> {
        if self.bindings.bind(slot, value) {
            Ok(())
        } else {
            Err(RuntimeError::SlotRebound { slot, instruction })
        }
    }
}

fn output_slot(inst: &Instruction, index: usize) -> Result<SlotId, RuntimeError> {
    inst.output.ok_or(RuntimeError::InternalError {
        message: format!("instruction {index}: {} without output slot", inst.opcode),
    })
}
