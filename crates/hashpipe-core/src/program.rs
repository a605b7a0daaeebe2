//! The compiled program: a linear, single-assignment instruction list.
//!
//! A [`Program`] is the boundary artifact between the compiler and its two
//! consumers, the interpreter and the host-code emitter. It can only be
//! built through [`Program::new`], which checks the shape of every
//! instruction, so consumers may rely on:
//!
//! - operand count equals the opcode's arity;
//! - an output slot is present exactly when the opcode has one;
//! - every slot is written at most once;
//! - every operand is written by an earlier instruction.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::CoreError;
use crate::id::SlotId;
use crate::ops::Opcode;

/// Operand list; no opcode reads more than two slots.
pub type Operands = SmallVec<[SlotId; 2]>;

/// One step of a program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Slots read, in input-port order.
    pub inputs: Operands,
    /// Slot written, absent for `Result`.
    pub output: Option<SlotId>,
}

impl Instruction {
    pub fn new(
        opcode: Opcode,
        inputs: impl IntoIterator<Item = SlotId>,
        output: Option<SlotId>,
    ) -> Self {
        Instruction {
            opcode,
            inputs: inputs.into_iter().collect(),
            output,
        }
    }

    /// `Input` instruction defining `slot`.
    pub fn input(slot: SlotId) -> Self {
        Instruction {
            opcode: Opcode::Input,
            inputs: Operands::new(),
            output: Some(slot),
        }
    }

    /// `Result` instruction exposing `slot`.
    pub fn result(slot: SlotId) -> Self {
        Instruction::new(Opcode::Result, [slot], None)
    }
}

/// A validated instruction sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Validates and wraps an instruction list.
    ///
    /// # Errors
    ///
    /// [`CoreError::ArityMismatch`], [`CoreError::OutputMismatch`],
    /// [`CoreError::SlotRedefined`] or [`CoreError::UndefinedOperand`] for the
    /// first offending instruction.
    pub fn new(instructions: Vec<Instruction>) -> Result<Self, CoreError> {
        let mut defined: HashSet<SlotId> = HashSet::with_capacity(instructions.len());

        for (index, inst) in instructions.iter().enumerate() {
            let expected = inst.opcode.arity();
            if inst.inputs.len() != expected {
                return Err(CoreError::ArityMismatch {
                    index,
                    opcode: inst.opcode,
                    expected,
                    actual: inst.inputs.len(),
                });
            }
            if inst.output.is_some() != inst.opcode.has_output() {
                return Err(CoreError::OutputMismatch {
                    index,
                    opcode: inst.opcode,
                    expected: inst.opcode.has_output(),
                });
            }
            if let Some(&slot) = inst.inputs.iter().find(|slot| !defined.contains(*slot)) {
                return Err(CoreError::UndefinedOperand { index, slot });
            }
            if let Some(slot) = inst.output {
                if !defined.insert(slot) {
                    return Err(CoreError::SlotRedefined { index, slot });
                }
            }
        }

        Ok(Program { instructions })
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Output slots of all `Input` instructions, in program order.
    pub fn input_slots(&self) -> Vec<SlotId> {
        self.instructions
            .iter()
            .filter(|inst| inst.opcode == Opcode::Input)
            .filter_map(|inst| inst.output)
            .collect()
    }

    /// Operand slots of all `Result` instructions, in program order.
    pub fn result_slots(&self) -> Vec<SlotId> {
        self.instructions
            .iter()
            .filter(|inst| inst.opcode == Opcode::Result)
            .filter_map(|inst| inst.inputs.first().copied())
            .collect()
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

impl TryFrom<Vec<Instruction>> for Program {
    type Error = CoreError;

    fn try_from(instructions: Vec<Instruction>) -> Result<Self, Self::Error> {
        Program::new(instructions)
    }
}

impl<'de> Deserialize<'de> for Program {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            instructions: Vec<Instruction>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Program::new(raw.instructions).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(n: u32) -> SlotId {
        SlotId(n)
    }

    #[test]
    fn accepts_well_formed_program() {
        let program = Program::new(vec![
            Instruction::input(slot(0)),
            Instruction::new(Opcode::Md5, [slot(0)], Some(slot(1))),
            Instruction::new(Opcode::Xor, [slot(0), slot(1)], Some(slot(2))),
            Instruction::result(slot(2)),
            Instruction::result(slot(1)),
        ])
        .unwrap();

        assert_eq!(program.len(), 5);
        assert_eq!(program.input_slots(), vec![slot(0)]);
        assert_eq!(program.result_slots(), vec![slot(2), slot(1)]);
    }

    #[test]
    fn empty_program_is_valid() {
        let program = Program::new(Vec::new()).unwrap();
        assert!(program.is_empty());
        assert!(program.input_slots().is_empty());
    }

    #[test]
    fn rejects_wrong_arity() {
        let err = Program::new(vec![
            Instruction::input(slot(0)),
            Instruction::new(Opcode::Xor, [slot(0)], Some(slot(1))),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::ArityMismatch { index: 1, expected: 2, actual: 1, .. }
        ));
    }

    #[test]
    fn rejects_output_on_result() {
        let err = Program::new(vec![
            Instruction::input(slot(0)),
            Instruction::new(Opcode::Result, [slot(0)], Some(slot(1))),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::OutputMismatch { index: 1, expected: false, .. }));
    }

    #[test]
    fn rejects_missing_output() {
        let err = Program::new(vec![Instruction {
            opcode: Opcode::Input,
            inputs: Operands::new(),
            output: None,
        }]).unwrap_err();
        assert!(matches!(err, CoreError::OutputMismatch { index: 0, expected: true, .. }));
    }

    #[test]
    fn rejects_forward_reference() {
        let err = Program::new(vec![
            Instruction::new(Opcode::Md5, [slot(1)], Some(slot(2))),
            Instruction::input(slot(1)),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::UndefinedOperand { index: 0, slot: SlotId(1) }));
    }

    #[test]
    fn rejects_redefinition() {
        let err = Program::new(vec![
            Instruction::input(slot(3)),
            Instruction::new(Opcode::Sha256, [slot(3)], Some(slot(3))),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::SlotRedefined { index: 1, slot: SlotId(3) }));
    }

    #[test]
    fn deserialize_revalidates() {
        let good =
            Program::new(vec![Instruction::input(slot(0)), Instruction::result(slot(0))]).unwrap();
        let json = serde_json::to_string(&good).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(back, good);

        let bad = r#"{"instructions":[{"opcode":"Result","inputs":[7],"output":null}]}"#;
        let err = serde_json::from_str::<Program>(bad).unwrap_err();
        assert!(err.to_string().contains("not defined by an earlier instruction"), "{err}");
    }
}
