//! Human-readable program text form.
//!
//! One line per instruction:
//!
//! ```text
//! Input, (var-4)
//! Md5, (var-4), (var-1)
//! Xor, (var-0 var-1), (var-2)
//! Result, (var-2)
//! ```
//!
//! `Input` and `Result` lines omit the absent side. The parser also accepts
//! an explicit empty group (`Input, (), (var-4)`), blank lines and `#`
//! comments, and re-validates the result through [`Program::new`].

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::error::CoreError;
use crate::id::SlotId;
use crate::ops::{NodeKind, Opcode};
use crate::program::{Instruction, Operands, Program};

const SLOT_PREFIX: &str = "var-";

/// Errors from [`parse_program`]. Line numbers are 1-based.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: unknown opcode '{name}'")]
    UnknownOpcode { line: usize, name: String },

    #[error("line {line}: node kind {kind} cannot appear in a program")]
    UnsupportedOpcode { line: usize, kind: NodeKind },

    #[error("line {line}: malformed slot '{token}', expected var-<id>")]
    BadSlot { line: usize, token: String },

    #[error("line {line}: {source}")]
    Invalid {
        line: usize,
        #[source]
        source: CoreError,
    },
}

// ---------------------------------------------------------------------------
// Printing
// ---------------------------------------------------------------------------

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode.name())?;
        if !self.inputs.is_empty() {
            f.write_str(", (")?;
            for (i, slot) in self.inputs.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{slot}")?;
            }
            f.write_str(")")?;
        }
        if let Some(out) = self.output {
            write!(f, ", ({out})")?;
        }
        Ok(())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for inst in self {
            writeln!(f, "{inst}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parses program text back into a validated [`Program`].
pub fn parse_program(text: &str) -> Result<Program, ParseError> {
    let mut instructions = Vec::new();
    let mut lines = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        instructions.push(parse_line(line, trimmed)?);
        lines.push(line);
    }

    Program::new(instructions).map_err(|source| {
        let line = instruction_index(&source)
            .and_then(|index| lines.get(index).copied())
            .unwrap_or(0);
        ParseError::Invalid { line, source }
    })
}

impl FromStr for Program {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_program(s)
    }
}

fn instruction_index(err: &CoreError) -> Option<usize> {
    match err {
        CoreError::ArityMismatch { index, .. }
        | CoreError::OutputMismatch { index, .. }
        | CoreError::SlotRedefined { index, .. }
        | CoreError::UndefinedOperand { index, .. } => Some(*index),
        _ => None,
    }
}

fn parse_line(line: usize, text: &str) -> Result<Instruction, ParseError> {
    let mut parts = text.split(',').map(str::trim);
    let name = parts.next().unwrap_or_default();
    let kind: NodeKind = name.parse().map_err(|_| ParseError::UnknownOpcode {
        line,
        name: name.to_string(),
    })?;
    let opcode = kind
        .opcode()
        .ok_or(ParseError::UnsupportedOpcode { line, kind })?;

    let groups = parts
        .map(|part| parse_group(line, part))
        .collect::<Result<Vec<Operands>, ParseError>>()?;

    let (inputs, output) = split_groups(line, opcode, groups)?;
    Ok(Instruction {
        opcode,
        inputs,
        output,
    })
}

/// Assigns parsed groups to operands and output according to the opcode's
/// shape. An empty group stands for an absent side.
fn split_groups(
    line: usize,
    opcode: Opcode,
    mut groups: Vec<Operands>,
) -> Result<(Operands, Option<SlotId>), ParseError> {
    let syntax = |message: String| ParseError::Syntax { line, message };

    if groups.len() > 2 {
        return Err(syntax(format!(
            "expected at most 2 slot groups, found {}",
            groups.len()
        )));
    }

    if opcode.has_output() {
        let out = groups
            .pop()
            .ok_or_else(|| syntax(format!("{opcode} needs an output slot")))?;
        if out.len() != 1 {
            return Err(syntax(format!(
                "expected exactly one output slot, found {}",
                out.len()
            )));
        }
        let inputs = groups.pop().unwrap_or_default();
        Ok((inputs, Some(out[0])))
    } else {
        if groups.len() == 2 && !groups[1].is_empty() {
            return Err(syntax(format!("{opcode} has no output slot")));
        }
        groups.truncate(1);
        let inputs = groups.pop().unwrap_or_default();
        Ok((inputs, None))
    }
}

fn parse_group(line: usize, part: &str) -> Result<Operands, ParseError> {
    let inner = part
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| ParseError::Syntax {
            line,
            message: format!("expected a parenthesized slot list, found '{part}'"),
        })?;

    inner
        .split_whitespace()
        .map(|token| parse_slot(line, token))
        .collect()
}

fn parse_slot(line: usize, token: &str) -> Result<SlotId, ParseError> {
    token
        .strip_prefix(SLOT_PREFIX)
        .and_then(|digits| digits.parse::<u32>().ok())
        .map(SlotId)
        .ok_or_else(|| ParseError::BadSlot {
            line,
            token: token.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_program() -> Program {
        Program::new(vec![
            Instruction::input(SlotId(4)),
            Instruction::new(Opcode::Md5, [SlotId(4)], Some(SlotId(1))),
            Instruction::new(Opcode::Xor, [SlotId(4), SlotId(1)], Some(SlotId(2))),
            Instruction::new(Opcode::Sha384, [SlotId(2)], Some(SlotId(7))),
            Instruction::result(SlotId(7)),
        ])
        .unwrap()
    }

    #[test]
    fn text_form() {
        let text = sample_program().to_string();
        insta::assert_snapshot!(text.trim_end(), @r"
        Input, (var-4)
        Md5, (var-4), (var-1)
        Xor, (var-4 var-1), (var-2)
        Sha-384, (var-2), (var-7)
        Result, (var-7)
        ");
    }

    #[test]
    fn printed_text_parses_back() {
        let program = sample_program();
        let back = parse_program(&program.to_string()).unwrap();
        assert_eq!(back, program);
    }

    #[test]
    fn accepts_legacy_input_line_and_comments() {
        let text = "# generated\n\nInput, (), (var-0)\n  Sha-256, (var-0), (var-3)  \nResult, (var-3)\n";
        let program: Program = text.parse().unwrap();
        assert_eq!(program.input_slots(), vec![SlotId(0)]);
        assert_eq!(program.result_slots(), vec![SlotId(3)]);
        assert_eq!(program.len(), 3);
    }

    #[test]
    fn unknown_opcode_reports_line() {
        let err = parse_program("Input, (var-0)\nRot13, (var-0), (var-1)\n").unwrap_err();
        assert!(matches!(err, ParseError::UnknownOpcode { line: 2, ref name } if name == "Rot13"));
    }

    #[test]
    fn unsupported_kind_is_rejected() {
        let err =
            parse_program("Input, (var-0)\nInput, (var-1)\nConcat, (var-0 var-1), (var-2)")
                .unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnsupportedOpcode { line: 3, kind: NodeKind::Concat }
        ));
    }

    #[test]
    fn bad_slot_token() {
        let err = parse_program("Input, (v4)").unwrap_err();
        assert!(matches!(err, ParseError::BadSlot { line: 1, ref token } if token == "v4"));
    }

    #[test]
    fn missing_parentheses() {
        let err = parse_program("Input, var-4").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 1, .. }));
    }

    #[test]
    fn forward_reference_maps_to_source_line() {
        let text = "# header\nInput, (var-0)\n\nMd5, (var-9), (var-1)\n";
        let err = parse_program(text).unwrap_err();
        match err {
            ParseError::Invalid { line, source } => {
                assert_eq!(line, 4);
                assert!(matches!(source, CoreError::UndefinedOperand { slot: SlotId(9), .. }));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn arity_is_rechecked() {
        let err = parse_program("Input, (var-0)\nXor, (var-0), (var-1)").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Invalid {
                line: 2,
                source: CoreError::ArityMismatch { expected: 2, actual: 1, .. }
            }
        ));
    }

    #[test]
    fn result_with_output_is_rejected() {
        let err = parse_program("Input, (var-0)\nResult, (var-0), (var-1)").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 2, .. }));
    }
}
