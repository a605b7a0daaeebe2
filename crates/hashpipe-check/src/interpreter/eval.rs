//! Per-opcode evaluation logic for the program interpreter.
//!
//! Contains the exhaustive [`eval_op`] function mapping each value-producing
//! [`Opcode`] to its byte-level semantics. `Input` and `Result` move data in
//! and out of the binding table and are handled in `state.rs` directly.

use md5::Md5;
use sha2::{Digest, Sha256, Sha384, Sha512};

use hashpipe_core::ops::Opcode;

use super::error::RuntimeError;

/// Evaluates a value-producing opcode over its operand buffers.
///
/// # Errors
///
/// Returns [`RuntimeError::InternalError`] if called with `Input`/`Result` or
/// with an operand count that does not match the opcode.
pub fn eval_op(opcode: Opcode, operands: &[&[u8]]) -> Result<Vec<u8>, RuntimeError> {
    match (opcode, operands) {
        (Opcode::Xor, [lhs, rhs]) => Ok(xor_bytes(lhs, rhs)),
        (Opcode::Md5, [data]) => Ok(Md5::digest(data).to_vec()),
        (Opcode::Sha256, [data]) => Ok(Sha256::digest(data).to_vec()),
        (Opcode::Sha384, [data]) => Ok(Sha384::digest(data).to_vec()),
        (Opcode::Sha512, [data]) => Ok(Sha512::digest(data).to_vec()),
        (Opcode::Input | Opcode::Result, _) => Err(RuntimeError::InternalError {
            message: format!("{opcode} is not a value-producing opcode"),
        }),
        (_, operands) => Err(RuntimeError::InternalError {
            message: format!(
                "{opcode} expects {} operand(s), got {}",
                opcode.arity(),
                operands.len()
            ),
        }),
    }
}

/// Byte-wise XOR. The shorter operand is zero-padded at the end, so the
/// result has the longer length and its tail copies the longer operand.
pub fn xor_bytes(lhs: &[u8], rhs: &[u8]) -> Vec<u8> {
    let (long, short) = if lhs.len() >= rhs.len() {
        (lhs, rhs)
    } else {
        (rhs, lhs)
    };
    let mut out = long.to_vec();
    for (byte, &other) in out.iter_mut().zip(short) {
        *byte ^= other;
    }
    out
}
