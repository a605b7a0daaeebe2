//! Per-instruction host code fragments.
//!
//! Every instruction contributes to two sections:
//!
//! - **allocation**: a `clCreateBuffer` pair (`buf_v<id>`, `buf_v<id>_size`)
//!   for each slot the instruction defines;
//! - **execution**: the calls that feed, dispatch or read back that slot.
//!
//! Both sections follow program order, and slot ids are written verbatim into
//! buffer names, so `var-7` becomes `buf_v7`. The sections are spliced between
//! the prologue, mid and epilogue [`Fragments`](crate::Fragments).

use hashpipe_core::id::SlotId;
use hashpipe_core::ops::Opcode;
use hashpipe_core::program::{Instruction, Program};
use tracing::debug;

use crate::fragments::Fragments;

/// Indentation of the allocation section, inside `main`.
const ALLOC_INDENT: &str = "    ";
/// Indentation of the execution section, inside the candidate loop.
const EXEC_INDENT: &str = "        ";

/// The two generated sections of a program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    pub allocation: String,
    pub execution: String,
}

/// Host variable holding the kernel for `opcode`, if it dispatches one.
///
/// The default prologue creates one `cl_kernel` per name returned here.
pub fn kernel_name(opcode: Opcode) -> Option<&'static str> {
    match opcode {
        Opcode::Md5 => Some("kernel_md5"),
        Opcode::Sha256 => Some("kernel_sha256"),
        Opcode::Sha384 => Some("kernel_sha384"),
        Opcode::Sha512 => Some("kernel_sha512"),
        Opcode::Xor => Some("kernel_xor"),
        Opcode::Input | Opcode::Result => None,
    }
}

/// Builds the allocation and execution sections for `program`.
pub fn sections(program: &Program) -> Sections {
    let mut sections = Sections::default();
    for instruction in program {
        if let Some(slot) = instruction.output {
            push_allocation(&mut sections.allocation, slot);
        }
        push_execution(&mut sections.execution, instruction);
    }
    sections
}

/// Produces the complete host source for `program`.
///
/// Layout: prologue, allocation, mid, execution, epilogue, each followed by a
/// newline.
pub fn emit(program: &Program, fragments: &Fragments) -> String {
    let Sections {
        allocation,
        execution,
    } = sections(program);

    let parts = [
        fragments.prologue.as_str(),
        &allocation,
        fragments.mid.as_str(),
        &execution,
        fragments.epilogue.as_str(),
    ];
    let mut source = String::with_capacity(parts.iter().map(|p| p.len() + 1).sum());
    for part in parts {
        source.push_str(part);
        source.push('\n');
    }

    debug!(
        instructions = program.len(),
        bytes = source.len(),
        "emitted host source"
    );
    source
}

fn push_line(out: &mut String, indent: &str, line: &str) {
    out.push_str(indent);
    out.push_str(line);
    out.push('\n');
}

fn push_allocation(out: &mut String, slot: SlotId) {
    let v = slot.0;
    push_line(
        out,
        ALLOC_INDENT,
        &format!("cl_mem buf_v{v} = clCreateBuffer(context, CL_MEM_READ_WRITE, input_data.size() * sizeof(cl_uint), nullptr, &err);"),
    );
    push_line(
        out,
        ALLOC_INDENT,
        &format!("cl_mem buf_v{v}_size = clCreateBuffer(context, CL_MEM_READ_WRITE, size_data.size() * sizeof(cl_uint), nullptr, &err);"),
    );
}

fn push_execution(out: &mut String, instruction: &Instruction) {
    match instruction.opcode {
        Opcode::Input => {
            if let Some(slot) = instruction.output {
                let v = slot.0;
                push_line(
                    out,
                    EXEC_INDENT,
                    &format!("err = clEnqueueWriteBuffer(queue, buf_v{v}, CL_TRUE, 0, input_data.size() * sizeof(cl_uint), input_data.data(), 0, nullptr, nullptr);"),
                );
                push_line(out, EXEC_INDENT, "size_data[0] = data_size;");
                push_line(
                    out,
                    EXEC_INDENT,
                    &format!("err = clEnqueueWriteBuffer(queue, buf_v{v}_size, CL_TRUE, 0, size_data.size() * sizeof(cl_uint), size_data.data(), 0, nullptr, nullptr);"),
                );
            }
        }
        Opcode::Result => {
            if let Some(slot) = instruction.inputs.first() {
                let v = slot.0;
                push_line(
                    out,
                    EXEC_INDENT,
                    &format!("err = clEnqueueReadBuffer(queue, buf_v{v}, CL_TRUE, 0, output_data.size() * sizeof(cl_uint), output_data.data(), 0, nullptr, nullptr);"),
                );
                push_line(
                    out,
                    EXEC_INDENT,
                    &format!("err = clEnqueueReadBuffer(queue, buf_v{v}_size, CL_TRUE, 0, size_data.size() * sizeof(cl_uint), size_data.data(), 0, nullptr, nullptr);"),
                );
            }
        }
        opcode => {
            let Some(kernel) = kernel_name(opcode) else {
                return;
            };
            // Operands first, then the output; each slot passes its data
            // buffer and its length buffer.
            let buffers = instruction.inputs.iter().chain(instruction.output.iter());
            for (index, slot) in buffers.enumerate() {
                let v = slot.0;
                let arg = index * 2;
                push_line(
                    out,
                    EXEC_INDENT,
                    &format!("clSetKernelArg({kernel}, {arg}, sizeof(cl_mem), &buf_v{v});"),
                );
                push_line(
                    out,
                    EXEC_INDENT,
                    &format!(
                        "clSetKernelArg({kernel}, {}, sizeof(cl_mem), &buf_v{v}_size);",
                        arg + 1
                    ),
                );
            }
            push_line(
                out,
                EXEC_INDENT,
                &format!("clEnqueueNDRangeKernel(queue, {kernel}, 1, nullptr, &global_size, nullptr, 0, nullptr, nullptr);"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md5_program() -> Program {
        Program::new(vec![
            Instruction::input(SlotId(4)),
            Instruction::new(Opcode::Md5, [SlotId(4)], Some(SlotId(1))),
            Instruction::result(SlotId(1)),
        ])
        .unwrap()
    }

    #[test]
    fn every_hash_and_xor_has_a_kernel() {
        for opcode in [Opcode::Md5, Opcode::Sha256, Opcode::Sha384, Opcode::Sha512, Opcode::Xor] {
            assert!(kernel_name(opcode).is_some(), "{opcode}");
        }
        assert_eq!(kernel_name(Opcode::Input), None);
        assert_eq!(kernel_name(Opcode::Result), None);
    }

    #[test]
    fn allocation_only_for_defined_slots() {
        let allocation = sections(&md5_program()).allocation;
        let lines: Vec<&str> = allocation.lines().map(str::trim).collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("cl_mem buf_v4 = clCreateBuffer("));
        assert!(lines[1].starts_with("cl_mem buf_v4_size = clCreateBuffer("));
        assert!(lines[2].starts_with("cl_mem buf_v1 = clCreateBuffer("));
        assert!(lines[3].starts_with("cl_mem buf_v1_size = clCreateBuffer("));
    }

    #[test]
    fn md5_dispatch_passes_input_then_output() {
        let execution = sections(&md5_program()).execution;
        let args: Vec<&str> = execution
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with("clSetKernelArg"))
            .collect();
        assert_eq!(
            args,
            vec![
                "clSetKernelArg(kernel_md5, 0, sizeof(cl_mem), &buf_v4);",
                "clSetKernelArg(kernel_md5, 1, sizeof(cl_mem), &buf_v4_size);",
                "clSetKernelArg(kernel_md5, 2, sizeof(cl_mem), &buf_v1);",
                "clSetKernelArg(kernel_md5, 3, sizeof(cl_mem), &buf_v1_size);",
            ]
        );
        assert!(execution.contains(
            "clEnqueueNDRangeKernel(queue, kernel_md5, 1, nullptr, &global_size, nullptr, 0, nullptr, nullptr);"
        ));
    }

    #[test]
    fn xor_uses_six_arguments() {
        let program = Program::new(vec![
            Instruction::input(SlotId(0)),
            Instruction::input(SlotId(1)),
            Instruction::new(Opcode::Xor, [SlotId(0), SlotId(1)], Some(SlotId(2))),
            Instruction::result(SlotId(2)),
        ])
        .unwrap();
        let execution = sections(&program).execution;
        assert!(execution.contains("clSetKernelArg(kernel_xor, 4, sizeof(cl_mem), &buf_v2);"));
        assert!(execution.contains("clSetKernelArg(kernel_xor, 5, sizeof(cl_mem), &buf_v2_size);"));
        assert!(!execution.contains("clSetKernelArg(kernel_xor, 6"));
    }

    #[test]
    fn input_writes_and_result_reads() {
        let execution = sections(&md5_program()).execution;
        let lines: Vec<&str> = execution.lines().map(str::trim).collect();
        assert!(lines[0].starts_with("err = clEnqueueWriteBuffer(queue, buf_v4, CL_TRUE"));
        assert_eq!(lines[1], "size_data[0] = data_size;");
        assert!(lines[2].starts_with("err = clEnqueueWriteBuffer(queue, buf_v4_size, CL_TRUE"));
        let n = lines.len();
        assert!(lines[n - 2].starts_with("err = clEnqueueReadBuffer(queue, buf_v1, CL_TRUE"));
        assert!(lines[n - 1].starts_with("err = clEnqueueReadBuffer(queue, buf_v1_size, CL_TRUE"));
    }

    #[test]
    fn empty_program_emits_bare_fragments() {
        let fragments = Fragments {
            prologue: "P".into(),
            mid: "M".into(),
            epilogue: "E".into(),
        };
        assert_eq!(emit(&Program::default(), &fragments), "P\n\nM\n\nE\n");
    }
}
