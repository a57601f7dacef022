//! A small disassembler over the instruction decoder, for debugging
//! story files alongside the live trace output.

use crate::instruction::{Instruction, OperandType};
use crate::vm::VM;
use std::fmt::Write as _;

pub struct Disassembler<'a> {
    vm: &'a VM,
}

impl<'a> Disassembler<'a> {
    pub fn new(vm: &'a VM) -> Self {
        Disassembler { vm }
    }

    /// Render one instruction: address, raw bytes, mnemonic, operands,
    /// store and branch annotations.
    pub fn disassemble_at(&self, addr: u32) -> Result<(String, usize), String> {
        let inst = Instruction::decode(
            self.vm.memory.bytes(),
            addr as usize,
            self.vm.header.version,
        )?;
        let mut line = format!("{addr:05x}: ");
        for b in &self.vm.memory.bytes()[addr as usize..addr as usize + inst.size] {
            write!(line, "{b:02x} ").unwrap();
        }
        // Column-align the mnemonics for short instructions
        while line.len() < 26 {
            line.push(' ');
        }
        write!(line, "{}", inst.name).unwrap();
        for (op_type, op) in inst.operand_types.iter().zip(&inst.operands) {
            match op_type {
                OperandType::Variable => write!(line, " V{op:02x}").unwrap(),
                _ => write!(line, " #{op:04x}").unwrap(),
            }
        }
        if let Some(text) = &inst.text {
            write!(line, " \"{text}\"").unwrap();
        }
        if let Some(var) = inst.store_var {
            write!(line, " -> V{var:02x}").unwrap();
        }
        if let Some(branch) = &inst.branch {
            let target = match branch.offset {
                0 => "RFALSE".to_string(),
                1 => "RTRUE".to_string(),
                offset => format!(
                    "{:05x}",
                    (addr as i64 + inst.size as i64 + offset as i64 - 2) as u32
                ),
            };
            write!(
                line,
                " [{}] {target}",
                if branch.on_true { "TRUE" } else { "FALSE" }
            )
            .unwrap();
        }
        Ok((line, inst.size))
    }

    /// Disassemble every instruction in `[start, end)`, stopping early
    /// at an undecodable byte.
    pub fn disassemble_range(&self, start: u32, end: u32) -> Result<String, String> {
        let mut output = String::new();
        let mut addr = start;
        while addr < end {
            match self.disassemble_at(addr) {
                Ok((line, size)) => {
                    output.push_str(&line);
                    output.push('\n');
                    addr += size as u32;
                }
                Err(e) => {
                    writeln!(output, "{addr:05x}: <{e}>").unwrap();
                    break;
                }
            }
        }
        Ok(output)
    }

    /// Disassemble from the header's initial program counter.
    pub fn disassemble_main(&self, max_instructions: usize) -> Result<String, String> {
        let mut output = String::new();
        let mut addr = self.vm.header.initial_pc as u32;
        for _ in 0..max_instructions {
            let (line, size) = self.disassemble_at(addr)?;
            output.push_str(&line);
            output.push('\n');
            addr += size as u32;
        }
        Ok(output)
    }
}
