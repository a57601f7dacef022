//! Memory and variable opcodes: array access, variable transfer, the
//! evaluation-stack operations, and the v5 table utilities.
//!
//! Array indices are signed; a bounds violation is logged and the
//! operation becomes a no-op (no store, no write).

use crate::instruction::Instruction;
use crate::interpreter::{ExecutionResult, Interpreter};
use log::error;

impl Interpreter<'_> {
    pub fn is_memory_opcode(name: &str) -> bool {
        matches!(
            name,
            "loadw"
                | "loadb"
                | "storew"
                | "storeb"
                | "store"
                | "load"
                | "push"
                | "pull"
                | "pop"
                | "inc"
                | "dec"
                | "scan_table"
                | "copy_table"
        )
    }

    /// Effective address of an array access, or None (logged) when it
    /// falls outside memory.
    fn array_addr(&self, base: u16, index: u16, scale: i64, span: u32, pc: u32) -> Option<u32> {
        let addr = base as i64 + scale * (index as i16) as i64;
        if addr < 0 || addr + span as i64 > self.vm.memory.len() as i64 {
            error!("Array access out of bounds at pc {pc:04x}: {base:04x}[{index}]");
            return None;
        }
        Some(addr as u32)
    }

    pub fn execute_memory_op(
        &mut self,
        inst: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, String> {
        match inst.name {
            "loadw" => {
                if let Some(addr) = self.array_addr(operands[0], operands[1], 2, 2, inst.addr) {
                    let value = self.vm.memory.read_word(addr);
                    self.store_result(inst, value)?;
                }
            }
            "loadb" => {
                if let Some(addr) = self.array_addr(operands[0], operands[1], 1, 1, inst.addr) {
                    let value = self.vm.memory.read_byte(addr) as u16;
                    self.store_result(inst, value)?;
                }
            }
            "storew" => {
                if let Some(addr) = self.array_addr(operands[0], operands[1], 2, 2, inst.addr) {
                    self.vm.memory.write_word(addr, operands[2])?;
                }
            }
            "storeb" => {
                if let Some(addr) = self.array_addr(operands[0], operands[1], 1, 1, inst.addr) {
                    self.vm.memory.write_byte(addr, operands[2] as u8)?;
                }
            }
            "store" => {
                self.vm.write_variable(operands[0] as u8, operands[1])?;
            }
            "load" => {
                let value = self.vm.read_variable(operands[0] as u8)?;
                self.store_result(inst, value)?;
            }
            "push" => {
                self.vm.push(operands[0])?;
            }
            "pull" => {
                let value = self.vm.pop()?;
                self.vm.write_variable(operands[0] as u8, value)?;
            }
            "pop" => {
                self.vm.pop()?;
            }
            "inc" => {
                let var = operands[0] as u8;
                let value = self.vm.read_variable(var)?.wrapping_add(1);
                self.vm.write_variable(var, value)?;
            }
            "dec" => {
                let var = operands[0] as u8;
                let value = self.vm.read_variable(var)?.wrapping_sub(1);
                self.vm.write_variable(var, value)?;
            }
            "scan_table" => {
                let form = operands.get(3).copied().unwrap_or(0x82);
                let words = form & 0x80 != 0;
                let field = (form & 0x7F) as u32;
                if field == 0 {
                    return Err(format!("scan_table with zero entry size at {:04x}", inst.addr));
                }
                let mut found = 0u16;
                for i in 0..operands[2] as u32 {
                    let addr = operands[1] as u32 + i * field;
                    let value = if words {
                        self.vm.memory.read_word(addr)
                    } else {
                        self.vm.memory.read_byte(addr) as u16
                    };
                    if value == operands[0] {
                        found = addr as u16;
                        break;
                    }
                }
                self.store_result(inst, found)?;
                return self.do_branch(inst, found != 0);
            }
            "copy_table" => {
                let (first, second) = (operands[0] as u32, operands[1] as u32);
                let size = operands[2] as i16;
                if second == 0 {
                    for i in 0..size.unsigned_abs() as u32 {
                        self.vm.memory.write_byte(first + i, 0)?;
                    }
                } else if size < 0 {
                    // Negative size forces a forward byte-by-byte copy
                    // even over overlapping ranges
                    for i in 0..size.unsigned_abs() as u32 {
                        let b = self.vm.memory.read_byte(first + i);
                        self.vm.memory.write_byte(second + i, b)?;
                    }
                } else {
                    let bytes: Vec<u8> = (0..size as u32)
                        .map(|i| self.vm.memory.read_byte(first + i))
                        .collect();
                    for (i, b) in bytes.into_iter().enumerate() {
                        self.vm.memory.write_byte(second + i as u32, b)?;
                    }
                }
            }
            _ => {
                return Err(format!(
                    "Unhandled memory opcode {} at {:04x}",
                    inst.name, inst.addr
                ))
            }
        }
        Ok(ExecutionResult::Continue)
    }
}
