//! Control-flow handlers: comparisons and branches, the call family,
//! returns, and the odd ducks (catch/throw, restart, the reserved
//! save/restore stubs).

use crate::instruction::Instruction;
use crate::interpreter::{ExecutionResult, Interpreter};
use log::debug;

impl Interpreter<'_> {
    pub fn is_flow_opcode(name: &str) -> bool {
        matches!(
            name,
            "je" | "jl"
                | "jg"
                | "jz"
                | "jin"
                | "test"
                | "dec_chk"
                | "inc_chk"
                | "jump"
                | "call"
                | "call_2s"
                | "call_2n"
                | "call_1s"
                | "call_1n"
                | "call_vs2"
                | "call_vn"
                | "call_vn2"
                | "ret"
                | "rtrue"
                | "rfalse"
                | "ret_popped"
                | "check_arg_count"
                | "catch"
                | "throw"
                | "nop"
                | "quit"
                | "restart"
                | "verify"
                | "piracy"
                | "save"
                | "restore"
                | "save_undo"
                | "restore_undo"
        )
    }

    pub fn execute_flow_op(
        &mut self,
        inst: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, String> {
        match inst.name {
            "je" => {
                // Branch if the first operand equals any of the rest
                if operands.len() < 2 {
                    debug!("je with {} operands at {:04x}", operands.len(), inst.addr);
                    return self.do_branch(inst, false);
                }
                let hit = operands[1..].contains(&operands[0]);
                self.do_branch(inst, hit)
            }
            "jl" => self.do_branch(inst, (operands[0] as i16) < operands[1] as i16),
            "jg" => self.do_branch(inst, (operands[0] as i16) > operands[1] as i16),
            "jz" => self.do_branch(inst, operands[0] == 0),
            "jin" => {
                let parent = self.vm.get_parent(operands[0])?;
                self.do_branch(inst, parent == operands[1])
            }
            "test" => self.do_branch(inst, operands[0] & operands[1] == operands[1]),
            "dec_chk" => {
                let var = operands[0] as u8;
                let value = self.vm.read_variable(var)?.wrapping_sub(1);
                self.vm.write_variable(var, value)?;
                self.do_branch(inst, (value as i16) < operands[1] as i16)
            }
            "inc_chk" => {
                let var = operands[0] as u8;
                let value = self.vm.read_variable(var)?.wrapping_add(1);
                self.vm.write_variable(var, value)?;
                self.do_branch(inst, (value as i16) > operands[1] as i16)
            }
            "jump" => {
                // Unconditional; the operand is a signed offset, not a
                // branch byte
                let offset = operands[0] as i16;
                self.vm.pc = (self.vm.pc as i64 + offset as i64 - 2) as u32;
                Ok(ExecutionResult::Branched)
            }
            "call" | "call_2s" | "call_1s" | "call_vs2" | "call_2n" | "call_1n" | "call_vn"
            | "call_vn2" => {
                if operands.is_empty() {
                    return Err(format!("{} with no operands at {:04x}", inst.name, inst.addr));
                }
                self.do_call(operands[0], &operands[1..], inst.store_var)
            }
            "ret" => self.do_return(operands[0]),
            "rtrue" => self.do_return(1),
            "rfalse" => self.do_return(0),
            "ret_popped" => {
                let value = self.vm.pop()?;
                self.do_return(value)
            }
            "check_arg_count" => {
                let supplied = self.vm.current_frame().arg_count as u16;
                self.do_branch(inst, operands[0] <= supplied)
            }
            "catch" => {
                let depth = self.vm.call_depth() as u16;
                self.store_result(inst, depth)?;
                Ok(ExecutionResult::Continue)
            }
            "throw" => {
                let depth = operands[1] as usize;
                if depth == 0 || depth > self.vm.call_depth() {
                    return Err(format!(
                        "throw to invalid frame {depth} at {:04x}",
                        inst.addr
                    ));
                }
                self.vm.call_stack.truncate(depth);
                self.do_return(operands[0])
            }
            "nop" => Ok(ExecutionResult::Continue),
            "quit" => Ok(ExecutionResult::Quit),
            "restart" => {
                self.vm.reset()?;
                Ok(ExecutionResult::Branched)
            }
            // Always-true checks
            "verify" | "piracy" => self.do_branch(inst, true),
            // Reserved: game-state snapshots report failure until
            // implemented. Branch variants signal a false condition,
            // store variants store 0.
            "save" | "restore" | "save_undo" | "restore_undo" => {
                debug!("{} is reserved; reporting failure", inst.name);
                if inst.store_var.is_some() {
                    self.store_result(inst, 0)?;
                    Ok(ExecutionResult::Continue)
                } else {
                    self.do_branch(inst, false)
                }
            }
            _ => Err(format!(
                "Unhandled flow opcode {} at {:04x}",
                inst.name, inst.addr
            )),
        }
    }
}
