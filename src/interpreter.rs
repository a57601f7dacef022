use crate::device::{trace_handle, IoDevice, TraceHandle};
use crate::instruction::{Instruction, OperandType};
use crate::vm::{CallFrame, VM};
use log::debug;
use std::fmt::Write as _;

/// What an instruction did to the control flow.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// Fall through to the next instruction
    Continue,
    /// A branch fired; pc already updated
    Branched,
    /// A routine was entered; pc already updated
    Called,
    /// A routine returned with this value
    Returned(u16),
    /// The quit sentinel: unwind to the driver
    Quit,
}

/// The evaluation loop: fetch, decode, dispatch, trace.
///
/// The device is borrowed for the lifetime of execution; the driver owns
/// it and closes it afterwards.
pub struct Interpreter<'a> {
    pub vm: VM,
    pub device: &'a mut dyn IoDevice,
    trace: TraceHandle,
    instruction_count: u64,
}

impl<'a> Interpreter<'a> {
    pub fn new(vm: VM, device: &'a mut dyn IoDevice) -> Self {
        Interpreter {
            vm,
            device,
            trace: trace_handle(false),
            instruction_count: 0,
        }
    }

    /// Share a trace toggle with the device layer so `/trace` can flip it
    /// mid-game.
    pub fn set_trace_handle(&mut self, trace: TraceHandle) {
        self.trace = trace;
    }

    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    /// Run until the game quits. Fatal faults surface as `Err` with the
    /// pc baked into the message.
    pub fn run(&mut self) -> Result<(), String> {
        loop {
            if self.step()? == ExecutionResult::Quit {
                self.device.flush().map_err(String::from)?;
                return Ok(());
            }
        }
    }

    /// Execute exactly one instruction.
    pub fn step(&mut self) -> Result<ExecutionResult, String> {
        let inst = Instruction::decode(
            self.vm.memory.bytes(),
            self.vm.pc as usize,
            self.vm.header.version,
        )?;
        self.vm.pc += inst.size as u32;
        let operands = self.resolve_operands(&inst)?;
        self.instruction_count += 1;

        if self.trace.get() {
            let line = self.format_trace(&inst, &operands);
            self.device.write_error(&line).map_err(String::from)?;
        }

        self.execute(&inst, &operands)
    }

    /// Variable-typed operands are looked up (variable 0 pops); literals
    /// pass through.
    fn resolve_operands(&mut self, inst: &Instruction) -> Result<Vec<u16>, String> {
        inst.operand_types
            .iter()
            .zip(&inst.operands)
            .map(|(t, &raw)| match t {
                OperandType::Variable => self.vm.read_variable(raw as u8),
                _ => Ok(raw),
            })
            .collect()
    }

    /// Route to the handler. The dispatch key is the version-resolved
    /// descriptor name, so opcodes that change meaning across versions
    /// (not/call_1n, sread/read, pop/catch) land in the right place.
    fn execute(&mut self, inst: &Instruction, operands: &[u16]) -> Result<ExecutionResult, String> {
        if Self::is_math_opcode(inst.name) {
            return self.execute_math_op(inst, operands);
        }
        if Self::is_flow_opcode(inst.name) {
            return self.execute_flow_op(inst, operands);
        }
        if Self::is_object_opcode(inst.name) {
            return self.execute_object_op(inst, operands);
        }
        if Self::is_memory_opcode(inst.name) {
            return self.execute_memory_op(inst, operands);
        }
        if Self::is_display_opcode(inst.name) {
            return self.execute_display_op(inst, operands);
        }
        if Self::is_input_opcode(inst.name) {
            return self.execute_input_op(inst, operands);
        }
        Err(format!(
            "No handler for opcode {} at {:04x}",
            inst.name, inst.addr
        ))
    }

    /// Store an instruction's result, if it has somewhere to go.
    pub(crate) fn store_result(&mut self, inst: &Instruction, value: u16) -> Result<(), String> {
        match inst.store_var {
            Some(var) => self.vm.write_variable(var, value),
            None => Ok(()),
        }
    }

    /// Resolve a branch after the handler computed its condition: offsets
    /// 0 and 1 return from the routine with that value, anything else
    /// moves pc relative to the instruction's end.
    pub(crate) fn do_branch(
        &mut self,
        inst: &Instruction,
        condition: bool,
    ) -> Result<ExecutionResult, String> {
        let branch = match &inst.branch {
            Some(b) => b,
            None => return Ok(ExecutionResult::Continue),
        };
        if condition != branch.on_true {
            return Ok(ExecutionResult::Continue);
        }
        match branch.offset {
            0 => self.do_return(0),
            1 => self.do_return(1),
            offset => {
                self.vm.pc = (self.vm.pc as i64 + offset as i64 - 2) as u32;
                Ok(ExecutionResult::Branched)
            }
        }
    }

    /// Enter a routine at a packed address. Calls to address 0 (or past
    /// the end of memory) store 0 and fall through; some story files rely
    /// on that.
    pub(crate) fn do_call(
        &mut self,
        packed: u16,
        args: &[u16],
        return_store: Option<u8>,
    ) -> Result<ExecutionResult, String> {
        if packed == 0 {
            if let Some(var) = return_store {
                self.vm.write_variable(var, 0)?;
            }
            return Ok(ExecutionResult::Continue);
        }

        let addr = self.vm.unpack_routine_addr(packed);
        if !self.vm.memory.contains(addr) {
            debug!(
                "call to routine {addr:04x} beyond memory at pc {:04x}",
                self.vm.pc
            );
            if let Some(var) = return_store {
                self.vm.write_variable(var, 0)?;
            }
            return Ok(ExecutionResult::Continue);
        }

        let mut num_locals = self.vm.memory.read_byte(addr) as usize;
        if num_locals > 15 {
            debug!("Routine at {addr:04x} claims {num_locals} locals; clamping to 15");
            num_locals = 15;
        }

        let mut frame = CallFrame {
            return_pc: self.vm.pc,
            return_store,
            num_locals: num_locals as u8,
            locals: [0; 16],
            stack_base: self.vm.stack.len(),
            arg_count: args.len() as u8,
        };

        self.vm.pc = addr + 1;
        if self.vm.header.version <= 4 {
            // Initial values follow the count byte
            for local in frame.locals.iter_mut().take(num_locals) {
                *local = self.vm.memory.read_word(self.vm.pc);
                self.vm.pc += 2;
            }
        }
        for (i, &arg) in args.iter().enumerate().take(num_locals) {
            frame.locals[i] = arg;
        }

        self.vm.call_stack.push(frame);
        Ok(ExecutionResult::Called)
    }

    /// Leave the current routine: discard its stack intermediates,
    /// restore the caller's pc, and deliver the value if the call wanted
    /// one.
    pub(crate) fn do_return(&mut self, value: u16) -> Result<ExecutionResult, String> {
        if self.vm.call_stack.len() <= 1 {
            return Err(format!(
                "Return from the top-level routine at pc {:04x}",
                self.vm.pc
            ));
        }
        let frame = self.vm.call_stack.pop().expect("call stack underflow");
        self.vm.stack.truncate(frame.stack_base);
        self.vm.pc = frame.return_pc;
        if let Some(var) = frame.return_store {
            self.vm.write_variable(var, value)?;
        }
        Ok(ExecutionResult::Returned(value))
    }

    /// One trace line: start pc, consumed bytes, mnemonic, resolved
    /// operands, store target, branch plumbing.
    fn format_trace(&self, inst: &Instruction, operands: &[u16]) -> String {
        let mut line = format!("{:05x}:", inst.addr);
        let start = inst.addr as usize;
        for b in &self.vm.memory.bytes()[start..start + inst.size] {
            write!(line, " {b:02x}").unwrap();
        }
        write!(line, "  {}", inst.name).unwrap();
        for op in operands {
            write!(line, " {op:04x}").unwrap();
        }
        if let Some(var) = inst.store_var {
            write!(line, " -> var{var}").unwrap();
        }
        if let Some(branch) = &inst.branch {
            write!(
                line,
                " ?branch({}:{})",
                if branch.on_true { 'T' } else { 'F' },
                branch.offset
            )
            .unwrap();
        }
        line
    }
}
