//! The blocking input opcodes. These are the only suspension points in
//! the machine: execution stops until the device produces a line or a
//! key. End-of-input from the device becomes the quit sentinel.

use crate::device::Input;
use crate::instruction::Instruction;
use crate::interpreter::{ExecutionResult, Interpreter};
use crate::text;
use log::debug;

impl Interpreter<'_> {
    pub fn is_input_opcode(name: &str) -> bool {
        matches!(
            name,
            "sread" | "read" | "read_char" | "tokenise" | "encode_text"
        )
    }

    pub fn execute_input_op(
        &mut self,
        inst: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, String> {
        match inst.name {
            "sread" | "read" => {
                self.device.flush().map_err(String::from)?;
                // v1-3 interpreters redraw the status line before input
                if self.vm.header.version <= 3 {
                    self.refresh_status()?;
                }

                let line = match self.device.read_line().map_err(String::from)? {
                    Input::Line(line) => line,
                    _ => return Ok(ExecutionResult::Quit),
                };

                let text_buffer = operands[0] as u32;
                let parse_buffer = operands.get(1).copied().unwrap_or(0) as u32;
                self.write_text_buffer(text_buffer, &line)?;
                if parse_buffer != 0 {
                    let dict = self.vm.header.dictionary as u32;
                    self.vm
                        .tokenize_buffer(text_buffer, parse_buffer, dict, false)?;
                }
                if self.vm.header.version >= 5 {
                    // The terminating key, always return for line input
                    self.store_result(inst, 13)?;
                }
                Ok(ExecutionResult::Continue)
            }
            "read_char" => {
                self.device.flush().map_err(String::from)?;
                match self.device.read_char().map_err(String::from)? {
                    Input::Char(code) => {
                        self.store_result(inst, code)?;
                        Ok(ExecutionResult::Continue)
                    }
                    _ => Ok(ExecutionResult::Quit),
                }
            }
            "tokenise" => {
                let text_buffer = operands[0] as u32;
                let parse_buffer = operands[1] as u32;
                let dict = match operands.get(2) {
                    Some(&d) if d != 0 => d as u32,
                    _ => self.vm.header.dictionary as u32,
                };
                let skip_unknown = operands.get(3).map_or(false, |&f| f != 0);
                self.vm
                    .tokenize_buffer(text_buffer, parse_buffer, dict, skip_unknown)?;
                Ok(ExecutionResult::Continue)
            }
            "encode_text" => {
                // zscii-text, length, from, coded-text
                let src = operands[0] as u32 + operands[2] as u32;
                let length = operands[1] as u32;
                let word: String = (0..length)
                    .map(|i| self.vm.memory.read_byte(src + i) as char)
                    .collect();
                let encoded = text::encode_word(&word, self.vm.header.version);
                let dest = operands[3] as u32;
                for (i, w) in encoded.iter().enumerate() {
                    self.vm.memory.write_word(dest + i as u32 * 2, *w)?;
                }
                Ok(ExecutionResult::Continue)
            }
            _ => Err(format!(
                "Unhandled input opcode {} at {:04x}",
                inst.name, inst.addr
            )),
        }
    }

    /// Lowercase, truncate to the buffer's capacity, and store in the
    /// version's format.
    fn write_text_buffer(&mut self, text_buffer: u32, line: &str) -> Result<(), String> {
        let max = self.vm.memory.read_byte(text_buffer) as usize;
        let line: String = line
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii() && *c != '\n' && *c != '\r')
            .take(max)
            .collect();
        debug!("read line: '{line}'");

        if self.vm.header.version >= 5 {
            self.vm
                .memory
                .write_byte(text_buffer + 1, line.len() as u8)?;
            for (i, b) in line.bytes().enumerate() {
                self.vm.memory.write_byte(text_buffer + 2 + i as u32, b)?;
            }
        } else {
            for (i, b) in line.bytes().enumerate() {
                self.vm.memory.write_byte(text_buffer + 1 + i as u32, b)?;
            }
            self.vm
                .memory
                .write_byte(text_buffer + 1 + line.len() as u32, 0)?;
        }
        Ok(())
    }
}
