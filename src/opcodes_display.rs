//! Text output and screen-control handlers. Everything user-visible
//! goes through the I/O device; the runtime never writes escape
//! sequences itself.

use crate::instruction::Instruction;
use crate::interpreter::{ExecutionResult, Interpreter};
use crate::text;
use log::debug;

/// Printable ZSCII to char. Newline is 13 going out; codes outside the
/// printable ASCII range fall back to '?' rather than corrupting the
/// transcript.
fn zscii_to_char(code: u16) -> char {
    match code {
        13 => '\n',
        32..=126 => (code as u8) as char,
        _ => {
            debug!("Unprintable ZSCII output code {code}");
            '?'
        }
    }
}

impl Interpreter<'_> {
    pub fn is_display_opcode(name: &str) -> bool {
        matches!(
            name,
            "print"
                | "print_ret"
                | "new_line"
                | "print_num"
                | "print_char"
                | "print_addr"
                | "print_paddr"
                | "print_obj"
                | "print_table"
                | "print_unicode"
                | "check_unicode"
                | "show_status"
                | "split_window"
                | "set_window"
                | "erase_window"
                | "erase_line"
                | "set_cursor"
                | "get_cursor"
                | "set_text_style"
                | "buffer_mode"
                | "output_stream"
                | "input_stream"
                | "sound_effect"
                | "set_colour"
                | "set_font"
        )
    }

    fn write_str(&mut self, s: &str) -> Result<(), String> {
        self.device.write_string(s).map_err(String::from)
    }

    /// Compose the v3 status line from the location object (global 16)
    /// and either score/moves or hours:minutes (globals 17 and 18), and
    /// hand it to the device's side channel.
    pub(crate) fn refresh_status(&mut self) -> Result<(), String> {
        if self.vm.header.version > 3 {
            return Ok(());
        }
        let location_obj = self.vm.read_global(0x10)?;
        let location = if location_obj != 0 {
            self.vm.object_name(location_obj)?
        } else {
            String::new()
        };
        let a = self.vm.read_global(0x11)?;
        let b = self.vm.read_global(0x12)?;
        let right = if self.vm.header.status_is_time() {
            format!("Time: {a}:{b:02}")
        } else {
            format!("Score: {}  Moves: {b}", a as i16)
        };
        self.device
            .show_status(&location, &right)
            .map_err(String::from)
    }

    pub fn execute_display_op(
        &mut self,
        inst: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, String> {
        match inst.name {
            "print" => {
                let s = inst.text.clone().unwrap_or_default();
                self.write_str(&s)?;
            }
            "print_ret" => {
                let s = inst.text.clone().unwrap_or_default();
                self.write_str(&s)?;
                self.write_str("\n")?;
                return self.do_return(1);
            }
            "new_line" => self.write_str("\n")?,
            "print_num" => {
                let s = (operands[0] as i16).to_string();
                self.write_str(&s)?;
            }
            "print_char" => {
                let ch = zscii_to_char(operands[0]);
                self.device.write_char(ch).map_err(String::from)?;
            }
            "print_addr" => {
                let (s, _) = text::decode_string(
                    self.vm.memory.bytes(),
                    operands[0] as usize,
                    self.vm.header.abbrev_table as usize,
                )?;
                self.write_str(&s)?;
            }
            "print_paddr" => {
                let s = text::decode_string_at_packed_addr(
                    self.vm.memory.bytes(),
                    operands[0],
                    self.vm.header.string_multiplier(),
                    self.vm.header.abbrev_table as usize,
                )?;
                self.write_str(&s)?;
            }
            "print_obj" => {
                let name = self.vm.object_name(operands[0])?;
                self.write_str(&name)?;
            }
            "print_table" => {
                let addr = operands[0] as u32;
                let width = operands[1] as u32;
                let height = operands.get(2).copied().unwrap_or(1) as u32;
                let skip = operands.get(3).copied().unwrap_or(0) as u32;
                let mut at = addr;
                for row in 0..height {
                    if row > 0 {
                        self.write_str("\n")?;
                    }
                    let line: String = (0..width)
                        .map(|i| zscii_to_char(self.vm.memory.read_byte(at + i) as u16))
                        .collect();
                    self.write_str(&line)?;
                    at += width + skip;
                }
            }
            "print_unicode" => {
                let ch = char::from_u32(operands[0] as u32).unwrap_or('?');
                self.device.write_char(ch).map_err(String::from)?;
            }
            "check_unicode" => {
                // 3 = can both print and read the character
                let ok = char::from_u32(operands[0] as u32).is_some();
                self.store_result(inst, if ok { 3 } else { 0 })?;
            }
            "show_status" => self.refresh_status()?,
            "split_window" => self.device.split_window(operands[0]).map_err(String::from)?,
            "set_window" => self.device.set_window(operands[0]).map_err(String::from)?,
            "erase_window" => self
                .device
                .erase_window(operands[0] as i16)
                .map_err(String::from)?,
            "erase_line" => self.device.erase_line().map_err(String::from)?,
            "set_cursor" => self
                .device
                .set_cursor(operands[0], operands[1])
                .map_err(String::from)?,
            "get_cursor" => {
                let (row, column) = self.device.get_cursor().map_err(String::from)?;
                let addr = operands[0] as u32;
                self.vm.memory.write_word(addr, row)?;
                self.vm.memory.write_word(addr + 2, column)?;
            }
            "set_text_style" => self
                .device
                .set_text_style(operands[0])
                .map_err(String::from)?,
            "buffer_mode" => self
                .device
                .set_buffer_mode(operands[0] == 1)
                .map_err(String::from)?,
            "output_stream" => self
                .device
                .set_output_stream(operands[0] as i16)
                .map_err(String::from)?,
            "input_stream" => self
                .device
                .set_input_stream(operands[0])
                .map_err(String::from)?,
            "sound_effect" => debug!("sound_effect {operands:?} ignored"),
            "set_colour" => debug!("set_colour {operands:?} ignored"),
            "set_font" => {
                // Font changes are not supported; report "previous font 0"
                self.store_result(inst, 0)?;
            }
            _ => {
                return Err(format!(
                    "Unhandled display opcode {} at {:04x}",
                    inst.name, inst.addr
                ))
            }
        }
        Ok(ExecutionResult::Continue)
    }
}
