//! Arithmetic, logic, and shift handlers.
//!
//! Operands arrive as unsigned 16-bit values; arithmetic reinterprets
//! them as signed, operates, and masks back to 16 bits on store.
//! Division truncates toward zero and modulo follows the dividend's
//! sign, which is exactly what Rust's `/` and `%` do on i16. Division or
//! modulo by zero is logged and stores nothing.

use crate::instruction::Instruction;
use crate::interpreter::{ExecutionResult, Interpreter};
use log::error;

impl Interpreter<'_> {
    pub fn is_math_opcode(name: &str) -> bool {
        matches!(
            name,
            "add"
                | "sub"
                | "mul"
                | "div"
                | "mod"
                | "and"
                | "or"
                | "not"
                | "log_shift"
                | "art_shift"
                | "random"
        )
    }

    pub fn execute_math_op(
        &mut self,
        inst: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, String> {
        match inst.name {
            "add" => {
                let result = (operands[0] as i16).wrapping_add(operands[1] as i16);
                self.store_result(inst, result as u16)?;
            }
            "sub" => {
                let result = (operands[0] as i16).wrapping_sub(operands[1] as i16);
                self.store_result(inst, result as u16)?;
            }
            "mul" => {
                let result = (operands[0] as i16).wrapping_mul(operands[1] as i16);
                self.store_result(inst, result as u16)?;
            }
            "div" => {
                if operands[1] == 0 {
                    error!("Division by zero at pc {:04x}", inst.addr);
                    return Ok(ExecutionResult::Continue);
                }
                let result = (operands[0] as i16).wrapping_div(operands[1] as i16);
                self.store_result(inst, result as u16)?;
            }
            "mod" => {
                if operands[1] == 0 {
                    error!("Modulo by zero at pc {:04x}", inst.addr);
                    return Ok(ExecutionResult::Continue);
                }
                let result = (operands[0] as i16).wrapping_rem(operands[1] as i16);
                self.store_result(inst, result as u16)?;
            }
            "and" => self.store_result(inst, operands[0] & operands[1])?,
            "or" => self.store_result(inst, operands[0] | operands[1])?,
            "not" => self.store_result(inst, !operands[0])?,
            "log_shift" => {
                let places = operands[1] as i16 as i32;
                let result = if places >= 0 {
                    (operands[0] as u32) << places.min(16)
                } else {
                    (operands[0] as u32) >> (-places).min(16)
                };
                self.store_result(inst, result as u16)?;
            }
            "art_shift" => {
                let places = operands[1] as i16 as i32;
                let result = if places >= 0 {
                    ((operands[0] as i16) as i32) << places.min(16)
                } else {
                    ((operands[0] as i16) as i32) >> (-places).min(16)
                };
                self.store_result(inst, result as u16)?;
            }
            "random" => {
                let range = operands[0] as i16;
                let value = if range > 0 {
                    self.vm.rng.gen_in_range(range as u16)
                } else {
                    self.vm.rng.reseed(range.unsigned_abs());
                    0
                };
                self.store_result(inst, value)?;
            }
            _ => {
                return Err(format!(
                    "Unhandled math opcode {} at {:04x}",
                    inst.name, inst.addr
                ))
            }
        }
        Ok(ExecutionResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use crate::device::HeadlessDevice;
    use crate::interpreter::{ExecutionResult, Interpreter};
    use crate::memory::Memory;
    use crate::test_support::minimal_image;
    use crate::vm::VM;

    /// Execute one instruction assembled at the initial pc and return
    /// the value stored in G00.
    fn run_one(code: &[u8]) -> u16 {
        let mut image = minimal_image(3);
        image[0x5000..0x5000 + code.len()].copy_from_slice(code);
        let vm = VM::new(Memory::load(image).unwrap()).unwrap();
        let mut device = HeadlessDevice::new();
        let mut interp = Interpreter::new(vm, &mut device);
        assert_eq!(interp.step().unwrap(), ExecutionResult::Continue);
        interp.vm.read_global(0x10).unwrap()
    }

    /// Long-form 2OP with two large constants via the variable encoding.
    fn twoop_large(opcode: u8, a: u16, b: u16) -> Vec<u8> {
        let mut code = vec![0xC0 | opcode, 0x0F];
        code.extend_from_slice(&a.to_be_bytes());
        code.extend_from_slice(&b.to_be_bytes());
        code.push(0x10);
        code
    }

    #[test]
    fn test_add_overflow_wraps() {
        assert_eq!(run_one(&twoop_large(0x14, 0x7FFF, 1)), 0x8000);
    }

    #[test]
    fn test_sub_signed() {
        assert_eq!(run_one(&twoop_large(0x15, 3, 5)) as i16, -2);
    }

    #[test]
    fn test_mul_masks_to_16_bits() {
        assert_eq!(run_one(&twoop_large(0x16, 0x4000, 4)), 0);
    }

    #[test]
    fn test_div_truncates_toward_zero() {
        assert_eq!(run_one(&twoop_large(0x17, (-7i16) as u16, 2)) as i16, -3);
    }

    #[test]
    fn test_mod_follows_dividend_sign() {
        assert_eq!(run_one(&twoop_large(0x18, (-7i16) as u16, 2)) as i16, -1);
        assert_eq!(run_one(&twoop_large(0x18, 7, (-2i16) as u16)) as i16, 1);
    }

    #[test]
    fn test_division_by_zero_stores_nothing() {
        // G00 keeps its previous value (0) and execution continues
        assert_eq!(run_one(&twoop_large(0x17, 100, 0)), 0);
    }

    #[test]
    fn test_bitwise_ops() {
        assert_eq!(run_one(&twoop_large(0x09, 0xF0F0, 0xFF00)), 0xF000);
        assert_eq!(run_one(&twoop_large(0x08, 0xF0F0, 0x0F00)), 0xFFF0);
        // 1OP not, v3
        assert_eq!(run_one(&[0x9F, 0xF0, 0x10]), 0xFF0F);
    }

    #[test]
    fn test_random_zero_reseeds_and_stores_zero() {
        // random #00 -> G00
        assert_eq!(run_one(&[0xE7, 0x7F, 0x00, 0x10]), 0);
    }

    #[test]
    fn test_random_positive_in_range() {
        for _ in 0..20 {
            let v = run_one(&[0xE7, 0x7F, 0x06, 0x10]);
            assert!((1..=6).contains(&v));
        }
    }

    #[test]
    fn test_shifts() {
        let mut image = minimal_image(5);
        // log_shift #8000 #-1 (0xFFFF) -> G00 : zero-fill right shift
        let code = [0xBE, 0x02, 0x0F, 0x80, 0x00, 0xFF, 0xFF, 0x10];
        image[0x5000..0x5000 + code.len()].copy_from_slice(&code);
        let vm = VM::new(Memory::load(image).unwrap()).unwrap();
        let mut device = HeadlessDevice::new();
        let mut interp = Interpreter::new(vm, &mut device);
        interp.step().unwrap();
        assert_eq!(interp.vm.read_global(0x10).unwrap(), 0x4000);

        let mut image = minimal_image(5);
        // art_shift #8000 #-1 -> G00 : sign-preserving right shift
        let code = [0xBE, 0x03, 0x0F, 0x80, 0x00, 0xFF, 0xFF, 0x10];
        image[0x5000..0x5000 + code.len()].copy_from_slice(&code);
        let vm = VM::new(Memory::load(image).unwrap()).unwrap();
        let mut device = HeadlessDevice::new();
        let mut interp = Interpreter::new(vm, &mut device);
        interp.step().unwrap();
        assert_eq!(interp.vm.read_global(0x10).unwrap(), 0xC000);
    }
}
