//! Object and property opcodes. The tree and property-list mechanics
//! live in `zobject`; these handlers wire them to stores and branches.

use crate::instruction::Instruction;
use crate::interpreter::{ExecutionResult, Interpreter};

impl Interpreter<'_> {
    pub fn is_object_opcode(name: &str) -> bool {
        matches!(
            name,
            "test_attr"
                | "set_attr"
                | "clear_attr"
                | "get_parent"
                | "get_sibling"
                | "get_child"
                | "insert_obj"
                | "remove_obj"
                | "get_prop"
                | "get_prop_addr"
                | "get_prop_len"
                | "get_next_prop"
                | "put_prop"
        )
    }

    pub fn execute_object_op(
        &mut self,
        inst: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, String> {
        match inst.name {
            "test_attr" => {
                let set = self.vm.test_attribute(operands[0], operands[1])?;
                self.do_branch(inst, set)
            }
            "set_attr" => {
                self.vm.set_attribute(operands[0], operands[1], true)?;
                Ok(ExecutionResult::Continue)
            }
            "clear_attr" => {
                self.vm.set_attribute(operands[0], operands[1], false)?;
                Ok(ExecutionResult::Continue)
            }
            "get_parent" => {
                let parent = self.vm.get_parent(operands[0])?;
                self.store_result(inst, parent)?;
                Ok(ExecutionResult::Continue)
            }
            "get_sibling" => {
                let sibling = self.vm.get_sibling(operands[0])?;
                self.store_result(inst, sibling)?;
                self.do_branch(inst, sibling != 0)
            }
            "get_child" => {
                let child = self.vm.get_child(operands[0])?;
                self.store_result(inst, child)?;
                self.do_branch(inst, child != 0)
            }
            "insert_obj" => {
                self.vm.insert_object(operands[0], operands[1])?;
                Ok(ExecutionResult::Continue)
            }
            "remove_obj" => {
                self.vm.remove_object(operands[0])?;
                Ok(ExecutionResult::Continue)
            }
            "get_prop" => {
                let value = self.vm.get_property(operands[0], operands[1] as u8)?;
                self.store_result(inst, value)?;
                Ok(ExecutionResult::Continue)
            }
            "get_prop_addr" => {
                let addr = self.vm.get_property_addr(operands[0], operands[1] as u8)?;
                self.store_result(inst, addr)?;
                Ok(ExecutionResult::Continue)
            }
            "get_prop_len" => {
                let len = self.vm.get_property_len(operands[0]);
                self.store_result(inst, len)?;
                Ok(ExecutionResult::Continue)
            }
            "get_next_prop" => {
                let next = self.vm.get_next_property(operands[0], operands[1] as u8)?;
                self.store_result(inst, next as u16)?;
                Ok(ExecutionResult::Continue)
            }
            "put_prop" => {
                self.vm
                    .put_property(operands[0], operands[1] as u8, operands[2])?;
                Ok(ExecutionResult::Continue)
            }
            _ => Err(format!(
                "Unhandled object opcode {} at {:04x}",
                inst.name, inst.addr
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::device::HeadlessDevice;
    use crate::interpreter::Interpreter;
    use crate::memory::Memory;
    use crate::test_support::minimal_image;
    use crate::vm::VM;

    const TREE_BASE: usize = 0x0300 + 31 * 2;

    /// obj1 has child obj3; obj2 is loose. obj1 owns property 12 (word).
    fn object_image() -> Vec<u8> {
        let mut image = minimal_image(3);
        let entry = |n: usize| TREE_BASE + (n - 1) * 9;
        image[entry(1) + 6] = 3;
        image[entry(1) + 7] = 0x06;
        image[entry(1) + 8] = 0x00;
        image[entry(2) + 7] = 0x06;
        image[entry(2) + 8] = 0x40;
        image[entry(3) + 4] = 1;
        image[entry(3) + 7] = 0x06;
        image[entry(3) + 8] = 0x80;
        // obj1 property table: no name, prop 12 = 0x0102
        image[0x0600] = 0;
        image[0x0601] = (1 << 5) | 12;
        image[0x0602] = 0x01;
        image[0x0603] = 0x02;
        image[0x0604] = 0;
        image[0x0640] = 0;
        image[0x0680] = 0;
        image
    }

    fn run_objects(code: &[u8]) -> (String, VM) {
        let mut image = object_image();
        image[0x5000..0x5000 + code.len()].copy_from_slice(code);
        let vm = VM::new(Memory::load(image).unwrap()).unwrap();
        let mut device = HeadlessDevice::new();
        let mut interp = Interpreter::new(vm, &mut device);
        interp.run().unwrap();
        let vm = interp.vm;
        (device.output().to_string(), vm)
    }

    #[test]
    fn test_attr_opcodes_round_trip() {
        // set_attr 2,6; test_attr 2,6 ?+5; print_num 1; quit
        let (output, _) = run_objects(&[
            0x0B, 0x02, 0x06, // set_attr 2 6
            0x0A, 0x02, 0x06, 0xC5, // test_attr 2 6 ?+5
            0xE6, 0x7F, 0, // skipped
            0xE6, 0x7F, 1, 0xBA,
        ]);
        assert_eq!(output, "1");
    }

    #[test]
    fn test_clear_attr() {
        let (output, _) = run_objects(&[
            0x0B, 0x02, 0x06, // set_attr 2 6
            0x0C, 0x02, 0x06, // clear_attr 2 6
            0x0A, 0x02, 0x06, 0x45, // test_attr 2 6 ?~+5
            0xE6, 0x7F, 0, // skipped
            0xE6, 0x7F, 2, 0xBA,
        ]);
        assert_eq!(output, "2");
    }

    #[test]
    fn test_get_parent_stores() {
        // get_parent 3 -> G00
        let (output, _) = run_objects(&[0x93, 0x03, 0x10, 0xE6, 0xBF, 0x10, 0xBA]);
        assert_eq!(output, "1");
    }

    #[test]
    fn test_get_child_branches_when_present() {
        // get_child 1 -> G00 ?+5
        let (output, _) = run_objects(&[
            0x92, 0x01, 0x10, 0xC5, // get_child 1 -> G00 ?+5
            0xE6, 0x7F, 0, // skipped
            0xE6, 0xBF, 0x10, 0xBA,
        ]);
        assert_eq!(output, "3");
    }

    #[test]
    fn test_get_sibling_of_last_child_falls_through() {
        // get_sibling 3 -> G00 ?+5 : no sibling, no branch
        let (output, _) = run_objects(&[
            0x91, 0x03, 0x10, 0xC5, // get_sibling 3 -> G00 ?+5
            0xE6, 0xBF, 0x10, 0xBA, // print_num G00 (0)
            0xE6, 0x7F, 9, 0xBA,
        ]);
        assert_eq!(output, "0");
    }

    #[test]
    fn test_insert_obj_opcode() {
        let (_, vm) = run_objects(&[0x0E, 0x02, 0x01, 0xBA]); // insert_obj 2 1
        assert_eq!(vm.get_child(1).unwrap(), 2);
        assert_eq!(vm.get_sibling(2).unwrap(), 3);
        assert_eq!(vm.get_parent(2).unwrap(), 1);
    }

    #[test]
    fn test_remove_obj_opcode() {
        let (_, vm) = run_objects(&[0x99, 0x03, 0xBA]); // remove_obj 3
        assert_eq!(vm.get_child(1).unwrap(), 0);
        assert_eq!(vm.get_parent(3).unwrap(), 0);
    }

    #[test]
    fn test_put_then_get_prop() {
        // put_prop 1 12 0x0203 (large); get_prop 1 12 -> G00
        let (output, _) = run_objects(&[
            0xE3, 0x54, 0x01, 0x0C, 0x02, 0x03, // put_prop 1 12 #0203
            0x11, 0x01, 0x0C, 0x10, // get_prop 1 12 -> G00
            0xE6, 0xBF, 0x10, 0xBA,
        ]);
        assert_eq!(output, "515");
    }

    #[test]
    fn test_get_prop_default_for_missing() {
        let mut image = object_image();
        // Default for property 4 = 777
        let default4 = 0x0300 + 3 * 2;
        image[default4..default4 + 2].copy_from_slice(&777u16.to_be_bytes());
        let code = &[
            0x11, 0x01, 0x04, 0x10, // get_prop 1 4 -> G00
            0xE6, 0xBF, 0x10, 0xBA,
        ];
        image[0x5000..0x5000 + code.len()].copy_from_slice(code);
        let vm = VM::new(Memory::load(image).unwrap()).unwrap();
        let mut device = HeadlessDevice::new();
        let mut interp = Interpreter::new(vm, &mut device);
        interp.run().unwrap();
        assert_eq!(device.output(), "777");
    }

    #[test]
    fn test_get_prop_addr_and_len() {
        // get_prop_addr 1 12 -> G00; get_prop_len G00 -> G01
        let (output, vm) = run_objects(&[
            0x12, 0x01, 0x0C, 0x10, // get_prop_addr 1 12 -> G00
            0xA4, 0x10, 0x11, // get_prop_len G00 -> G01
            0xE6, 0xBF, 0x11, 0xBA,
        ]);
        assert_eq!(output, "2");
        assert_eq!(vm.read_global(0x10).unwrap(), 0x0602);
    }

    #[test]
    fn test_get_next_prop_walk() {
        // get_next_prop 1 0 -> G00 (first property = 12)
        let (output, _) = run_objects(&[
            0x13, 0x01, 0x00, 0x10, // get_next_prop 1 0 -> G00
            0xE6, 0xBF, 0x10, 0xBA,
        ]);
        assert_eq!(output, "12");
    }
}
