//! Object table navigation: attributes, the parent/sibling/child tree,
//! and the per-object property lists.
//!
//! v1-3 entries are 9 bytes (4 attribute bytes, byte-sized tree links);
//! v4+ entries are 14 bytes (6 attribute bytes, word-sized links). The
//! property-default table sits immediately before the entry array.

use crate::text;
use crate::vm::VM;
use log::{debug, error};

/// Parsed property header: number, data size, and header length in bytes.
pub struct PropInfo {
    pub number: u8,
    pub size: usize,
    pub header_len: usize,
}

impl VM {
    fn max_objects(&self) -> u16 {
        if self.header.version <= 3 {
            255
        } else {
            u16::MAX
        }
    }

    fn default_prop_count(&self) -> u32 {
        if self.header.version <= 3 {
            31
        } else {
            63
        }
    }

    fn object_entry_size(&self) -> u32 {
        if self.header.version <= 3 {
            9
        } else {
            14
        }
    }

    pub fn max_attribute(&self) -> u8 {
        if self.header.version <= 3 {
            31
        } else {
            47
        }
    }

    /// Byte address of an object's entry in the table.
    pub fn object_addr(&self, obj: u16) -> Result<u32, String> {
        if obj == 0 || obj > self.max_objects() {
            return Err(format!("Invalid object number: {obj} at pc {:04x}", self.pc));
        }
        let tree_base = self.header.object_table as u32 + self.default_prop_count() * 2;
        Ok(tree_base + (obj as u32 - 1) * self.object_entry_size())
    }

    pub fn get_parent(&self, obj: u16) -> Result<u16, String> {
        if obj == 0 {
            return Ok(0);
        }
        let addr = self.object_addr(obj)?;
        if self.header.version <= 3 {
            Ok(self.memory.read_byte(addr + 4) as u16)
        } else {
            Ok(self.memory.read_word(addr + 6))
        }
    }

    pub fn set_parent(&mut self, obj: u16, parent: u16) -> Result<(), String> {
        let addr = self.object_addr(obj)?;
        if self.header.version <= 3 {
            self.memory.write_byte(addr + 4, parent as u8)
        } else {
            self.memory.write_word(addr + 6, parent)
        }
    }

    pub fn get_sibling(&self, obj: u16) -> Result<u16, String> {
        if obj == 0 {
            return Ok(0);
        }
        let addr = self.object_addr(obj)?;
        if self.header.version <= 3 {
            Ok(self.memory.read_byte(addr + 5) as u16)
        } else {
            Ok(self.memory.read_word(addr + 8))
        }
    }

    pub fn set_sibling(&mut self, obj: u16, sibling: u16) -> Result<(), String> {
        let addr = self.object_addr(obj)?;
        if self.header.version <= 3 {
            self.memory.write_byte(addr + 5, sibling as u8)
        } else {
            self.memory.write_word(addr + 8, sibling)
        }
    }

    pub fn get_child(&self, obj: u16) -> Result<u16, String> {
        if obj == 0 {
            return Ok(0);
        }
        let addr = self.object_addr(obj)?;
        if self.header.version <= 3 {
            Ok(self.memory.read_byte(addr + 6) as u16)
        } else {
            Ok(self.memory.read_word(addr + 10))
        }
    }

    pub fn set_child(&mut self, obj: u16, child: u16) -> Result<(), String> {
        let addr = self.object_addr(obj)?;
        if self.header.version <= 3 {
            self.memory.write_byte(addr + 6, child as u8)
        } else {
            self.memory.write_word(addr + 10, child)
        }
    }

    /// Attribute `attr` lives at bit `7 - attr % 8` of byte `attr / 8` of
    /// the entry's attribute region. Out-of-range attributes are logged
    /// and read as false.
    pub fn test_attribute(&self, obj: u16, attr: u16) -> Result<bool, String> {
        if obj == 0 {
            return Ok(false);
        }
        if attr > self.max_attribute() as u16 {
            error!("test_attr with invalid attribute {attr} at pc {:04x}", self.pc);
            return Ok(false);
        }
        let addr = self.object_addr(obj)? + attr as u32 / 8;
        let bit = 7 - (attr % 8) as u8;
        Ok(self.memory.read_byte(addr) & (1 << bit) != 0)
    }

    /// Set or clear an attribute bit. Invalid numbers are logged and the
    /// operation is skipped.
    pub fn set_attribute(&mut self, obj: u16, attr: u16, value: bool) -> Result<(), String> {
        if obj == 0 {
            return Ok(());
        }
        if attr > self.max_attribute() as u16 {
            error!(
                "{} with invalid attribute {attr} at pc {:04x}",
                if value { "set_attr" } else { "clear_attr" },
                self.pc
            );
            return Ok(());
        }
        let addr = self.object_addr(obj)? + attr as u32 / 8;
        let bit = 7 - (attr % 8) as u8;
        let byte = self.memory.read_byte(addr);
        let byte = if value {
            byte | (1 << bit)
        } else {
            byte & !(1 << bit)
        };
        self.memory.write_byte(addr, byte)
    }

    /// Detach an object from its parent's child chain and clear its
    /// parent and sibling links. No-op when the object is 0 or already
    /// parentless.
    pub fn remove_object(&mut self, obj: u16) -> Result<(), String> {
        if obj == 0 {
            return Ok(());
        }
        let parent = self.get_parent(obj)?;
        if parent == 0 {
            return Ok(());
        }

        let first_child = self.get_child(parent)?;
        if first_child == obj {
            let next = self.get_sibling(obj)?;
            self.set_child(parent, next)?;
        } else {
            let mut current = first_child;
            while current != 0 {
                let next = self.get_sibling(current)?;
                if next == obj {
                    let after = self.get_sibling(obj)?;
                    self.set_sibling(current, after)?;
                    break;
                }
                current = next;
            }
        }

        self.set_parent(obj, 0)?;
        self.set_sibling(obj, 0)
    }

    /// Make `obj` the first child of `dest`: detach it, chain the old
    /// first child behind it, and reparent.
    pub fn insert_object(&mut self, obj: u16, dest: u16) -> Result<(), String> {
        if obj == 0 || dest == 0 {
            error!(
                "insert_obj with object {obj} into {dest} at pc {:04x}",
                self.pc
            );
            return Ok(());
        }
        self.remove_object(obj)?;

        let old_child = self.get_child(dest)?;
        if old_child == obj {
            // Already the first child; only the parent link may be stale.
            return self.set_parent(obj, dest);
        }
        self.set_child(dest, obj)?;
        self.set_parent(obj, dest)?;
        self.set_sibling(obj, old_child)
    }

    /// Address of the object's property table.
    pub fn prop_table_addr(&self, obj: u16) -> Result<u32, String> {
        let addr = self.object_addr(obj)?;
        let offset = if self.header.version <= 3 { 7 } else { 12 };
        Ok(self.memory.read_word(addr + offset) as u32)
    }

    /// The object's short name, decoded from the length-prefixed z-string
    /// at the head of its property table.
    pub fn object_name(&self, obj: u16) -> Result<String, String> {
        let table = self.prop_table_addr(obj)?;
        if !self.memory.contains(table) {
            return Err(format!("Property table of object {obj} out of bounds"));
        }
        let name_words = self.memory.read_byte(table) as usize;
        if name_words == 0 {
            return Ok(String::new());
        }
        let (name, _) = text::decode_string(
            self.memory.bytes(),
            table as usize + 1,
            self.header.abbrev_table as usize,
        )?;
        Ok(name)
    }

    /// Parse the property header at `addr`. Returns None at the
    /// terminating zero size byte.
    pub fn prop_info_at(&self, addr: u32) -> Option<PropInfo> {
        let size_byte = self.memory.read_byte(addr);
        if size_byte == 0 {
            return None;
        }
        if self.header.version <= 3 {
            Some(PropInfo {
                number: size_byte & 0x1F,
                size: ((size_byte >> 5) & 0x07) as usize + 1,
                header_len: 1,
            })
        } else if size_byte & 0x80 != 0 {
            let second = self.memory.read_byte(addr + 1) & 0x3F;
            Some(PropInfo {
                number: size_byte & 0x3F,
                size: if second == 0 { 64 } else { second as usize },
                header_len: 2,
            })
        } else {
            Some(PropInfo {
                number: size_byte & 0x3F,
                size: if size_byte & 0x40 != 0 { 2 } else { 1 },
                header_len: 1,
            })
        }
    }

    /// Address of the first property header of an object.
    fn first_prop_addr(&self, obj: u16) -> Result<u32, String> {
        let table = self.prop_table_addr(obj)?;
        let name_words = self.memory.read_byte(table) as u32;
        Ok(table + 1 + name_words * 2)
    }

    /// Walk the property list for `prop`. Returns the address of the
    /// property's data and its size, or None when absent.
    pub fn find_prop(&self, obj: u16, prop: u8) -> Result<Option<(u32, usize)>, String> {
        let mut addr = self.first_prop_addr(obj)?;
        while let Some(info) = self.prop_info_at(addr) {
            if info.number == prop {
                return Ok(Some((addr + info.header_len as u32, info.size)));
            }
            // Numbers are descending, so passing the target means absent.
            if info.number < prop {
                return Ok(None);
            }
            addr += (info.header_len + info.size) as u32;
        }
        Ok(None)
    }

    /// get_prop: 1-byte properties read as a byte, 2-byte as a word;
    /// absent properties fall back to the default table.
    pub fn get_property(&self, obj: u16, prop: u8) -> Result<u16, String> {
        if obj == 0 {
            return Ok(0);
        }
        match self.find_prop(obj, prop)? {
            Some((addr, 1)) => Ok(self.memory.read_byte(addr) as u16),
            Some((addr, 2)) => Ok(self.memory.read_word(addr)),
            Some((_, size)) => Err(format!(
                "get_prop on property {prop} of object {obj} with size {size}"
            )),
            None => Ok(self.property_default(prop)),
        }
    }

    /// Entry from the property-default table (the words just before the
    /// object-entry array).
    pub fn property_default(&self, prop: u8) -> u16 {
        if prop == 0 || prop as u32 > self.default_prop_count() {
            return 0;
        }
        self.memory
            .read_word(self.header.object_table as u32 + (prop as u32 - 1) * 2)
    }

    /// get_prop_addr: address of the property data, or 0 when absent.
    pub fn get_property_addr(&self, obj: u16, prop: u8) -> Result<u16, String> {
        if obj == 0 {
            return Ok(0);
        }
        Ok(self
            .find_prop(obj, prop)?
            .map(|(addr, _)| addr as u16)
            .unwrap_or(0))
    }

    /// get_prop_len: size of the property whose data starts at `addr`.
    /// By convention get_prop_len(0) is 0.
    pub fn get_property_len(&self, data_addr: u16) -> u16 {
        if data_addr == 0 {
            return 0;
        }
        let size_byte = self.memory.read_byte(data_addr as u32 - 1);
        if self.header.version <= 3 {
            ((size_byte >> 5) & 0x07) as u16 + 1
        } else if size_byte & 0x80 != 0 {
            // Second byte of a two-byte header
            let size = size_byte & 0x3F;
            if size == 0 {
                64
            } else {
                size as u16
            }
        } else if size_byte & 0x40 != 0 {
            2
        } else {
            1
        }
    }

    /// get_next_prop: the number of the property after `prop`, or the
    /// first property when `prop` is 0, or 0 at the end of the list.
    pub fn get_next_property(&self, obj: u16, prop: u8) -> Result<u8, String> {
        if obj == 0 {
            return Ok(0);
        }
        let mut addr = self.first_prop_addr(obj)?;
        if prop == 0 {
            return Ok(self.prop_info_at(addr).map(|i| i.number).unwrap_or(0));
        }
        while let Some(info) = self.prop_info_at(addr) {
            addr += (info.header_len + info.size) as u32;
            if info.number == prop {
                return Ok(self.prop_info_at(addr).map(|i| i.number).unwrap_or(0));
            }
        }
        debug!("get_next_prop: object {obj} has no property {prop}");
        Ok(0)
    }

    /// put_prop: write a 1- or 2-byte property. The property must exist
    /// with a matching size; anything else is an error.
    pub fn put_property(&mut self, obj: u16, prop: u8, value: u16) -> Result<(), String> {
        match self.find_prop(obj, prop)? {
            Some((addr, 1)) => self.memory.write_byte(addr, value as u8),
            Some((addr, 2)) => self.memory.write_word(addr, value),
            Some((_, size)) => Err(format!(
                "put_prop on property {prop} of object {obj} with size {size}"
            )),
            None => Err(format!("put_prop: object {obj} has no property {prop}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::memory::Memory;
    use crate::test_support::{minimal_image, pack_zchars};
    use crate::vm::VM;

    const OBJ_TABLE: usize = 0x0300;
    const TREE_BASE: usize = OBJ_TABLE + 31 * 2;

    /// Three v3 objects: 1 is a room containing 3; 2 is detached.
    /// Object 1 carries properties 10 (word) and 5 (byte).
    fn object_vm() -> VM {
        let mut image = minimal_image(3);

        // Default for property 7
        let default7 = OBJ_TABLE + 6 * 2;
        image[default7] = 0x12;
        image[default7 + 1] = 0x34;

        let entry = |n: usize| TREE_BASE + (n - 1) * 9;

        // obj1: child = 3, property table at 0x0600
        image[entry(1) + 6] = 3;
        image[entry(1) + 7] = 0x06;
        image[entry(1) + 8] = 0x00;
        // obj2: detached, property table at 0x0640
        image[entry(2) + 7] = 0x06;
        image[entry(2) + 8] = 0x40;
        // obj3: parent = 1, property table at 0x0680
        image[entry(3) + 4] = 1;
        image[entry(3) + 7] = 0x06;
        image[entry(3) + 8] = 0x80;

        // Property table for obj1: name "box", prop 10 = 0xBEEF,
        // prop 5 = 0x42, terminator.
        let name = pack_zchars(&[7, 20, 29]); // b o x
        let mut p = 0x0600;
        image[p] = 1;
        image[p + 1..p + 3].copy_from_slice(&name);
        p += 3;
        image[p] = (1 << 5) | 10; // size 2, number 10
        image[p + 1] = 0xBE;
        image[p + 2] = 0xEF;
        p += 3;
        image[p] = 5; // size 1, number 5
        image[p + 1] = 0x42;
        image[p + 2] = 0;

        // Empty-name tables for obj2/obj3
        image[0x0640] = 0;
        image[0x0680] = 0;

        VM::new(Memory::load(image).unwrap()).unwrap()
    }

    #[test]
    fn test_entry_addresses() {
        let vm = object_vm();
        assert_eq!(vm.object_addr(1).unwrap(), TREE_BASE as u32);
        assert_eq!(vm.object_addr(2).unwrap(), TREE_BASE as u32 + 9);
        assert!(vm.object_addr(0).is_err());
    }

    #[test]
    fn test_tree_links() {
        let vm = object_vm();
        assert_eq!(vm.get_child(1).unwrap(), 3);
        assert_eq!(vm.get_parent(3).unwrap(), 1);
        assert_eq!(vm.get_sibling(3).unwrap(), 0);
    }

    #[test]
    fn test_attribute_round_trip() {
        let mut vm = object_vm();
        vm.set_attribute(2, 3, true).unwrap();
        assert!(vm.test_attribute(2, 3).unwrap());
        vm.set_attribute(2, 3, false).unwrap();
        assert!(!vm.test_attribute(2, 3).unwrap());
    }

    #[test]
    fn test_attribute_crosses_byte_boundary() {
        let mut vm = object_vm();
        // Attribute 15 is bit 0 of attribute byte 1
        vm.set_attribute(2, 15, true).unwrap();
        let addr = vm.object_addr(2).unwrap();
        assert_eq!(vm.memory.read_byte(addr), 0x00);
        assert_eq!(vm.memory.read_byte(addr + 1), 0x01);
        assert!(vm.test_attribute(2, 15).unwrap());
    }

    #[test]
    fn test_invalid_attribute_is_skipped() {
        let mut vm = object_vm();
        vm.set_attribute(2, 40, true).unwrap();
        assert!(!vm.test_attribute(2, 40).unwrap());
    }

    #[test]
    fn test_insert_makes_first_child() {
        let mut vm = object_vm();
        vm.insert_object(2, 1).unwrap();
        assert_eq!(vm.get_child(1).unwrap(), 2);
        assert_eq!(vm.get_sibling(2).unwrap(), 3);
        assert_eq!(vm.get_parent(2).unwrap(), 1);
        // Former first child is untouched
        assert_eq!(vm.get_parent(3).unwrap(), 1);
        assert_eq!(vm.get_sibling(3).unwrap(), 0);
    }

    #[test]
    fn test_remove_detaches_and_clears() {
        let mut vm = object_vm();
        vm.insert_object(2, 1).unwrap();
        vm.remove_object(2).unwrap();
        assert_eq!(vm.get_child(1).unwrap(), 3);
        assert_eq!(vm.get_parent(2).unwrap(), 0);
        assert_eq!(vm.get_sibling(2).unwrap(), 0);
        // Removing an orphan is a no-op
        vm.remove_object(2).unwrap();
    }

    #[test]
    fn test_remove_middle_sibling() {
        let mut vm = object_vm();
        vm.insert_object(2, 1).unwrap(); // chain: 2 -> 3
        vm.remove_object(3).unwrap();
        assert_eq!(vm.get_child(1).unwrap(), 2);
        assert_eq!(vm.get_sibling(2).unwrap(), 0);
    }

    #[test]
    fn test_reinsert_first_child_does_not_self_link() {
        let mut vm = object_vm();
        vm.insert_object(3, 1).unwrap();
        assert_eq!(vm.get_child(1).unwrap(), 3);
        assert_ne!(vm.get_sibling(3).unwrap(), 3);
    }

    #[test]
    fn test_object_name() {
        let vm = object_vm();
        assert_eq!(vm.object_name(1).unwrap(), "box");
        assert_eq!(vm.object_name(2).unwrap(), "");
    }

    #[test]
    fn test_get_property() {
        let vm = object_vm();
        assert_eq!(vm.get_property(1, 10).unwrap(), 0xBEEF);
        assert_eq!(vm.get_property(1, 5).unwrap(), 0x42);
    }

    #[test]
    fn test_missing_property_uses_default() {
        let vm = object_vm();
        assert_eq!(vm.get_property(1, 7).unwrap(), 0x1234);
        assert_eq!(vm.get_property(1, 3).unwrap(), 0);
    }

    #[test]
    fn test_prop_addr_and_len() {
        let vm = object_vm();
        let addr = vm.get_property_addr(1, 10).unwrap();
        assert_ne!(addr, 0);
        assert_eq!(vm.get_property_len(addr), 2);
        let addr5 = vm.get_property_addr(1, 5).unwrap();
        assert_eq!(vm.get_property_len(addr5), 1);
        assert_eq!(vm.get_property_addr(1, 9).unwrap(), 0);
        assert_eq!(vm.get_property_len(0), 0);
    }

    #[test]
    fn test_next_property_walks_descending() {
        let vm = object_vm();
        assert_eq!(vm.get_next_property(1, 0).unwrap(), 10);
        assert_eq!(vm.get_next_property(1, 10).unwrap(), 5);
        assert_eq!(vm.get_next_property(1, 5).unwrap(), 0);
    }

    #[test]
    fn test_put_property_round_trip() {
        let mut vm = object_vm();
        vm.put_property(1, 5, 0x17FF).unwrap();
        // Truncated to the 1-byte property size
        assert_eq!(vm.get_property(1, 5).unwrap(), 0xFF);
        vm.put_property(1, 10, 0xCAFE).unwrap();
        assert_eq!(vm.get_property(1, 10).unwrap(), 0xCAFE);
    }

    #[test]
    fn test_put_missing_property_is_an_error() {
        let mut vm = object_vm();
        assert!(vm.put_property(1, 9, 1).is_err());
    }
}
