//! Dispatch tables for the five opcode families.
//!
//! Each table is a sparse array indexed by the family opcode number. A
//! slot holds the descriptors valid for some version range; most slots
//! have one, a few (save, pop/catch, not/call_1n, sread/read) change
//! meaning across versions. The descriptor drives the decoder: whether a
//! store byte, branch bytes, or inline text follow the operands.

use crate::instruction::OpcodeFamily;

#[derive(Debug)]
pub struct OpcodeDesc {
    pub name: &'static str,
    pub store: bool,
    pub branch: bool,
    pub text: bool,
    pub min_version: u8,
    pub max_version: u8,
}

const fn plain(name: &'static str) -> OpcodeDesc {
    OpcodeDesc {
        name,
        store: false,
        branch: false,
        text: false,
        min_version: 1,
        max_version: 8,
    }
}

const fn store(name: &'static str) -> OpcodeDesc {
    OpcodeDesc {
        store: true,
        ..plain(name)
    }
}

const fn branch(name: &'static str) -> OpcodeDesc {
    OpcodeDesc {
        branch: true,
        ..plain(name)
    }
}

const fn versions(desc: OpcodeDesc, min: u8, max: u8) -> OpcodeDesc {
    OpcodeDesc {
        min_version: min,
        max_version: max,
        ..desc
    }
}

const fn text(name: &'static str) -> OpcodeDesc {
    OpcodeDesc {
        text: true,
        ..plain(name)
    }
}

/// 0OP: short form with operand bits 11.
pub static OP0: [&[OpcodeDesc]; 16] = [
    &[plain("rtrue")],
    &[plain("rfalse")],
    &[text("print")],
    &[text("print_ret")],
    &[plain("nop")],
    &[
        versions(branch("save"), 1, 3),
        versions(store("save"), 4, 4),
    ],
    &[
        versions(branch("restore"), 1, 3),
        versions(store("restore"), 4, 4),
    ],
    &[plain("restart")],
    &[plain("ret_popped")],
    &[versions(plain("pop"), 1, 4), versions(store("catch"), 5, 8)],
    &[plain("quit")],
    &[plain("new_line")],
    &[versions(plain("show_status"), 3, 3)],
    &[versions(branch("verify"), 3, 8)],
    // 0x0E is the extended-form marker byte, never dispatched
    &[],
    &[versions(branch("piracy"), 5, 8)],
];

const fn store_branch(name: &'static str) -> OpcodeDesc {
    OpcodeDesc {
        store: true,
        branch: true,
        ..plain(name)
    }
}

/// 1OP: short form with operand bits 00, 01, or 10.
pub static OP1: [&[OpcodeDesc]; 16] = [
    &[branch("jz")],
    &[store_branch("get_sibling")],
    &[store_branch("get_child")],
    &[store("get_parent")],
    &[store("get_prop_len")],
    &[plain("inc")],
    &[plain("dec")],
    &[plain("print_addr")],
    &[versions(store("call_1s"), 4, 8)],
    &[plain("remove_obj")],
    &[plain("print_obj")],
    &[plain("ret")],
    &[plain("jump")],
    &[plain("print_paddr")],
    &[store("load")],
    &[versions(store("not"), 1, 4), versions(plain("call_1n"), 5, 8)],
];

/// 2OP: long form, and the variable form of bytes 0xC0-0xDF.
pub static OP2: [&[OpcodeDesc]; 32] = [
    &[],
    &[branch("je")],
    &[branch("jl")],
    &[branch("jg")],
    &[branch("dec_chk")],
    &[branch("inc_chk")],
    &[branch("jin")],
    &[branch("test")],
    &[store("or")],
    &[store("and")],
    &[branch("test_attr")],
    &[plain("set_attr")],
    &[plain("clear_attr")],
    &[plain("store")],
    &[plain("insert_obj")],
    &[store("loadw")],
    &[store("loadb")],
    &[store("get_prop")],
    &[store("get_prop_addr")],
    &[store("get_next_prop")],
    &[store("add")],
    &[store("sub")],
    &[store("mul")],
    &[store("div")],
    &[store("mod")],
    &[versions(store("call_2s"), 4, 8)],
    &[versions(plain("call_2n"), 5, 8)],
    &[versions(plain("set_colour"), 5, 8)],
    &[versions(plain("throw"), 5, 8)],
    &[],
    &[],
    &[],
];

/// VAR: the low five bits of bytes 0xE0-0xFF.
pub static VAR: [&[OpcodeDesc]; 32] = [
    &[store("call")],
    &[plain("storew")],
    &[plain("storeb")],
    &[plain("put_prop")],
    &[versions(plain("sread"), 1, 4), versions(store("read"), 5, 8)],
    &[plain("print_char")],
    &[plain("print_num")],
    &[store("random")],
    &[plain("push")],
    &[plain("pull")],
    &[versions(plain("split_window"), 3, 8)],
    &[versions(plain("set_window"), 3, 8)],
    &[versions(store("call_vs2"), 4, 8)],
    &[versions(plain("erase_window"), 4, 8)],
    &[versions(plain("erase_line"), 4, 8)],
    &[versions(plain("set_cursor"), 4, 8)],
    &[versions(plain("get_cursor"), 4, 8)],
    &[versions(plain("set_text_style"), 4, 8)],
    &[versions(plain("buffer_mode"), 4, 8)],
    &[versions(plain("output_stream"), 3, 8)],
    &[versions(plain("input_stream"), 3, 8)],
    &[versions(plain("sound_effect"), 3, 8)],
    &[versions(store("read_char"), 4, 8)],
    &[versions(store_branch("scan_table"), 4, 8)],
    &[versions(store("not"), 5, 8)],
    &[versions(plain("call_vn"), 5, 8)],
    &[versions(plain("call_vn2"), 5, 8)],
    &[versions(plain("tokenise"), 5, 8)],
    &[versions(plain("encode_text"), 5, 8)],
    &[versions(plain("copy_table"), 5, 8)],
    &[versions(plain("print_table"), 5, 8)],
    &[versions(branch("check_arg_count"), 5, 8)],
];

/// EXT: the byte after the 0xBE marker (v5+).
pub static EXT: [&[OpcodeDesc]; 32] = [
    &[versions(store("save"), 5, 8)],
    &[versions(store("restore"), 5, 8)],
    &[versions(store("log_shift"), 5, 8)],
    &[versions(store("art_shift"), 5, 8)],
    &[versions(store("set_font"), 5, 8)],
    &[],
    &[],
    &[],
    &[],
    &[versions(store("save_undo"), 5, 8)],
    &[versions(store("restore_undo"), 5, 8)],
    &[versions(plain("print_unicode"), 5, 8)],
    &[versions(store("check_unicode"), 5, 8)],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
];

/// Find the descriptor for a family opcode under a given version.
pub fn lookup(family: OpcodeFamily, number: u8, version: u8) -> Option<&'static OpcodeDesc> {
    let table: &[&[OpcodeDesc]] = match family {
        OpcodeFamily::Op0 => &OP0,
        OpcodeFamily::Op1 => &OP1,
        OpcodeFamily::Op2 => &OP2,
        OpcodeFamily::Var => &VAR,
        OpcodeFamily::Ext => &EXT,
    };
    table
        .get(number as usize)?
        .iter()
        .find(|d| version >= d.min_version && version <= d.max_version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::OpcodeFamily::*;

    #[test]
    fn test_basic_lookup() {
        let add = lookup(Op2, 0x14, 3).unwrap();
        assert_eq!(add.name, "add");
        assert!(add.store);
        assert!(!add.branch);

        let je = lookup(Op2, 0x01, 3).unwrap();
        assert!(je.branch);
    }

    #[test]
    fn test_version_gated_entries() {
        assert!(lookup(Op0, 0x05, 3).unwrap().branch); // save branches in v3
        assert!(lookup(Op0, 0x05, 4).unwrap().store); // ...stores in v4
        assert!(lookup(Op0, 0x05, 5).is_none()); // ...and moves to EXT in v5

        assert_eq!(lookup(Op1, 0x0F, 3).unwrap().name, "not");
        assert_eq!(lookup(Op1, 0x0F, 5).unwrap().name, "call_1n");

        assert_eq!(lookup(Var, 0x04, 3).unwrap().name, "sread");
        assert!(lookup(Var, 0x04, 5).unwrap().store);
    }

    #[test]
    fn test_unknown_opcodes_are_absent() {
        assert!(lookup(Op2, 0x00, 3).is_none());
        assert!(lookup(Ext, 0x1F, 5).is_none());
        assert!(lookup(Var, 0x17, 3).is_none()); // scan_table is v4+
    }

    #[test]
    fn test_inline_text_flags() {
        assert!(lookup(Op0, 0x02, 3).unwrap().text);
        assert!(lookup(Op0, 0x03, 3).unwrap().text);
        assert!(!lookup(Op0, 0x0B, 3).unwrap().text);
    }
}
