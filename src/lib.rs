#![crate_name = "lantern"]

#[macro_use]
extern crate lazy_static;

pub mod device;
pub mod dictionary;
pub mod disassembler;
pub mod header;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod opcode_tables;
pub mod opcodes_display;
pub mod opcodes_flow;
pub mod opcodes_input;
pub mod opcodes_math;
pub mod opcodes_memory;
pub mod opcodes_object;
pub mod terminal;
pub mod text;
pub mod vm;
pub mod zobject;
pub mod zrand;

#[cfg(test)]
pub mod test_support;

/*
Memory map of the synthetic images the test suites build
(test_support::minimal_image and tests/common):
Dynamic 00000  header
        00040  abbreviation table
        00100  global variables
        00300  property defaults, then object entries
        00800  dictionary
Static  00d00  start of read-only tables
High    01000  high-memory base
        05000  code assembled by each test
*/
