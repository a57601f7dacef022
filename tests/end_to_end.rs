//! Whole-machine tests: hand-assembled story files run through the
//! interpreter against a scripted headless device.

mod common;

use common::{install_dictionary, minimal_image, pack_zchars, zchars};
use lantern::device::HeadlessDevice;
use lantern::interpreter::Interpreter;
use lantern::memory::Memory;
use lantern::vm::VM;
use test_log::test;

fn run_image(image: Vec<u8>, lines: &[&str]) -> (String, Vec<(String, String)>) {
    let vm = VM::new(Memory::load(image).unwrap()).unwrap();
    let mut device = HeadlessDevice::new();
    for line in lines {
        device.push_line(line);
    }
    {
        let mut interp = Interpreter::new(vm, &mut device);
        interp.run().unwrap();
    }
    (device.output().to_string(), device.statuses().to_vec())
}

#[test]
fn greet_read_and_count_tokens() {
    let mut image = minimal_image(3);
    install_dictionary(&mut image, 0x0800, 3, &[b','], 7, &["look", "north"]);
    image[0x0200] = 40; // text buffer
    image[0x0280] = 10; // parse buffer

    let mut code = vec![0xB2]; // print "hi"
    code.extend_from_slice(&pack_zchars(&zchars("hi")));
    code.extend_from_slice(&[
        0xBB, // new_line
        0xE4, 0x0F, 0x02, 0x00, 0x02, 0x80, // sread text parse
        0xD0, 0x1F, 0x02, 0x80, 0x01, 0x10, // loadb #0280 1 -> G00 (token count)
        0xE6, 0xBF, 0x10, // print_num G00
        0xBA, // quit
    ]);
    image[0x5000..0x5000 + code.len()].copy_from_slice(&code);

    let (output, statuses) = run_image(image, &["look north"]);
    assert_eq!(output, "hi\n2");
    // v3 redraws the status line before reading
    assert_eq!(statuses.len(), 1);
}

#[test]
fn recursive_factorial_through_the_call_stack() {
    // fact(n): if n == 0 return 1 else return fact(n-1) * n
    let mut image = minimal_image(3);
    let main: &[u8] = &[
        0xE0, 0x1F, 0x28, 0x80, 0x05, 0x00, // call fact #05 -> stack
        0xE6, 0xBF, 0x00, // print_num stack
        0xBA,
    ];
    image[0x5000..0x5000 + main.len()].copy_from_slice(main);
    let fact: &[u8] = &[
        0x01, 0x00, 0x00, // 1 local, initial 0
        0x41, 0x01, 0x00, 0xC1, // je L01 #00 ?rtrue
        0x55, 0x01, 0x01, 0x00, // sub L01 #01 -> stack
        0xE0, 0x2F, 0x28, 0x80, 0x00, 0x00, // call fact stack -> stack
        0x76, 0x00, 0x01, 0x00, // mul stack L01 -> stack
        0xAB, 0x00, // ret stack
    ];
    image[0x5100..0x5100 + fact.len()].copy_from_slice(fact);

    let (output, _) = run_image(image, &[]);
    assert_eq!(output, "120");
}

#[test]
fn print_paddr_with_abbreviation() {
    let mut image = minimal_image(3);
    // Abbreviation 0 -> "the " stored at 0x0060 (packed 0x30)
    image[0x0040..0x0042].copy_from_slice(&0x0030u16.to_be_bytes());
    let the_bytes = pack_zchars(&zchars("the "));
    image[0x0060..0x0060 + the_bytes.len()].copy_from_slice(&the_bytes);
    // Main string at 0x0A00 (packed 0x0500): abbrev(1,0) then "lamp"
    let mut zs = vec![1, 0];
    zs.extend_from_slice(&zchars("lamp"));
    let s = pack_zchars(&zs);
    image[0x0A00..0x0A00 + s.len()].copy_from_slice(&s);

    let code: &[u8] = &[
        0x8D, 0x05, 0x00, // print_paddr #0500
        0xBB, 0xBA,
    ];
    image[0x5000..0x5000 + code.len()].copy_from_slice(code);

    let (output, _) = run_image(image, &[]);
    assert_eq!(output, "the lamp\n");
}

#[test]
fn end_of_input_quits_cleanly() {
    let mut image = minimal_image(3);
    install_dictionary(&mut image, 0x0800, 3, &[], 7, &["look"]);
    image[0x0200] = 40;
    image[0x0280] = 10;
    // An input loop that would run forever if input never dried up
    let code: &[u8] = &[
        0xE4, 0x0F, 0x02, 0x00, 0x02, 0x80, // sread
        0x8C, 0xFF, 0xF9, // jump -7 (back to the sread)
    ];
    image[0x5000..0x5000 + code.len()].copy_from_slice(code);

    // Two commands, then EOF
    let (output, _) = run_image(image, &["look", "look"]);
    assert_eq!(output, "");
}

#[test]
fn v5_read_char_and_packed_addresses() {
    let mut image = minimal_image(5);
    // String "ok" at 0x0A00 = packed 0x0280 (v5 multiplies by 4)
    let s = pack_zchars(&zchars("ok"));
    image[0x0A00..0x0A00 + s.len()].copy_from_slice(&s);
    let code: &[u8] = &[
        0xF6, 0x7F, 0x01, 0x10, // read_char 1 -> G00
        0xE5, 0xBF, 0x10, // print_char G00
        0x8D, 0x02, 0x80, // print_paddr #0280
        0xBB, 0xBA,
    ];
    image[0x5000..0x5000 + code.len()].copy_from_slice(code);

    let vm = VM::new(Memory::load(image).unwrap()).unwrap();
    let mut device = HeadlessDevice::new();
    device.push_key(b'!' as u16);
    {
        let mut interp = Interpreter::new(vm, &mut device);
        interp.run().unwrap();
    }
    assert_eq!(device.output(), "!ok\n");
}

#[test]
fn reserved_save_opcode_runs_without_crashing() {
    let mut image = minimal_image(3);
    let code: &[u8] = &[
        0xB5, 0x45, // save ?~+5  (failure path branches)
        0xE6, 0x7F, 1, // print_num 1 (skipped)
        0xE6, 0x7F, 0, // print_num 0
        0xBA,
    ];
    image[0x5000..0x5000 + code.len()].copy_from_slice(code);
    let (output, _) = run_image(image, &[]);
    assert_eq!(output, "0");
}
