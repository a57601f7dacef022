use bitreader::BitReader;
use log::{debug, trace};
use std::collections::HashMap;

/// There are three possible alphabets: lower case, upper case, and
/// number/symbol.
///
///| Alphabet |   Z-char offset            |
///|----------|----------------------------|
///|          | 6789abcdef0123456789abcdef |
///|  A0      | abcdefghijklmnopqrstuvwxyz |
///|  A1      | ABCDEFGHIJKLMNOPQRSTUVWXYZ |
///|  A2      |  ^0123456789.,!?_#'"/\-:() |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alphabet {
    A0,
    A1,
    A2,
}

lazy_static! {
    pub static ref ALPHABETS: HashMap<Alphabet, &'static [u8]> = {
        let mut m: HashMap<Alphabet, &'static [u8]> = HashMap::new();
        m.insert(Alphabet::A0, b"abcdefghijklmnopqrstuvwxyz");
        m.insert(Alphabet::A1, b"ABCDEFGHIJKLMNOPQRSTUVWXYZ");
        // Positions 0 and 1 are the ZSCII escape and newline; both are
        // handled before the table lookup.
        m.insert(Alphabet::A2, b" \n0123456789.,!?_#'\"/\\-:()");
        m
    };
}

/// Guard against decoding runaway strings from corrupt tables. Real
/// story strings stay well under this.
const MAX_ZCHARS: usize = 12_000;

/// Three 5-bit z-characters unpacked from one 16-bit word, plus the
/// end-of-string flag carried in the word's top bit.
#[derive(Debug, Clone, Copy)]
pub struct ZWord {
    pub last: bool,
    pub chars: [u8; 3],
}

/// Unpack one big-endian z-word.
pub fn read_zchars(word: &[u8; 2]) -> Result<ZWord, String> {
    let mut br = BitReader::new(word);
    let mut zw = ZWord {
        last: br.read_u8(1).map_err(|e| e.to_string())? == 1,
        chars: [0; 3],
    };
    for c in zw.chars.iter_mut() {
        *c = br.read_u8(5).map_err(|e| e.to_string())?;
    }
    Ok(zw)
}

/// Look up a plain z-character (6..=31) in an alphabet.
fn lookup_char(zc: u8, alphabet: Alphabet) -> char {
    ALPHABETS[&alphabet][(zc - 6) as usize] as char
}

/// Decode a Z-string from memory starting at the given byte address.
/// Returns the decoded string and the number of bytes consumed.
pub fn decode_string(
    memory: &[u8],
    addr: usize,
    abbrev_table_addr: usize,
) -> Result<(String, usize), String> {
    decode_inner(memory, addr, abbrev_table_addr, true)
}

fn decode_inner(
    memory: &[u8],
    addr: usize,
    abbrev_table_addr: usize,
    allow_abbrev: bool,
) -> Result<(String, usize), String> {
    let mut offset = addr;
    let mut zchars = Vec::new();
    let mut saw_end = false;

    while !saw_end && zchars.len() < MAX_ZCHARS {
        if offset + 1 >= memory.len() {
            return Err(format!("Z-string at {addr:04x} runs past end of memory"));
        }
        let word = [memory[offset], memory[offset + 1]];
        offset += 2;
        let zw = read_zchars(&word)?;
        saw_end = zw.last;
        trace!("z-word {:02x}{:02x} -> {:?}", word[0], word[1], zw.chars);
        zchars.extend_from_slice(&zw.chars);
    }
    if !saw_end {
        return Err(format!("Z-string at {addr:04x} never terminates"));
    }

    let mut result = String::new();
    let mut alphabet = Alphabet::A0;
    // One-shot shift: the alphabet to return to after the next character.
    let mut shift_return: Option<Alphabet> = None;

    let mut i = 0;
    while i < zchars.len() {
        let zc = zchars[i];
        i += 1;
        match zc {
            0 => result.push(' '),
            1..=3 => {
                if i >= zchars.len() {
                    break;
                }
                let index = zchars[i];
                i += 1;
                if !allow_abbrev {
                    debug!("Nested abbreviation z-char {zc} ignored");
                    continue;
                }
                let number = 32 * (zc as usize - 1) + index as usize;
                let entry = abbrev_table_addr + number * 2;
                if entry + 1 >= memory.len() {
                    debug!("Abbreviation {number} entry out of bounds");
                    continue;
                }
                let packed = ((memory[entry] as usize) << 8) | memory[entry + 1] as usize;
                let byte_addr = packed * 2;
                if byte_addr == 0 || byte_addr + 1 >= memory.len() {
                    debug!("Abbreviation {number} points at invalid address {byte_addr:04x}");
                    continue;
                }
                let (expansion, _) = decode_inner(memory, byte_addr, abbrev_table_addr, false)?;
                result.push_str(&expansion);
            }
            4 => {
                shift_return = Some(alphabet);
                alphabet = Alphabet::A1;
            }
            5 => {
                shift_return = Some(alphabet);
                alphabet = Alphabet::A2;
            }
            6 if alphabet == Alphabet::A2 => {
                // 10-bit ZSCII escape: next two z-chars are the high and
                // low halves.
                if i + 1 < zchars.len() {
                    let code = ((zchars[i] as u16) << 5) | zchars[i + 1] as u16;
                    i += 2;
                    match char::from_u32(code as u32) {
                        Some(ch) => result.push(ch),
                        None => debug!("Unprintable ZSCII escape code {code}"),
                    }
                } else {
                    debug!("ZSCII escape truncated at end of string");
                }
                if let Some(prev) = shift_return.take() {
                    alphabet = prev;
                }
            }
            6..=31 => {
                result.push(lookup_char(zc, alphabet));
                if let Some(prev) = shift_return.take() {
                    alphabet = prev;
                }
            }
            _ => unreachable!(),
        }
    }

    Ok((result, offset - addr))
}

/// Decode a string at a packed address (for print_paddr).
pub fn decode_string_at_packed_addr(
    memory: &[u8],
    packed_addr: u16,
    multiplier: u32,
    abbrev_table_addr: usize,
) -> Result<String, String> {
    let byte_addr = packed_addr as usize * multiplier as usize;
    let (string, _) = decode_string(memory, byte_addr, abbrev_table_addr)?;
    Ok(string)
}

/// Number of z-characters in an encoded dictionary word.
pub fn dictionary_zchar_count(version: u8) -> usize {
    if version <= 3 {
        6
    } else {
        9
    }
}

/// Z-characters for one input character, including any shift prefix.
/// Characters outside all three alphabets become a 10-bit ZSCII escape.
fn zchars_for_char(ch: char) -> Vec<u8> {
    let b = ch as u32;
    if let Some(pos) = ALPHABETS[&Alphabet::A0].iter().position(|&a| a as u32 == b) {
        return vec![pos as u8 + 6];
    }
    if let Some(pos) = ALPHABETS[&Alphabet::A1].iter().position(|&a| a as u32 == b) {
        return vec![4, pos as u8 + 6];
    }
    if let Some(pos) = ALPHABETS[&Alphabet::A2][2..]
        .iter()
        .position(|&a| a as u32 == b)
    {
        return vec![5, pos as u8 + 8];
    }
    let code = (b & 0x3FF) as u16;
    vec![5, 6, (code >> 5) as u8 & 0x1F, code as u8 & 0x1F]
}

/// Encode one lowercased word for dictionary lookup: exactly 6 z-chars in
/// two words (v3) or 9 in three (v4+), padded with z-char 5, high bit set
/// on the final word.
pub fn encode_word(word: &str, version: u8) -> Vec<u16> {
    let target = dictionary_zchar_count(version);
    let mut zchars = Vec::with_capacity(target);
    for ch in word.chars() {
        if zchars.len() >= target {
            break;
        }
        zchars.extend(zchars_for_char(ch.to_ascii_lowercase()));
    }
    zchars.truncate(target);
    while zchars.len() < target {
        zchars.push(5);
    }

    let mut words: Vec<u16> = zchars
        .chunks(3)
        .map(|c| ((c[0] as u16) << 10) | ((c[1] as u16) << 5) | c[2] as u16)
        .collect();
    if let Some(last) = words.last_mut() {
        *last |= 0x8000;
    }
    words
}
