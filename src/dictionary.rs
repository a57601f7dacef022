//! Dictionary lookup and the input tokenizer.
//!
//! A dictionary starts with its word-separator list, then the entry size
//! and count, then fixed-size entries holding the encoded word (two words
//! in v3, three in v4+) plus game-defined data bytes. Entries are in
//! ascending encoded order, so lookup is a binary search over the full
//! encoded length; user dictionaries with a negative count are unsorted
//! and searched linearly.

use crate::text;
use crate::vm::VM;
use log::debug;

/// Parsed dictionary header.
pub struct Dictionary {
    pub separators: Vec<u8>,
    pub entry_length: u8,
    /// Negative means "unsorted", per the tokenise convention.
    pub entry_count: i16,
    pub entries_addr: u32,
}

impl VM {
    /// Parse the dictionary header at `addr` (the game dictionary lives
    /// at the header's dictionary address; tokenise may name another).
    pub fn dictionary_at(&self, addr: u32) -> Dictionary {
        let sep_count = self.memory.read_byte(addr) as u32;
        let separators = (0..sep_count)
            .map(|i| self.memory.read_byte(addr + 1 + i))
            .collect();
        let entry_start = addr + 1 + sep_count;
        Dictionary {
            separators,
            entry_length: self.memory.read_byte(entry_start),
            entry_count: self.memory.read_word(entry_start + 1) as i16,
            entries_addr: entry_start + 3,
        }
    }

    /// Encode `word` and search `dict` for it. Returns the entry's byte
    /// address, or 0 when absent.
    pub fn lookup_word(&self, dict: &Dictionary, word: &str) -> u16 {
        let encoded = text::encode_word(word, self.header.version);
        let entry_words = encoded.len() as u32;
        if (dict.entry_length as u32) < entry_words * 2 {
            debug!(
                "Dictionary entries of {} bytes cannot hold {} encoded words",
                dict.entry_length, entry_words
            );
            return 0;
        }

        let read_entry = |index: u32| -> Vec<u16> {
            let addr = dict.entries_addr + index * dict.entry_length as u32;
            (0..entry_words)
                .map(|w| self.memory.read_word(addr + w * 2))
                .collect()
        };

        if dict.entry_count < 0 {
            // Unsorted user dictionary: linear scan
            let count = dict.entry_count.unsigned_abs() as u32;
            for i in 0..count {
                if read_entry(i) == encoded {
                    return (dict.entries_addr + i * dict.entry_length as u32) as u16;
                }
            }
            return 0;
        }

        let mut low = 0i32;
        let mut high = dict.entry_count as i32 - 1;
        while low <= high {
            let mid = (low + high) / 2;
            let entry = read_entry(mid as u32);
            match encoded.cmp(&entry) {
                std::cmp::Ordering::Less => high = mid - 1,
                std::cmp::Ordering::Greater => low = mid + 1,
                std::cmp::Ordering::Equal => {
                    return (dict.entries_addr + mid as u32 * dict.entry_length as u32) as u16;
                }
            }
        }
        debug!("Dictionary: '{word}' not found");
        0
    }

    /// Read the typed line back out of the text buffer in version format.
    fn text_buffer_contents(&self, text_buffer: u32) -> (String, u32) {
        if self.header.version >= 5 {
            let len = self.memory.read_byte(text_buffer + 1) as u32;
            let text = (0..len)
                .map(|i| self.memory.read_byte(text_buffer + 2 + i) as char)
                .collect();
            (text, 2)
        } else {
            let max = self.memory.read_byte(text_buffer) as u32;
            let mut text = String::new();
            for i in 0..max {
                let b = self.memory.read_byte(text_buffer + 1 + i);
                if b == 0 {
                    break;
                }
                text.push(b as char);
            }
            (text, 1)
        }
    }

    /// Split the text buffer into tokens and fill the parse buffer with
    /// four-byte records: dictionary address (0 when unknown), token
    /// length, and the token's byte offset within the text buffer.
    ///
    /// Spaces separate tokens; the dictionary's separator characters both
    /// terminate the current token and stand as one-character tokens of
    /// their own. With `skip_unknown` (tokenise flag), records for
    /// unknown words are left untouched rather than zeroed.
    pub fn tokenize_buffer(
        &mut self,
        text_buffer: u32,
        parse_buffer: u32,
        dict_addr: u32,
        skip_unknown: bool,
    ) -> Result<(), String> {
        let dict = self.dictionary_at(dict_addr);
        let (text, text_base) = self.text_buffer_contents(text_buffer);

        // (token, byte offset within the text buffer)
        let mut tokens: Vec<(String, u32)> = Vec::new();
        let mut current = String::new();
        let mut start = 0u32;
        for (i, ch) in text.bytes().enumerate() {
            let i = i as u32;
            if ch == b' ' {
                if !current.is_empty() {
                    tokens.push((std::mem::take(&mut current), text_base + start));
                }
            } else if dict.separators.contains(&ch) {
                if !current.is_empty() {
                    tokens.push((std::mem::take(&mut current), text_base + start));
                }
                tokens.push(((ch as char).to_string(), text_base + i));
            } else {
                if current.is_empty() {
                    start = i;
                }
                current.push(ch as char);
            }
        }
        if !current.is_empty() {
            tokens.push((current, text_base + start));
        }

        let max_tokens = self.memory.read_byte(parse_buffer) as usize;
        let count = tokens.len().min(max_tokens);
        if tokens.len() > max_tokens {
            debug!("Parse buffer overflow: {} tokens, room for {max_tokens}", tokens.len());
        }

        // All lookups happen before any parse-buffer write.
        let addrs: Vec<u16> = tokens[..count]
            .iter()
            .map(|(word, _)| self.lookup_word(&dict, word))
            .collect();

        self.memory.write_byte(parse_buffer + 1, count as u8)?;
        for (i, ((word, pos), addr)) in tokens[..count].iter().zip(addrs).enumerate() {
            let entry = parse_buffer + 2 + (i as u32) * 4;
            if addr == 0 && skip_unknown {
                continue;
            }
            self.memory.write_word(entry, addr)?;
            self.memory.write_byte(entry + 2, word.len() as u8)?;
            self.memory.write_byte(entry + 3, *pos as u8)?;
        }
        Ok(())
    }
}
