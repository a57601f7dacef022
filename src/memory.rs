use log::debug;

/// The story file's byte image with bounds-checked big-endian accessors.
///
/// All addresses are byte offsets from the start of the file. A pristine
/// copy of the image is kept for `restart`.
pub struct Memory {
    bytes: Vec<u8>,
    pristine: Vec<u8>,
}

impl Memory {
    /// Take ownership of a loaded story image.
    pub fn load(bytes: Vec<u8>) -> Result<Self, String> {
        if bytes.len() < 64 {
            return Err(format!(
                "Story file too small for header: {} bytes",
                bytes.len()
            ));
        }
        let pristine = bytes.clone();
        Ok(Memory { bytes, pristine })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw view of the whole image, for the text codec and decoder.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn contains(&self, addr: u32) -> bool {
        (addr as usize) < self.bytes.len()
    }

    /// Read a byte. Out-of-bounds reads yield 0 and a log line.
    pub fn read_byte(&self, addr: u32) -> u8 {
        match self.bytes.get(addr as usize) {
            Some(&b) => b,
            None => {
                debug!("Out-of-bounds byte read at {addr:04x}");
                0
            }
        }
    }

    /// Read a word (2 bytes, big-endian).
    pub fn read_word(&self, addr: u32) -> u16 {
        let high = self.read_byte(addr) as u16;
        let low = self.read_byte(addr + 1) as u16;
        (high << 8) | low
    }

    /// Read a word and reinterpret it as signed 16-bit.
    pub fn read_word_signed(&self, addr: u32) -> i16 {
        self.read_word(addr) as i16
    }

    /// Write a byte. The static/dynamic boundary is the story file's
    /// contract, not ours; only the image bounds are enforced.
    pub fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), String> {
        match self.bytes.get_mut(addr as usize) {
            Some(b) => {
                *b = value;
                Ok(())
            }
            None => Err(format!("Memory address out of bounds: {addr:04x}")),
        }
    }

    /// Write a word (2 bytes, big-endian).
    pub fn write_word(&mut self, addr: u32, value: u16) -> Result<(), String> {
        if (addr as usize) + 1 >= self.bytes.len() {
            return Err(format!("Memory address out of bounds: {addr:04x}"));
        }
        self.write_byte(addr, (value >> 8) as u8)?;
        self.write_byte(addr + 1, (value & 0xFF) as u8)
    }

    /// Restore the image to its as-loaded state (used by `restart`).
    pub fn reset(&mut self) {
        self.bytes.copy_from_slice(&self.pristine[..]);
    }
}
