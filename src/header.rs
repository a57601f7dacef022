use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use crate::memory::Memory;

/// Screen geometry reported to v4+ story files at load time.
pub const SCREEN_ROWS: u8 = 24;
pub const SCREEN_COLUMNS: u8 = 80;

/// The fixed 64-byte header at the start of every story file.
///
/// Parsed once at load; the version and table addresses never change
/// afterwards, so handlers read them from here rather than from memory.
pub struct Header {
    pub version: u8,
    pub flags1: u8,
    pub release: u16,
    pub base_high_mem: u16,
    pub initial_pc: u16,
    pub dictionary: u16,
    pub object_table: u16,
    pub global_variables: u16,
    pub base_static_mem: u16,
    pub serial: String,
    pub abbrev_table: u16,
    pub len_file: usize,
    pub checksum: u16,
}

impl Header {
    /// Parse the header from the first 64 bytes of the image.
    pub fn parse(mem: &Memory) -> Result<Header, String> {
        let version = mem.read_byte(0);
        if !(1..=8).contains(&version) {
            return Err(format!("Unsupported story file version: {version}"));
        }

        let serial = mem.bytes()[0x12..0x18]
            .iter()
            .map(|&b| b as char)
            .collect::<String>();

        let length_units = match version {
            1..=3 => 2,
            4..=5 => 4,
            _ => 8,
        };

        Ok(Header {
            version,
            flags1: mem.read_byte(1),
            release: mem.read_word(2),
            base_high_mem: mem.read_word(4),
            initial_pc: mem.read_word(6),
            dictionary: mem.read_word(8),
            object_table: mem.read_word(0x0A),
            global_variables: mem.read_word(0x0C),
            base_static_mem: mem.read_word(0x0E),
            serial,
            abbrev_table: mem.read_word(0x18),
            len_file: mem.read_word(0x1A) as usize * length_units,
            checksum: mem.read_word(0x1C),
        })
    }

    /// Multiplier turning a packed routine address into a byte address.
    pub fn routine_multiplier(&self) -> u32 {
        match self.version {
            1..=3 => 2,
            4..=7 => 4,
            _ => 8,
        }
    }

    /// Multiplier turning a packed string address into a byte address.
    pub fn string_multiplier(&self) -> u32 {
        self.routine_multiplier()
    }

    /// Flags 1 bit 1: in v3, whether the status line shows time rather
    /// than score and moves.
    pub fn status_is_time(&self) -> bool {
        self.version <= 3 && self.flags1 & 0x02 != 0
    }

    /// v4+ games read the screen geometry out of the header; the loader
    /// fills it in before execution starts.
    pub fn write_screen_geometry(version: u8, mem: &mut Memory) -> Result<(), String> {
        if version < 4 {
            return Ok(());
        }
        mem.write_byte(0x20, SCREEN_ROWS)?;
        mem.write_byte(0x21, SCREEN_COLUMNS)?;
        if version >= 5 {
            // Width and height in units (units are characters here)
            mem.write_word(0x22, SCREEN_COLUMNS as u16)?;
            mem.write_word(0x24, SCREEN_ROWS as u16)?;
        }
        Ok(())
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        writeln!(
            f,
            "v{} release {} serial {}",
            self.version, self.release, self.serial
        )?;
        writeln!(f, "  initial pc     {:04x}", self.initial_pc)?;
        writeln!(f, "  dictionary     {:04x}", self.dictionary)?;
        writeln!(f, "  objects        {:04x}", self.object_table)?;
        writeln!(f, "  globals        {:04x}", self.global_variables)?;
        writeln!(f, "  static base    {:04x}", self.base_static_mem)?;
        writeln!(f, "  high base      {:04x}", self.base_high_mem)?;
        writeln!(f, "  abbreviations  {:04x}", self.abbrev_table)?;
        write!(
            f,
            "  file {} bytes, checksum {:04x}",
            self.len_file, self.checksum
        )
    }
}
