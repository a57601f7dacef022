//! The interactive terminal device. Raw mode is entered only for
//! single-key reads; line input uses the terminal's own editing. The
//! v3 status line is painted in reverse video across the top row.
//!
//! Command lines starting with `/trace` are intercepted here and toggle
//! the shared trace flag; the game never sees them.

use crate::device::{DeviceError, Input, IoDevice, TraceHandle};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    style::{Attribute, SetAttribute},
    terminal, QueueableCommand,
};
use log::debug;
use std::io::{self, BufRead, Write};

pub struct TerminalDevice {
    /// False when stdin/stdout are pipes; status and raw mode are
    /// skipped then.
    interactive: bool,
    trace: TraceHandle,
    stdout: io::Stdout,
}

impl TerminalDevice {
    pub fn new(trace: TraceHandle) -> Self {
        let interactive = atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout);
        TerminalDevice {
            interactive,
            trace,
            stdout: io::stdout(),
        }
    }

    /// Handle a `/`-prefixed out-of-band command. Returns true when the
    /// line was consumed.
    fn handle_command(&mut self, line: &str) -> bool {
        if line.trim() == "/trace" {
            let enabled = !self.trace.get();
            self.trace.set(enabled);
            eprintln!("[trace {}]", if enabled { "on" } else { "off" });
            return true;
        }
        false
    }

    fn key_to_zscii(code: KeyCode) -> Option<u16> {
        match code {
            KeyCode::Char(c) if c.is_ascii() => Some(c as u16),
            KeyCode::Enter => Some(13),
            KeyCode::Esc => Some(27),
            KeyCode::Backspace => Some(8),
            KeyCode::Up => Some(129),
            KeyCode::Down => Some(130),
            KeyCode::Left => Some(131),
            KeyCode::Right => Some(132),
            _ => None,
        }
    }
}

impl IoDevice for TerminalDevice {
    fn read_line(&mut self) -> Result<Input, DeviceError> {
        self.flush()?;
        loop {
            let mut line = String::new();
            let n = io::stdin().lock().read_line(&mut line)?;
            if n == 0 {
                return Ok(Input::Eof);
            }
            let line = line.trim_end_matches(['\n', '\r']);
            if self.handle_command(line) {
                continue;
            }
            return Ok(Input::Line(line.to_string()));
        }
    }

    fn read_char(&mut self) -> Result<Input, DeviceError> {
        self.flush()?;
        if !self.interactive {
            // Pipe input: take the first byte of the next line
            return Ok(match self.read_line()? {
                Input::Line(line) => Input::Char(line.bytes().next().unwrap_or(13) as u16),
                other => other,
            });
        }
        terminal::enable_raw_mode()?;
        let result = loop {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    if let Some(code) = Self::key_to_zscii(key.code) {
                        break Ok(Input::Char(code));
                    }
                    debug!("ignoring key {:?}", key.code);
                }
                _ => {}
            }
        };
        terminal::disable_raw_mode()?;
        result
    }

    fn write_string(&mut self, s: &str) -> Result<(), DeviceError> {
        self.stdout.write_all(s.as_bytes())?;
        Ok(())
    }

    fn write_char(&mut self, ch: char) -> Result<(), DeviceError> {
        let mut buf = [0u8; 4];
        self.stdout.write_all(ch.encode_utf8(&mut buf).as_bytes())?;
        Ok(())
    }

    fn write_error(&mut self, s: &str) -> Result<(), DeviceError> {
        eprintln!("{s}");
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DeviceError> {
        self.stdout.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.flush()
    }

    fn show_status(&mut self, left: &str, right: &str) -> Result<(), DeviceError> {
        if !self.interactive {
            return Ok(());
        }
        let (columns, _) = self.screen_size();
        let columns = columns as usize;
        // Pad or clip the halves into one full-width line
        let mut line = format!(" {left}");
        let tail = format!("{right} ");
        if line.len() + tail.len() < columns {
            line.push_str(&" ".repeat(columns - line.len() - tail.len()));
        }
        line.push_str(&tail);
        line.truncate(columns);

        self.stdout.queue(cursor::SavePosition)?;
        self.stdout.queue(cursor::MoveTo(0, 0))?;
        self.stdout.queue(SetAttribute(Attribute::Reverse))?;
        self.stdout.write_all(line.as_bytes())?;
        self.stdout.queue(SetAttribute(Attribute::Reset))?;
        self.stdout.queue(cursor::RestorePosition)?;
        self.stdout.flush()?;
        Ok(())
    }

    fn screen_size(&self) -> (u16, u16) {
        terminal::size().unwrap_or((80, 24))
    }
}
