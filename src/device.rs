//! The I/O device contract between the runtime and the outside world.
//!
//! All user-visible text flows through a device. The four core
//! operations block; the windowing hooks are optional and default to
//! no-ops so that plain devices (pipes, test harnesses) stay trivial.

use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Shared trace toggle. The terminal device flips it on `/trace`; the
/// interpreter reads it each step. Single-threaded, so a plain Cell.
pub type TraceHandle = Rc<Cell<bool>>;

pub fn trace_handle(enabled: bool) -> TraceHandle {
    Rc::new(Cell::new(enabled))
}

/// One blocking read's worth of input. End-of-input is how a device
/// cancels the game; the runtime turns it into the quit sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Line(String),
    Char(u16),
    Eof,
}

#[derive(Debug, Clone)]
pub struct DeviceError {
    pub message: String,
}

impl DeviceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device error: {}", self.message)
    }
}

impl std::error::Error for DeviceError {}

impl From<std::io::Error> for DeviceError {
    fn from(error: std::io::Error) -> Self {
        Self::new(format!("I/O error: {error}"))
    }
}

impl From<DeviceError> for String {
    fn from(error: DeviceError) -> String {
        error.message
    }
}

/// A Z-machine I/O device.
///
/// `write_string` must emit exactly the bytes given; embedded control
/// characters pass through untouched. The windowing hooks mirror the
/// optional opcode set and may be ignored by simple devices.
pub trait IoDevice {
    /// Block for one line of input (without its terminator).
    fn read_line(&mut self) -> Result<Input, DeviceError>;

    /// Block for one keypress, reported as a ZSCII code (13 return,
    /// 27 escape, 8 backspace, 129-132 arrows).
    fn read_char(&mut self) -> Result<Input, DeviceError>;

    fn write_string(&mut self, s: &str) -> Result<(), DeviceError>;

    fn write_char(&mut self, ch: char) -> Result<(), DeviceError>;

    /// Out-of-band channel for trace lines and fatal errors; must not
    /// disturb the game transcript.
    fn write_error(&mut self, s: &str) -> Result<(), DeviceError>;

    /// Push any buffered output to the user, e.g. before blocking reads.
    fn flush(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError>;

    /// Render the v3 status line. `left` is the location name, `right`
    /// the score/turns or time text.
    fn show_status(&mut self, _left: &str, _right: &str) -> Result<(), DeviceError> {
        Ok(())
    }

    fn split_window(&mut self, _lines: u16) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_window(&mut self, _window: u16) -> Result<(), DeviceError> {
        Ok(())
    }

    fn erase_window(&mut self, _window: i16) -> Result<(), DeviceError> {
        Ok(())
    }

    fn erase_line(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_cursor(&mut self, _row: u16, _column: u16) -> Result<(), DeviceError> {
        Ok(())
    }

    /// 1-based (row, column).
    fn get_cursor(&mut self) -> Result<(u16, u16), DeviceError> {
        Ok((1, 1))
    }

    fn set_text_style(&mut self, _style: u16) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_buffer_mode(&mut self, _buffered: bool) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_output_stream(&mut self, _stream: i16) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_input_stream(&mut self, _stream: u16) -> Result<(), DeviceError> {
        Ok(())
    }

    /// (columns, rows)
    fn screen_size(&self) -> (u16, u16) {
        (80, 24)
    }
}

/// A device that records everything and replays scripted input; used by
/// the test suites and by non-interactive runs.
#[derive(Default)]
pub struct HeadlessDevice {
    lines: VecDeque<String>,
    keys: VecDeque<u16>,
    output: String,
    errors: String,
    statuses: Vec<(String, String)>,
    closed: bool,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a line for a future `read_line`.
    pub fn push_line(&mut self, line: &str) {
        self.lines.push_back(line.to_string());
    }

    /// Queue a key for a future `read_char`.
    pub fn push_key(&mut self, key: u16) {
        self.keys.push_back(key);
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn errors(&self) -> &str {
        &self.errors
    }

    pub fn statuses(&self) -> &[(String, String)] {
        &self.statuses
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl IoDevice for HeadlessDevice {
    fn read_line(&mut self) -> Result<Input, DeviceError> {
        Ok(match self.lines.pop_front() {
            Some(line) => Input::Line(line),
            None => Input::Eof,
        })
    }

    fn read_char(&mut self) -> Result<Input, DeviceError> {
        Ok(match self.keys.pop_front() {
            Some(key) => Input::Char(key),
            None => Input::Eof,
        })
    }

    fn write_string(&mut self, s: &str) -> Result<(), DeviceError> {
        self.output.push_str(s);
        Ok(())
    }

    fn write_char(&mut self, ch: char) -> Result<(), DeviceError> {
        self.output.push(ch);
        Ok(())
    }

    fn write_error(&mut self, s: &str) -> Result<(), DeviceError> {
        self.errors.push_str(s);
        self.errors.push('\n');
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.closed = true;
        Ok(())
    }

    fn show_status(&mut self, left: &str, right: &str) -> Result<(), DeviceError> {
        self.statuses.push((left.to_string(), right.to_string()));
        Ok(())
    }
}
