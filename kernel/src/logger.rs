//! Buffered `log` sink.
//!
//! Embedders without a console of their own install this logger and read the
//! captured text back with [`contents`].

use alloc::string::String;
use conquer_once::spin::OnceCell;
use core::fmt::Write;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

const BUFFER_SIZE: usize = 8192;

static LOGGER: OnceCell<BufferedLogger> = OnceCell::uninit();

/// Fixed-size text buffer. Messages that no longer fit are dropped.
struct LogBuffer {
    buffer: [u8; BUFFER_SIZE],
    position: usize,
}

impl LogBuffer {
    const fn new() -> Self {
        Self {
            buffer: [0; BUFFER_SIZE],
            position: 0,
        }
    }

    fn contents(&self) -> &str {
        core::str::from_utf8(&self.buffer[..self.position]).unwrap_or("<invalid UTF-8>")
    }

    fn clear(&mut self) {
        self.position = 0;
    }

    /// Append a whole message, or nothing if it does not fit.
    fn push_message(&mut self, message: &str) {
        let bytes = message.as_bytes();
        let remaining = BUFFER_SIZE - self.position;

        if bytes.len() > remaining {
            return;
        }

        self.buffer[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
    }
}

pub struct BufferedLogger {
    buffer: Mutex<LogBuffer>,
}

impl BufferedLogger {
    pub const fn new() -> Self {
        BufferedLogger {
            buffer: Mutex::new(LogBuffer::new()),
        }
    }

    pub fn contents(&self) -> String {
        String::from(self.buffer.lock().contents())
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

impl Default for BufferedLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Log for BufferedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Formatting writes piecewise, so the message is committed in one go
        let mut message = String::new();
        if writeln!(
            &mut message,
            "[{:>5}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        )
        .is_err()
        {
            return;
        }

        // try_lock: a trap taken while the buffer is held must not deadlock
        if let Some(mut buffer) = self.buffer.try_lock() {
            buffer.push_message(&message);
        }
    }

    fn flush(&self) {}
}

/// Install the global buffered logger and set the maximum level.
///
/// Fails if any logger is already installed.
pub fn init(max_level: LevelFilter) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(BufferedLogger::new);
    log::set_logger(logger)?;
    log::set_max_level(max_level);
    Ok(())
}

/// Text captured by the global logger so far.
pub fn contents() -> String {
    LOGGER.get().map(BufferedLogger::contents).unwrap_or_default()
}
