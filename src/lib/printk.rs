//! Kernel logging (printk) with a ring-buffered backlog plus immediate
//! serial output for warnings and errors.

use super::ringbuf::RingBuffer;
use core::fmt::{self, Write};
use spin::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

#[derive(Copy, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: [u8; 128],
    pub len: usize,
}

struct LogBuffer {
    buffer: Mutex<RingBuffer<LogEntry, 512>>,
}

impl LogBuffer {
    const fn new() -> Self {
        Self {
            buffer: Mutex::new(RingBuffer::new()),
        }
    }

    fn push(&self, entry: LogEntry) {
        self.buffer.lock().push(entry);
    }

    pub fn drain_all(&self) -> alloc::vec::Vec<LogEntry> {
        self.buffer.lock().drain_all()
    }
}

static KERNEL_LOG: LogBuffer = LogBuffer::new();

struct SerialWriter;

impl Write for SerialWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        crate::arch::console_write(s.as_bytes());
        Ok(())
    }
}

pub fn log(level: LogLevel, args: fmt::Arguments) {
    let msg = alloc::format!("{}", args);
    let mut message = [0u8; 128];
    let len = core::cmp::min(msg.len(), message.len());
    message[..len].copy_from_slice(&msg.as_bytes()[..len]);

    KERNEL_LOG.push(LogEntry { level, message, len });

    if level <= LogLevel::Warn {
        let mut w = SerialWriter;
        let _ = write!(w, "[{}] {}\n", level.as_str(), msg);
    }
}

/// Drain buffered log entries, formatting each as `"LEVEL message"`.
pub fn drain_formatted() -> alloc::vec::Vec<alloc::string::String> {
    KERNEL_LOG
        .drain_all()
        .into_iter()
        .map(|e| {
            let text = core::str::from_utf8(&e.message[..e.len]).unwrap_or("<invalid utf8>");
            alloc::format!("{} {}", e.level.as_str(), text)
        })
        .collect()
}

#[macro_export]
macro_rules! printk {
    ($level:expr, $($arg:tt)*) => {
        $crate::lib::printk::log($level, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::printk!($crate::lib::printk::LogLevel::Error, $($arg)*) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::printk!($crate::lib::printk::LogLevel::Warn, $($arg)*) };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::printk!($crate::lib::printk::LogLevel::Info, $($arg)*) };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::printk!($crate::lib::printk::LogLevel::Debug, $($arg)*) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logged_message_round_trips_through_the_ring_buffer() {
        log(LogLevel::Debug, format_args!("hello {}", 42));
        let drained = drain_formatted();
        assert!(drained.iter().any(|l| l.contains("hello 42")));
    }
}
