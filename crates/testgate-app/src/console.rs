//! Console sinks for human-readable run output.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Destination for console text. Shared between the reporter and the export thread.
pub trait ConsoleSink: Send + Sync {
    fn write(&self, text: &str);
}

/// Writes to the process's standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl ConsoleSink for StdoutConsole {
    fn write(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        // stdout going away must not take the test run down with it
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

/// Collects console text in memory.
#[derive(Debug, Default)]
pub struct BufferConsole {
    buf: Mutex<String>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ConsoleSink for BufferConsole {
    fn write(&self, text: &str) {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(text);
    }
}
