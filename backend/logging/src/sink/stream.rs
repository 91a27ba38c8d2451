use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use beatlog_core::{LogError, Sink};

/// Writes lines to stdout, stderr or any `io::Write`.
pub struct StreamSink {
    label: &'static str,
    writer: Box<dyn Write + Send>,
}

impl StreamSink {
    pub fn stdout() -> Self {
        Self {
            label: "<stdout>",
            writer: Box::new(io::stdout()),
        }
    }

    pub fn stderr() -> Self {
        Self {
            label: "<stderr>",
            writer: Box::new(io::stderr()),
        }
    }

    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            label: "<stream>",
            writer,
        }
    }
}

impl Sink for StreamSink {
    fn write(&mut self, line: &[u8]) -> Result<(), LogError> {
        self.writer
            .write_all(line)
            .map_err(|e| LogError::io(self.label, e))
    }

    fn flush(&mut self) -> Result<(), LogError> {
        self.writer.flush().map_err(|e| LogError::io(self.label, e))
    }
}

/// Shared in-memory buffer. Clones see the same bytes.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Sink for MemorySink {
    fn write(&mut self, line: &[u8]) -> Result<(), LogError> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(line);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LogError> {
        Ok(())
    }
}
