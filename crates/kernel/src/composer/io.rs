//! Output channel for Composer hooks.

use parking_lot::Mutex;
use tracing::{error, info};

/// Where hooks report progress and problems.
pub trait IoSink: Send + Sync {
    fn write(&self, message: &str);
    fn write_error(&self, message: &str);
}

/// Sends hook output to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingIo;

impl IoSink for TracingIo {
    fn write(&self, message: &str) {
        info!(target: "bolt::composer", "{message}");
    }

    fn write_error(&self, message: &str) {
        error!(target: "bolt::composer", "{message}");
    }
}

/// Collects hook output in memory.
#[derive(Debug, Default)]
pub struct BufferedIo {
    output: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl BufferedIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> Vec<String> {
        self.output.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl IoSink for BufferedIo {
    fn write(&self, message: &str) {
        self.output.lock().push(message.to_string());
    }

    fn write_error(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }
}
