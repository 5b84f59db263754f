//! Output ports
//!
//! Parallel install tasks never touch the real output sink directly: each
//! task writes to its own [`BufferedOutput`][], and the wave installer
//! flushes the buffers in install order after the wave joins. Logs stay
//! reproducible without serializing the work.

use std::sync::Mutex;

use tracing::info;

/// Where user-visible install lines go
pub trait OutputPort: Send + Sync {
    /// Emit one line
    fn line(&self, message: &str);
}

/// A port that buffers everything for a later ordered flush
#[derive(Debug, Default)]
pub struct BufferedOutput {
    lines: Mutex<Vec<String>>,
}

impl BufferedOutput {
    /// A fresh empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the buffered lines, oldest first
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut self.lines.lock().unwrap())
    }
}

impl OutputPort for BufferedOutput {
    fn line(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_owned());
    }
}

/// The default real sink: structured logs
///
/// The CLI layer substitutes its own port; the core only guarantees
/// ordering.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingOutput;

impl OutputPort for TracingOutput {
    fn line(&self, message: &str) {
        info!("{message}");
    }
}
