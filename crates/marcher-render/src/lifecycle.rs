//! Per-frame scene buffer bookkeeping
//!
//! Buffers created during a frame stay alive until the start of the next
//! frame, when [`BufferLedger::begin_frame`] hands them back for release.

use tracing::warn;

/// Tracks the scene buffers of the current frame generation
#[derive(Debug)]
pub struct BufferLedger<B> {
    live: Vec<B>,
    generation: u64,
}

impl<B> Default for BufferLedger<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> BufferLedger<B> {
    pub fn new() -> Self {
        Self {
            live: Vec::new(),
            generation: 0,
        }
    }

    /// Start a new generation and return the previous one for release
    pub fn begin_frame(&mut self) -> Vec<B> {
        self.generation += 1;
        std::mem::take(&mut self.live)
    }

    /// Record a buffer created during the current frame
    pub fn track(&mut self, buffer: B) {
        self.live.push(buffer);
    }

    /// Take every outstanding buffer (teardown)
    pub fn drain(&mut self) -> Vec<B> {
        std::mem::take(&mut self.live)
    }

    /// Number of buffers currently alive
    pub fn live(&self) -> usize {
        self.live.len()
    }

    /// Number of frames started so far
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<B> Drop for BufferLedger<B> {
    fn drop(&mut self) {
        if !self.live.is_empty() {
            warn!(
                count = self.live.len(),
                "Scene buffers dropped without teardown"
            );
        }
    }
}
