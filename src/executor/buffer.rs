//! Append-only output buffer shared between a pump and its readers.

use std::sync::Arc;

use parking_lot::Mutex;

/// Growable byte buffer written by exactly one pump.
///
/// Readers take snapshots; the lock is only held for a memcpy.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk
    pub fn append(&self, chunk: &[u8]) {
        self.inner.lock().extend_from_slice(chunk);
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().clone()
    }

    /// Reset to empty; the allocation is kept for the next chunks
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Move the current contents out, leaving the buffer empty.
    ///
    /// A single lock covers both steps, so no appended chunk can slip
    /// between the read and the reset.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.inner.lock())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
