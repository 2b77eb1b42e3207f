use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{Transport, TransportError};

/// In-process transport that records every frame it accepts.
///
/// Clones share the log and the connected flag, so a test can keep one handle
/// while the scheduler owns another.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    connected: Arc<AtomicBool>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Copy of every frame sent so far
    pub fn sent(&self) -> Vec<Vec<u8>> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn sent_count(&self) -> usize {
        match self.sent.lock() {
            Ok(sent) => sent.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl Transport for MemoryTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Unavailable);
        }
        match self.sent.lock() {
            Ok(mut sent) => sent.push(frame.to_vec()),
            Err(poisoned) => poisoned
                .into_inner()
                .push(frame.to_vec()),
        }
        Ok(())
    }
}
