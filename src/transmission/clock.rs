use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond time source for frame timestamps
pub trait Clock {
    fn now_ms(&mut self) -> u32;
}

/// Low 32 bits of epoch milliseconds.
///
/// A wall-clock step backwards repeats the last value instead, so timestamps
/// within a session never decrease (modulo the 2^32 wrap).
#[derive(Debug, Default)]
pub struct WallClock {
    last: Option<u32>,
}

impl WallClock {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn epoch_ms_low32() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u32)
        .unwrap_or(0)
}

impl Clock for WallClock {
    fn now_ms(&mut self) -> u32 {
        let now = epoch_ms_low32();
        let next = match self.last {
            // wrapping difference read as signed: negative means backwards
            Some(last) if (now.wrapping_sub(last) as i32) < 0 => last,
            _ => now,
        };
        self.last = Some(next);
        next
    }
}

/// Hand-driven clock; clones share one time value.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start_ms)),
        }
    }

    pub fn set(&self, ms: u32) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u32) -> u32 {
        self.now
            .fetch_add(ms, Ordering::SeqCst)
            .wrapping_add(ms)
    }
}

impl Clock for ManualClock {
    fn now_ms(&mut self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_clock_never_decreases() {
        let mut clock = WallClock::new();
        let a = clock.now_ms();
        // pretend a later sample was already handed out
        clock.last = Some(a.wrapping_add(60_000));
        assert_eq!(clock.now_ms(), a.wrapping_add(60_000));
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(100);
        let mut reader = clock.clone();
        assert_eq!(clock.advance(50), 150);
        assert_eq!(reader.now_ms(), 150);
        clock.set(7);
        assert_eq!(reader.now_ms(), 7);
    }
}
