use serde::Serialize;
use tracing::{debug, trace, warn};

use super::clock::Clock;
use super::latest::Latest;
use crate::error::Result;
use crate::input::InputState;
use crate::protocol::{PidGains, build_config_packet, build_rc_packet};
use crate::transport::{Transport, TransportError};
use crate::utils::dump::to_hex;

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Sent { bytes: usize },
    Paused,
    Disconnected,
    /// Encode or send failed; the frame is gone
    Dropped,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TxStats {
    pub sent: u64,
    pub paused: u64,
    pub disconnected: u64,
    pub dropped: u64,
    pub config_sent: u64,
}

/// Samples the latest input on every tick and sends one RC frame.
///
/// Ticks while paused or disconnected send nothing and buffer nothing: the
/// first tick after resuming carries whatever the input is at that moment.
pub struct TxScheduler<T, C> {
    transport: T,
    input: Latest<InputState>,
    clock: C,
    paused: bool,
    stats: TxStats,
}

impl<T: Transport, C: Clock> TxScheduler<T, C> {
    pub fn new(transport: T, input: Latest<InputState>, clock: C) -> Self {
        Self {
            transport,
            input,
            clock,
            paused: false,
            stats: TxStats::default(),
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn stats(&self) -> TxStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn now_ms(&mut self) -> u32 {
        self.clock.now_ms()
    }

    pub fn tick(&mut self) -> TickOutcome {
        let outcome = self.tick_inner();
        match outcome {
            TickOutcome::Sent { .. } => self.stats.sent += 1,
            TickOutcome::Paused => self.stats.paused += 1,
            TickOutcome::Disconnected => self.stats.disconnected += 1,
            TickOutcome::Dropped => self.stats.dropped += 1,
        }
        trace!("tick: {:?}", outcome);
        outcome
    }

    fn tick_inner(&mut self) -> TickOutcome {
        if self.paused {
            return TickOutcome::Paused;
        }
        if !self.transport.is_connected() {
            return TickOutcome::Disconnected;
        }
        let state = self.input.load();
        let now = self.clock.now_ms();
        let frame = match build_rc_packet(&state.channels(), now) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("RC frame encode failed: {}", e);
                return TickOutcome::Dropped;
            }
        };
        match self.transport.send(&frame) {
            Ok(()) => TickOutcome::Sent { bytes: frame.len() },
            Err(TransportError::Unavailable) => TickOutcome::Disconnected,
            Err(e) => {
                warn!("RC frame dropped: {}", e);
                TickOutcome::Dropped
            }
        }
    }

    /// Send one Config frame now, outside the tick cadence. Pausing RC
    /// transmission does not block it; a disconnected transport does.
    pub fn send_config(&mut self, gains: &PidGains) -> Result<usize> {
        if !self.transport.is_connected() {
            return Err(TransportError::Unavailable.into());
        }
        let frame = build_config_packet(gains)?;
        debug!("sending config P={} I={} D={}: {}", gains.p, gains.i, gains.d, to_hex(&frame));
        self.transport.send(&frame)?;
        self.stats.config_sent += 1;
        Ok(frame.len())
    }
}
