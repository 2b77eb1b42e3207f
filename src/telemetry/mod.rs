//! Inbound message handling: frames are decoded by type, text is parsed as
//! JSON when possible and otherwise passed through as a log line.

use serde::Serialize;
use tracing::{debug, warn};

use crate::protocol::{Frame, FrameError, FrameReceiver, PidGains, RcPacket, latency_ms};
use crate::transport::Inbound;
use crate::utils::consts::{FRAME_TYPE_CONFIG, FRAME_TYPE_RC};
use crate::utils::dump::to_hex;

/// One decoded inbound item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Telemetry {
    Rc {
        packet: RcPacket,
        latency_ms: u32,
    },
    Config {
        gains: PidGains,
    },
    /// Valid frame of a type this end has no schema for
    Unknown {
        frame_type: u8,
        records: usize,
    },
    Json {
        value: serde_json::Value,
    },
    Text {
        line: String,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RxStats {
    pub frames: u64,
    pub dropped: u64,
    pub text: u64,
}

/// Turns inbound messages into `Telemetry`. Malformed frames are logged,
/// counted and dropped; they never stop the stream.
#[derive(Debug, Default)]
pub struct InboundDecoder {
    receiver: FrameReceiver,
    stats: RxStats,
}

impl InboundDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> RxStats {
        self.stats
    }

    pub fn handle(&mut self, message: Inbound, arrival_ms: u32) -> Vec<Telemetry> {
        match message {
            Inbound::Text(line) => {
                self.stats.text += 1;
                vec![parse_text(line)]
            }
            Inbound::Binary(bytes) => {
                // each message carries whole frames; nothing spills into the next
                let mut results = self.receiver.feed_all(&bytes);
                results.extend(self.receiver.finish());

                let mut out = Vec::new();
                for result in results {
                    match result.and_then(|frame| decode_frame(&frame, arrival_ms)) {
                        Ok(item) => {
                            self.stats.frames += 1;
                            out.push(item);
                        }
                        Err(e) => {
                            self.stats.dropped += 1;
                            warn!("dropping inbound frame: {}", e);
                            debug!("offending message: {}", to_hex(&bytes));
                        }
                    }
                }
                out
            }
        }
    }
}

fn parse_text(line: String) -> Telemetry {
    match serde_json::from_str::<serde_json::Value>(&line) {
        Ok(value) if value.is_object() || value.is_array() => Telemetry::Json { value },
        _ => Telemetry::Text { line },
    }
}

/// Decode one complete frame according to its type.
pub fn decode_frame(bytes: &[u8], arrival_ms: u32) -> Result<Telemetry, FrameError> {
    let frame = Frame::parse(bytes)?;
    match frame.frame_type() {
        FRAME_TYPE_RC => {
            let packet = RcPacket::decode(&frame)?;
            Ok(Telemetry::Rc {
                packet,
                latency_ms: latency_ms(arrival_ms, packet.timestamp_ms),
            })
        }
        FRAME_TYPE_CONFIG => Ok(Telemetry::Config {
            gains: PidGains::decode(&frame)?,
        }),
        frame_type => {
            let mut records = 0;
            for tlv in frame.records() {
                tlv?;
                records += 1;
            }
            Ok(Telemetry::Unknown {
                frame_type,
                records,
            })
        }
    }
}
