//! Compact TLV framing for the command/telemetry link.
//!
//! `[STX] [Length] [Type] [id size value]... [XOR]`, little-endian values.

pub mod checksum;
pub mod error;
pub mod frame;
pub mod packets;
pub mod stream;

pub use error::FrameError;
pub use frame::{
    Frame, FrameBuilder, FrameHeader, Tlv, TlvIter, decode_header, decode_tlv_at, int_width,
    verify_checksum,
};
pub use packets::{
    Channels, PidGains, RcPacket, build_config_packet, build_rc_packet, latency_ms,
};
pub use stream::FrameReceiver;
