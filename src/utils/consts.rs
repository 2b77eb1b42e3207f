/// Default log level (overridden by RUST_LOG)
pub const LOG_LEVEL: &str = "info";

// ============================================================================
// Wire format
// ============================================================================

/// Start-of-frame marker
pub const STX: u8 = 0x02;

/// Largest frame on the wire, checksum included (bytes)
pub const MAX_FRAME_SIZE: usize = 256;

/// STX + length + frame type
pub const FRAME_HEADER_BYTES: usize = 3;

/// Smallest decodable frame: header plus checksum, no records
pub const MIN_FRAME_BYTES: usize = FRAME_HEADER_BYTES + 1;

/// Largest value the length byte may carry: type byte plus records
pub const MAX_BODY_LEN: usize = MAX_FRAME_SIZE - 3;

/// TLV id + size
pub const TLV_HEADER_BYTES: usize = 2;

pub const FRAME_TYPE_RC: u8 = 0x01;
pub const FRAME_TYPE_CONFIG: u8 = 0x02;

// RC frame field ids
pub const RC_ID_ROLL: u8 = 0;
pub const RC_ID_THROTTLE: u8 = 1;
pub const RC_ID_AUX1: u8 = 3;
pub const RC_ID_AUX2: u8 = 4;

/// Reserved id of the 4-byte timestamp record
pub const TIMESTAMP_TLV_ID: u8 = 100;

// Config frame field ids
pub const CONFIG_ID_P: u8 = 1;
pub const CONFIG_ID_I: u8 = 2;
pub const CONFIG_ID_D: u8 = 3;

// ============================================================================
// Channel values (servo microseconds)
// ============================================================================

pub const CHANNEL_LOW: u16 = 1000;
pub const CHANNEL_NEUTRAL: u16 = 1500;
pub const CHANNEL_HIGH: u16 = 2000;

/// Upper bound of the operator speed limiter
pub const SPEED_LIMIT_MAX: u16 = 500;

// ============================================================================
// Runtime defaults
// ============================================================================

/// RC transmission period (20 Hz)
pub const DEFAULT_TICK_MS: u64 = 50;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9870";
pub const DEFAULT_PEER_ADDR: &str = "127.0.0.1:9871";

/// Largest datagram the UDP reader accepts
pub const MAX_DATAGRAM_SIZE: usize = 2048;

/// Poll interval of background reader threads (milliseconds)
pub const READER_POLL_MS: u64 = 100;
