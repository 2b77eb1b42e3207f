use thiserror::Error;

/// Errors returned by frame encoding and decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Appending would push the sealed frame past the maximum frame size.
    #[error("frame overflow: {needed} bytes needed, max is {max}")]
    EncodeOverflow { needed: usize, max: usize },
    /// Integer TLVs carry at most 32 bits.
    #[error("integer {value} does not fit in a 4-byte TLV")]
    IntOutOfRange { value: u64 },
    /// Fewer bytes than the header or the declared length requires.
    #[error("truncated frame: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },
    /// Length byte declares a frame larger than the maximum frame size.
    #[error("declared length {length} exceeds the maximum frame size")]
    LengthOutOfRange { length: u8 },
    #[error("bad start byte 0x{found:02X}")]
    BadStartByte { found: u8 },
    #[error("checksum mismatch: expected 0x{expected:02X}, computed 0x{computed:02X}")]
    ChecksumMismatch { expected: u8, computed: u8 },
    /// A record header or value runs past the end of the payload.
    #[error("TLV at offset {offset} overruns payload end {end}")]
    TlvOverrun { offset: usize, end: usize },
    #[error("TLV id {id} has unsupported width {size}")]
    UnsupportedWidth { id: u8, size: u8 },
    #[error("frame type 0x{expected:02X} expected, got 0x{found:02X}")]
    UnexpectedFrameType { expected: u8, found: u8 },
    #[error("field id {id} missing from frame")]
    MissingField { id: u8 },
    #[error("field id {id} value {value} out of range")]
    FieldOutOfRange { id: u8, value: u32 },
}

impl FrameError {
    /// Malformed inbound data, as opposed to a rejected encode.
    pub fn is_decode_error(&self) -> bool {
        !matches!(
            self,
            FrameError::EncodeOverflow { .. } | FrameError::IntOutOfRange { .. }
        )
    }
}
