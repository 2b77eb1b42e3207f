use serde::Serialize;

use crate::protocol::{Frame, FrameError};

/// JSON-friendly view of a decoded frame
#[derive(Serialize, Debug)]
pub struct FrameDump {
    pub frame_type: u8,
    pub length: u8,
    pub checksum: u8,
    pub records: Vec<RecordDump>,
}

#[derive(Serialize, Debug)]
pub struct RecordDump {
    pub id: u8,
    pub size: u8,
    pub hex: String,
    /// Unsigned little-endian reading, when the width allows one
    pub uint: Option<u32>,
    /// f32 reading of 4-byte records
    pub float: Option<f32>,
}

impl FrameDump {
    pub fn from_frame(frame: &Frame<'_>) -> Result<Self, FrameError> {
        let mut records = Vec::new();
        for tlv in frame.records() {
            let tlv = tlv?;
            records.push(RecordDump {
                id: tlv.id,
                size: tlv.size,
                hex: to_hex(tlv.value),
                uint: tlv.as_uint().ok(),
                float: tlv.as_f32().ok(),
            });
        }
        Ok(Self {
            frame_type: frame.frame_type(),
            length: frame.length(),
            checksum: frame.checksum(),
            records,
        })
    }
}

/// `02 17 01 ...`
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex with optional whitespace, `0x` prefixes and `:`/`,` separators.
pub fn from_hex(text: &str) -> Option<Vec<u8>> {
    let digits: String = text
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .map(|tok| tok.trim_start_matches("0x").trim_start_matches("0X"))
        .collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok())
        .collect()
}
