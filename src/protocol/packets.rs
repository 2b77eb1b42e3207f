//! RC and Config packets on top of the frame codec.
//!
//! The receiver knows each frame type's id mapping out of band; nothing here
//! is self-describing.

use serde::{Deserialize, Serialize};

use super::error::FrameError;
use super::frame::{Frame, FrameBuilder};
use crate::utils::consts::*;

/// The four RC channels as they travel on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channels {
    pub throttle: u16,
    pub roll: u16,
    pub aux1: u16,
    pub aux2: u16,
}

impl Default for Channels {
    fn default() -> Self {
        Self {
            throttle: CHANNEL_NEUTRAL,
            roll: CHANNEL_NEUTRAL,
            aux1: CHANNEL_LOW,
            aux2: CHANNEL_LOW,
        }
    }
}

/// Controller gains carried by a Config frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct PidGains {
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            p: 1.0,
            i: 0.1,
            d: 0.01,
        }
    }
}

/// Build an RC frame: throttle, roll, aux1, aux2, then the timestamp.
///
/// The emission order is fixed; some receivers index records by position.
pub fn build_rc_packet(channels: &Channels, now_ms: u32) -> Result<Vec<u8>, FrameError> {
    let mut builder = FrameBuilder::begin(FRAME_TYPE_RC);
    builder
        .append_uint(RC_ID_THROTTLE, channels.throttle as u64)?
        .append_uint(RC_ID_ROLL, channels.roll as u64)?
        .append_uint(RC_ID_AUX1, channels.aux1 as u64)?
        .append_uint(RC_ID_AUX2, channels.aux2 as u64)?
        .append_timestamp(now_ms)?;
    Ok(builder.seal())
}

/// Build a Config frame with P, I, D as ids 1, 2, 3.
pub fn build_config_packet(gains: &PidGains) -> Result<Vec<u8>, FrameError> {
    let mut builder = FrameBuilder::begin(FRAME_TYPE_CONFIG);
    builder
        .append_f32(CONFIG_ID_P, gains.p)?
        .append_f32(CONFIG_ID_I, gains.i)?
        .append_f32(CONFIG_ID_D, gains.d)?;
    Ok(builder.seal())
}

/// A decoded RC frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RcPacket {
    pub channels: Channels,
    pub timestamp_ms: u32,
}

fn channel(frame: &Frame<'_>, id: u8) -> Result<u16, FrameError> {
    let value = frame.field(id)?.as_uint()?;
    u16::try_from(value).map_err(|_| FrameError::FieldOutOfRange { id, value })
}

impl RcPacket {
    /// Fields are looked up by id, in any width the encoder may pick.
    pub fn decode(frame: &Frame<'_>) -> Result<Self, FrameError> {
        frame.expect_type(FRAME_TYPE_RC)?;
        let channels = Channels {
            throttle: channel(frame, RC_ID_THROTTLE)?,
            roll: channel(frame, RC_ID_ROLL)?,
            aux1: channel(frame, RC_ID_AUX1)?,
            aux2: channel(frame, RC_ID_AUX2)?,
        };
        let timestamp = frame.field(TIMESTAMP_TLV_ID)?;
        if timestamp.size != 4 {
            return Err(FrameError::UnsupportedWidth {
                id: TIMESTAMP_TLV_ID,
                size: timestamp.size,
            });
        }
        Ok(Self {
            channels,
            timestamp_ms: timestamp.as_uint()?,
        })
    }
}

impl PidGains {
    pub fn decode(frame: &Frame<'_>) -> Result<Self, FrameError> {
        frame.expect_type(FRAME_TYPE_CONFIG)?;
        Ok(Self {
            p: frame.field(CONFIG_ID_P)?.as_f32()?,
            i: frame.field(CONFIG_ID_I)?.as_f32()?,
            d: frame.field(CONFIG_ID_D)?.as_f32()?,
        })
    }
}

/// One-way latency from a frame's timestamp, modulo 2^32 ms.
pub fn latency_ms(arrival_ms: u32, sent_ms: u32) -> u32 {
    arrival_ms.wrapping_sub(sent_ms)
}
