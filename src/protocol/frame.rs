// Frame format: [STX] [Length] [Frame Type] [TLV records...] [XOR]
//
// Length counts the frame type byte plus every record byte, i.e. everything
// between the length field and the checksum. The checksum covers the same
// range.

use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

use super::checksum::xor_checksum;
use super::error::FrameError;
use crate::utils::consts::*;

/// Offset of the first byte covered by length and checksum
const BODY_START: usize = 2;

/// Smallest of {1, 2, 4} bytes that holds `value`.
pub fn int_width(value: u64) -> Result<u8, FrameError> {
    if value <= 0xFF {
        Ok(1)
    } else if value <= 0xFFFF {
        Ok(2)
    } else if value <= 0xFFFF_FFFF {
        Ok(4)
    } else {
        Err(FrameError::IntOutOfRange { value })
    }
}

/// Writes one frame into a buffer it owns.
///
/// `begin` starts a frame, the `append_*` methods add records, and `seal`
/// consumes the builder and hands back exactly the frame bytes. A builder
/// can't be restarted mid-frame, so there is never more than one frame in
/// flight per buffer.
#[derive(Debug)]
pub struct FrameBuilder {
    buf: Vec<u8>,
}

impl FrameBuilder {
    pub fn begin(frame_type: u8) -> Self {
        Self::with_buffer(Vec::with_capacity(MAX_FRAME_SIZE), frame_type)
    }

    /// Start a frame in a caller-provided scratch buffer. Previous contents are
    /// discarded; the allocation comes back from `seal`.
    pub fn with_buffer(mut buf: Vec<u8>, frame_type: u8) -> Self {
        buf.clear();
        buf.push(STX);
        buf.push(0); // patched by seal
        buf.push(frame_type);
        Self { buf }
    }

    fn reserve(&self, extra: usize) -> Result<(), FrameError> {
        // +1 for the checksum seal appends
        let needed = self.buf.len() + extra + 1;
        if needed > MAX_FRAME_SIZE {
            return Err(FrameError::EncodeOverflow {
                needed,
                max: MAX_FRAME_SIZE,
            });
        }
        Ok(())
    }

    fn push_record(&mut self, id: u8, value: &[u8]) -> Result<&mut Self, FrameError> {
        self.reserve(TLV_HEADER_BYTES + value.len())?;
        self.buf.push(id);
        self.buf.push(value.len() as u8);
        self.buf.extend_from_slice(value);
        Ok(self)
    }

    /// Unsigned integer record, little-endian in the narrowest width that fits.
    /// Values above `u32::MAX` are rejected and leave the frame untouched.
    pub fn append_uint(&mut self, id: u8, value: u64) -> Result<&mut Self, FrameError> {
        let size = int_width(value)? as usize;
        let mut raw = [0u8; 4];
        LittleEndian::write_u32(&mut raw, value as u32);
        self.push_record(id, &raw[..size])
    }

    pub fn append_f32(&mut self, id: u8, value: f32) -> Result<&mut Self, FrameError> {
        let mut raw = [0u8; 4];
        LittleEndian::write_f32(&mut raw, value);
        self.push_record(id, &raw)
    }

    /// Fixed-width timestamp record (id 100, 4 bytes).
    pub fn append_timestamp(&mut self, value: u32) -> Result<&mut Self, FrameError> {
        let mut raw = [0u8; 4];
        LittleEndian::write_u32(&mut raw, value);
        self.push_record(TIMESTAMP_TLV_ID, &raw)
    }

    /// Bytes written so far, header included.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.len() <= FRAME_HEADER_BYTES
    }

    /// Patch the length, append the checksum and return the finished frame.
    pub fn seal(mut self) -> Vec<u8> {
        // reserve() keeps the body within MAX_FRAME_SIZE - 3 < 256
        let length = self.buf.len() - BODY_START;
        self.buf[1] = length as u8;
        let crc = xor_checksum(&self.buf[BODY_START..]);
        self.buf.push(crc);
        trace!("sealed frame type 0x{:02X}, {} bytes", self.buf[2], self.buf.len());
        self.buf
    }
}

/// Parsed fixed header of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_type: u8,
    pub length: u8,
}

impl FrameHeader {
    /// Offset of the checksum byte
    pub fn body_end(&self) -> usize {
        BODY_START + self.length as usize
    }

    /// Total size on the wire
    pub fn frame_len(&self) -> usize {
        self.body_end() + 1
    }
}

/// Read STX, length and type, and check the buffer holds the whole frame.
/// Bytes after the checksum are ignored.
pub fn decode_header(bytes: &[u8]) -> Result<FrameHeader, FrameError> {
    if bytes.len() < MIN_FRAME_BYTES {
        return Err(FrameError::Truncated {
            needed: MIN_FRAME_BYTES,
            actual: bytes.len(),
        });
    }
    if bytes[0] != STX {
        return Err(FrameError::BadStartByte { found: bytes[0] });
    }
    let length = bytes[1];
    if length == 0 {
        // the body always holds at least the frame type byte
        return Err(FrameError::Truncated {
            needed: MIN_FRAME_BYTES,
            actual: BODY_START + 1,
        });
    }
    if length as usize > MAX_BODY_LEN {
        return Err(FrameError::LengthOutOfRange { length });
    }
    let header = FrameHeader {
        frame_type: bytes[2],
        length,
    };
    if bytes.len() < header.frame_len() {
        return Err(FrameError::Truncated {
            needed: header.frame_len(),
            actual: bytes.len(),
        });
    }
    Ok(header)
}

fn check_body(bytes: &[u8], header: &FrameHeader) -> Result<(), FrameError> {
    let end = header.body_end();
    let computed = xor_checksum(&bytes[BODY_START..end]);
    let expected = bytes[end];
    if computed != expected {
        return Err(FrameError::ChecksumMismatch { expected, computed });
    }
    Ok(())
}

/// False for short, malformed or corrupted frames.
pub fn verify_checksum(bytes: &[u8]) -> bool {
    decode_header(bytes)
        .and_then(|header| check_body(bytes, &header))
        .is_ok()
}

/// One TLV record borrowed from a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tlv<'a> {
    pub id: u8,
    pub size: u8,
    pub value: &'a [u8],
    /// Offset of the following record
    pub next: usize,
}

impl Tlv<'_> {
    pub fn as_uint(&self) -> Result<u32, FrameError> {
        match self.size {
            1 => Ok(self.value[0] as u32),
            2 => Ok(LittleEndian::read_u16(self.value) as u32),
            4 => Ok(LittleEndian::read_u32(self.value)),
            size => Err(FrameError::UnsupportedWidth { id: self.id, size }),
        }
    }

    pub fn as_f32(&self) -> Result<f32, FrameError> {
        match self.size {
            4 => Ok(LittleEndian::read_f32(self.value)),
            size => Err(FrameError::UnsupportedWidth { id: self.id, size }),
        }
    }
}

fn read_tlv(bytes: &[u8], offset: usize, end: usize) -> Result<Tlv<'_>, FrameError> {
    let value_start = offset + TLV_HEADER_BYTES;
    if value_start > end {
        return Err(FrameError::TlvOverrun { offset, end });
    }
    let id = bytes[offset];
    let size = bytes[offset + 1];
    let value_end = value_start + size as usize;
    if value_end > end {
        return Err(FrameError::TlvOverrun { offset, end });
    }
    Ok(Tlv {
        id,
        size,
        value: &bytes[value_start..value_end],
        next: value_end,
    })
}

/// Read the record starting at `offset` of a whole frame. Records start at
/// offset 3; loop on `next` until it reaches the checksum offset.
pub fn decode_tlv_at(bytes: &[u8], offset: usize) -> Result<Tlv<'_>, FrameError> {
    let header = decode_header(bytes)?;
    read_tlv(bytes, offset, header.body_end())
}

/// Iterator over the records of one frame. Stops after the first error.
#[derive(Debug, Clone)]
pub struct TlvIter<'a> {
    bytes: &'a [u8],
    offset: usize,
    end: usize,
    failed: bool,
}

impl<'a> Iterator for TlvIter<'a> {
    type Item = Result<Tlv<'a>, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.end {
            return None;
        }
        match read_tlv(self.bytes, self.offset, self.end) {
            Ok(tlv) => {
                self.offset = tlv.next;
                Some(Ok(tlv))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// A validated frame borrowed from an inbound buffer
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    bytes: &'a [u8],
    header: FrameHeader,
}

impl<'a> Frame<'a> {
    /// Check header, length and checksum. Trailing bytes are not part of the frame.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FrameError> {
        let header = decode_header(bytes)?;
        check_body(bytes, &header)?;
        Ok(Self {
            bytes: &bytes[..header.frame_len()],
            header,
        })
    }

    pub fn frame_type(&self) -> u8 {
        self.header.frame_type
    }

    pub fn length(&self) -> u8 {
        self.header.length
    }

    pub fn checksum(&self) -> u8 {
        self.bytes[self.header.body_end()]
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Fresh iterator over the records; call again to restart.
    pub fn records(&self) -> TlvIter<'a> {
        TlvIter {
            bytes: self.bytes,
            offset: FRAME_HEADER_BYTES,
            end: self.header.body_end(),
            failed: false,
        }
    }

    /// First record with `id`.
    pub fn field(&self, id: u8) -> Result<Tlv<'a>, FrameError> {
        for tlv in self.records() {
            let tlv = tlv?;
            if tlv.id == id {
                return Ok(tlv);
            }
        }
        Err(FrameError::MissingField { id })
    }

    pub fn expect_type(&self, expected: u8) -> Result<(), FrameError> {
        if self.frame_type() != expected {
            return Err(FrameError::UnexpectedFrameType {
                expected,
                found: self.frame_type(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_width_selection() {
        assert_eq!(int_width(0), Ok(1));
        assert_eq!(int_width(255), Ok(1));
        assert_eq!(int_width(256), Ok(2));
        assert_eq!(int_width(65535), Ok(2));
        assert_eq!(int_width(65536), Ok(4));
        assert_eq!(int_width(u32::MAX as u64), Ok(4));
        assert_eq!(
            int_width(u32::MAX as u64 + 1),
            Err(FrameError::IntOutOfRange {
                value: u32::MAX as u64 + 1
            })
        );
    }

    #[test]
    fn test_append_uint_encodes_size_and_le_value() {
        let mut builder = FrameBuilder::begin(0x01);
        builder.append_uint(7, 255).unwrap();
        builder.append_uint(8, 256).unwrap();
        builder.append_uint(9, 65536).unwrap();
        let frame = builder.seal();

        assert_eq!(&frame[3..6], &[7, 1, 0xFF]);
        assert_eq!(&frame[6..10], &[8, 2, 0x00, 0x01]);
        assert_eq!(&frame[10..16], &[9, 4, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_seal_patches_length_and_checksum() {
        let mut builder = FrameBuilder::begin(0x05);
        builder.append_uint(1, 0x42).unwrap();
        let frame = builder.seal();

        assert_eq!(frame, vec![STX, 4, 0x05, 1, 1, 0x42, 0x05 ^ 1 ^ 1 ^ 0x42]);
        assert!(verify_checksum(&frame));
    }

    #[test]
    fn test_empty_frame() {
        let frame = FrameBuilder::begin(0x09).seal();
        assert_eq!(frame, vec![STX, 1, 0x09, 0x09]);
        let parsed = Frame::parse(&frame).unwrap();
        assert_eq!(parsed.records().count(), 0);
    }

    #[test]
    fn test_out_of_range_int_leaves_frame_intact() {
        let mut builder = FrameBuilder::begin(0x01);
        builder.append_uint(1, 10).unwrap();
        let before = builder.len();
        assert!(builder.append_uint(2, u64::MAX).is_err());
        assert_eq!(builder.len(), before);
        let frame = builder.seal();
        assert!(verify_checksum(&frame));
    }

    #[test]
    fn test_overflow_rejected_at_max_frame_size() {
        let mut builder = FrameBuilder::begin(0x02);
        // 3 header + 42 * 6 = 255, plus checksum = 256
        for id in 0..42u8 {
            builder.append_f32(id, 1.0).unwrap();
        }
        let err = builder.append_uint(99, 1).unwrap_err();
        assert_eq!(
            err,
            FrameError::EncodeOverflow {
                needed: 259,
                max: MAX_FRAME_SIZE
            }
        );
        let frame = builder.seal();
        assert_eq!(frame.len(), MAX_FRAME_SIZE);
        assert_eq!(frame[1], 253);
        assert!(verify_checksum(&frame));
    }

    #[test]
    fn test_with_buffer_discards_stale_bytes() {
        let scratch = vec![0xEE; 64];
        let mut builder = FrameBuilder::with_buffer(scratch, 0x01);
        builder.append_uint(1, 1).unwrap();
        let frame = builder.seal();
        assert_eq!(frame.len(), 7);
        assert!(frame.iter().all(|&b| b != 0xEE));
    }

    #[test]
    fn test_decode_header_rejects_short_and_bad_frames() {
        assert_eq!(
            decode_header(&[STX, 1, 0x01]),
            Err(FrameError::Truncated {
                needed: 4,
                actual: 3
            })
        );
        assert_eq!(
            decode_header(&[0x7E, 1, 0x01, 0x01]),
            Err(FrameError::BadStartByte { found: 0x7E })
        );
        assert_eq!(
            decode_header(&[STX, 5, 0x01, 0x01]),
            Err(FrameError::Truncated {
                needed: 8,
                actual: 4
            })
        );
        assert!(decode_header(&[STX, 0, 0x01, 0x01]).is_err());

        let mut oversized = vec![0u8; 258];
        oversized[0] = STX;
        oversized[1] = 254;
        assert_eq!(
            decode_header(&oversized),
            Err(FrameError::LengthOutOfRange { length: 254 })
        );
    }

    #[test]
    fn test_decode_tlv_at_walks_records() {
        let mut builder = FrameBuilder::begin(0x01);
        builder.append_uint(1, 1500).unwrap();
        builder.append_timestamp(7).unwrap();
        let frame = builder.seal();

        let first = decode_tlv_at(&frame, FRAME_HEADER_BYTES).unwrap();
        assert_eq!((first.id, first.size), (1, 2));
        assert_eq!(first.as_uint(), Ok(1500));

        let second = decode_tlv_at(&frame, first.next).unwrap();
        assert_eq!((second.id, second.size), (TIMESTAMP_TLV_ID, 4));
        assert_eq!(second.as_uint(), Ok(7));
        assert_eq!(second.next, frame.len() - 1);

        assert!(matches!(
            decode_tlv_at(&frame, second.next),
            Err(FrameError::TlvOverrun { .. })
        ));
    }

    #[test]
    fn test_record_running_past_frame_is_rejected() {
        // record claims 4 value bytes but the body only holds 2
        let body = [0x01u8, 1, 4, 0xAA, 0xBB];
        let mut frame = vec![STX, body.len() as u8];
        frame.extend_from_slice(&body);
        frame.push(xor_checksum(&body));

        let parsed = Frame::parse(&frame).unwrap();
        let records: Vec<_> = parsed.records().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0],
            Err(FrameError::TlvOverrun { offset: 3, end: 7 })
        );
    }

    #[test]
    fn test_records_iterator_is_restartable() {
        let mut builder = FrameBuilder::begin(0x02);
        builder.append_f32(1, 0.5).unwrap();
        builder.append_f32(2, -2.0).unwrap();
        let bytes = builder.seal();
        let frame = Frame::parse(&bytes).unwrap();

        let first: Vec<u8> = frame.records().map(|r| r.unwrap().id).collect();
        let second: Vec<u8> = frame.records().map(|r| r.unwrap().id).collect();
        assert_eq!(first, vec![1, 2]);
        assert_eq!(first, second);
        assert_eq!(frame.field(2).unwrap().as_f32(), Ok(-2.0));
        assert_eq!(frame.field(3), Err(FrameError::MissingField { id: 3 }));
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() {
        let mut bytes = FrameBuilder::begin(0x01).seal();
        let len = bytes.len();
        bytes.extend_from_slice(&[0xFF, 0xFF]);
        let frame = Frame::parse(&bytes).unwrap();
        assert_eq!(frame.as_bytes().len(), len);
    }

    #[test]
    fn test_checksum_mismatch_reported() {
        let mut builder = FrameBuilder::begin(0x01);
        builder.append_uint(1, 1500).unwrap();
        let mut bytes = builder.seal();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(!verify_checksum(&bytes));
        assert!(matches!(
            Frame::parse(&bytes),
            Err(FrameError::ChecksumMismatch { .. })
        ));
    }
}
