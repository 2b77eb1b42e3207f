// Byte-at-a-time frame receiver.
//
// Hunts for STX, reads the length, collects the body and checksum, then
// validates. A failed frame is reported once and the bytes after its start
// byte are rescanned, so a stray STX or a broken frame never swallows the
// frames behind it.

use std::collections::VecDeque;

use tracing::trace;

use super::checksum::xor_checksum;
use super::error::FrameError;
use crate::utils::consts::*;

type RxResult = Result<Vec<u8>, FrameError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    Hunting,
    Length,
    Body { remaining: usize },
    Checksum,
}

#[derive(Debug)]
pub struct FrameReceiver {
    state: RxState,
    buf: Vec<u8>,
    skipped: usize,
    /// The frame in progress started on a rescanned byte
    rescanned: bool,
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReceiver {
    pub fn new() -> Self {
        Self {
            state: RxState::Hunting,
            buf: Vec::with_capacity(MAX_FRAME_SIZE),
            skipped: 0,
            rescanned: false,
        }
    }

    pub fn reset(&mut self) {
        self.state = RxState::Hunting;
        self.buf.clear();
        self.rescanned = false;
    }

    /// Bytes discarded while hunting for a start byte
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Push one byte. Returns every frame it completed (STX through
    /// checksum) and every frame it caused to be dropped.
    pub fn feed(&mut self, byte: u8) -> Vec<RxResult> {
        let mut out = Vec::new();
        self.push(byte, &mut out);
        out
    }

    /// Feed a whole message, collecting every completed frame or error.
    pub fn feed_all(&mut self, bytes: &[u8]) -> Vec<RxResult> {
        let mut out = Vec::new();
        for &byte in bytes {
            self.push(byte, &mut out);
        }
        out
    }

    /// Close a message: a frame still in progress is reported as truncated
    /// and the bytes behind its start byte are rescanned for complete frames.
    /// The receiver is hunting afterwards.
    pub fn finish(&mut self) -> Vec<RxResult> {
        let mut out = Vec::new();
        while self.in_frame() {
            let actual = self.buf.len();
            let needed = match self.state {
                RxState::Body { remaining } => actual + remaining + 1,
                RxState::Checksum => actual + 1,
                RxState::Length | RxState::Hunting => MIN_FRAME_BYTES,
            };
            let mut pending = VecDeque::new();
            let error = FrameError::Truncated { needed, actual };
            self.drop_frame(error, &mut pending, &mut out);
            self.drain(pending, &mut out);
        }
        out
    }

    /// True while a frame is partially received
    pub fn in_frame(&self) -> bool {
        self.state != RxState::Hunting
    }

    fn push(&mut self, byte: u8, out: &mut Vec<RxResult>) {
        let mut pending = VecDeque::new();
        if let Err(error) = self.step(byte, false, out) {
            self.drop_frame(error, &mut pending, out);
        }
        self.drain(pending, out);
    }

    fn drain(&mut self, mut pending: VecDeque<u8>, out: &mut Vec<RxResult>) {
        while let Some(byte) = pending.pop_front() {
            if let Err(error) = self.step(byte, true, out) {
                self.drop_frame(error, &mut pending, out);
            }
        }
    }

    fn step(
        &mut self,
        byte: u8,
        rescanned: bool,
        out: &mut Vec<RxResult>,
    ) -> Result<(), FrameError> {
        match self.state {
            RxState::Hunting => {
                if byte == STX {
                    self.buf.clear();
                    self.buf.push(byte);
                    self.rescanned = rescanned;
                    self.state = RxState::Length;
                } else {
                    self.skipped += 1;
                }
            }
            RxState::Length => {
                self.buf.push(byte);
                let length = byte as usize;
                if length == 0 {
                    return Err(FrameError::Truncated {
                        needed: MIN_FRAME_BYTES,
                        actual: FRAME_HEADER_BYTES,
                    });
                }
                if length > MAX_BODY_LEN {
                    return Err(FrameError::LengthOutOfRange { length: byte });
                }
                self.state = RxState::Body { remaining: length };
            }
            RxState::Body { remaining } => {
                self.buf.push(byte);
                self.state = if remaining > 1 {
                    RxState::Body {
                        remaining: remaining - 1,
                    }
                } else {
                    RxState::Checksum
                };
            }
            RxState::Checksum => {
                let computed = xor_checksum(&self.buf[2..]);
                self.buf.push(byte);
                if computed != byte {
                    return Err(FrameError::ChecksumMismatch {
                        expected: byte,
                        computed,
                    });
                }
                self.state = RxState::Hunting;
                out.push(Ok(std::mem::take(&mut self.buf)));
            }
        }
        Ok(())
    }

    /// Abandon the frame in progress. Its start byte counts as skipped and
    /// the rest goes back in front of `pending`. A false start found while
    /// rescanning is not reported again.
    fn drop_frame(
        &mut self,
        error: FrameError,
        pending: &mut VecDeque<u8>,
        out: &mut Vec<RxResult>,
    ) {
        let bytes = std::mem::take(&mut self.buf);
        self.state = RxState::Hunting;
        self.skipped += 1;
        for &b in bytes.iter().skip(1).rev() {
            pending.push_front(b);
        }
        if self.rescanned {
            trace!("false start while resyncing: {}", error);
        } else {
            trace!("stream frame dropped, resyncing: {}", error);
            out.push(Err(error));
        }
        self.rescanned = false;
    }
}
