//! Bidirectional message transport the link runs over.
//!
//! Sends are best effort: an error means the frame is gone, nothing is queued
//! for retry. Inbound messages arrive on a channel owned by the transport.

pub mod memory;
pub mod udp;

use thiserror::Error;

pub use memory::MemoryTransport;
pub use udp::UdpTransport;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Send attempted while disconnected
    #[error("transport unavailable")]
    Unavailable,
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Binary(Vec<u8>),
}

impl Inbound {
    /// Binary unless the payload is UTF-8 that does not open with a start byte.
    pub fn classify(bytes: Vec<u8>) -> Self {
        if bytes.first() == Some(&crate::utils::consts::STX) {
            return Inbound::Binary(bytes);
        }
        match String::from_utf8(bytes) {
            Ok(text) => Inbound::Text(text),
            Err(e) => Inbound::Binary(e.into_bytes()),
        }
    }
}

pub trait Transport {
    fn is_connected(&self) -> bool;

    /// Fire-and-forget send of one complete frame.
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        (**self).send(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_inbound() {
        assert_eq!(
            Inbound::classify(b"motor ok".to_vec()),
            Inbound::Text("motor ok".into())
        );
        assert_eq!(
            Inbound::classify(vec![0x02, 0x41]),
            Inbound::Binary(vec![0x02, 0x41])
        );
        assert_eq!(
            Inbound::classify(vec![0xFF, 0xFE]),
            Inbound::Binary(vec![0xFF, 0xFE])
        );
    }
}
