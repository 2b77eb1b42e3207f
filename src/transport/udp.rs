use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, trace, warn};

use super::{Inbound, Transport, TransportError};
use crate::utils::consts::{MAX_DATAGRAM_SIZE, READER_POLL_MS};
use crate::utils::dump::to_hex;

/// One frame per datagram.
///
/// Without a configured peer the transport answers whoever sent the most
/// recent datagram, and stays disconnected until the first one arrives.
pub struct UdpTransport {
    socket: UdpSocket,
    peer: Arc<Mutex<Option<SocketAddr>>>,
    running: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

fn resolve(addr: &str) -> Result<SocketAddr, TransportError> {
    addr.to_socket_addrs()?
        .next()
        .ok_or_else(|| {
            TransportError::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("no address for {}", addr),
            ))
        })
}

impl UdpTransport {
    /// Bind `bind` and start the reader thread. Inbound datagrams are
    /// delivered on the returned channel.
    pub fn open(
        bind: &str,
        peer: Option<&str>,
    ) -> Result<(Self, Receiver<Inbound>), TransportError> {
        let socket = UdpSocket::bind(resolve(bind)?)?;
        socket.set_read_timeout(Some(Duration::from_millis(READER_POLL_MS)))?;
        let peer = match peer {
            Some(addr) => Some(resolve(addr)?),
            None => None,
        };
        info!(
            "UDP transport bound to {} (peer: {})",
            socket.local_addr()?,
            peer.map(|p| p.to_string())
                .unwrap_or_else(|| "learned".into())
        );

        let learn_peer = peer.is_none();
        let peer = Arc::new(Mutex::new(peer));
        let running = Arc::new(AtomicBool::new(true));
        let (tx, rx) = crossbeam_channel::unbounded::<Inbound>();

        let reader_socket = socket.try_clone()?;
        let r_peer = peer.clone();
        let r_running = running.clone();
        let reader = thread::spawn(move || {
            read_loop(reader_socket, tx, r_peer, r_running, learn_peer);
        });

        Ok((
            Self {
                socket,
                peer,
                running,
                reader: Some(reader),
            },
            rx,
        ))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    fn peer(&self) -> Option<SocketAddr> {
        match self.peer.lock() {
            Ok(peer) => *peer,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Stop the reader thread; later sends fail with `Unavailable`.
    pub fn close(&mut self) {
        self.running
            .store(false, Ordering::SeqCst);
        if let Some(handle) = self.reader.take() {
            if handle.join().is_err() {
                warn!("UDP reader thread panicked");
            }
        }
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl Transport for UdpTransport {
    fn is_connected(&self) -> bool {
        self.running
            .load(Ordering::SeqCst)
            && self.peer().is_some()
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable);
        }
        let peer = self
            .peer()
            .ok_or(TransportError::Unavailable)?;
        trace!("UDP -> {}: {}", peer, to_hex(frame));
        self.socket.send_to(frame, peer)?;
        Ok(())
    }
}

fn read_loop(
    socket: UdpSocket,
    tx: Sender<Inbound>,
    peer: Arc<Mutex<Option<SocketAddr>>>,
    running: Arc<AtomicBool>,
    learn_peer: bool,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    while running.load(Ordering::SeqCst) {
        match socket.recv_from(&mut buf) {
            Ok((n, from)) => {
                trace!("UDP <- {}: {} bytes", from, n);
                if learn_peer {
                    let mut peer = match peer.lock() {
                        Ok(peer) => peer,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    if *peer != Some(from) {
                        debug!("UDP peer is now {}", from);
                        *peer = Some(from);
                    }
                }
                if tx
                    .send(Inbound::classify(buf[..n].to_vec()))
                    .is_err()
                {
                    // nobody is listening any more
                    break;
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                trace!("UDP peer refused: {}", e);
            }
            Err(e) => {
                warn!("UDP read error: {}", e);
                thread::sleep(Duration::from_millis(READER_POLL_MS));
            }
        }
    }
    debug!("UDP reader thread stopping");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_exchange_learns_peer() {
        let (mut vehicle, vehicle_rx) = UdpTransport::open("127.0.0.1:0", None).unwrap();
        assert!(!vehicle.is_connected());
        let vehicle_addr = vehicle.local_addr().unwrap().to_string();

        let (mut operator, operator_rx) =
            UdpTransport::open("127.0.0.1:0", Some(&vehicle_addr)).unwrap();
        assert!(operator.is_connected());

        operator.send(&[0x02, 0x01, 0x09, 0x09]).unwrap();
        let got = vehicle_rx
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert_eq!(got, Inbound::Binary(vec![0x02, 0x01, 0x09, 0x09]));
        assert!(vehicle.is_connected());

        vehicle.send(b"{\"battery\": 12.1}").unwrap();
        let reply = operator_rx
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert_eq!(reply, Inbound::Text("{\"battery\": 12.1}".into()));

        operator.close();
        assert!(!operator.is_connected());
        assert!(matches!(
            operator.send(&[0x02]),
            Err(TransportError::Unavailable)
        ));
    }
}
