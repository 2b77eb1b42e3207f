use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, select};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::scheduler::{TxScheduler, TxStats};
use crate::protocol::PidGains;
use crate::telemetry::{InboundDecoder, RxStats, Telemetry};
use crate::transport::{Inbound, Transport};

/// Operator actions delivered to a running session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Pause,
    Resume,
    SendConfig(PidGains),
    Shutdown,
}

/// Cloneable control handle of a `Session`
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: Sender<Command>,
}

impl SessionHandle {
    fn post(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn pause(&self) -> bool {
        self.post(Command::Pause)
    }

    pub fn resume(&self) -> bool {
        self.post(Command::Resume)
    }

    pub fn send_config(&self, gains: PidGains) -> bool {
        self.post(Command::SendConfig(gains))
    }

    /// Stop the session. Once `run` returns no further tick fires.
    /// False if the session is already gone.
    pub fn cancel(&self) -> bool {
        self.post(Command::Shutdown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub tx: TxStats,
    pub rx: RxStats,
}

/// Single-threaded event loop: the fixed-period ticker, operator commands
/// and inbound messages are handled one at a time on the calling thread.
pub struct Session<T, C> {
    scheduler: TxScheduler<T, C>,
    period: Duration,
    control: Receiver<Command>,
    inbound: Receiver<Inbound>,
    decoder: InboundDecoder,
}

impl<T: Transport, C: Clock> Session<T, C> {
    pub fn new(scheduler: TxScheduler<T, C>, period: Duration) -> (Self, SessionHandle) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (
            Self {
                scheduler,
                period,
                control: rx,
                inbound: crossbeam_channel::never(),
                decoder: InboundDecoder::new(),
            },
            SessionHandle { tx },
        )
    }

    pub fn with_inbound(mut self, inbound: Receiver<Inbound>) -> Self {
        self.inbound = inbound;
        self
    }

    /// Run until cancelled or every handle is dropped.
    pub fn run(self, mut on_telemetry: impl FnMut(Telemetry)) -> SessionReport {
        let Session {
            mut scheduler,
            period,
            control,
            inbound,
            mut decoder,
        } = self;
        let closed = crossbeam_channel::never::<Inbound>();
        let mut inbound_open = true;
        let ticker = crossbeam_channel::tick(period);
        info!("session started, tick every {:?}", period);

        loop {
            let inbound_rx = if inbound_open { &inbound } else { &closed };
            select! {
                recv(ticker) -> _ => {
                    scheduler.tick();
                }
                recv(control) -> command => match command {
                    Ok(Command::Pause) => {
                        debug!("RC transmission paused");
                        scheduler.pause();
                    }
                    Ok(Command::Resume) => {
                        debug!("RC transmission resumed");
                        scheduler.resume();
                    }
                    Ok(Command::SendConfig(gains)) => {
                        if let Err(e) = scheduler.send_config(&gains) {
                            warn!("config not sent: {}", e);
                        }
                    }
                    Ok(Command::Shutdown) | Err(_) => break,
                },
                recv(inbound_rx) -> message => match message {
                    Ok(message) => {
                        let arrival = scheduler.now_ms();
                        for item in decoder.handle(message, arrival) {
                            on_telemetry(item);
                        }
                    }
                    Err(_) => {
                        debug!("inbound channel closed");
                        inbound_open = false;
                    }
                },
            }
        }

        let report = SessionReport {
            tx: scheduler.stats(),
            rx: decoder.stats(),
        };
        info!("session stopped: {:?}", report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputState;
    use crate::transmission::clock::ManualClock;
    use crate::transmission::latest::Latest;
    use crate::transport::MemoryTransport;
    use std::thread;

    #[test]
    fn test_no_ticks_after_cancel() {
        let transport = MemoryTransport::new();
        let scheduler = TxScheduler::new(
            transport.clone(),
            Latest::new(InputState::default()),
            ManualClock::new(0),
        );
        let (session, handle) = Session::new(scheduler, Duration::from_millis(5));
        let worker = thread::spawn(move || session.run(|_| {}));

        thread::sleep(Duration::from_millis(60));
        assert!(handle.cancel());
        let report = worker.join().unwrap();
        let sent_at_cancel = transport.sent_count();
        assert!(sent_at_cancel > 0);
        assert_eq!(report.tx.sent, sent_at_cancel as u64);

        thread::sleep(Duration::from_millis(100));
        assert_eq!(transport.sent_count(), sent_at_cancel);
        assert!(!handle.cancel());
    }

    #[test]
    fn test_commands_and_inbound_are_handled() {
        let transport = MemoryTransport::new();
        let scheduler = TxScheduler::new(
            transport.clone(),
            Latest::new(InputState::default()),
            ManualClock::new(0),
        );
        // long period: only commands produce traffic
        let (session, handle) = Session::new(scheduler, Duration::from_secs(3600));
        let (inbound_tx, inbound_rx) = crossbeam_channel::unbounded();
        let session = session.with_inbound(inbound_rx);
        let (seen_tx, seen_rx) = crossbeam_channel::unbounded();
        let worker = thread::spawn(move || {
            session.run(move |item| {
                let _ = seen_tx.send(item);
            })
        });

        inbound_tx
            .send(Inbound::Text("hello".into()))
            .unwrap();
        drop(inbound_tx);
        let item = seen_rx
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert_eq!(item, Telemetry::Text { line: "hello".into() });

        handle.pause();
        handle.send_config(PidGains::default());
        handle.cancel();
        let report = worker.join().unwrap();

        assert_eq!(report.tx.config_sent, 1);
        assert_eq!(report.tx.sent, 0);
        assert_eq!(report.rx.text, 1);
        assert_eq!(transport.sent_count(), 1);
    }
}
