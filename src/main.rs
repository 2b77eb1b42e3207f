use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use teleop_link::config::LinkConfig;
use teleop_link::console::{ConsoleCommand, parse_line};
use teleop_link::input::{InputState, KeyBindings};
use teleop_link::protocol::Frame;
use teleop_link::telemetry::{InboundDecoder, Telemetry, decode_frame};
use teleop_link::transmission::{Clock, Latest, Session, SessionHandle, TxScheduler, WallClock};
use teleop_link::transport::{Transport, UdpTransport};
use teleop_link::utils::consts::READER_POLL_MS;
use teleop_link::utils::dump::{FrameDump, from_hex};
use teleop_link::utils::logging::init_logging;

#[derive(Parser)]
#[command(author, version, about = "TLV command link for remote teleoperation", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Operator side: read key events from stdin, send RC frames at a fixed rate
    Drive {
        #[arg(short, long)]
        bind: Option<String>,
        #[arg(short, long)]
        peer: Option<String>,
        #[arg(short, long)]
        tick_ms: Option<u64>,
        #[arg(short, long)]
        speed: Option<u16>,
    },
    /// Vehicle side: decode inbound frames and answer with a status line
    Listen {
        #[arg(short, long)]
        bind: Option<String>,
        /// Print decoded items as JSON lines on stdout
        #[arg(long)]
        json: bool,
    },
    /// Decode one hex-encoded frame
    Inspect { hex: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => LinkConfig::load(path)?,
        None => LinkConfig::default(),
    };
    init_logging(&config.log_level);

    match cli.command {
        Commands::Drive {
            bind,
            peer,
            tick_ms,
            speed,
        } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if let Some(peer) = peer {
                config.peer = peer;
            }
            if let Some(tick_ms) = tick_ms {
                config.tick_ms = tick_ms;
            }
            if let Some(speed) = speed {
                config.speed_limit = speed;
            }
            config.validate()?;
            run_drive(config)
        }
        Commands::Listen { bind, json } => {
            let bind = bind.unwrap_or_else(|| config.peer.clone());
            run_listen(&bind, json)
        }
        Commands::Inspect { hex } => run_inspect(&hex),
    }
}

fn run_drive(config: LinkConfig) -> anyhow::Result<()> {
    info!("=== Drive Mode ===");
    let (transport, inbound) = UdpTransport::open(&config.bind, Some(&config.peer))?;

    let input = Latest::new(InputState::with_speed_limit(config.speed_limit));
    let scheduler = TxScheduler::new(transport, input.clone(), WallClock::new());
    let (session, handle) = Session::new(scheduler, config.tick_period());
    let session = session.with_inbound(inbound);

    let ctrl = handle.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        ctrl.cancel();
    }) {
        warn!("Ctrl+C handler not installed: {}", e);
    }

    let keys = config.keys.clone();
    let gains = config.gains;
    // Detached: it may be blocked on stdin when the session ends.
    thread::spawn(move || run_console(input, handle, keys, gains));

    info!("Commands: down <key>, up <key>, tap <key>, speed <n>, pid <P> <I> <D>, pause, resume, status, quit");
    let report = session.run(|item| log_telemetry(&item));
    info!(
        "sent {} RC frames, {} config frames, received {} frames ({} dropped)",
        report.tx.sent, report.tx.config_sent, report.rx.frames, report.rx.dropped
    );
    Ok(())
}

/// Owns the input state; publishes every new state to the scheduler's cell.
fn run_console(
    input: Latest<InputState>,
    handle: SessionHandle,
    keys: KeyBindings,
    gains: teleop_link::protocol::PidGains,
) {
    let mut state = input.load();
    let mut gains = gains;
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("stdin read error: {}", e);
                break;
            }
        };
        match parse_line(&line, &keys) {
            Ok(ConsoleCommand::Input(events)) => {
                let before = state.mode();
                for event in events {
                    state = state.apply(event);
                }
                input.store(state);
                if state.mode() != before {
                    info!("mode {:?} -> {:?}", before, state.mode());
                }
            }
            Ok(ConsoleCommand::SendConfig(new_gains)) => {
                gains = new_gains;
                handle.send_config(gains);
            }
            Ok(ConsoleCommand::Pause) => {
                handle.pause();
            }
            Ok(ConsoleCommand::Resume) => {
                handle.resume();
            }
            Ok(ConsoleCommand::Status) => {
                info!(
                    "{:?} throttle={} roll={} aux1={} aux2={} speed={} gains={:?}",
                    state.mode(),
                    state.throttle,
                    state.roll,
                    state.aux1,
                    state.aux2,
                    state.speed_limit(),
                    gains
                );
            }
            Ok(ConsoleCommand::Quit) => break,
            Ok(ConsoleCommand::Empty) => {}
            Err(e) => warn!("{}", e),
        }
    }
    handle.cancel();
}

fn log_telemetry(item: &Telemetry) {
    match item {
        Telemetry::Rc { packet, latency_ms } => {
            info!("RX RC {:?} ({} ms)", packet.channels, latency_ms)
        }
        Telemetry::Config { gains } => info!("RX config {:?}", gains),
        Telemetry::Unknown {
            frame_type,
            records,
        } => info!("RX frame type 0x{:02X} with {} records", frame_type, records),
        Telemetry::Json { value } => info!("RX {}", value),
        Telemetry::Text { line } => info!("RX {}", line),
    }
}

#[derive(Serialize)]
struct VehicleStatus {
    rx_frames: u64,
    rx_dropped: u64,
    last_latency_ms: Option<u32>,
}

fn run_listen(bind: &str, json: bool) -> anyhow::Result<()> {
    info!("=== Listen Mode ===");
    let (mut transport, inbound) = UdpTransport::open(bind, None)?;
    let mut decoder = InboundDecoder::new();
    let mut clock = WallClock::new();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .ok(); // Ignore error if handler already set

    let mut last_status = Instant::now();
    let mut last_latency = None;
    while running.load(Ordering::SeqCst) {
        match inbound.recv_timeout(Duration::from_millis(READER_POLL_MS)) {
            Ok(message) => {
                for item in decoder.handle(message, clock.now_ms()) {
                    if let Telemetry::Rc { latency_ms, .. } = &item {
                        last_latency = Some(*latency_ms);
                    }
                    if json {
                        println!("{}", serde_json::to_string(&item)?);
                    } else {
                        log_telemetry(&item);
                    }
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }

        if last_status.elapsed() >= Duration::from_secs(1) && transport.is_connected() {
            last_status = Instant::now();
            let stats = decoder.stats();
            let status = VehicleStatus {
                rx_frames: stats.frames,
                rx_dropped: stats.dropped,
                last_latency_ms: last_latency,
            };
            if let Err(e) = transport.send(&serde_json::to_vec(&status)?) {
                warn!("status not sent: {}", e);
            }
        }
    }

    transport.close();
    info!("listener stopped: {:?}", decoder.stats());
    Ok(())
}

fn run_inspect(hex: &str) -> anyhow::Result<()> {
    let Some(bytes) = from_hex(hex) else {
        bail!("not a hex string: {:?}", hex);
    };
    let frame = Frame::parse(&bytes).context("invalid frame")?;
    let dump = FrameDump::from_frame(&frame)?;
    println!("{}", serde_json::to_string_pretty(&dump)?);
    match decode_frame(frame.as_bytes(), 0) {
        Ok(item) => println!("{}", serde_json::to_string_pretty(&item)?),
        Err(e) => println!("records do not match the {:#04X} schema: {}", frame.frame_type(), e),
    }
    Ok(())
}
