use clap::Parser;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tetra_config::{ReceiverConfig, StreamKind, toml_config};
use tetra_core::debug;
use tetra_rx::Decoder;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "TETRA air-interface monitor",
    long_about = "Decodes TETRA downlink and uplink traffic from a bit or IQ \
                  stream and emits parsed packets as JSON over UDP"
)]
struct Args {
    /// TOML config file; omit to run with defaults
    config: Option<String>,

    /// UDP port receiving from the phy front end
    #[arg(short = 'r', long)]
    receive_port: Option<u16>,

    /// UDP port the decoded JSON packets are sent to
    #[arg(short = 't', long)]
    send_port: Option<u16>,

    /// Replay ingress from a binary file instead of the socket
    #[arg(short = 'i', long)]
    input_file: Option<String>,

    /// Record the raw ingress byte stream to a file for later replay
    #[arg(short = 'o', long)]
    output_file: Option<String>,

    /// Treat each ingress octet as 8 packed bits (LSB first)
    #[arg(short = 'P', long)]
    packed: bool,

    /// Ingress carries raw IQ samples instead of bits
    #[arg(long)]
    iq: bool,

    /// Decode uplink only, using this scrambling code instead of a BSCH
    #[arg(long)]
    uplink_scrambling_code: Option<u32>,
}

fn load_config(args: &Args) -> ReceiverConfig {
    let mut cfg = match &args.config {
        Some(path) => match toml_config::from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Failed to load configuration from {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => ReceiverConfig::default(),
    };

    // command line overrides
    if let Some(v) = args.receive_port {
        cfg.receive_port = v;
    }
    if let Some(v) = args.send_port {
        cfg.send_port = v;
    }
    if args.input_file.is_some() {
        cfg.input_file = args.input_file.clone();
    }
    if args.output_file.is_some() {
        cfg.output_file = args.output_file.clone();
    }
    if args.packed {
        cfg.packed = true;
    }
    if args.iq {
        cfg.stream = StreamKind::Iq;
    }
    if args.uplink_scrambling_code.is_some() {
        cfg.uplink_scrambling_code = args.uplink_scrambling_code;
    }

    cfg
}

fn main() {
    let args = Args::parse();
    let cfg = load_config(&args);
    let _log_guard = debug::setup_logging_default(cfg.debug_log.clone());

    tracing::info!("tetra-monitor {}", tetra_core::RECEIVER_VERSION);

    // Ctrl+C flips the shared termination flag; every stage finishes its
    // in-flight work and exits
    let termination = Arc::new(AtomicBool::new(false));
    let t = Arc::clone(&termination);
    ctrlc::set_handler(move || {
        t.store(true, Ordering::Release);
    })
    .expect("failed to set Ctrl+C handler");

    match Decoder::new(cfg).run(termination) {
        Ok(_) => {}
        Err(e) => {
            tracing::error!("pipeline failed: {}", e);
            std::process::exit(1);
        }
    }
}
