use std::fs::OpenOptions;
use std::sync::Once;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt as tracingfmt};

static INIT_LOG: Once = Once::new();

/// Sets up logging with maximum verbosity (trace level).
/// Mainly for unit tests.
pub fn setup_logging_verbose() {
    setup_logging(EnvFilter::new("trace"), None);
}

/// Sets up default logging to stdout and optionally a verbose log file.
/// Returns a guard that must be kept alive for file logging to keep working.
pub fn setup_logging_default(verbose_logfile: Option<String>) -> Option<WorkerGuard> {
    let logfile_and_filter = verbose_logfile.map(|file| (file, EnvFilter::new("debug")));
    setup_logging(get_default_stdout_filter(), logfile_and_filter)
}

pub fn get_default_stdout_filter() -> EnvFilter {
    EnvFilter::new("info")
        // Hide continuous per-bit/per-burst logs from the hot path
        .add_directive("tetra_core::bitbuffer=warn".parse().unwrap())
        .add_directive("tetra_rx::sync=info".parse().unwrap())
        .add_directive("tetra_rx::lmac=info".parse().unwrap())
        // Decoded packets are the interesting part
        .add_directive("tetra_rx::umac=debug".parse().unwrap())
        .add_directive("tetra_pdus=debug".parse().unwrap())
}

fn setup_logging(stdout_filter: EnvFilter, outfile: Option<(String, EnvFilter)>) -> Option<WorkerGuard> {
    if let Some((outfile, outfile_filter)) = outfile {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(outfile)
            .expect("Failed to open log file");
        let (file_writer, guard) = tracing_appender::non_blocking(file);

        INIT_LOG.call_once(|| {
            let file_layer = tracingfmt::layer().with_writer(file_writer).with_ansi(false);
            let stdout_layer = tracingfmt::layer();
            tracing_subscriber::registry()
                .with(file_layer.with_filter(outfile_filter))
                .with(stdout_layer.with_filter(stdout_filter))
                .init();
        });

        Some(guard)
    } else {
        INIT_LOG.call_once(|| {
            let stdout_layer = tracingfmt::layer();
            tracing_subscriber::registry()
                .with(stdout_layer.with_filter(stdout_filter))
                .init();
        });
        None
    }
}
