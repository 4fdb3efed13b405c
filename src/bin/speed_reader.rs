// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Usage:
//   speed_reader
//
// Attaches to the "speed_shm" segment and "speed_sem" semaphore created by
// the publisher and prints the speed once per second until Ctrl-C or SIGTERM.
// Diagnostics go to stderr, filtered by RUST_LOG (default: info).
//
// Exit codes: 0 after Ctrl-C or SIGTERM, 1 if attaching failed, 2 if the
// read loop hit a fatal error. A hard kill skips cleanup entirely.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use speed_reader::{ReaderConfig, SpeedReader};
use tracing::{error, info, warn};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::Release)) {
            warn!(error = %e, "failed to install Ctrl-C handler; stop with a signal instead");
        }
    }

    let mut reader = match SpeedReader::attach(ReaderConfig::default()) {
        Ok(reader) => reader,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(e.exit_code());
        }
    };

    println!("Connected to shared memory and semaphore.");
    println!("Reading speed data...");

    let result = reader.run(&stop, |speed| println!("Speed received: {speed} km/h"));

    if let Err(e) = reader.detach() {
        warn!(error = %e, "cleanup incomplete");
    }
    println!("\nReader stopped.");

    match result {
        Ok(reads) => {
            info!(reads, "reader finished");
            ExitCode::SUCCESS
        }
        // run() already logged the error
        Err(_) => ExitCode::from(2),
    }
}
