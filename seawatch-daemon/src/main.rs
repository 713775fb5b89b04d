// Seawatch Daemon - Acquisition daemon
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Seawatch Daemon
//!
//! Runs the acquisition engine for the drone and the buoy, logging
//! readings, alerts and a periodic status report.
//!
//! ## Usage
//!
//! ```bash
//! # Presets, hardware ports
//! seawatch
//!
//! # Partial JSON configuration, simulation only
//! seawatch --config seawatch.json --simulate-only
//!
//! # Print the effective configuration
//! seawatch --config seawatch.json print-config
//!
//! # Emulate the buoy firmware on a serial port
//! seawatch emit buoy --port /dev/pts/4 --seed 7
//! ```

mod emitter;
mod sinks;

use clap::{Parser, Subcommand, ValueEnum};
use emitter::{Emitter, EmitterOptions};
use seawatch::{SystemClock, Unit};
use seawatch_gateway::{system_ports, Engine, EngineConfig, EngineHandle};
use sinks::LogSink;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// Seawatch telemetry acquisition daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration merged over the presets
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Never open serial ports; simulate every reading
    #[arg(long)]
    simulate_only: bool,

    /// Seconds between status reports (0 disables them)
    #[arg(long, default_value = "30")]
    status_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective configuration as JSON and exit
    PrintConfig,

    /// Emulate a unit: write simulated wire lines to a serial port
    Emit {
        /// Unit to emulate
        #[arg(value_enum)]
        unit: UnitArg,

        /// Serial port to write to
        #[arg(short, long)]
        port: String,

        /// Line speed
        #[arg(short, long, default_value = "9600")]
        baud: u32,

        /// Milliseconds between lines (defaults to the unit's cadence)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Simulation seed
        #[arg(long)]
        seed: Option<u64>,

        /// Stop after this many lines
        #[arg(long)]
        count: Option<u64>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum UnitArg {
    Drone,
    Buoy,
}

impl From<UnitArg> for Unit {
    fn from(arg: UnitArg) -> Self {
        match arg {
            UnitArg::Drone => Unit::Drone,
            UnitArg::Buoy => Unit::Buoy,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Seawatch v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Some(Command::Emit {
            unit,
            port,
            baud,
            interval_ms,
            seed,
            count,
        }) => {
            let mut options = EmitterOptions::new(unit.into(), port);
            options.baud_rate = baud;
            options.seed = seed;
            options.count = count;
            if let Some(ms) = interval_ms {
                options.interval = Duration::from_millis(ms.max(1));
            }
            emit(options).await
        }
        Some(Command::PrintConfig) => match load_config(&args.config, args.simulate_only) {
            Ok(config) => match config.to_json_string() {
                Ok(json) => {
                    println!("{}", json);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("Cannot serialize configuration: {}", e);
                    ExitCode::FAILURE
                }
            },
            Err(code) => code,
        },
        None => match load_config(&args.config, args.simulate_only) {
            Ok(config) => serve(config, args.status_interval).await,
            Err(code) => code,
        },
    }
}

fn load_config(path: &Option<PathBuf>, simulate_only: bool) -> Result<EngineConfig, ExitCode> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            EngineConfig::from_json_file(path)
        }
        None => {
            info!("No configuration file, using presets");
            Ok(EngineConfig::default())
        }
    };
    match config {
        Ok(config) if simulate_only => Ok(config.simulate_only()),
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Invalid configuration: {}", e);
            Err(ExitCode::FAILURE)
        }
    }
}

async fn serve(config: EngineConfig, status_interval: u64) -> ExitCode {
    let sink = Arc::new(LogSink);
    let handle = match Engine::new(config)
        .with_reading_sink(sink.clone())
        .with_alert_sink(sink)
        .start()
    {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start engine: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if status_interval == 0 {
        wait_for_ctrl_c().await;
    } else {
        report_until(
            &handle,
            Duration::from_secs(status_interval),
            wait_for_ctrl_c(),
        )
        .await;
    }

    info!("Shutting down");
    match handle.shutdown().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Unclean shutdown: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Report status on every interval until `stop` completes; returns the report count
async fn report_until(handle: &EngineHandle, every: Duration, stop: impl Future<Output = ()>) -> u64 {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    tokio::pin!(stop);
    let mut reports = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                report_status(handle);
                reports += 1;
            }
            _ = &mut stop => break,
        }
    }
    reports
}

fn report_status(handle: &EngineHandle) {
    for unit in handle.units() {
        let stats = handle.stats(unit).unwrap_or_default();
        match handle.latest(unit) {
            Some(snapshot) => info!(
                unit = %unit,
                provenance = %snapshot.reading.provenance,
                link = %snapshot.link.state,
                port = snapshot.link.port.as_deref().unwrap_or("-"),
                attempts = snapshot.link.reconnect_attempts,
                ticks = stats.ticks,
                real = stats.real_readings,
                alerts = stats.alerts,
                link_failures = stats.link_failures,
                discarded_partials = stats.discarded_partials,
                "Status"
            ),
            None => info!(unit = %unit, "Status: no data yet"),
        }
    }
}

async fn emit(options: EmitterOptions) -> ExitCode {
    let emitter = match Emitter::new(options, system_ports(), Arc::new(SystemClock)) {
        Ok(emitter) => emitter,
        Err(e) => {
            error!("Invalid simulation: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (shutdown, rx) = watch::channel(false);
    let task = tokio::spawn(emitter.run(rx));
    tokio::select! {
        _ = wait_for_ctrl_c() => {
            let _ = shutdown.send(true);
        }
        _ = shutdown.closed() => {}
    }

    match task.await {
        Ok(sent) => {
            info!("Emitted {} lines", sent);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Emitter failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test(start_paused = true)]
    async fn test_status_loop_stops_on_signal_between_reports() {
        let handle = Engine::new(EngineConfig::default().simulate_only())
            .start()
            .unwrap();

        let (tx, rx) = oneshot::channel::<()>();
        let stop = async {
            let _ = rx.await;
        };
        let signal = async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            let _ = tx.send(());
        };

        let (reports, ()) = tokio::join!(report_until(&handle, Duration::from_secs(1), stop), signal);
        assert_eq!(reports, 2);
        handle.shutdown().await.unwrap();
    }

    #[test]
    fn test_emit_arguments() {
        let args = Args::try_parse_from(["seawatch", "emit", "buoy", "--port", "/dev/pts/4", "--count", "3"])
            .unwrap();
        match args.command {
            Some(Command::Emit { unit, port, count, baud, .. }) => {
                assert_eq!(Unit::from(unit), Unit::Buoy);
                assert_eq!(port, "/dev/pts/4");
                assert_eq!(count, Some(3));
                assert_eq!(baud, 9600);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
