//! Command-line monitor for R48xx rectifiers.
//!
//! Run with: cargo run --features cli -- -v 53.5 -c 10 can0
//!
//! Polls the module once per second and prints a report for every completed
//! telemetry burst. `-v` and `-c` send set-points at startup; `-s` stores
//! them in non-volatile memory as well.

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use r48xx::utils::format_description;
use r48xx::{
    AckOutcome, Command, CurrentScale, EventSink, Monitor, MonitorConfig, RectifierParameters,
    SocketCanTransport,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "r48xx", version, about = "R48xx rectifier CAN monitor")]
struct Args {
    /// Set output voltage (V)
    #[arg(short = 'v', value_name = "VOLTAGE")]
    voltage: Option<f32>,

    /// Set maximum output current (A)
    #[arg(short = 'c', value_name = "CURRENT")]
    current: Option<f32>,

    /// Also store the settings in non-volatile (off-line) memory
    #[arg(short = 's')]
    store: bool,

    /// Max output current divisor of the connected module
    #[arg(long, default_value_t = 30.0)]
    current_scale: f32,

    /// Seconds between telemetry requests, 0 disables polling
    #[arg(long, default_value_t = 1.0)]
    interval: f64,

    /// CAN interface, e.g. can0
    interface: String,
}

impl Args {
    fn startup_commands(&self, scale: CurrentScale) -> r48xx::Result<Vec<Command>> {
        let mut commands = Vec::new();
        if let Some(voltage) = self.voltage {
            commands.push(Command::set_voltage(voltage, false)?);
            if self.store {
                commands.push(Command::set_voltage(voltage, true)?);
            }
        }
        if let Some(current) = self.current {
            commands.push(Command::set_current(current, false, scale)?);
            if self.store {
                commands.push(Command::set_current(current, true, scale)?);
            }
        }
        Ok(commands)
    }

    fn config(&self, scale: CurrentScale) -> r48xx::Result<MonitorConfig> {
        let config = MonitorConfig::new(&self.interface, scale);
        if self.interval == 0.0 {
            return Ok(config.without_polling());
        }
        let interval = Duration::try_from_secs_f64(self.interval)
            .map_err(|e| r48xx::R48xxError::invalid_parameter("interval", e.to_string()))?;
        Ok(config.with_poll_interval(interval))
    }
}

/// Prints everything the module reports to stdout.
struct Report;

impl EventSink for Report {
    fn on_snapshot(&mut self, snapshot: &RectifierParameters) {
        println!("{}", snapshot);
    }

    fn on_description(&mut self, text: [u8; 6]) {
        print!("{}", format_description(&text));
        let _ = std::io::stdout().flush();
    }

    fn on_ack(&mut self, outcome: &AckOutcome) {
        println!("{}", outcome);
    }
}

async fn run(args: Args) -> r48xx::Result<()> {
    let scale = CurrentScale::new(args.current_scale)?;
    let startup = args.startup_commands(scale)?;
    let config = args.config(scale)?;

    let transport = SocketCanTransport::open(config.interface())?;
    let monitor = Monitor::new(transport, config)?;

    let shutdown = monitor.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, shutting down");
            shutdown.cancel();
        }
    });

    monitor.run(Report, startup).await
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
