//! # tricore CLI
//!
//! Entry point for the three roles this crate can run as: the aggregator
//! node (`aggregator`), the actuator node (`actuator`), or a one-shot
//! producer (`send`) standing in for the vision pipeline, the gamepad
//! layer, or the console — all black-box producers upstream of the
//! aggregator's reply endpoint.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tricore::actuator::Actuator;
use tricore::aggregator::Aggregator;
use tricore::executor::{ExecutorConfig, MotionExecutor};
use tricore::model::{Priority, Source};
use tricore::pins::LoggingPinSink;
use tricore::transport::heartbeat::{Publisher, Subscriber};
use tricore::transport::reqrep::Client;
use tricore::wire::{CommandRequest, Mode};

#[derive(Parser)]
#[command(
    name = "tricore",
    about = "Command bus and motion executor for a three-tier mobile robot control plane"
)]
struct Cli {
    /// Host the actuator's command/heartbeat channels are reachable on
    #[arg(long, env = "RPI_HOST", default_value = "127.0.0.1")]
    rpi_host: String,

    /// Host the aggregator's producer-facing channel is reachable on
    /// (used by `send` and by the aggregator's own bind address)
    #[arg(long, env = "AGGREGATOR_HOST", default_value = "127.0.0.1")]
    aggregator_host: String,

    /// Actuator command-channel port
    #[arg(long, env = "COMMAND_PORT", default_value_t = 5555)]
    command_port: u16,

    /// Actuator heartbeat-channel port
    #[arg(long, env = "HEARTBEAT_PORT", default_value_t = 5556)]
    heartbeat_port: u16,

    /// Aggregator's producer-facing port
    #[arg(long, env = "AGGREGATOR_PORT", default_value_t = 5557)]
    aggregator_port: u16,

    /// Default forward duration, seconds
    #[arg(long, env = "DUR_FORWARD", default_value_t = 0.5)]
    dur_forward: f64,

    /// Default backward duration, seconds
    #[arg(long, env = "DUR_BACKWARD", default_value_t = 0.5)]
    dur_backward: f64,

    /// Default left/right turn duration, seconds
    #[arg(long, env = "DUR_TURN", default_value_t = 0.3)]
    dur_turn: f64,

    /// Minimum interval between producer commands, seconds (producer-side; unused by `send`)
    #[arg(long, env = "SEND_COOLDOWN", default_value_t = 0.05)]
    send_cooldown: f64,

    /// Hold-to-repeat interval for held producer inputs, seconds (producer-side; unused by `send`)
    #[arg(long, env = "REPEAT_HOLD_INTERVAL", default_value_t = 0.15)]
    repeat_hold_interval: f64,

    /// Bounded history size kept by the aggregator
    #[arg(long, env = "HISTORY_CAPACITY", default_value_t = 100)]
    history_capacity: usize,

    /// Heartbeat publish period, seconds
    #[arg(long, env = "HEARTBEAT_PERIOD", default_value_t = 1.0)]
    heartbeat_period: f64,

    /// Heartbeat staleness threshold, seconds
    #[arg(long, env = "HEARTBEAT_STALE_AFTER", default_value_t = 3.0)]
    heartbeat_stale_after: f64,

    /// Pause held after a sequence completes uninterrupted, seconds
    #[arg(long, env = "POST_SEQUENCE_HOLD", default_value_t = 1.0)]
    post_sequence_hold: f64,

    /// Command-channel request timeout, seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 5.0)]
    request_timeout: f64,

    /// Command-channel retries before surfacing a transport error
    #[arg(long, env = "REQUEST_RETRIES", default_value_t = 3)]
    request_retries: u32,

    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand)]
enum Role {
    /// Run the aggregator node
    Aggregator,
    /// Run the actuator node
    Actuator,
    /// Submit one intent to a running aggregator and print the reply
    Send {
        /// Raw command text, e.g. "forward 2" or "seq forward 1; stop"
        cmd: String,
        /// Producer identity attached to the intent
        #[arg(long, value_enum, default_value_t = Source::Manual)]
        source: Source,
        /// Advisory priority attached to the intent
        #[arg(long, value_enum, default_value_t = Priority::Normal)]
        priority: Priority,
        /// Request mode; auto infers sequence vs single from a leading `seq `
        #[arg(long, value_enum, default_value_t = Mode::Auto)]
        mode: Mode,
    },
}

impl Cli {
    fn actuator_command_addr(&self) -> String {
        format!("{}:{}", self.rpi_host, self.command_port)
    }

    fn actuator_heartbeat_addr(&self) -> String {
        format!("{}:{}", self.rpi_host, self.heartbeat_port)
    }

    /// Bind address for the aggregator's own producer-facing channel.
    fn aggregator_bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.aggregator_port)
    }

    /// Address `send` (and any other producer) dials to reach the aggregator.
    fn aggregator_dial_addr(&self) -> String {
        format!("{}:{}", self.aggregator_host, self.aggregator_port)
    }

    fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            dur_forward: Duration::from_secs_f64(self.dur_forward),
            dur_backward: Duration::from_secs_f64(self.dur_backward),
            dur_turn: Duration::from_secs_f64(self.dur_turn),
            post_sequence_hold: Duration::from_secs_f64(self.post_sequence_hold),
        }
    }
}

fn init_logging() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_target(false).init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_logging();

    let cli = Cli::parse();
    let request_timeout = Duration::from_secs_f64(cli.request_timeout);

    match &cli.role {
        Role::Aggregator => run_aggregator(&cli, request_timeout).await,
        Role::Actuator => run_actuator(&cli).await,
        Role::Send {
            cmd,
            source,
            priority,
            mode,
        } => run_send(&cli, cmd, *source, *priority, *mode, request_timeout).await,
    }
}

async fn run_aggregator(cli: &Cli, request_timeout: Duration) -> Result<()> {
    let forwarder = Client::new(
        cli.actuator_command_addr(),
        request_timeout,
        cli.request_retries,
    );
    let heartbeat = Subscriber::new();
    tokio::spawn(Arc::clone(&heartbeat).run(cli.actuator_heartbeat_addr()));

    let aggregator = Arc::new(Aggregator::new(forwarder, heartbeat, cli.history_capacity));
    tracing::info!(addr = %cli.aggregator_bind_addr(), "aggregator starting");
    aggregator
        .serve(&cli.aggregator_bind_addr())
        .await
        .context("aggregator command channel failed")?;
    Ok(())
}

async fn run_actuator(cli: &Cli) -> Result<()> {
    let pins = Arc::new(LoggingPinSink);
    let executor = MotionExecutor::new(pins, cli.executor_config());
    let heartbeat = Arc::new(Publisher::new());
    let actuator = Arc::new(Actuator::new(executor, heartbeat));

    let heartbeat_addr = format!("0.0.0.0:{}", cli.heartbeat_port);
    let heartbeat_period = Duration::from_secs_f64(cli.heartbeat_period);
    let heartbeat_actuator = Arc::clone(&actuator);
    tokio::spawn(async move {
        if let Err(e) = heartbeat_actuator
            .serve_heartbeat(&heartbeat_addr, heartbeat_period)
            .await
        {
            tracing::error!(error = %e, "heartbeat channel failed");
        }
    });

    let command_addr = format!("0.0.0.0:{}", cli.command_port);
    tracing::info!(addr = %command_addr, "actuator starting");
    actuator
        .serve_commands(&command_addr)
        .await
        .context("actuator command channel failed")?;
    Ok(())
}

async fn run_send(
    cli: &Cli,
    cmd: &str,
    source: Source,
    priority: Priority,
    mode: Mode,
    request_timeout: Duration,
) -> Result<()> {
    let client = Client::new(cli.aggregator_dial_addr(), request_timeout, cli.request_retries);
    let request = CommandRequest::structured(cmd.to_string(), mode, source, priority);
    let reply = client
        .request(&request)
        .await
        .context("failed to reach aggregator")?;
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}
