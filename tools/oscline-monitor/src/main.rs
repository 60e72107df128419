//! Oscline monitor
//!
//! Watch the OSC traffic arriving on a UDP port, or send one message.

mod args;
mod config;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oscline_server::{describe_message, OscClient, OscServer};
use tracing_subscriber::EnvFilter;

use crate::args::{encode_message, message_json, Literal};
use crate::config::MonitorConfig;

#[derive(Parser)]
#[command(name = "oscline-monitor")]
#[command(about = "Listen for and send Open Sound Control messages")]
#[command(version)]
struct Cli {
    /// Log level filter (RUST_LOG takes precedence)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every message received on a port
    Listen {
        /// UDP port (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Local IP to bind (overrides the config file)
        #[arg(short, long)]
        bind: Option<String>,

        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print messages as JSON lines
        #[arg(long)]
        json: bool,

        /// Count messages matching an address pattern (repeatable)
        #[arg(long = "pattern")]
        patterns: Vec<String>,
    },

    /// Send one message
    Send {
        /// Destination host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Destination port
        #[arg(short, long, default_value_t = oscline_core::DEFAULT_PORT)]
        port: u16,

        /// OSC address (e.g., /synth/1/freq)
        address: String,

        /// Arguments: i:42 h:7 f:0.5 d:0.25 s:text c:x T F N I
        #[arg(allow_hyphen_values = true)]
        args: Vec<Literal>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs);

    match cli.command {
        Commands::Listen {
            port,
            bind,
            config,
            json,
            patterns,
        } => {
            let mut settings = match config {
                Some(path) => MonitorConfig::load(&path)?,
                None => MonitorConfig::default(),
            };
            if let Some(port) = port {
                settings.server.port = port;
            }
            if let Some(bind) = bind {
                settings.server.bind_addr = bind;
            }
            listen(settings, json, patterns).await
        }

        Commands::Send {
            host,
            port,
            address,
            args,
        } => {
            let datagram = encode_message(&address, &args)
                .with_context(|| format!("encoding message for {}", address))?;
            let client = OscClient::new(&host, port)
                .with_context(|| format!("connecting to {}:{}", host, port))?;
            client.send_raw(&datagram)?;
            tracing::info!("Sent {} ({} bytes) to {}", address, datagram.len(), client.destination());
            Ok(())
        }
    }
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn listen(settings: MonitorConfig, json: bool, patterns: Vec<String>) -> Result<()> {
    let server = OscServer::bind(settings.server.clone())
        .with_context(|| format!("binding {}:{}", settings.server.bind_addr, settings.server.port))?;

    server.add_monitor_callback(move |address, values| {
        if json {
            println!("{}", message_json(address, values));
        } else {
            println!("{}", describe_message(address, values));
        }
    });

    let mut counters = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let count = Arc::new(AtomicU64::new(0));
        let handler_count = Arc::clone(&count);
        server
            .add_method(&pattern, move |_| {
                handler_count.fetch_add(1, Ordering::Relaxed);
            })
            .with_context(|| format!("registering pattern {}", pattern))?;
        counters.push((pattern, count));
    }

    tracing::info!("Listening on {} (Ctrl-C to stop)", server.local_addr());

    let mut tick = tokio::time::interval(Duration::from_millis(settings.tick_ms.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                server.drain();
            }
            result = &mut shutdown => {
                result.context("waiting for Ctrl-C")?;
                break;
            }
        }
    }

    server.dispose()?;
    for (pattern, count) in counters {
        tracing::info!("{}: {} messages", pattern, count.load(Ordering::Relaxed));
    }
    Ok(())
}
