//! Traffic steering xApp
//!
//! This is the main binary for the traffic steering xApp. It implements:
//! - CLI argument parsing
//! - Configuration loading and validation
//! - Task spawning and lifecycle management
//! - Graceful shutdown handling
//!
//! # Usage
//!
//! ```bash
//! tsxapp -c config/tsxapp.yaml -l debug --node e2:4/1
//! ```
//!
//! Without a RIC platform the binary runs standalone: E2 nodes given with
//! `--node` are registered in an in-memory topology and served by a
//! loopback transport whose control requests are logged.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use tsxapp::{load_and_validate_config, InMemoryRnib, LoopbackTransport, XappManager};
use tsxapp_common::{init_logging, init_logging_with_filter, LogLevel, XappConfig};
use tsxapp_e2::{codec, ControlRequest};

/// tsxapp - Near-RT RIC Traffic Steering xApp
#[derive(Parser, Debug)]
#[command(name = "tsxapp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the xApp configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config_file: Option<String>,

    /// Log level (trace, debug, info, warn, error) or a tracing filter directive
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    log_level: String,

    /// Report cells with topology-ordered ids
    #[arg(long = "topo-ids", conflicts_with = "no_topo_ids")]
    topo_ids: bool,

    /// Report cells with wire-ordered ids
    #[arg(long = "no-topo-ids")]
    no_topo_ids: bool,

    /// E2 node supporting E2SM-MHO to register in the standalone topology
    #[arg(long = "node", value_name = "NODE_ID")]
    nodes: Vec<String>,
}

impl Args {
    fn topo_ids_override(&self) -> Option<bool> {
        match (self.topo_ids, self.no_topo_ids) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Application state for the xApp
struct TsApp {
    xapp: XappManager,
    shutdown_rx: watch::Receiver<bool>,
}

impl TsApp {
    /// Builds the xApp from the command line
    async fn new(args: &Args) -> Result<Self> {
        let mut config = match &args.config_file {
            Some(path) => {
                info!("Loading configuration from: {}", path);
                load_and_validate_config(path)
                    .with_context(|| format!("Failed to load configuration from {path}"))?
            }
            None => {
                info!("No configuration file given, using defaults");
                XappConfig::default()
            }
        };
        if let Some(enabled) = args.topo_ids_override() {
            config.topo_ids_enabled = enabled;
        }

        info!(
            "Configuration loaded: app={}, e2t={}, topo={}, A1 port={}",
            config.app_id, config.e2t, config.topo, config.a1.port
        );
        info!(
            "Policy type {}, topo ids {}, steering every {} ms after {} ms",
            config.a1.policy_type_id(),
            if config.topo_ids_enabled { "enabled" } else { "disabled" },
            config.steering.interval_ms,
            config.steering.start_delay_ms
        );

        let rnib = Arc::new(InMemoryRnib::new());
        for node in &args.nodes {
            rnib.add_mho_node(node.as_str()).await;
        }

        let (transport, controls) = LoopbackTransport::new();
        tokio::spawn(log_controls(controls));

        let xapp = XappManager::start(config, Arc::new(transport), rnib);
        let shutdown_rx = xapp.shutdown_receiver();

        Ok(Self { xapp, shutdown_rx })
    }

    /// Subscribes every known E2 node
    async fn connect_nodes(&self) -> Result<()> {
        let nodes = self
            .xapp
            .connect_nodes()
            .await
            .context("Failed to subscribe to E2 nodes")?;
        if nodes.is_empty() {
            warn!("No E2 node supports the MHO service model");
        } else {
            info!("Subscribed to {} E2 node(s): {}", nodes.len(), nodes.join(", "));
        }
        Ok(())
    }

    /// Runs until ctrl-c or a task manager shutdown
    async fn run(&mut self) -> Result<()> {
        info!("xApp running. Press Ctrl+C to stop.");

        tokio::select! {
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Received Ctrl+C, initiating shutdown..."),
                    Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
                }
            }
            _ = async {
                loop {
                    if *self.shutdown_rx.borrow() {
                        break;
                    }
                    if self.shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            } => {
                info!("Received shutdown signal from task manager");
            }
        }

        Ok(())
    }

    async fn shutdown(mut self) -> Result<()> {
        info!("Initiating graceful shutdown...");

        match self.xapp.shutdown().await {
            Ok(()) => {
                info!("All tasks shut down successfully");
                Ok(())
            }
            Err(e) => {
                warn!("Some tasks failed during shutdown: {}", e);
                Ok(())
            }
        }
    }
}

async fn log_controls(mut controls: mpsc::UnboundedReceiver<ControlRequest>) {
    while let Some(request) = controls.recv().await {
        match codec::decode_control_message(&request.message) {
            Ok(control) => debug!(
                "Control to {}: UE {} {:?} -> {:?}",
                request.node_id,
                control.ue_id.numeric_id(),
                control.serving_cgi.cell,
                control.target_cgi.cell
            ),
            Err(e) => warn!(
                "Control to {} ({} bytes) not decodable: {}",
                request.node_id,
                request.message.len(),
                e
            ),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match args.log_level.parse::<LogLevel>() {
        Ok(level) => init_logging(level),
        Err(_) => init_logging_with_filter(&args.log_level),
    }

    println!("tsxapp - Traffic Steering xApp");
    println!("==============================");

    match run_xapp(args).await {
        Ok(()) => {
            info!("xApp exited successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("xApp failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_xapp(args: Args) -> Result<()> {
    let mut app = TsApp::new(&args).await?;

    app.connect_nodes().await?;

    app.run().await?;

    app.shutdown().await?;

    Ok(())
}
