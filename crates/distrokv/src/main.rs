//! # distrokv
//!
//! Runs either the node registry or a worker node.
//!
//! ```text
//! distrokv registry --listen 0.0.0.0:8080
//! distrokv worker --hostname host1 --ip 10.0.0.1 --control-port 8002 \
//!     --data-port 9002 --registry 10.0.0.100:8080
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use distrokv::config::AppConfig;
use distrokv::registry::RegistryServer;
use distrokv::worker::WorkerNode;

/// DistroKV cluster node
#[derive(Parser, Debug)]
#[command(name = "distrokv")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/distrokv.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "DISTROKV_LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,

    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand, Debug)]
enum Role {
    /// Run the node registry
    Registry {
        /// Listen address (overrides config)
        #[arg(short, long, env = "DISTROKV_REGISTRY_LISTEN_ADDR")]
        listen: Option<String>,
    },
    /// Run a worker node
    Worker {
        #[arg(long, env = "DISTROKV_NODE_HOSTNAME")]
        hostname: Option<String>,

        /// Address peers and the registry reach this node on
        #[arg(long, env = "DISTROKV_NODE_IP")]
        ip: Option<String>,

        #[arg(long, env = "DISTROKV_CONTROL_PORT")]
        control_port: Option<String>,

        #[arg(long, env = "DISTROKV_DATA_PORT")]
        data_port: Option<String>,

        /// Registry `host:port`
        #[arg(long, env = "DISTROKV_REGISTRY_ADDR")]
        registry: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_logging(&args.log_level, args.json_logs)?;

    info!("Starting distrokv v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load(&args.config)?;
    info!(path = %args.config, "Configuration loaded");

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
        }
        let _ = signal_tx.send(());
    });

    match args.role {
        Role::Registry { listen } => {
            if let Some(listen) = listen {
                config.registry.listen_addr = listen;
            }
            RegistryServer::new(config.registry).run(shutdown_tx).await?;
        }
        Role::Worker {
            hostname,
            ip,
            control_port,
            data_port,
            registry,
        } => {
            let node = &mut config.node;
            if let Some(v) = hostname {
                node.hostname = v;
            }
            if let Some(v) = ip {
                node.ip_address = v;
            }
            if let Some(v) = control_port {
                node.control_port = v;
            }
            if let Some(v) = data_port {
                node.data_port = v;
            }
            if let Some(v) = registry {
                node.registry_addr = v;
            }

            info!(
                hostname = %config.node.hostname,
                ip = %config.node.ip_address,
                registry = %config.node.registry_addr,
                "Starting worker"
            );
            WorkerNode::new(&config.node, &config.cluster)
                .run(shutdown_tx)
                .await?;
        }
    }

    info!("distrokv shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
