//! Configuration management for registry and worker processes.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::transport::DialOptions;
use distrokv_common::constants::{
    ANNOUNCE_TIMEOUT_SECS, DEFAULT_CONTROL_PORT, DEFAULT_DATA_PORT, DEFAULT_REGISTRY_ADDR,
    DEFAULT_REGISTRY_LISTEN_ADDR, DIAL_TIMEOUT_SECS, HEARTBEAT_INTERVAL_SECS,
    HEARTBEAT_TIMEOUT_SECS, LIST_NODES_TIMEOUT_SECS, REGISTER_TIMEOUT_SECS,
};

/// Environment variable prefix, e.g. `DISTROKV_NODE__HOSTNAME`
const ENV_PREFIX: &str = "DISTROKV";

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Registry process settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// This worker's identity and the registry it joins
    #[serde(default)]
    pub node: NodeConfig,

    /// Membership protocol timing
    #[serde(default)]
    pub cluster: ClusterConfig,
}

/// Registry-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// TCP listen address
    #[serde(default = "default_registry_listen_addr")]
    pub listen_addr: String,

    /// Evict nodes whose last heartbeat is older than this (0 = never)
    #[serde(default)]
    pub stale_after_secs: u64,

    /// How often the stale-node sweep runs
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_registry_listen_addr(),
            stale_after_secs: 0,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl RegistryConfig {
    /// Liveness threshold, if eviction is enabled
    pub fn stale_after(&self) -> Option<Duration> {
        (self.stale_after_secs > 0).then(|| Duration::from_secs(self.stale_after_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Worker node identity
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Address peers use to reach this node
    #[serde(default = "default_ip_address")]
    pub ip_address: String,

    #[serde(default = "default_control_port")]
    pub control_port: String,

    #[serde(default = "default_data_port")]
    pub data_port: String,

    /// Interface the listeners bind to
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Registry `host:port`
    #[serde(default = "default_registry_addr")]
    pub registry_addr: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            ip_address: default_ip_address(),
            control_port: default_control_port(),
            data_port: default_data_port(),
            bind_host: default_bind_host(),
            registry_addr: default_registry_addr(),
        }
    }
}

impl NodeConfig {
    pub fn control_bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.control_port)
    }

    pub fn data_bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.data_port)
    }
}

/// Membership protocol timing
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_secs: u64,

    #[serde(default = "default_register_timeout")]
    pub register_timeout_secs: u64,

    #[serde(default = "default_list_timeout")]
    pub list_timeout_secs: u64,

    #[serde(default = "default_announce_timeout")]
    pub announce_timeout_secs: u64,

    #[serde(default = "default_dial_timeout")]
    pub dial_timeout_secs: u64,

    /// Abort bootstrap if any peer announcement fails
    #[serde(default)]
    pub require_full_mesh: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval(),
            heartbeat_timeout_secs: default_heartbeat_timeout(),
            register_timeout_secs: default_register_timeout(),
            list_timeout_secs: default_list_timeout(),
            announce_timeout_secs: default_announce_timeout(),
            dial_timeout_secs: default_dial_timeout(),
            require_full_mesh: false,
        }
    }
}

impl ClusterConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn register_timeout(&self) -> Duration {
        Duration::from_secs(self.register_timeout_secs)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    pub fn announce_timeout(&self) -> Duration {
        Duration::from_secs(self.announce_timeout_secs)
    }

    pub fn dial_options(&self) -> DialOptions {
        DialOptions {
            connect_timeout: Duration::from_secs(self.dial_timeout_secs),
            ..Default::default()
        }
    }
}

// Default value functions
fn default_registry_listen_addr() -> String { DEFAULT_REGISTRY_LISTEN_ADDR.to_string() }
fn default_sweep_interval() -> u64 { 5 }
fn default_hostname() -> String { "localhost".to_string() }
fn default_ip_address() -> String { "127.0.0.1".to_string() }
fn default_control_port() -> String { DEFAULT_CONTROL_PORT.to_string() }
fn default_data_port() -> String { DEFAULT_DATA_PORT.to_string() }
fn default_bind_host() -> String { "0.0.0.0".to_string() }
fn default_registry_addr() -> String { DEFAULT_REGISTRY_ADDR.to_string() }
fn default_heartbeat_interval() -> u64 { HEARTBEAT_INTERVAL_SECS }
fn default_heartbeat_timeout() -> u64 { HEARTBEAT_TIMEOUT_SECS }
fn default_register_timeout() -> u64 { REGISTER_TIMEOUT_SECS }
fn default_list_timeout() -> u64 { LIST_NODES_TIMEOUT_SECS }
fn default_announce_timeout() -> u64 { ANNOUNCE_TIMEOUT_SECS }
fn default_dial_timeout() -> u64 { DIAL_TIMEOUT_SECS }

impl AppConfig {
    /// Load configuration from file (if present) overlaid with `DISTROKV_*` env vars
    pub fn load(config_path: &str) -> Result<Self> {
        let mut builder = config::Config::builder();

        if Path::new(config_path).exists() {
            builder = builder.add_source(config::File::with_name(config_path));
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to load config")?;

        settings
            .try_deserialize()
            .context("Failed to parse config")
    }
}
