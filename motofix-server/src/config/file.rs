//! TOML file configuration structures.
//!
//! These structs directly map to the `motofix-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub push: PushConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("valid default address")
}

/// Push gateway configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Endpoint messages are POSTed to.
    pub endpoint: Url,
    /// Bearer credential for the gateway.
    #[serde(default)]
    pub api_key: String,
}

/// Inbox processor knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Attempt budget per inbox record before dead-lettering.
    pub max_attempts: i32,
    /// Records claimed per batch; this single value drives the claim query.
    pub claim_batch_size: u32,
    /// Concurrent processing units per batch.
    pub max_concurrency: usize,
    /// Sleep between polls when the inbox is empty.
    pub poll_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            claim_batch_size: 50,
            max_concurrency: 8,
            poll_interval_ms: 800,
        }
    }
}

/// Sweep scheduling and dedup knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Fixed-interval sweep period.
    pub interval_secs: u64,
    /// How long an "already notified" marker suppresses re-notification.
    pub dedup_ttl_hours: u64,
    /// Local hour of the daily sweep.
    pub daily_hour: u8,
    /// Shop-local UTC offset used by the daily sweep.
    pub utc_offset_hours: i8,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            dedup_ttl_hours: 24,
            daily_hour: 8,
            utc_offset_hours: 7,
        }
    }
}
