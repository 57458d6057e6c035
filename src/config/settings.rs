//! Settings sections of `config.toml`

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::DEFAULT_TASK;

/// Backend worker connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Websocket endpoint of the report worker
    #[serde(default = "default_worker_url")]
    pub url: String,

    /// How many times readiness is polled before giving up
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// Delay before each readiness poll, in milliseconds
    #[serde(default = "default_connect_interval_ms")]
    pub connect_interval_ms: u64,
}

/// HTTP bridge server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Local port for the bridge endpoint (bound on 127.0.0.1)
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Shared secret required as `X-Jobstream-Token`.
    ///
    /// If empty, requests are accepted unauthenticated.
    #[serde(default)]
    pub auth_token: String,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Idle time on an open event stream before a blank keep-alive frame is
    /// written. A failed write is how a departed client is noticed.
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
}

/// Defaults applied to requests that leave fields out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSettings {
    /// Prompt used when the request has no task text
    #[serde(default = "default_task")]
    pub default_task: String,

    #[serde(default = "default_report_type")]
    pub default_report_type: String,

    #[serde(default)]
    pub default_sources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Transcript database. Defaults to `~/.jobstream/transcripts.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

fn default_worker_url() -> String {
    "ws://localhost:8000/ws".to_string()
}

fn default_connect_attempts() -> u32 {
    10
}

fn default_connect_interval_ms() -> u64 {
    1000
}

fn default_server_port() -> u16 {
    8787
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_heartbeat_ms() -> u64 {
    15_000
}

fn default_task() -> String {
    DEFAULT_TASK.to_string()
}

fn default_report_type() -> String {
    "research_report".to_string()
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            url: default_worker_url(),
            connect_attempts: default_connect_attempts(),
            connect_interval_ms: default_connect_interval_ms(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            auth_token: String::new(),
            max_body_bytes: default_max_body_bytes(),
            heartbeat_ms: default_heartbeat_ms(),
        }
    }
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            default_task: default_task(),
            default_report_type: default_report_type(),
            default_sources: Vec::new(),
        }
    }
}
