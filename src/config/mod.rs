//! Configuration loading and management

mod io;
mod settings;

pub use settings::{JobSettings, ServerSettings, StoreSettings, WorkerSettings};

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::JobRequestBuilder;
use crate::worker::RetryPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub worker: WorkerSettings,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub job: JobSettings,

    #[serde(default)]
    pub store: StoreSettings,
}

impl Config {
    /// Connection retry bounds for the worker socket
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.worker.connect_attempts.max(1),
            interval: Duration::from_millis(self.worker.connect_interval_ms),
        }
    }

    /// Transcript database location
    pub fn db_path(&self) -> PathBuf {
        self.store
            .db_path
            .clone()
            .unwrap_or_else(|| Self::global_config_dir().join("transcripts.db"))
    }

    /// Request builder seeded with the configured job defaults
    pub fn job_builder(&self, report_type: Option<String>) -> JobRequestBuilder {
        let report_type = report_type
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| self.job.default_report_type.clone());
        JobRequestBuilder::new(report_type)
            .default_task(self.job.default_task.clone())
            .sources(self.job.default_sources.clone())
    }

    /// Auth token if one is configured
    /// Keep-alive interval for event streams, never zero
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.server.heartbeat_ms.max(10))
    }

    pub fn auth_token(&self) -> Option<&str> {
        let token = self.server.auth_token.trim();
        (!token.is_empty()).then_some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.worker.connect_attempts, 10);
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.server.max_body_bytes, 2 * 1024 * 1024);
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(15));
        assert!(config.auth_token().is_none());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
[worker]
url = "ws://10.0.0.5:8000/ws"
connect_interval_ms = 250

[server]
auth_token = "s3cret"
"#,
        )
        .unwrap();

        assert_eq!(config.worker.url, "ws://10.0.0.5:8000/ws");
        assert_eq!(config.worker.connect_attempts, 10);
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.auth_token(), Some("s3cret"));

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.interval, Duration::from_millis(250));
    }

    #[test]
    fn test_job_builder_uses_configured_defaults() {
        let mut config = Config::default();
        config.job.default_task = "Configured prompt".to_string();
        config.job.default_sources = vec!["WEB".to_string()];

        let request = config.job_builder(None).task("  ").build();
        assert_eq!(request.task, "Configured prompt");
        assert_eq!(request.report_type, "research_report");
        assert_eq!(request.sources, vec!["WEB"]);

        let request = config.job_builder(Some("detailed_report".to_string())).build();
        assert_eq!(request.report_type, "detailed_report");
    }

    #[test]
    fn test_explicit_db_path_wins() {
        let mut config = Config::default();
        config.store.db_path = Some(PathBuf::from("/tmp/jobs.db"));
        assert_eq!(config.db_path(), PathBuf::from("/tmp/jobs.db"));
    }
}
