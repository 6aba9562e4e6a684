use config::{Config, ConfigError, Environment, File};
use integra_models::{FailurePolicy, MergeOrder};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub processing: ProcessingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_size: usize,
    /// Limit for any single uploaded file.
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Upper bound on source files processed concurrently.
    pub max_workers: usize,
    /// Per-file deadline; `None` lets a file run indefinitely.
    pub task_timeout_seconds: Option<u64>,
    pub failure_policy: FailurePolicy,
    pub merge_order: MergeOrder,
}

impl ProcessingConfig {
    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_seconds.map(Duration::from_secs)
    }

    pub fn worker_count(&self) -> usize {
        self.max_workers.max(1)
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            task_timeout_seconds: None,
            failure_policy: FailurePolicy::default(),
            merge_order: MergeOrder::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let defaults = AppConfig::default();

        let config = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("server.max_request_size", defaults.server.max_request_size as i64)?
            .set_default("server.max_file_size", defaults.server.max_file_size as i64)?
            .set_default("processing.max_workers", defaults.processing.max_workers as i64)?
            .set_default("processing.failure_policy", "skip_file")?
            .set_default("processing.merge_order", "completion")?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            // Start with default values
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(
                File::with_name(&format!(
                    "config/{}",
                    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // Add local config (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with STATEMENT prefix
            .add_source(Environment::with_prefix("STATEMENT").separator("__"));

        config.build()?.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8090,
                max_request_size: 256 * 1024 * 1024, // 256MB of statements per run
                max_file_size: 64 * 1024 * 1024,
            },
            processing: ProcessingConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
                file_path: None,
            },
        }
    }
}
