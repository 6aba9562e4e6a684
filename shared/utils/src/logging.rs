//! Tracing subscriber setup for the service.
//!
//! One fmt layer is built per process. The format (`json` or text) and the
//! sink (append-only file or stdout) are picked independently from
//! [`LoggingConfig`]; `RUST_LOG` overrides the configured level.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Destination of formatted events, and whether it takes ANSI colors.
fn sink(config: &LoggingConfig) -> Result<(BoxMakeWriter, bool)> {
    match &config.file_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            Ok((BoxMakeWriter::new(Mutex::new(file)), false))
        }
        None => Ok((BoxMakeWriter::new(std::io::stdout), true)),
    }
}

fn fmt_layer(config: &LoggingConfig) -> Result<BoxedLayer> {
    let (writer, ansi) = sink(config)?;
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_span_events(FmtSpan::CLOSE)
        .with_thread_ids(true)
        .with_thread_names(true);

    Ok(match config.format.as_str() {
        "json" => layer.json().boxed(),
        _ => layer.boxed(),
    })
}

pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt_layer(config)?)
        .with(env_filter(&config.level))
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::info!(level = %config.level, format = %config.format, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_appends_json_events() {
        let path = std::env::temp_dir().join(format!("statement-logging-{}.log", std::process::id()));
        let config = LoggingConfig {
            level: "info".to_string(),
            format: "json".to_string(),
            file_path: Some(path.to_string_lossy().into_owned()),
        };

        init_logging(&config).unwrap();
        tracing::error!(unit = "A12", "written to file");

        let contents = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(contents.lines().any(|line| line.contains("\"unit\":\"A12\"")));
        assert!(init_logging(&config).is_err());
    }
}
