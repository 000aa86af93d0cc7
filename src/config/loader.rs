//! Configuration loading from disk.

use std::fs;
use std::io::Write;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ConfigDocument;

/// Starter document written by `kws --init`.
pub const DEFAULT_CONFIG: &str = r#""schema.version" = "1.0"
# "tls.cert.file" = "my-domain.crt"
# "tls.key.file" = "my-domain.key"

[observability]
log_level = "info"
# metrics_enabled = true
# metrics_address = "0.0.0.0:9090"

[[ "kafka.to.websocket" ]]
address = ":9999"
"kafka.topics" = ["my.kafka.topic"]
# "message.details" = false
# "message.type" = "json"
# "endpoint.prefix" = ""
# "endpoint.websocket" = "ws"
# "endpoint.test" = "test"
# compression = false

# https://github.com/confluentinc/librdkafka/blob/master/CONFIGURATION.md
[ "kafka.to.websocket"."kafka.consumer.config" ]
"metadata.broker.list" = "localhost:9092"
"enable.auto.commit" = false
"group.id" = "my-kafka-group"

[ "kafka.to.websocket"."kafka.default.topic.config" ]
"auto.offset.reset" = "latest"
"#;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error while reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config file {0} already exists")]
    AlreadyExists(String),
}

/// Load a configuration document from a TOML file.
///
/// Only syntax is checked here; semantic validation happens when the
/// routing table is built.
pub fn load_config(path: &Path) -> Result<ConfigDocument, ConfigError> {
    let shown = absolute_display(path);
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: shown.clone(),
        source,
    })?;
    tracing::debug!(path = %shown, bytes = content.len(), "Config file read");

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: shown,
        source,
    })
}

/// Write [`DEFAULT_CONFIG`] to `path`, refusing to overwrite an existing file.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let display = absolute_display(path);
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| match source.kind() {
            std::io::ErrorKind::AlreadyExists => ConfigError::AlreadyExists(display.clone()),
            _ => ConfigError::Io {
                path: display.clone(),
                source,
            },
        })?;
    file.write_all(DEFAULT_CONFIG.as_bytes())
        .map_err(|source| ConfigError::Io { path: display, source })
}

fn absolute_display(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
