//! YAML configuration: parse-or-default, then a `validate_*` pass per
//! group, matching the enumerated keys and defaults of the reference
//! implementation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::replication::ReplicaConfig;
use crate::wal::WalWriterConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub timeout: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig { timeout: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    #[serde(rename = "type")]
    pub engine_type: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            engine_type: "in_memory".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub address: String,
    pub max_connections: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            address: "localhost:8088".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalConfig {
    pub flushing_batch_size: usize,
    pub flushing_batch_timeout: String,
    pub max_segment_size: String,
    pub data_directory: String,
    pub compaction: bool,
    pub compaction_interval: String,
}

impl Default for WalConfig {
    fn default() -> Self {
        WalConfig {
            flushing_batch_size: 100,
            flushing_batch_timeout: "10ms".to_string(),
            max_segment_size: "10MB".to_string(),
            data_directory: "./data/wal".to_string(),
            compaction: false,
            compaction_interval: "1h".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    pub replica_type: String,
    #[serde(default)]
    pub master_address: String,
    #[serde(default = "default_sync_interval")]
    pub sync_interval: String,
    #[serde(default = "default_replicated_data_directory")]
    pub replicated_data_directory: String,
}

fn default_sync_interval() -> String {
    "1s".to_string()
}

fn default_replicated_data_directory() -> String {
    "./data/replica".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub wal: WalConfig,
    pub replication: Option<ReplicationConfig>,
    #[serde(default)]
    pub logger: LoggerConfig,
}

impl Config {
    /// Parse `path`, or fall back to defaults if the file doesn't exist.
    /// A present-but-malformed file is always an error.
    pub fn load(path: &Path) -> Result<Self> {
        let config = match std::fs::read_to_string(path) {
            Ok(contents) => serde_yaml::from_str::<Config>(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(Error::Config(format!("read {}: {e}", path.display()))),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.validate_engine()?;
        self.validate_network()?;
        self.validate_wal()?;
        self.validate_replication()?;
        self.validate_logger()?;
        self.validate_mutual_exclusion()?;
        Ok(())
    }

    fn validate_engine(&self) -> Result<()> {
        if self.engine.engine_type != "in_memory" {
            return Err(Error::Config(format!(
                "engine.type must be 'in_memory', got '{}'",
                self.engine.engine_type
            )));
        }
        Ok(())
    }

    fn validate_network(&self) -> Result<()> {
        if self.network.max_connections == 0 {
            return Err(Error::Config("network.max_connections must be greater than 0".to_string()));
        }
        if self.network.address.is_empty() {
            return Err(Error::Config("network.address must not be empty".to_string()));
        }
        Ok(())
    }

    fn validate_wal(&self) -> Result<()> {
        if self.wal.flushing_batch_size == 0 {
            return Err(Error::Config("wal.flushing_batch_size must be greater than 0".to_string()));
        }
        parse_duration(&self.wal.flushing_batch_timeout)?;
        parse_size(&self.wal.max_segment_size)?;
        if self.wal.compaction {
            parse_duration(&self.wal.compaction_interval)?;
        }
        Ok(())
    }

    fn validate_replication(&self) -> Result<()> {
        let Some(replication) = &self.replication else {
            return Ok(());
        };

        match replication.replica_type.as_str() {
            "master" => {}
            "slave" => {
                if replication.master_address.is_empty() {
                    return Err(Error::Config(
                        "replication.master_address is required when replica_type is 'slave'".to_string(),
                    ));
                }
            }
            other => {
                return Err(Error::Config(format!(
                    "replication.replica_type must be 'master' or 'slave', got '{other}'"
                )))
            }
        }

        parse_duration(&replication.sync_interval)?;
        Ok(())
    }

    fn validate_logger(&self) -> Result<()> {
        match self.logger.level.as_str() {
            "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(Error::Config(format!(
                "logger.level must be one of debug|info|warn|error, got '{other}'"
            ))),
        }
    }

    fn validate_mutual_exclusion(&self) -> Result<()> {
        if self.wal.compaction && self.replication.is_some() {
            return Err(Error::Config(
                "wal.compaction and replication are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_replica(&self) -> bool {
        self.replication
            .as_ref()
            .map(|r| r.replica_type == "slave")
            .unwrap_or(false)
    }

    pub fn wal_writer_config(&self) -> Result<WalWriterConfig> {
        Ok(WalWriterConfig {
            data_dir: PathBuf::from(&self.wal.data_directory),
            flushing_batch_size: self.wal.flushing_batch_size,
            flushing_batch_timeout: parse_duration(&self.wal.flushing_batch_timeout)?,
            max_segment_size_bytes: parse_size(&self.wal.max_segment_size)?,
        })
    }

    pub fn replica_config(&self) -> Result<Option<ReplicaConfig>> {
        let Some(replication) = &self.replication else {
            return Ok(None);
        };
        if replication.replica_type != "slave" {
            return Ok(None);
        }
        Ok(Some(ReplicaConfig {
            master_address: replication.master_address.clone(),
            replicated_data_dir: PathBuf::from(&replication.replicated_data_directory),
            sync_interval: parse_duration(&replication.sync_interval)?,
        }))
    }
}

/// Parses durations of the shape `<number><unit>` with unit one of
/// `ms`, `s`, `m`, `h` — the subset the reference's YAML config actually
/// uses (`10ms`, `1s`, `1h`).
fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let split_at = raw
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| Error::Config(format!("invalid duration '{raw}': missing unit")))?;
    let (number, unit) = raw.split_at(split_at);
    let number: u64 = number
        .parse()
        .map_err(|_| Error::Config(format!("invalid duration '{raw}': bad number")))?;

    let duration = match unit {
        "ms" => Duration::from_millis(number),
        "s" => Duration::from_secs(number),
        "m" => Duration::from_secs(number * 60),
        "h" => Duration::from_secs(number * 3600),
        other => return Err(Error::Config(format!("invalid duration unit '{other}' in '{raw}'"))),
    };
    Ok(duration)
}

/// Parses human-readable byte sizes (`10MB`, `1KB`, `3GB`).
fn parse_size(raw: &str) -> Result<u64> {
    let raw = raw.trim();
    let split_at = raw
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| Error::Config(format!("invalid size '{raw}': missing unit")))?;
    let (number, unit) = raw.split_at(split_at);
    let number: u64 = number
        .parse()
        .map_err(|_| Error::Config(format!("invalid size '{raw}': bad number")))?;

    let multiplier = match unit.to_uppercase().as_str() {
        "B" => 1,
        "KB" => 1024,
        "MB" => 1024 * 1024,
        "GB" => 1024 * 1024 * 1024,
        other => return Err(Error::Config(format!("invalid size unit '{other}' in '{raw}'"))),
    };
    Ok(number * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("missing.yaml")).unwrap();
        assert_eq!(config.network.address, "localhost:8088");
        assert_eq!(config.wal.flushing_batch_size, 100);
    }

    #[test]
    fn compaction_and_replication_are_mutually_exclusive() {
        let yaml = r#"
wal:
  compaction: true
replication:
  replica_type: slave
  master_address: "127.0.0.1:9000"
"#;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, yaml).unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn slave_without_master_address_is_rejected() {
        let yaml = "replication:\n  replica_type: slave\n";
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, yaml).unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn parses_size_suffixes() {
        assert_eq!(parse_size("10MB").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_size("1KB").unwrap(), 1024);
        assert_eq!(parse_size("3GB").unwrap(), 3 * 1024 * 1024 * 1024);
    }

    #[test]
    fn parses_duration_suffixes() {
        assert_eq!(parse_duration("10ms").unwrap(), Duration::from_millis(10));
        assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let yaml = "logger:\n  level: verbose\n";
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, yaml).unwrap();

        assert!(Config::load(&path).is_err());
    }
}
