use std::path::Path;

use thiserror::Error as ThisError;
use tracing::warn;

use crate::aof::AppendFsync;

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid value {value:?} for configuration key {key:?}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error | LogLevel::Fatal => tracing::Level::ERROR,
        }
    }
}

/// Server configuration, loaded from a redis-style file of
/// whitespace-separated `key value` lines with `#` comments.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub loglevel: LogLevel,
    /// Empty means log to standard output.
    pub logfile: String,
    pub aof_enabled: bool,
    pub aof_file: String,
    pub appendfsync: AppendFsync,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 6379,
            loglevel: LogLevel::Info,
            logfile: String::new(),
            aof_enabled: false,
            aof_file: "dump.aof".to_string(),
            appendfsync: AppendFsync::Always,
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Config::parse(&contents)
    }

    fn parse(contents: &str) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = match line.split_once(char::is_whitespace) {
                Some((key, value)) => (key, value.trim()),
                None => (line, ""),
            };

            let invalid = || ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            };

            match key {
                "port" => config.port = value.parse().map_err(|_| invalid())?,
                "loglevel" => {
                    config.loglevel = match value {
                        "debug" => LogLevel::Debug,
                        "info" => LogLevel::Info,
                        "warn" => LogLevel::Warn,
                        "error" => LogLevel::Error,
                        "fatal" => LogLevel::Fatal,
                        _ => return Err(invalid()),
                    }
                }
                "logfile" => config.logfile = value.to_string(),
                "aof-enabled" => {
                    config.aof_enabled = match value {
                        "yes" => true,
                        "no" => false,
                        _ => return Err(invalid()),
                    }
                }
                "aof-file" => config.aof_file = value.to_string(),
                "appendfsync" => {
                    config.appendfsync = match value {
                        "always" => AppendFsync::Always,
                        "everysec" => AppendFsync::EverySec,
                        "no" => AppendFsync::No,
                        _ => return Err(invalid()),
                    }
                }
                _ => warn!("ignoring unknown configuration key {:?}", key),
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.port, 6379);
        assert_eq!(config.loglevel, LogLevel::Info);
        assert!(config.logfile.is_empty());
        assert!(!config.aof_enabled);
        assert_eq!(config.aof_file, "dump.aof");
        assert_eq!(config.appendfsync, AppendFsync::Always);
    }

    #[test]
    fn parse_full_file() {
        let config = Config::parse(
            "# server settings\n\
             port 6380\n\
             loglevel debug\n\
             logfile /var/log/rudis.log\n\
             \n\
             aof-enabled yes\n\
             aof-file /var/lib/rudis/dump.aof\n\
             appendfsync everysec\n",
        )
        .unwrap();

        assert_eq!(config.port, 6380);
        assert_eq!(config.loglevel, LogLevel::Debug);
        assert_eq!(config.logfile, "/var/log/rudis.log");
        assert!(config.aof_enabled);
        assert_eq!(config.aof_file, "/var/lib/rudis/dump.aof");
        assert_eq!(config.appendfsync, AppendFsync::EverySec);
    }

    #[test]
    fn parse_ignores_unknown_keys() {
        let config = Config::parse("maxmemory 100mb\nport 7000\n").unwrap();
        assert_eq!(config.port, 7000);
    }

    #[test]
    fn parse_rejects_bad_values() {
        assert!(Config::parse("port not-a-number\n").is_err());
        assert!(Config::parse("appendfsync sometimes\n").is_err());
        assert!(Config::parse("aof-enabled maybe\n").is_err());
        assert!(Config::parse("loglevel verbose\n").is_err());
    }
}
