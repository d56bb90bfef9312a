//! Configuration file parsing.
//!
//! A plain key-value text format: one `key value` pair per line, `#`
//! starts a comment, blank lines and unknown keys are ignored. Keys
//! are matched case-insensitively. The `peers` value is a
//! comma-separated address list.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid value for '{key}': '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// Server configuration with Redis-compatible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub append_only: bool,
    pub append_filename: String,
    /// 0 means unlimited.
    pub maxclients: usize,
    pub requirepass: Option<String>,
    pub databases: usize,
    /// Other cluster members, `host:port`.
    pub peers: Vec<String>,
    /// This node's own advertised address in cluster mode.
    pub self_addr: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: "0.0.0.0".to_string(),
            port: 6379,
            append_only: false,
            append_filename: "appendonly.aof".to_string(),
            maxclients: 0,
            requirepass: None,
            databases: 16,
            peers: Vec::new(),
            self_addr: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        Config::parse(&std::fs::read_to_string(path)?)
    }

    pub fn parse(text: &str) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(char::is_whitespace) else {
                continue;
            };
            let value = value.trim();

            match key.to_ascii_lowercase().as_str() {
                "bind" => config.bind = value.to_string(),
                "port" => {
                    config.port = value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: "port",
                        value: value.to_string(),
                    })?;
                }
                "appendonly" => config.append_only = parse_bool("appendOnly", value)?,
                "appendfilename" => config.append_filename = value.to_string(),
                "maxclients" => {
                    config.maxclients = value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: "maxclients",
                        value: value.to_string(),
                    })?;
                }
                "requirepass" => config.requirepass = Some(value.to_string()),
                "databases" => {
                    config.databases = value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: "databases",
                        value: value.to_string(),
                    })?;
                }
                "peers" => {
                    config.peers = value
                        .split(',')
                        .map(str::trim)
                        .filter(|peer| !peer.is_empty())
                        .map(String::from)
                        .collect();
                }
                "self" => config.self_addr = Some(value.to_string()),
                _ => {}
            }
        }
        Ok(config)
    }

    /// Whether this node should run the cluster facade.
    pub fn is_cluster(&self) -> bool {
        self.self_addr.is_some() && !self.peers.is_empty()
    }

    /// The listen address, `bind:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.addr(), "0.0.0.0:6379");
        assert_eq!(config.databases, 16);
        assert!(!config.append_only);
        assert!(!config.is_cluster());
    }

    #[test]
    fn parses_all_keys() {
        let config = Config::parse(
            "# cinder configuration\n\
             bind 127.0.0.1\n\
             port 7000\n\
             \n\
             appendOnly yes\n\
             appendFilename cinder.aof\n\
             maxclients 128\n\
             requirepass sekrit\n\
             databases 4\n\
             peers 10.0.0.2:7000,10.0.0.3:7000\n\
             self 10.0.0.1:7000\n",
        )
        .unwrap();

        assert_eq!(config.addr(), "127.0.0.1:7000");
        assert!(config.append_only);
        assert_eq!(config.append_filename, "cinder.aof");
        assert_eq!(config.maxclients, 128);
        assert_eq!(config.requirepass.as_deref(), Some("sekrit"));
        assert_eq!(config.databases, 4);
        assert_eq!(config.peers, vec!["10.0.0.2:7000", "10.0.0.3:7000"]);
        assert_eq!(config.self_addr.as_deref(), Some("10.0.0.1:7000"));
        assert!(config.is_cluster());
    }

    #[test]
    fn comments_blanks_and_unknown_keys_are_ignored() {
        let config = Config::parse(
            "# comment\n\
             \n\
             save 900 1\n\
             port 6380\n",
        )
        .unwrap();
        assert_eq!(config.port, 6380);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(Config::parse("port notaport\n").is_err());
        assert!(Config::parse("appendOnly maybe\n").is_err());
        assert!(Config::parse("databases minus\n").is_err());
    }

    #[test]
    fn peers_alone_is_not_cluster_mode() {
        let config = Config::parse("peers 10.0.0.2:7000\n").unwrap();
        assert!(!config.is_cluster());
        let config = Config::parse("self 10.0.0.1:7000\n").unwrap();
        assert!(!config.is_cluster());
    }

    #[test]
    fn key_case_is_insensitive() {
        let config = Config::parse("APPENDONLY yes\nPort 6400\n").unwrap();
        assert!(config.append_only);
        assert_eq!(config.port, 6400);
    }
}
