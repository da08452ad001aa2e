use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const DB_PATH_VAR: &str = "DOCDESK_DB_PATH";
pub const LISTEN_ADDR_VAR: &str = "DOCDESK_LISTEN_ADDR";
pub const LIST_LIMIT_VAR: &str = "DOCDESK_LIST_LIMIT";
pub const LOG_VAR: &str = "DOCDESK_LOG";

const DEFAULT_DB_PATH: &str = "/var/lib/docdesk/documents.db";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var} is not a valid socket address: {value}")]
    InvalidAddress { var: &'static str, value: String },

    #[error("{var} must be a positive integer, got {value}")]
    InvalidLimit { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub listen_addr: SocketAddr,
    /// Page size for listings that do not ask for one.
    pub list_limit: usize,
    /// Default tracing filter; `RUST_LOG` takes precedence.
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = lookup(DB_PATH_VAR).unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let addr = lookup(LISTEN_ADDR_VAR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr: SocketAddr = addr.parse().map_err(|_| ConfigError::InvalidAddress {
            var: LISTEN_ADDR_VAR,
            value: addr.clone(),
        })?;

        let list_limit = match lookup(LIST_LIMIT_VAR) {
            Some(value) => match value.parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => {
                    return Err(ConfigError::InvalidLimit {
                        var: LIST_LIMIT_VAR,
                        value,
                    })
                }
            },
            None => crate::application::DEFAULT_LIST_LIMIT,
        };

        Ok(Self {
            db_path: PathBuf::from(db_path),
            listen_addr,
            list_limit,
            log_filter: lookup(LOG_VAR).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }
}
