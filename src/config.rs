//! Environment configuration (`.env` is loaded first via dotenvy).

use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub bind: SocketAddr,
    pub bcrypt_cost: u32,
    pub log_json: bool,
    pub log_dir: Option<PathBuf>,
    pub api_url: String,
    pub client_dir: PathBuf,
}

impl Config {
    /// Read `SCHOOL_DESK_*` variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env is not an error.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup("SCHOOL_DESK_BIND").unwrap_or_else(|| "0.0.0.0:5000".to_string());
        let bind = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            var: "SCHOOL_DESK_BIND",
            value: bind_raw.clone(),
        })?;

        let bcrypt_cost = match lookup("SCHOOL_DESK_BCRYPT_COST") {
            None => DEFAULT_BCRYPT_COST,
            Some(raw) => match raw.parse::<u32>() {
                Ok(cost) if (4..=31).contains(&cost) => cost,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "SCHOOL_DESK_BCRYPT_COST",
                        value: raw,
                    })
                }
            },
        };

        let log_json = match lookup("SCHOOL_DESK_LOG_JSON").as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "SCHOOL_DESK_LOG_JSON",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            data_dir: lookup("SCHOOL_DESK_DATA_DIR")
                .unwrap_or_else(|| "school_desk_data".to_string())
                .into(),
            bind,
            bcrypt_cost,
            log_json,
            log_dir: lookup("SCHOOL_DESK_LOG_DIR").map(PathBuf::from),
            api_url: lookup("SCHOOL_DESK_API_URL")
                .unwrap_or_else(|| "http://localhost:5000".to_string()),
            client_dir: lookup("SCHOOL_DESK_CLIENT_DIR")
                .unwrap_or_else(|| ".school_desk".to_string())
                .into(),
        })
    }
}
