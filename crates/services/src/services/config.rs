//! Runtime configuration read from the environment.

use std::{net::IpAddr, path::PathBuf};

use secrecy::SecretString;
use thiserror::Error;
use utils::assets::default_data_dir;

use super::{gemini_api::GEMINI_API_BASE, sheets::SHEETS_API_BASE};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Absent when neither GEMINI_API_KEY nor API_KEY is set
    pub gemini_api_key: Option<SecretString>,
    pub google_client_id: Option<String>,
    pub data_dir: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    pub gemini_api_base: String,
    pub sheets_api_base: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host_raw = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host = host_raw.parse::<IpAddr>().map_err(|_| ConfigError::Invalid {
            name: "HOST",
            value: host_raw.clone(),
        })?;

        let port = match var("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            gemini_api_key: var("GEMINI_API_KEY")
                .or_else(|| var("API_KEY"))
                .map(SecretString::from),
            google_client_id: var("GOOGLE_CLIENT_ID"),
            data_dir: var("OPERATOR_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            host,
            port,
            gemini_api_base: var("GEMINI_API_BASE").unwrap_or_else(|| GEMINI_API_BASE.to_string()),
            sheets_api_base: var("SHEETS_API_BASE").unwrap_or_else(|| SHEETS_API_BASE.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[("OPERATOR_DATA_DIR", "/tmp/op")]).unwrap();
        assert!(cfg.gemini_api_key.is_none());
        assert!(cfg.google_client_id.is_none());
        assert_eq!(cfg.host.to_string(), DEFAULT_HOST);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/op"));
        assert_eq!(cfg.gemini_api_base, GEMINI_API_BASE);
    }

    #[test]
    fn test_api_key_fallback() {
        let cfg = config(&[("API_KEY", "fallback")]).unwrap();
        assert_eq!(cfg.gemini_api_key.unwrap().expose_secret(), "fallback");

        let cfg = config(&[("GEMINI_API_KEY", "primary"), ("API_KEY", "fallback")]).unwrap();
        assert_eq!(cfg.gemini_api_key.unwrap().expose_secret(), "primary");

        let cfg = config(&[("GEMINI_API_KEY", "  ")]).unwrap();
        assert!(cfg.gemini_api_key.is_none());
    }

    #[test]
    fn test_invalid_port() {
        assert!(matches!(
            config(&[("PORT", "http")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
    }
}
