//! Gateway configuration from environment variables

use std::path::PathBuf;
use tourist_registry::CorruptionPolicy;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_FILE: &str = "data.json";
pub const DEFAULT_FRONTEND_DIR: &str = "../frontend";

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub port: u16,
    pub data_file: PathBuf,
    pub frontend_dir: PathBuf,
    pub on_corrupt: CorruptionPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            frontend_dir: PathBuf::from(DEFAULT_FRONTEND_DIR),
            on_corrupt: CorruptionPolicy::default(),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable values keep their default
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("SURAKSHA_GATEWAY_PORT").or_else(|| lookup("PORT")) {
            match raw.trim().parse::<u16>() {
                Ok(port) => config.port = port,
                Err(_) => tracing::warn!("Ignoring invalid port {:?}, using {}", raw, DEFAULT_PORT),
            }
        }
        if let Some(path) = lookup("SURAKSHA_DATA_FILE").filter(|s| !s.is_empty()) {
            config.data_file = PathBuf::from(path);
        }
        if let Some(path) = lookup("SURAKSHA_FRONTEND_DIR").filter(|s| !s.is_empty()) {
            config.frontend_dir = PathBuf::from(path);
        }
        if let Some(raw) = lookup("SURAKSHA_ON_CORRUPT") {
            match raw.parse() {
                Ok(policy) => config.on_corrupt = policy,
                Err(e) => tracing::warn!("{}, using {}", e, config.on_corrupt),
            }
        }

        config
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
