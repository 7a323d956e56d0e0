//! Конфигурация HTTP-сервиса

use std::net::SocketAddr;
use std::path::PathBuf;

pub const MODEL_PATH_ENV: &str = "MODEL_PATH";
pub const DEFAULT_MODEL_PATH: &str = "saved_models/device_price_classifier.json";

#[derive(Debug, Clone, PartialEq)]
pub struct ServeConfig {
    pub model_path: PathBuf,
    pub bind_addr: SocketAddr,
}

impl ServeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let model_path = lookup(MODEL_PATH_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string());

        Self {
            model_path: PathBuf::from(model_path),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
        }
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_path() {
        let config = ServeConfig::default();
        assert_eq!(config.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(config.bind_addr.port(), 5000);
    }

    #[test]
    fn test_model_path_from_env() {
        let config = ServeConfig::from_lookup(|key| {
            (key == MODEL_PATH_ENV).then(|| "/models/v2.json".to_string())
        });
        assert_eq!(config.model_path, PathBuf::from("/models/v2.json"));
    }

    #[test]
    fn test_blank_env_falls_back() {
        let config = ServeConfig::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(config.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
    }
}
