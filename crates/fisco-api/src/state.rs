//! # Application State
//!
//! The engine and its reference tables are loaded once at startup and
//! shared read-only across handlers.

use std::path::PathBuf;
use std::sync::Arc;

use fisco_engine::{ConfigError, EngineConfig, FiscalEngine};

/// Server configuration, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port to bind the HTTP server to (`PORT`).
    pub port: u16,
    /// YAML file overriding the statutory tables (`FISCO_RATES`).
    pub rates_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            rates_path: None,
        }
    }
}

impl AppConfig {
    /// Read `PORT` and `FISCO_RATES`. Unparseable or absent values fall
    /// back to defaults.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let rates_path = std::env::var_os("FISCO_RATES")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        Self { port, rates_path }
    }
}

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Calculators over the loaded tables.
    pub engine: Arc<FiscalEngine>,
    /// Server configuration.
    pub config: AppConfig,
}

impl AppState {
    /// State with statutory defaults.
    pub fn new() -> Self {
        Self::with_engine(AppConfig::default(), FiscalEngine::default())
    }

    /// State over an explicit engine.
    pub fn with_engine(config: AppConfig, engine: FiscalEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            config,
        }
    }

    /// State for `config`, loading the rates file when one is set.
    pub fn from_config(config: AppConfig) -> Result<Self, ConfigError> {
        let engine_config = match &config.rates_path {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        Ok(Self::with_engine(config, FiscalEngine::new(engine_config)))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8080);
        assert!(config.rates_path.is_none());
    }

    #[test]
    fn loads_rates_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rates:\n  internal:\n    SP: 20").unwrap();
        let config = AppConfig {
            rates_path: Some(file.path().to_path_buf()),
            ..AppConfig::default()
        };
        let state = AppState::from_config(config).unwrap();
        assert_eq!(
            state.engine.config().rates.internal_rate(fisco_core::Uf::Sp),
            20.0
        );
    }

    #[test]
    fn missing_rates_file_is_an_error() {
        let config = AppConfig {
            rates_path: Some(PathBuf::from("/nonexistent/fisco-rates.yaml")),
            ..AppConfig::default()
        };
        assert!(matches!(
            AppState::from_config(config),
            Err(ConfigError::Io { .. })
        ));
    }
}
