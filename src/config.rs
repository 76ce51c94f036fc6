//! Service configuration. JSON file with per-section defaults, plus a few env overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid intensity thresholds: moderate {moderate_pct}, heavy {heavy_pct} (need 0 <= moderate < heavy <= 100)")]
    InvalidThresholds { moderate_pct: f64, heavy_pct: f64 },

    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener address
    pub server: ServerConfig,
    /// Path to the trained model artifact (`.onnx` or LightGBM `.json` dump)
    pub model_path: PathBuf,
    /// Index page, static assets, CORS
    pub web: WebConfig,
    /// Probability thresholds for rainfall intensity
    pub intensity: IntensityConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub index_path: PathBuf,
    pub static_dir: PathBuf,
    pub cors: bool,
}

/// Thresholds are percentages (probability * 100), inclusive at the lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensityConfig {
    pub moderate_pct: f64,
    pub heavy_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            model_path: PathBuf::from("lgbm_rainfall_model.onnx"),
            web: WebConfig::default(),
            intensity: IntensityConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("templates/index.html"),
            static_dir: PathBuf::from("templates/static"),
            cors: true,
        }
    }
}

impl Default for IntensityConfig {
    fn default() -> Self {
        Self {
            moderate_pct: 34.0,
            heavy_pct: 67.0,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl IntensityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = 0.0 <= self.moderate_pct
            && self.moderate_pct < self.heavy_pct
            && self.heavy_pct <= 100.0;
        if ordered {
            Ok(())
        } else {
            Err(ConfigError::InvalidThresholds {
                moderate_pct: self.moderate_pct,
                heavy_pct: self.heavy_pct,
            })
        }
    }
}

impl ServiceConfig {
    /// Load from JSON file if present; otherwise return default.
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `RAINFALL_MODEL_PATH`, `RAINFALL_HOST` and `RAINFALL_PORT` take precedence over the file.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(path) = lookup("RAINFALL_MODEL_PATH") {
            self.model_path = PathBuf::from(path);
        }
        if let Some(host) = lookup("RAINFALL_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("RAINFALL_PORT") {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "RAINFALL_PORT",
                value: port.clone(),
            })?;
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
