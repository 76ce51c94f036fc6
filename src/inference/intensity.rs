//! Maps rain probability to an intensity category with an agricultural suggestion.

use crate::config::{ConfigError, IntensityConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intensity {
    Light,
    Moderate,
    Heavy,
}

impl Intensity {
    pub fn suggestion(self) -> &'static str {
        match self {
            Intensity::Light => "Normal activities with caution",
            Intensity::Moderate => "Avoid fertilizer spraying",
            Intensity::Heavy => "Protect crops & livestock",
        }
    }
}

/// Thresholds on `probability * 100`, inclusive at the lower bound of each band.
#[derive(Debug, Clone, Copy)]
pub struct IntensityScale {
    config: IntensityConfig,
}

impl Default for IntensityScale {
    fn default() -> Self {
        Self {
            config: IntensityConfig::default(),
        }
    }
}

impl IntensityScale {
    pub fn new(config: IntensityConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn classify(&self, probability: f64) -> Intensity {
        let pct = probability * 100.0;
        if pct >= self.config.heavy_pct {
            Intensity::Heavy
        } else if pct >= self.config.moderate_pct {
            Intensity::Moderate
        } else {
            Intensity::Light
        }
    }

    /// No probability available: degrade to Light.
    pub fn classify_opt(&self, probability: Option<f64>) -> Intensity {
        probability.map_or(Intensity::Light, |p| self.classify(p))
    }
}
