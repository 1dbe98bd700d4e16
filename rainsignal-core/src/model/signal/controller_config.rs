use super::ControllerError;
use crate::model::rain::{CategoryFactors, SeverityCategory};
use serde::{Deserialize, Serialize};

/// congestion level boundaries. a level strictly above a boundary selects that tier.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CongestionThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for CongestionThresholds {
    fn default() -> Self {
        Self {
            low: 0.3,
            medium: 0.5,
            high: 0.7,
        }
    }
}

/// green extension applied in each congestion tier
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CongestionFactors {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for CongestionFactors {
    fn default() -> Self {
        Self {
            low: 1.1,
            medium: 1.2,
            high: 1.3,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    /// seconds
    pub min_green: f64,
    /// seconds
    pub max_green: f64,
    /// green extension per raining category. dry weather is always 1.0.
    pub weather_factors: CategoryFactors,
    pub congestion_thresholds: CongestionThresholds,
    pub congestion_factors: CongestionFactors,
    /// green phases of a rain program are scaled by `1 + green_intensity_gain * intensity`
    pub green_intensity_gain: f64,
    /// yellow phases of a rain program are scaled up to this factor at full intensity.
    /// must lie in [1.0, 1.5] so that clearance intervals never shrink.
    pub amber_max_factor: f64,
    /// classify phases without a state string by index parity instead of failing
    pub legacy_parity_fallback: bool,
    /// while raining, swap in a resized program when the severity category changes
    pub resize_on_severity_change: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            min_green: 10.0,
            max_green: 120.0,
            weather_factors: CategoryFactors::new(1.1, 1.2, 1.3, 1.5),
            congestion_thresholds: CongestionThresholds::default(),
            congestion_factors: CongestionFactors::default(),
            green_intensity_gain: 0.5,
            amber_max_factor: 1.0,
            legacy_parity_fallback: true,
            resize_on_severity_change: true,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ControllerError> {
        use ControllerError as E;
        if !(self.min_green.is_finite() && self.min_green > 0.0) {
            return Err(E::ConfigurationError(format!(
                "min_green must be positive, found {}",
                self.min_green
            )));
        }
        if !self.max_green.is_finite() || self.max_green < self.min_green {
            return Err(E::ConfigurationError(format!(
                "max_green ({}) must be at least min_green ({})",
                self.max_green, self.min_green
            )));
        }
        for category in SeverityCategory::ALL.iter().skip(1) {
            let f = self.weather_factors.get(*category);
            if !f.is_finite() || f <= 0.0 {
                return Err(E::ConfigurationError(format!(
                    "weather factor for {category} must be positive, found {f}"
                )));
            }
        }
        let t = &self.congestion_thresholds;
        let ordered = 0.0 <= t.low && t.low < t.medium && t.medium < t.high && t.high <= 1.0;
        if !ordered {
            return Err(E::ConfigurationError(format!(
                "congestion thresholds must satisfy 0 <= low < medium < high <= 1, found {}/{}/{}",
                t.low, t.medium, t.high
            )));
        }
        let c = &self.congestion_factors;
        if [c.low, c.medium, c.high]
            .iter()
            .any(|f| !f.is_finite() || *f <= 0.0)
        {
            return Err(E::ConfigurationError(String::from(
                "congestion factors must be positive",
            )));
        }
        if !self.green_intensity_gain.is_finite() || self.green_intensity_gain < 0.0 {
            return Err(E::ConfigurationError(format!(
                "green_intensity_gain must be non-negative, found {}",
                self.green_intensity_gain
            )));
        }
        if !(1.0..=1.5).contains(&self.amber_max_factor) {
            return Err(E::ConfigurationError(format!(
                "amber_max_factor must be in [1.0, 1.5], found {}",
                self.amber_max_factor
            )));
        }
        Ok(())
    }

    pub fn weather_factor(&self, category: SeverityCategory) -> f64 {
        self.weather_factors.get(category)
    }

    pub fn congestion_factor(&self, congestion_level: f64) -> f64 {
        let t = &self.congestion_thresholds;
        let f = &self.congestion_factors;
        if congestion_level > t.high {
            f.high
        } else if congestion_level > t.medium {
            f.medium
        } else if congestion_level > t.low {
            f.low
        } else {
            1.0
        }
    }

    pub fn clamp_green(&self, duration: f64) -> f64 {
        duration.clamp(self.min_green, self.max_green)
    }
}
