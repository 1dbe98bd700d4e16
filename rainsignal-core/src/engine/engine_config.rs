use super::EngineError;
use crate::model::{
    congestion::CongestionConfig,
    rain::{RainImpactConfig, RoadSurface},
    signal::ControllerConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// observe and record only, never command the signals
    Baseline,
    #[default]
    Adaptive,
}

/// what the loop does when a backend command fails
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Abort,
    /// log the failure and continue with the next tick
    SkipTick,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// number of ticks to run
    pub steps: u64,
    /// ticks between weather polls
    pub weather_interval: u64,
    pub mode: ControlMode,
    pub failure_policy: FailurePolicy,
    pub rain: RainImpactConfig,
    pub controller: ControllerConfig,
    pub congestion: CongestionConfig,
    /// dry-weather flow parameters scaled by the rain model on each weather update
    pub base_parameters: BTreeMap<String, f64>,
    pub road_surface: RoadSurface,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let base_parameters = [
            ("speed", 13.89),
            ("headway", 2.0),
            ("capacity", 1800.0),
            ("driver_behavior", 1.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            steps: 3600,
            weather_interval: 300,
            mode: ControlMode::default(),
            failure_policy: FailurePolicy::default(),
            rain: RainImpactConfig::default(),
            controller: ControllerConfig::default(),
            congestion: CongestionConfig::default(),
            base_parameters,
            road_surface: RoadSurface::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.weather_interval == 0 {
            return Err(EngineError::ConfigurationError(String::from(
                "weather_interval must be at least 1 step",
            )));
        }
        let capacity = self.congestion.per_lane_capacity;
        if !(capacity.is_finite() && capacity > 0.0) {
            return Err(EngineError::ConfigurationError(format!(
                "per_lane_capacity must be a finite positive number, found {capacity}"
            )));
        }
        let stopped = self.congestion.stopped_speed_threshold;
        if !(stopped.is_finite() && stopped >= 0.0) {
            return Err(EngineError::ConfigurationError(format!(
                "stopped_speed_threshold must be a finite non-negative speed, found {stopped}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::EngineConfig;
    use crate::engine::EngineError;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_finite_congestion_values() {
        let config: EngineConfig = toml::from_str("[congestion]\nper_lane_capacity = nan").unwrap();
        assert!(config.congestion.per_lane_capacity.is_nan());
        assert!(matches!(
            config.validate(),
            Err(EngineError::ConfigurationError(_))
        ));

        for capacity in [0.0, -4.0, f64::INFINITY] {
            let mut config = EngineConfig::default();
            config.congestion.per_lane_capacity = capacity;
            assert!(config.validate().is_err(), "accepted capacity {capacity}");
        }
        for threshold in [f64::NAN, -0.5, f64::INFINITY] {
            let mut config = EngineConfig::default();
            config.congestion.stopped_speed_threshold = threshold;
            assert!(config.validate().is_err(), "accepted threshold {threshold}");
        }
    }
}
