use super::AppError;
use crate::{backend::GridSimulationConfig, weather::WeatherSourceConfig};
use config::{Config, Environment, File, FileFormat};
use rainsignal_core::engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// prefix of environment variables overriding file values, for example
/// `RAINSIGNAL__ENGINE__STEPS=600`
pub const ENV_PREFIX: &str = "RAINSIGNAL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
    /// also write per-intersection summaries next to the time series
    pub write_summaries: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: String::from("."),
            write_summaries: true,
        }
    }
}

/// top-level configuration of a run. every section is optional.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub weather: WeatherSourceConfig,
    pub backend: GridSimulationConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// loads a configuration from an optional TOML or JSON file, with
    /// environment overrides applied on top.
    pub fn load(filepath: Option<&str>) -> Result<AppConfig, AppError> {
        let mut builder = Config::builder();
        if let Some(filepath) = filepath {
            builder = builder.add_source(File::new(filepath, file_format(filepath)));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::ConfigReadError {
                msg: format!("failed reading '{}'", filepath.unwrap_or("<environment>")),
                source: e,
            })?;
        config
            .try_deserialize::<AppConfig>()
            .map_err(|e| AppError::ConfigReadError {
                msg: String::from("failed deserializing rainsignal configuration"),
                source: e,
            })
    }

    /// default configuration rendered as TOML
    pub fn default_toml() -> Result<String, AppError> {
        toml::to_string_pretty(&AppConfig::default())
            .map_err(|e| AppError::InternalError(format!("failure encoding default config: {e}")))
    }
}

fn file_format(filepath: &str) -> FileFormat {
    match Path::new(filepath).extension().and_then(|e| e.to_str()) {
        Some("json") => FileFormat::Json,
        _ => FileFormat::Toml,
    }
}

#[cfg(test)]
mod tests {
    use super::AppConfig;
    use crate::weather::WeatherSourceConfig;
    use rainsignal_core::engine::{ControlMode, FailurePolicy};
    use rainsignal_core::model::rain::{SeverityLadderConfig, SeverityLadderPreset};

    #[test]
    fn test_empty_config_is_default() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let text = r#"
            [engine]
            steps = 900
            failure_policy = "skip_tick"

            [engine.rain.ladder]
            type = "preset"
            name = "controller"

            [engine.controller]
            amber_max_factor = 1.2

            [weather]
            type = "constant"
            rainfall_mm_h = 12.0

            [backend]
            rows = 3
        "#;
        let config: AppConfig = toml::from_str(text).unwrap();
        assert_eq!(config.engine.steps, 900);
        assert_eq!(config.engine.weather_interval, 300);
        assert_eq!(config.engine.mode, ControlMode::Adaptive);
        assert_eq!(config.engine.failure_policy, FailurePolicy::SkipTick);
        assert_eq!(
            config.engine.rain.ladder,
            SeverityLadderConfig::Preset {
                name: SeverityLadderPreset::Controller
            }
        );
        assert_eq!(config.engine.controller.amber_max_factor, 1.2);
        assert_eq!(config.engine.controller.min_green, 10.0);
        assert_eq!(
            config.weather,
            WeatherSourceConfig::Constant {
                rainfall_mm_h: 12.0
            }
        );
        assert_eq!(config.backend.rows, 3);
        assert_eq!(config.backend.cols, 2);
    }

    #[test]
    fn test_default_toml_round_trip() {
        let text = AppConfig::default_toml().unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }

    #[test]
    fn test_load_without_file() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.backend.rows, 2);
    }
}
