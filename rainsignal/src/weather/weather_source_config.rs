use super::{ConstantWeather, EventPattern, OpenWeatherMap, RainfallSeries, SyntheticRainEvent};
use rainsignal_core::engine::{WeatherError, WeatherSource};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// selects and configures the weather source polled by the control loop
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum WeatherSourceConfig {
    Constant {
        rainfall_mm_h: f64,
    },
    /// CSV file with `step,rainfall_mm_h` or `timestamp,precipitation_mm` columns
    Series {
        filepath: String,
    },
    Synthetic {
        #[serde(default)]
        pattern: EventPattern,
        #[serde(default)]
        start_step: u64,
        duration_steps: usize,
        max_intensity_mm_h: f64,
        #[serde(default)]
        seed: u64,
    },
    OpenWeatherMap {
        api_key: String,
        city: String,
        #[serde(default)]
        base_url: Option<String>,
    },
}

impl Default for WeatherSourceConfig {
    fn default() -> Self {
        WeatherSourceConfig::Constant { rainfall_mm_h: 0.0 }
    }
}

impl WeatherSourceConfig {
    pub fn build(&self) -> Result<Box<dyn WeatherSource>, WeatherError> {
        match self {
            WeatherSourceConfig::Constant { rainfall_mm_h } => Ok(Box::new(ConstantWeather {
                rainfall_mm_h: *rainfall_mm_h,
            })),
            WeatherSourceConfig::Series { filepath } => {
                let series = RainfallSeries::from_csv_path(Path::new(filepath))?;
                Ok(Box::new(series))
            }
            WeatherSourceConfig::Synthetic {
                pattern,
                start_step,
                duration_steps,
                max_intensity_mm_h,
                seed,
            } => {
                let event = SyntheticRainEvent::new(
                    *pattern,
                    *start_step,
                    *duration_steps,
                    *max_intensity_mm_h,
                    *seed,
                )?;
                Ok(Box::new(event))
            }
            WeatherSourceConfig::OpenWeatherMap {
                api_key,
                city,
                base_url,
            } => {
                if api_key.is_empty() {
                    return Err(WeatherError::ConfigurationError(String::from(
                        "OpenWeatherMap source requires an api_key",
                    )));
                }
                Ok(Box::new(OpenWeatherMap::new(
                    api_key,
                    city,
                    base_url.as_deref(),
                )))
            }
        }
    }
}
