mod constant_weather;
mod open_weather_map;
mod rain_events;
mod rainfall_series;
mod synthetic_event;
mod weather_source_config;

pub use constant_weather::ConstantWeather;
pub use open_weather_map::OpenWeatherMap;
pub use rain_events::{extract_rain_events, RainEvent};
pub use rainfall_series::RainfallSeries;
pub use synthetic_event::{EventPattern, SyntheticRainEvent};
pub use weather_source_config::WeatherSourceConfig;
