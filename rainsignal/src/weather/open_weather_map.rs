use rainsignal_core::engine::{WeatherError, WeatherSource};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Deserialize, Debug, Default)]
struct RainBlock {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
struct CurrentWeather {
    #[serde(default)]
    rain: Option<RainBlock>,
}

/// current rainfall from the OpenWeatherMap current-weather endpoint. the
/// `rain.1h` field is read as mm/h; a response without it is dry weather.
pub struct OpenWeatherMap {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    city: String,
}

impl OpenWeatherMap {
    pub fn new(api_key: &str, city: &str, base_url: Option<&str>) -> OpenWeatherMap {
        OpenWeatherMap {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).to_string(),
            api_key: api_key.to_string(),
            city: city.to_string(),
        }
    }

    fn current_rainfall(&self) -> Result<f64, WeatherError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", self.city.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| WeatherError::RequestFailed(e.to_string()))?;
        let body = response
            .text()
            .map_err(|e| WeatherError::RequestFailed(e.to_string()))?;
        parse_rainfall(&body)
    }
}

fn parse_rainfall(body: &str) -> Result<f64, WeatherError> {
    let weather: CurrentWeather = serde_json::from_str(body).map_err(|e| {
        WeatherError::RequestFailed(format!("unexpected weather response: {e}"))
    })?;
    Ok(weather.rain.and_then(|r| r.one_hour).unwrap_or(0.0))
}

impl WeatherSource for OpenWeatherMap {
    fn rainfall(&mut self, _step: u64) -> Result<f64, WeatherError> {
        self.current_rainfall()
    }

    fn name(&self) -> String {
        format!("OpenWeatherMap for '{}'", self.city)
    }
}
