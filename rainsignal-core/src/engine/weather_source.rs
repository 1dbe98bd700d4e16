use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    RequestFailed(String),
    #[error("failed reading rainfall series '{filepath}': {msg}")]
    SeriesError { filepath: String, msg: String },
    #[error("rainfall series is empty")]
    EmptySeries,
    #[error("invalid weather source configuration: {0}")]
    ConfigurationError(String),
}

/// provides the rainfall rate in mm/h observed at a simulation step
pub trait WeatherSource {
    fn rainfall(&mut self, step: u64) -> Result<f64, WeatherError>;

    /// short label used in log messages
    fn name(&self) -> String;
}
