use rainsignal_core::engine::{BackendError, EngineError, WeatherError};
use rainsignal_core::model::rain::RainModelError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{msg}: {source}")]
    ConfigReadError {
        msg: String,
        source: config::ConfigError,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Weather(#[from] WeatherError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    RainModel(#[from] RainModelError),
    #[error("failed writing '{filepath}': {error}")]
    WriteError { filepath: String, error: String },
    #[error("{0}")]
    InternalError(String),
}
