use super::BackendError;
use crate::model::{rain::RainModelError, signal::ControllerError};

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    RainModel(#[from] RainModelError),
    #[error(transparent)]
    Controller(#[from] ControllerError),
    #[error("backend failure at step {step}: {source}")]
    Backend { step: u64, source: BackendError },
    #[error("invalid engine configuration: {0}")]
    ConfigurationError(String),
}
