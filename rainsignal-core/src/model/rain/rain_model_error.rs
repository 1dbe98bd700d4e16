use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RainModelError {
    #[error("parameter '{name}' not supported, must be one of [{valid}]")]
    UnknownParameter { name: String, valid: String },
    #[error("unknown rain intensity category '{0}'")]
    UnknownIntensityCategory(String),
    #[error("invalid severity threshold ladder: {0}")]
    InvalidSeverityLadder(String),
    #[error("invalid adjustment factor for parameter '{parameter}' at {category}: {msg}")]
    InvalidAdjustmentFactor {
        parameter: String,
        category: String,
        msg: String,
    },
    #[error("invalid rain impact configuration: {0}")]
    ConfigurationError(String),
}
