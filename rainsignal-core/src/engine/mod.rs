mod control_loop;
mod engine_config;
mod engine_error;
#[cfg(test)]
pub(crate) mod recording_backend;
mod signal_backend;
mod weather_source;

pub use control_loop::{ControlLoop, RunSummary};
pub use engine_config::{ControlMode, EngineConfig, FailurePolicy};
pub use engine_error::EngineError;
pub use signal_backend::{BackendError, SignalBackend, StepReport};
pub use weather_source::{WeatherError, WeatherSource};
