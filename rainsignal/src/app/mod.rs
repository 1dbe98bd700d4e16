mod app_config;
mod app_error;
mod classify;
mod extract_events;
mod rainsignal_cli;
mod run;

pub use app_config::{AppConfig, OutputConfig};
pub use app_error::AppError;
pub use classify::{classify_rainfall, RainfallClassification};
pub use extract_events::run_rain_events;
pub use rainsignal_cli::{RainsignalCliArguments, RainsignalOperation, RunMode};
pub use run::{run_simulation, RunResult};
