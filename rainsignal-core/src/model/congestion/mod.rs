mod congestion_config;
mod congestion_estimator;
mod sample_window;

pub use congestion_config::CongestionConfig;
pub use congestion_estimator::{CongestionEstimator, QueueSample};
pub use sample_window::SampleWindow;
