pub mod congestion;
pub mod rain;
pub mod signal;
pub mod stats;
