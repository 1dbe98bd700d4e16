use serde::{Deserialize, Serialize};

/// whole-run queue and wait aggregates of one intersection
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IntersectionSummary {
    pub intersection_id: String,
    /// seconds
    pub avg_wait_time: f64,
    /// seconds
    pub max_wait_time: f64,
    pub avg_queue_length: f64,
    pub max_queue_length: usize,
    /// vehicles on incoming lanes at the last sample
    pub vehicle_count: usize,
}
