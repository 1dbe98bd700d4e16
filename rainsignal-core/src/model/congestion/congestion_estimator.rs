use super::{CongestionConfig, SampleWindow};
use crate::model::signal::{IntersectionId, IntersectionTelemetry};
use crate::model::stats::IntersectionSummary;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// one observation of an intersection's approaches
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct QueueSample {
    /// vehicles stopped on incoming lanes
    pub queue_length: usize,
    /// accumulated waiting time of the stopped vehicles, in seconds
    pub wait_time_sum: f64,
    /// all vehicles on incoming lanes
    pub vehicle_count: usize,
}

impl QueueSample {
    /// reduces lane telemetry to a sample. vehicles slower than `stopped_speed`
    /// are queued and contribute their accumulated wait.
    pub fn from_telemetry(telemetry: &IntersectionTelemetry, stopped_speed: f64) -> QueueSample {
        let mut sample = QueueSample::default();
        for vehicle in telemetry.incoming_lanes.iter().flat_map(|l| l.vehicles.iter()) {
            sample.vehicle_count += 1;
            if vehicle.speed < stopped_speed {
                sample.queue_length += 1;
                sample.wait_time_sum += vehicle.accumulated_wait;
            }
        }
        sample
    }
}

#[derive(Debug, Clone)]
struct IntersectionCongestion {
    window: SampleWindow<QueueSample>,
    incoming_lanes: usize,
    samples: u64,
    total_queue: f64,
    max_queue: usize,
    total_wait: f64,
    max_wait: f64,
}

impl IntersectionCongestion {
    fn new(window: usize) -> IntersectionCongestion {
        IntersectionCongestion {
            window: SampleWindow::new(window),
            incoming_lanes: 0,
            samples: 0,
            total_queue: 0.0,
            max_queue: 0,
            total_wait: 0.0,
            max_wait: 0.0,
        }
    }
}

/// rolling queue-length history per intersection, reduced to a congestion level in [0, 1].
#[derive(Debug, Clone, Default)]
pub struct CongestionEstimator {
    config: CongestionConfig,
    intersections: HashMap<IntersectionId, IntersectionCongestion>,
}

impl CongestionEstimator {
    pub fn new(config: CongestionConfig) -> CongestionEstimator {
        CongestionEstimator {
            config,
            intersections: HashMap::new(),
        }
    }

    pub fn config(&self) -> &CongestionConfig {
        &self.config
    }

    fn entry(&mut self, intersection_id: &str) -> &mut IntersectionCongestion {
        let window = self.config.window;
        self.intersections
            .entry(intersection_id.to_string())
            .or_insert_with(|| IntersectionCongestion::new(window))
    }

    /// records the number of incoming lanes used to normalize queue lengths.
    pub fn set_incoming_lanes(&mut self, intersection_id: &str, lanes: usize) {
        self.entry(intersection_id).incoming_lanes = lanes;
    }

    pub fn record_sample(
        &mut self,
        intersection_id: &str,
        queue_length: usize,
        wait_time_sum: f64,
        vehicle_count: usize,
    ) {
        let state = self.entry(intersection_id);
        state.window.push(QueueSample {
            queue_length,
            wait_time_sum,
            vehicle_count,
        });
        state.samples += 1;
        state.total_queue += queue_length as f64;
        state.max_queue = state.max_queue.max(queue_length);
        state.total_wait += wait_time_sum;
        state.max_wait = state.max_wait.max(wait_time_sum);
    }

    /// mean queue over the recent window divided by the estimated capacity of
    /// the incoming lanes, clamped to 1. zero before any sample is recorded or
    /// when no incoming lanes are known.
    pub fn congestion_level(&self, intersection_id: &str) -> f64 {
        let state = match self.intersections.get(intersection_id) {
            Some(s) if !s.window.is_empty() => s,
            _ => return 0.0,
        };
        let capacity = state.incoming_lanes as f64 * self.config.per_lane_capacity;
        if !(capacity.is_finite() && capacity > 0.0) {
            return 0.0;
        }
        let total: usize = state.window.iter().map(|s| s.queue_length).sum();
        let mean = total as f64 / state.window.len() as f64;
        (mean / capacity).clamp(0.0, 1.0)
    }

    /// whole-run aggregates for an intersection, if it has been sampled
    pub fn summary(&self, intersection_id: &str) -> Option<IntersectionSummary> {
        let state = self.intersections.get(intersection_id)?;
        if state.samples == 0 {
            return None;
        }
        let n = state.samples as f64;
        Some(IntersectionSummary {
            intersection_id: intersection_id.to_string(),
            avg_wait_time: state.total_wait / n,
            max_wait_time: state.max_wait,
            avg_queue_length: state.total_queue / n,
            max_queue_length: state.max_queue,
            vehicle_count: state.window.latest().map(|s| s.vehicle_count).unwrap_or_default(),
        })
    }

    /// summaries for every sampled intersection, ordered by id
    pub fn summaries(&self) -> Vec<IntersectionSummary> {
        let mut ids: Vec<&IntersectionId> = self.intersections.keys().collect();
        ids.sort();
        ids.into_iter().filter_map(|id| self.summary(id)).collect()
    }
}
