use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// when a rainfall reading was observed
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum ObservationTime {
    /// simulation step index
    Step(u64),
    WallClock(DateTime<Utc>),
}

/// a single rainfall observation in mm/h, produced once per weather update tick.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RainfallReading {
    pub rainfall_mm_h: f64,
    pub observed_at: ObservationTime,
}

impl RainfallReading {
    /// builds a reading for a simulation step. negative or non-finite rates
    /// are stored as 0 mm/h.
    pub fn at_step(rainfall_mm_h: f64, step: u64) -> RainfallReading {
        RainfallReading {
            rainfall_mm_h: sanitize(rainfall_mm_h),
            observed_at: ObservationTime::Step(step),
        }
    }

    pub fn at_time(rainfall_mm_h: f64, time: DateTime<Utc>) -> RainfallReading {
        RainfallReading {
            rainfall_mm_h: sanitize(rainfall_mm_h),
            observed_at: ObservationTime::WallClock(time),
        }
    }

    pub fn dry(step: u64) -> RainfallReading {
        RainfallReading::at_step(0.0, step)
    }
}

fn sanitize(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        0.0
    }
}
