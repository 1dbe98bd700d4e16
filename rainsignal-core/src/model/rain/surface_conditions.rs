//! auxiliary estimates of visibility and road friction under rain. these are
//! reported alongside the control loop's statistics but do not feed back into
//! signal timing.
use serde::{Deserialize, Serialize};

const VISIBILITY_BASE: f64 = 0.95;
const VISIBILITY_DECAY: f64 = 0.04;
const VISIBILITY_FLOOR: f64 = 0.1;

const WET_PENALTY: f64 = 0.15;
const INTENSITY_PENALTY: f64 = 0.05;
const TRANSIENT_PENALTY: f64 = 0.1;
const TRANSIENT_WINDOW_MINUTES: f64 = 10.0;
const FRICTION_FLOOR: f64 = 0.3;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoadSurface {
    #[default]
    Asphalt,
    Concrete,
    Gravel,
    Dirt,
}

impl RoadSurface {
    /// dry friction coefficient
    pub fn base_friction(&self) -> f64 {
        match self {
            RoadSurface::Asphalt => 0.85,
            RoadSurface::Concrete => 0.80,
            RoadSurface::Gravel => 0.60,
            RoadSurface::Dirt => 0.68,
        }
    }

    /// parses a surface name, treating unrecognized surfaces as asphalt.
    pub fn from_name(name: &str) -> RoadSurface {
        match name.trim().to_lowercase().as_str() {
            "asphalt" => RoadSurface::Asphalt,
            "concrete" => RoadSurface::Concrete,
            "gravel" => RoadSurface::Gravel,
            "dirt" => RoadSurface::Dirt,
            other => {
                log::debug!("unknown road surface '{other}', using asphalt");
                RoadSurface::Asphalt
            }
        }
    }
}

/// fraction of dry-weather visibility remaining, in [0.1, 1.0]. decays
/// exponentially with the rainfall rate.
pub fn visibility_factor(rainfall_mm_h: f64) -> f64 {
    if rainfall_mm_h.is_nan() || rainfall_mm_h <= 0.0 {
        return 1.0;
    }
    let v = VISIBILITY_BASE * (-VISIBILITY_DECAY * rainfall_mm_h).exp();
    v.max(VISIBILITY_FLOOR)
}

/// estimated tire-road friction coefficient.
///
/// # Arguments
///
/// * `rainfall_mm_h` - rainfall rate
/// * `surface` - road surface type
/// * `minutes_since_rain_start` - if known, time since the current rain event began.
///   roads are most slippery during the first minutes while oil is washed off.
///
/// # Returns
///
/// * friction coefficient, never below 0.3 while wet
pub fn road_friction(
    rainfall_mm_h: f64,
    surface: RoadSurface,
    minutes_since_rain_start: Option<f64>,
) -> f64 {
    let base = surface.base_friction();
    if rainfall_mm_h.is_nan() || rainfall_mm_h <= 0.0 {
        return base;
    }
    let intensity = INTENSITY_PENALTY * rainfall_mm_h.ln_1p();
    let transient = match minutes_since_rain_start {
        Some(t) if t >= 0.0 && t < TRANSIENT_WINDOW_MINUTES => {
            TRANSIENT_PENALTY * (1.0 - t / TRANSIENT_WINDOW_MINUTES)
        }
        _ => 0.0,
    };
    let friction = base * (1.0 - WET_PENALTY - intensity - transient);
    friction.max(FRICTION_FLOOR)
}
