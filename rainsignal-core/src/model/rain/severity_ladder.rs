use super::{RainModelError, SeverityCategory};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// named threshold ladders observed in rain-adaptive deployments. they disagree
/// with each other, so none is implied: callers pick one or supply their own.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLadderPreset {
    /// 0 / 2.5 / 10 / 50 mm/h, the impact-literature ladder.
    #[default]
    Impact,
    /// 0 / 0.1 / 5 / 15 mm/h, used when sizing signal programs.
    Controller,
    /// 0.5 / 4 / 8 / 50 mm/h, used by synthetic weather generation.
    Simulator,
}

impl SeverityLadderPreset {
    pub fn bounds(&self) -> [f64; 4] {
        match self {
            SeverityLadderPreset::Impact => [0.0, 2.5, 10.0, 50.0],
            SeverityLadderPreset::Controller => [0.0, 0.1, 5.0, 15.0],
            SeverityLadderPreset::Simulator => [0.5, 4.0, 8.0, 50.0],
        }
    }
}

impl FromStr for SeverityLadderPreset {
    type Err = RainModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "impact" => Ok(SeverityLadderPreset::Impact),
            "controller" => Ok(SeverityLadderPreset::Controller),
            "simulator" => Ok(SeverityLadderPreset::Simulator),
            other => Err(RainModelError::InvalidSeverityLadder(format!(
                "unknown preset '{other}', must be one of [impact, controller, simulator]"
            ))),
        }
    }
}

/// configures a [`SeverityLadder`]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SeverityLadderConfig {
    Preset {
        name: SeverityLadderPreset,
    },
    Custom {
        /// rates above this bound are at least light rain
        light: f64,
        moderate: f64,
        heavy: f64,
        /// rates above this bound are severe rain
        severe: f64,
    },
}

impl Default for SeverityLadderConfig {
    fn default() -> Self {
        SeverityLadderConfig::Preset {
            name: SeverityLadderPreset::default(),
        }
    }
}

impl TryFrom<&SeverityLadderConfig> for SeverityLadder {
    type Error = RainModelError;

    fn try_from(config: &SeverityLadderConfig) -> Result<Self, Self::Error> {
        match config {
            SeverityLadderConfig::Preset { name } => Ok(SeverityLadder::from(*name)),
            SeverityLadderConfig::Custom {
                light,
                moderate,
                heavy,
                severe,
            } => SeverityLadder::new(*light, *moderate, *heavy, *severe),
        }
    }
}

/// threshold ladder mapping a rainfall rate in mm/h onto a [`SeverityCategory`].
///
/// a rate is assigned the highest category whose lower bound it strictly exceeds,
/// so with bounds (0, 2.5, 10, 50) a rate of exactly 2.5 mm/h is still light rain.
/// bounds are validated to be strictly increasing, which makes classification
/// monotone non-decreasing in the rate.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct SeverityLadder {
    bounds: [f64; 4],
}

impl SeverityLadder {
    pub fn new(
        light: f64,
        moderate: f64,
        heavy: f64,
        severe: f64,
    ) -> Result<SeverityLadder, RainModelError> {
        let bounds = [light, moderate, heavy, severe];
        if let Some(bad) = bounds.iter().find(|b| !b.is_finite() || **b < 0.0) {
            return Err(RainModelError::InvalidSeverityLadder(format!(
                "bounds must be finite and non-negative, found {bad}"
            )));
        }
        for pair in bounds.windows(2) {
            if pair[0] >= pair[1] {
                return Err(RainModelError::InvalidSeverityLadder(format!(
                    "bounds must be strictly increasing, found {} followed by {}",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(SeverityLadder { bounds })
    }

    pub fn classify(&self, rainfall_mm_h: f64) -> SeverityCategory {
        // NaN and negative readings are treated as dry
        let rate = if rainfall_mm_h.is_nan() {
            0.0
        } else {
            rainfall_mm_h
        };
        let [light, moderate, heavy, severe] = self.bounds;
        if rate > severe {
            SeverityCategory::Severe
        } else if rate > heavy {
            SeverityCategory::Heavy
        } else if rate > moderate {
            SeverityCategory::Moderate
        } else if rate > light {
            SeverityCategory::Light
        } else {
            SeverityCategory::None
        }
    }

    /// lower bound (exclusive) for a raining category, or None for dry conditions.
    pub fn lower_bound(&self, category: SeverityCategory) -> Option<f64> {
        match category {
            SeverityCategory::None => None,
            c => self.bounds.get(c.index() - 1).copied(),
        }
    }

    pub fn severe_bound(&self) -> f64 {
        self.bounds[3]
    }
}

impl From<SeverityLadderPreset> for SeverityLadder {
    fn from(preset: SeverityLadderPreset) -> Self {
        SeverityLadder {
            bounds: preset.bounds(),
        }
    }
}

impl Default for SeverityLadder {
    fn default() -> Self {
        SeverityLadder::from(SeverityLadderPreset::default())
    }
}
