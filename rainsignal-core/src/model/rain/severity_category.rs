use super::RainModelError;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// ordinal rainfall severity. ordering follows severity, so `None < Light < ... < Severe`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeverityCategory {
    #[default]
    #[serde(alias = "normal", alias = "no_rain")]
    None,
    #[serde(alias = "light_rain")]
    Light,
    #[serde(alias = "moderate_rain")]
    Moderate,
    #[serde(alias = "heavy_rain")]
    Heavy,
    #[serde(alias = "extreme")]
    Severe,
}

impl SeverityCategory {
    pub const ALL: [SeverityCategory; 5] = [
        SeverityCategory::None,
        SeverityCategory::Light,
        SeverityCategory::Moderate,
        SeverityCategory::Heavy,
        SeverityCategory::Severe,
    ];

    /// position of this category in [`SeverityCategory::ALL`], used to index factor arrays.
    pub fn index(&self) -> usize {
        match self {
            SeverityCategory::None => 0,
            SeverityCategory::Light => 1,
            SeverityCategory::Moderate => 2,
            SeverityCategory::Heavy => 3,
            SeverityCategory::Severe => 4,
        }
    }

    pub fn is_raining(&self) -> bool {
        *self != SeverityCategory::None
    }
}

impl Display for SeverityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SeverityCategory::None => "none",
            SeverityCategory::Light => "light",
            SeverityCategory::Moderate => "moderate",
            SeverityCategory::Heavy => "heavy",
            SeverityCategory::Severe => "severe",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SeverityCategory {
    type Err = RainModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "normal" | "no_rain" => Ok(SeverityCategory::None),
            "light" | "light_rain" => Ok(SeverityCategory::Light),
            "moderate" | "moderate_rain" => Ok(SeverityCategory::Moderate),
            "heavy" | "heavy_rain" => Ok(SeverityCategory::Heavy),
            "severe" | "extreme" => Ok(SeverityCategory::Severe),
            other => Err(RainModelError::UnknownIntensityCategory(other.to_string())),
        }
    }
}
