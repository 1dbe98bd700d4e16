use super::{
    AdjustmentTable, AdjustmentTableConfig, RainModelError, SeverityCategory, SeverityLadder,
    SeverityLadderConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// multiple of the severe bound at which normalized intensity saturates at 1.0
const DEFAULT_SATURATION_MULTIPLIER: f64 = 1.5;

/// configures a [`RainImpactModel`]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RainImpactConfig {
    #[serde(default)]
    pub ladder: SeverityLadderConfig,
    #[serde(default)]
    pub table: AdjustmentTableConfig,
    /// rainfall rate in mm/h mapped to intensity 1.0. defaults to 1.5x the
    /// ladder's severe bound.
    #[serde(default)]
    pub intensity_saturation_mm_h: Option<f64>,
}

/// composes a [`SeverityLadder`] and an [`AdjustmentTable`] into a pure
/// adjustment service. it holds no mutable state and may be shared across threads.
#[derive(Debug, Clone)]
pub struct RainImpactModel {
    ladder: SeverityLadder,
    table: AdjustmentTable,
    saturation_mm_h: f64,
}

impl RainImpactModel {
    pub fn new(
        ladder: SeverityLadder,
        table: AdjustmentTable,
        saturation_mm_h: Option<f64>,
    ) -> Result<RainImpactModel, RainModelError> {
        let saturation_mm_h = saturation_mm_h
            .unwrap_or_else(|| ladder.severe_bound() * DEFAULT_SATURATION_MULTIPLIER);
        if !saturation_mm_h.is_finite() || saturation_mm_h <= 0.0 {
            return Err(RainModelError::ConfigurationError(format!(
                "intensity saturation must be a positive rate, found {saturation_mm_h}"
            )));
        }
        Ok(RainImpactModel {
            ladder,
            table,
            saturation_mm_h,
        })
    }

    pub fn ladder(&self) -> &SeverityLadder {
        &self.ladder
    }

    pub fn table(&self) -> &AdjustmentTable {
        &self.table
    }

    pub fn classify(&self, rainfall_mm_h: f64) -> SeverityCategory {
        self.ladder.classify(rainfall_mm_h)
    }

    /// normalized rain intensity in [0, 1], used to proportion signal programs.
    pub fn intensity(&self, rainfall_mm_h: f64) -> f64 {
        if rainfall_mm_h.is_nan() || rainfall_mm_h <= 0.0 {
            return 0.0;
        }
        (rainfall_mm_h / self.saturation_mm_h).min(1.0)
    }

    /// adjustment factor for one registered parameter.
    pub fn adjustment_for(
        &self,
        parameter: &str,
        rainfall_mm_h: f64,
    ) -> Result<f64, RainModelError> {
        self.table.factor(parameter, self.classify(rainfall_mm_h))
    }

    pub fn all_adjustments(&self, rainfall_mm_h: f64) -> BTreeMap<String, f64> {
        self.table.all_factors(self.classify(rainfall_mm_h))
    }

    /// multiplies every recognized parameter by its factor. unrecognized keys
    /// are passed through unchanged.
    pub fn apply(
        &self,
        base_params: &BTreeMap<String, f64>,
        rainfall_mm_h: f64,
    ) -> BTreeMap<String, f64> {
        let category = self.classify(rainfall_mm_h);
        base_params
            .iter()
            .map(|(name, value)| {
                let adjusted = match self.table.factor(name, category) {
                    Ok(factor) => value * factor,
                    Err(_) => *value,
                };
                (name.clone(), adjusted)
            })
            .collect()
    }

    /// factor time series for the requested parameters over a rainfall series.
    /// every parameter is checked before any series is computed.
    pub fn temporal_adjustments(
        &self,
        rainfall_series: &[f64],
        parameters: &[&str],
    ) -> Result<BTreeMap<String, Vec<f64>>, RainModelError> {
        let unknown: Vec<&str> = parameters
            .iter()
            .filter(|p| !self.table.contains(p))
            .copied()
            .collect();
        if !unknown.is_empty() {
            return Err(RainModelError::UnknownParameter {
                name: unknown.join(", "),
                valid: self.table.parameters().join(", "),
            });
        }
        let categories: Vec<SeverityCategory> =
            rainfall_series.iter().map(|r| self.classify(*r)).collect();
        parameters
            .iter()
            .map(|p| -> Result<(String, Vec<f64>), RainModelError> {
                let series = categories
                    .iter()
                    .map(|c| self.table.factor(p, *c))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((p.to_string(), series))
            })
            .collect()
    }
}

impl TryFrom<&RainImpactConfig> for RainImpactModel {
    type Error = RainModelError;

    fn try_from(config: &RainImpactConfig) -> Result<Self, Self::Error> {
        let ladder = SeverityLadder::try_from(&config.ladder)?;
        let table = AdjustmentTable::try_from(&config.table)?;
        RainImpactModel::new(ladder, table, config.intensity_saturation_mm_h)
    }
}

impl Default for RainImpactModel {
    fn default() -> Self {
        let ladder = SeverityLadder::default();
        RainImpactModel {
            saturation_mm_h: ladder.severe_bound() * DEFAULT_SATURATION_MULTIPLIER,
            ladder,
            table: AdjustmentTable::default(),
        }
    }
}
