use super::{AdjustmentTable, CategoryFactors, RainModelError, SeverityCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentTablePreset {
    #[default]
    Traffic,
    Pedestrian,
}

/// partial factor row used to override a preset. any category left out keeps
/// the preset value. `none` is accepted only as 1.0 so that configuration files
/// can spell out a full row.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FactorOverride {
    #[serde(default, alias = "normal")]
    pub none: Option<f64>,
    #[serde(default)]
    pub light: Option<f64>,
    #[serde(default)]
    pub moderate: Option<f64>,
    #[serde(default)]
    pub heavy: Option<f64>,
    #[serde(default, alias = "extreme")]
    pub severe: Option<f64>,
}

/// configures an [`AdjustmentTable`] from a preset plus per-parameter overrides.
/// overriding a parameter the preset does not know registers it, with the
/// identity factor for any category not given.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AdjustmentTableConfig {
    #[serde(default)]
    pub preset: AdjustmentTablePreset,
    #[serde(default)]
    pub overrides: BTreeMap<String, FactorOverride>,
}

impl TryFrom<&AdjustmentTableConfig> for AdjustmentTable {
    type Error = RainModelError;

    fn try_from(config: &AdjustmentTableConfig) -> Result<Self, Self::Error> {
        let mut table = match config.preset {
            AdjustmentTablePreset::Traffic => AdjustmentTable::traffic(),
            AdjustmentTablePreset::Pedestrian => AdjustmentTable::pedestrian(),
        };
        for (parameter, o) in config.overrides.iter() {
            if let Some(dry) = o.none {
                if dry != 1.0 {
                    return Err(RainModelError::InvalidAdjustmentFactor {
                        parameter: parameter.clone(),
                        category: SeverityCategory::None.to_string(),
                        msg: format!("dry factor must be 1.0, found {dry}"),
                    });
                }
            }
            let row = table
                .rows_mut()
                .entry(parameter.clone())
                .or_insert(CategoryFactors::IDENTITY);
            let updates = [
                (SeverityCategory::Light, o.light),
                (SeverityCategory::Moderate, o.moderate),
                (SeverityCategory::Heavy, o.heavy),
                (SeverityCategory::Severe, o.severe),
            ];
            for (category, value) in updates {
                if let Some(factor) = value {
                    row.set(category, factor);
                }
            }
        }
        // re-run validation over the merged rows
        let rows = table.rows_mut().clone();
        AdjustmentTable::new(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::AdjustmentTableConfig;
    use crate::model::rain::{AdjustmentTable, SeverityCategory};

    #[test]
    fn test_override_merges_into_preset() {
        let config: AdjustmentTableConfig = serde_json::from_str(
            r#"{ "overrides": { "speed": { "light": 0.97 }, "friction_margin": { "heavy": 1.2 } } }"#,
        )
        .unwrap();
        let table = AdjustmentTable::try_from(&config).unwrap();
        assert_eq!(table.factor("speed", SeverityCategory::Light).unwrap(), 0.97);
        assert_eq!(table.factor("speed", SeverityCategory::Heavy).unwrap(), 0.82);
        assert_eq!(
            table.factor("friction_margin", SeverityCategory::Heavy).unwrap(),
            1.2
        );
        assert_eq!(
            table.factor("friction_margin", SeverityCategory::Light).unwrap(),
            1.0
        );
    }

    #[test]
    fn test_dry_override_must_be_identity() {
        let ok: AdjustmentTableConfig =
            serde_json::from_str(r#"{ "overrides": { "speed": { "normal": 1.0 } } }"#).unwrap();
        assert!(AdjustmentTable::try_from(&ok).is_ok());
        let bad: AdjustmentTableConfig =
            serde_json::from_str(r#"{ "overrides": { "speed": { "none": 0.9 } } }"#).unwrap();
        assert!(AdjustmentTable::try_from(&bad).is_err());
    }

    #[test]
    fn test_pedestrian_preset() {
        let config: AdjustmentTableConfig =
            serde_json::from_str(r#"{ "preset": "pedestrian" }"#).unwrap();
        let table = AdjustmentTable::try_from(&config).unwrap();
        assert!(table.contains("walking_speed"));
        assert!(!table.contains("speed"));
    }
}
