use super::{RainModelError, SeverityCategory};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// multiplicative factors for one parameter at each raining category.
/// the dry (`None`) factor is not stored: it is always the identity.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CategoryFactors {
    pub light: f64,
    pub moderate: f64,
    pub heavy: f64,
    pub severe: f64,
}

impl CategoryFactors {
    pub const IDENTITY: CategoryFactors = CategoryFactors {
        light: 1.0,
        moderate: 1.0,
        heavy: 1.0,
        severe: 1.0,
    };

    pub fn new(light: f64, moderate: f64, heavy: f64, severe: f64) -> CategoryFactors {
        CategoryFactors {
            light,
            moderate,
            heavy,
            severe,
        }
    }

    pub fn get(&self, category: SeverityCategory) -> f64 {
        match category {
            SeverityCategory::None => 1.0,
            SeverityCategory::Light => self.light,
            SeverityCategory::Moderate => self.moderate,
            SeverityCategory::Heavy => self.heavy,
            SeverityCategory::Severe => self.severe,
        }
    }

    pub fn set(&mut self, category: SeverityCategory, factor: f64) {
        match category {
            SeverityCategory::None => {}
            SeverityCategory::Light => self.light = factor,
            SeverityCategory::Moderate => self.moderate = factor,
            SeverityCategory::Heavy => self.heavy = factor,
            SeverityCategory::Severe => self.severe = factor,
        }
    }

    fn validate(&self, parameter: &str) -> Result<(), RainModelError> {
        for category in SeverityCategory::ALL.iter().skip(1) {
            let factor = self.get(*category);
            if !factor.is_finite() || factor <= 0.0 {
                return Err(RainModelError::InvalidAdjustmentFactor {
                    parameter: parameter.to_string(),
                    category: category.to_string(),
                    msg: format!("factor must be finite and positive, found {factor}"),
                });
            }
        }
        Ok(())
    }
}

/// immutable (category × parameter) → factor lookup. built once at startup.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AdjustmentTable {
    factors: BTreeMap<String, CategoryFactors>,
}

impl AdjustmentTable {
    pub fn new(
        factors: BTreeMap<String, CategoryFactors>,
    ) -> Result<AdjustmentTable, RainModelError> {
        for (parameter, row) in factors.iter() {
            row.validate(parameter)?;
        }
        Ok(AdjustmentTable { factors })
    }

    /// vehicle traffic defaults, calibrated from rainfall impact literature.
    pub fn traffic() -> AdjustmentTable {
        let factors = BTreeMap::from([
            ("speed".to_string(), CategoryFactors::new(0.95, 0.90, 0.82, 0.75)),
            ("headway".to_string(), CategoryFactors::new(1.10, 1.25, 1.40, 1.60)),
            ("capacity".to_string(), CategoryFactors::new(0.93, 0.85, 0.76, 0.65)),
            (
                "driver_behavior".to_string(),
                CategoryFactors::new(0.90, 0.82, 0.70, 0.60),
            ),
        ]);
        AdjustmentTable { factors }
    }

    /// pedestrian behavior defaults: slower walking, less patience at crossings,
    /// less tolerance for detours.
    pub fn pedestrian() -> AdjustmentTable {
        let factors = BTreeMap::from([
            (
                "walking_speed".to_string(),
                CategoryFactors::new(0.95, 0.90, 0.80, 0.70),
            ),
            (
                "crossing_wait_time".to_string(),
                CategoryFactors::new(0.90, 0.80, 0.70, 0.60),
            ),
            (
                "detour_tolerance".to_string(),
                CategoryFactors::new(0.90, 0.80, 0.70, 0.50),
            ),
        ]);
        AdjustmentTable { factors }
    }

    pub fn factor(
        &self,
        parameter: &str,
        category: SeverityCategory,
    ) -> Result<f64, RainModelError> {
        self.factors
            .get(parameter)
            .map(|row| row.get(category))
            .ok_or_else(|| RainModelError::UnknownParameter {
                name: parameter.to_string(),
                valid: self.parameters().join(", "),
            })
    }

    pub fn contains(&self, parameter: &str) -> bool {
        self.factors.contains_key(parameter)
    }

    /// factor for every registered parameter at this category
    pub fn all_factors(&self, category: SeverityCategory) -> BTreeMap<String, f64> {
        self.factors
            .iter()
            .map(|(name, row)| (name.clone(), row.get(category)))
            .collect()
    }

    pub fn parameters(&self) -> Vec<&str> {
        self.factors.keys().map(String::as_str).collect_vec()
    }

    pub(super) fn rows_mut(&mut self) -> &mut BTreeMap<String, CategoryFactors> {
        &mut self.factors
    }
}

impl Default for AdjustmentTable {
    fn default() -> Self {
        AdjustmentTable::traffic()
    }
}

#[cfg(test)]
mod tests {
    use super::{AdjustmentTable, CategoryFactors};
    use crate::model::rain::{RainModelError, SeverityCategory};
    use std::collections::BTreeMap;

    #[test]
    fn test_dry_factor_is_identity_for_every_parameter() {
        for table in [AdjustmentTable::traffic(), AdjustmentTable::pedestrian()] {
            for (_, factor) in table.all_factors(SeverityCategory::None) {
                assert_eq!(factor, 1.0);
            }
        }
    }

    #[test]
    fn test_lookup() {
        let table = AdjustmentTable::traffic();
        assert_eq!(table.factor("speed", SeverityCategory::Heavy).unwrap(), 0.82);
        assert_eq!(
            table.factor("headway", SeverityCategory::Severe).unwrap(),
            1.60
        );
    }

    #[test]
    fn test_unknown_parameter_lists_valid_names() {
        let table = AdjustmentTable::traffic();
        match table.factor("visibility", SeverityCategory::Light) {
            Err(RainModelError::UnknownParameter { name, valid }) => {
                assert_eq!(name, "visibility");
                assert!(valid.contains("speed"));
                assert!(valid.contains("capacity"));
            }
            other => panic!("expected unknown parameter error, found {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_positive_factor() {
        let factors = BTreeMap::from([(
            "speed".to_string(),
            CategoryFactors::new(0.9, 0.0, 0.8, 0.7),
        )]);
        assert!(AdjustmentTable::new(factors).is_err());
    }
}
