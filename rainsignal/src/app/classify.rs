use super::AppError;
use rainsignal_core::model::rain::{
    road_friction, visibility_factor, AdjustmentTable, RainImpactModel, RoadSurface,
    SeverityCategory, SeverityLadder, SeverityLadderPreset,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// everything the rain model derives from a single rainfall rate
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RainfallClassification {
    pub rainfall_mm_h: f64,
    pub ladder: SeverityLadderPreset,
    pub category: SeverityCategory,
    pub intensity: f64,
    pub adjustments: BTreeMap<String, f64>,
    pub visibility: f64,
    /// steady-state friction on dry-weather asphalt
    pub friction: f64,
}

pub fn classify_rainfall(
    rainfall_mm_h: f64,
    ladder: SeverityLadderPreset,
) -> Result<RainfallClassification, AppError> {
    if !rainfall_mm_h.is_finite() || rainfall_mm_h < 0.0 {
        return Err(AppError::InternalError(format!(
            "rainfall must be a finite non-negative rate, found {rainfall_mm_h}"
        )));
    }
    let model = RainImpactModel::new(
        SeverityLadder::from(ladder),
        AdjustmentTable::default(),
        None,
    )?;
    Ok(RainfallClassification {
        rainfall_mm_h,
        ladder,
        category: model.classify(rainfall_mm_h),
        intensity: model.intensity(rainfall_mm_h),
        adjustments: model.all_adjustments(rainfall_mm_h),
        visibility: visibility_factor(rainfall_mm_h),
        friction: road_friction(rainfall_mm_h, RoadSurface::Asphalt, None),
    })
}
