mod adjustment_table;
mod adjustment_table_config;
mod rain_impact_model;
mod rain_model_error;
mod rainfall_reading;
mod severity_category;
mod severity_ladder;
mod surface_conditions;

pub use adjustment_table::{AdjustmentTable, CategoryFactors};
pub use adjustment_table_config::{AdjustmentTableConfig, AdjustmentTablePreset};
pub use rain_impact_model::{RainImpactConfig, RainImpactModel};
pub use rain_model_error::RainModelError;
pub use rainfall_reading::{ObservationTime, RainfallReading};
pub use severity_category::SeverityCategory;
pub use severity_ladder::{SeverityLadder, SeverityLadderConfig, SeverityLadderPreset};
pub use surface_conditions::{road_friction, visibility_factor, RoadSurface};
