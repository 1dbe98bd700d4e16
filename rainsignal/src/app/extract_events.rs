use super::AppError;
use crate::weather::{extract_rain_events, RainEvent, RainfallSeries};
use rainsignal_core::model::rain::{
    AdjustmentTable, RainImpactModel, SeverityLadder, SeverityLadderPreset,
};
use std::path::Path;

/// reads a historical rainfall CSV and prints its rain events as JSON.
pub fn run_rain_events(
    input: &Path,
    min_duration_minutes: f64,
    ladder: SeverityLadderPreset,
) -> Result<(), AppError> {
    let series = RainfallSeries::from_csv_path(input)?;
    let events = find_events(&series, min_duration_minutes, ladder)?;
    log::info!(
        "found {} rain events lasting at least {min_duration_minutes} minutes in {} readings",
        events.len(),
        series.readings().len()
    );
    let json = serde_json::to_string_pretty(&events)
        .map_err(|e| AppError::InternalError(format!("failure encoding rain events: {e}")))?;
    println!("{json}");
    Ok(())
}

fn find_events(
    series: &RainfallSeries,
    min_duration_minutes: f64,
    ladder: SeverityLadderPreset,
) -> Result<Vec<RainEvent>, AppError> {
    if !min_duration_minutes.is_finite() || min_duration_minutes < 0.0 {
        return Err(AppError::InternalError(format!(
            "minimum event duration must be non-negative, found {min_duration_minutes}"
        )));
    }
    let model = RainImpactModel::new(
        SeverityLadder::from(ladder),
        AdjustmentTable::default(),
        None,
    )?;
    Ok(extract_rain_events(
        series.readings(),
        &model,
        min_duration_minutes,
    ))
}
