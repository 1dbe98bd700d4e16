use itertools::Itertools;
use rainsignal_core::model::rain::{
    ObservationTime, RainImpactModel, RainfallReading, SeverityCategory,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// a contiguous run of raining readings
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RainEvent {
    pub start: ObservationTime,
    pub end: ObservationTime,
    pub duration_minutes: f64,
    pub mean_intensity: f64,
    pub peak_intensity: f64,
    /// most frequent category in the event, ties going to the more severe
    pub dominant_category: SeverityCategory,
    /// sum of the readings' precipitation values
    pub total_precipitation: f64,
}

/// finds rain events in a time-ordered series. readings are grouped into runs
/// whose category is not `None`; runs shorter than `min_duration_minutes`
/// (from first to last reading) are dropped. step-indexed readings are taken
/// as one second per step.
pub fn extract_rain_events(
    readings: &[RainfallReading],
    model: &RainImpactModel,
    min_duration_minutes: f64,
) -> Vec<RainEvent> {
    let mut events = vec![];
    for (raining, group) in &readings
        .iter()
        .chunk_by(|r| model.classify(r.rainfall_mm_h).is_raining())
    {
        if !raining {
            continue;
        }
        let run: Vec<&RainfallReading> = group.collect();
        if let Some(event) = summarize(&run, model, min_duration_minutes) {
            events.push(event);
        }
    }
    events
}

fn summarize(
    run: &[&RainfallReading],
    model: &RainImpactModel,
    min_duration_minutes: f64,
) -> Option<RainEvent> {
    let first = run.first()?;
    let last = run.last()?;
    let duration_minutes = minutes_between(&first.observed_at, &last.observed_at);
    if duration_minutes < min_duration_minutes {
        return None;
    }
    let intensities: Vec<f64> = run.iter().map(|r| model.intensity(r.rainfall_mm_h)).collect();
    let mean_intensity = intensities.iter().sum::<f64>() / intensities.len() as f64;
    let peak_intensity = intensities.iter().copied().fold(0.0, f64::max);
    let mut counts: BTreeMap<SeverityCategory, usize> = BTreeMap::new();
    for r in run.iter() {
        *counts.entry(model.classify(r.rainfall_mm_h)).or_default() += 1;
    }
    // BTreeMap iterates from least to most severe, so max_by_key keeps the last maximum
    let dominant_category = counts
        .into_iter()
        .max_by_key(|(_, n)| *n)
        .map(|(c, _)| c)
        .unwrap_or_default();
    Some(RainEvent {
        start: first.observed_at,
        end: last.observed_at,
        duration_minutes,
        mean_intensity,
        peak_intensity,
        dominant_category,
        total_precipitation: run.iter().map(|r| r.rainfall_mm_h).sum(),
    })
}

fn minutes_between(start: &ObservationTime, end: &ObservationTime) -> f64 {
    match (start, end) {
        (ObservationTime::Step(a), ObservationTime::Step(b)) => b.saturating_sub(*a) as f64 / 60.0,
        (ObservationTime::WallClock(a), ObservationTime::WallClock(b)) => {
            (*b - *a).num_seconds() as f64 / 60.0
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::extract_rain_events;
    use chrono::{DateTime, Duration, Utc};
    use rainsignal_core::model::rain::{
        AdjustmentTable, ObservationTime, RainImpactModel, RainfallReading, SeverityCategory,
        SeverityLadder, SeverityLadderPreset,
    };

    fn minute_series(values: &[f64]) -> Vec<RainfallReading> {
        let origin: DateTime<Utc> = DateTime::from_timestamp(1_714_557_600, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| RainfallReading::at_time(*v, origin + Duration::minutes(i as i64)))
            .collect()
    }

    fn model() -> RainImpactModel {
        let ladder = SeverityLadder::from(SeverityLadderPreset::Simulator);
        RainImpactModel::new(ladder, AdjustmentTable::traffic(), None).unwrap()
    }

    #[test]
    fn test_extracts_long_runs_only() {
        let mut values = vec![0.0; 5];
        values.extend(vec![5.0; 40]);
        values.extend(vec![0.0; 10]);
        values.extend(vec![2.0; 10]);
        let events = extract_rain_events(&minute_series(&values), &model(), 30.0);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.duration_minutes, 39.0);
        assert_eq!(event.dominant_category, SeverityCategory::Moderate);
        assert_eq!(event.total_precipitation, 200.0);
        assert!(matches!(event.start, ObservationTime::WallClock(_)));
    }

    #[test]
    fn test_dominant_category_and_peak() {
        let mut values = vec![1.0; 3];
        values.extend(vec![9.0; 3]);
        let events = extract_rain_events(&minute_series(&values), &model(), 0.0);
        assert_eq!(events.len(), 1);
        // tie between light and heavy goes to heavy
        assert_eq!(events[0].dominant_category, SeverityCategory::Heavy);
        // saturation is 1.5 x 50 mm/h
        assert!((events[0].peak_intensity - 9.0 / 75.0).abs() < 1e-12);
    }

    #[test]
    fn test_dry_series_has_no_events() {
        let events = extract_rain_events(&minute_series(&[0.0, 0.2, 0.4]), &model(), 0.0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_step_readings() {
        let readings: Vec<RainfallReading> = (0..7200)
            .map(|s| RainfallReading::at_step(if s < 3600 { 6.0 } else { 0.0 }, s))
            .collect();
        let events = extract_rain_events(&readings, &model(), 30.0);
        assert_eq!(events.len(), 1);
        assert!((events[0].duration_minutes - 3599.0 / 60.0).abs() < 1e-9);
    }
}
