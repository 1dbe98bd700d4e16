use chrono::{DateTime, NaiveDateTime, Utc};
use rainsignal_core::engine::{WeatherError, WeatherSource};
use rainsignal_core::model::rain::{ObservationTime, RainfallReading};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// a row of either supported layout: `step,rainfall_mm_h` or
/// `timestamp,precipitation_mm`
#[derive(Deserialize, Debug)]
struct SeriesRow {
    #[serde(default)]
    step: Option<u64>,
    #[serde(default, alias = "rainfall")]
    rainfall_mm_h: Option<f64>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    precipitation_mm: Option<f64>,
}

/// recorded rainfall replayed by step. lookups return the most recent
/// reading at or before the step, and 0 mm/h before the first reading.
#[derive(Debug, Clone)]
pub struct RainfallSeries {
    name: String,
    readings: Vec<RainfallReading>,
    /// step offset of each reading. wall-clock readings are offset in
    /// seconds from the first timestamp.
    offsets: Vec<u64>,
}

impl RainfallSeries {
    pub fn new(name: &str, mut readings: Vec<RainfallReading>) -> Result<RainfallSeries, WeatherError> {
        let first = match readings.first() {
            Some(r) => r.observed_at,
            None => return Err(WeatherError::EmptySeries),
        };
        let origin = match first {
            ObservationTime::WallClock(_) => readings
                .iter()
                .filter_map(|r| match r.observed_at {
                    ObservationTime::WallClock(t) => Some(t),
                    ObservationTime::Step(_) => None,
                })
                .min(),
            ObservationTime::Step(_) => None,
        };
        let mut keyed = readings
            .drain(..)
            .map(|r| offset(&r.observed_at, origin).map(|o| (o, r)))
            .collect::<Result<Vec<_>, _>>()?;
        keyed.sort_by_key(|(o, _)| *o);
        let (offsets, readings): (Vec<u64>, Vec<RainfallReading>) = keyed.into_iter().unzip();
        Ok(RainfallSeries {
            name: name.to_string(),
            readings,
            offsets,
        })
    }

    pub fn from_csv_path(path: &Path) -> Result<RainfallSeries, WeatherError> {
        let filepath = path.to_string_lossy().to_string();
        let file = std::fs::File::open(path).map_err(|e| WeatherError::SeriesError {
            filepath: filepath.clone(),
            msg: e.to_string(),
        })?;
        RainfallSeries::from_reader(file, &filepath)
    }

    pub fn from_reader<R: Read>(reader: R, name: &str) -> Result<RainfallSeries, WeatherError> {
        let series_error = |msg: String| WeatherError::SeriesError {
            filepath: name.to_string(),
            msg,
        };
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut readings = vec![];
        for (idx, row) in reader.deserialize::<SeriesRow>().enumerate() {
            let row = row.map_err(|e| series_error(format!("row {idx}: {e}")))?;
            let reading = match (row.step, row.rainfall_mm_h, row.timestamp, row.precipitation_mm) {
                (Some(step), Some(rate), _, _) => RainfallReading::at_step(rate, step),
                (Some(step), None, _, Some(rate)) => RainfallReading::at_step(rate, step),
                (None, rate, Some(ts), precip) => {
                    let rate = precip.or(rate).ok_or_else(|| {
                        series_error(format!("row {idx} has no precipitation value"))
                    })?;
                    let time = parse_timestamp(&ts)
                        .ok_or_else(|| series_error(format!("row {idx}: invalid timestamp '{ts}'")))?;
                    RainfallReading::at_time(rate, time)
                }
                _ => {
                    return Err(series_error(format!(
                        "row {idx} must have 'step,rainfall_mm_h' or 'timestamp,precipitation_mm'"
                    )))
                }
            };
            readings.push(reading);
        }
        RainfallSeries::new(name, readings)
    }

    pub fn readings(&self) -> &[RainfallReading] {
        &self.readings
    }

    pub fn rainfall_at(&self, step: u64) -> f64 {
        // index of the first offset after `step`
        let idx = self.offsets.partition_point(|o| *o <= step);
        if idx == 0 {
            0.0
        } else {
            self.readings[idx - 1].rainfall_mm_h
        }
    }
}

impl WeatherSource for RainfallSeries {
    fn rainfall(&mut self, step: u64) -> Result<f64, WeatherError> {
        Ok(self.rainfall_at(step))
    }

    fn name(&self) -> String {
        format!("series '{}'", self.name)
    }
}

fn offset(time: &ObservationTime, origin: Option<DateTime<Utc>>) -> Result<u64, WeatherError> {
    match (time, origin) {
        (ObservationTime::Step(s), None) => Ok(*s),
        (ObservationTime::WallClock(t), Some(origin)) => Ok((*t - origin).num_seconds().max(0) as u64),
        _ => Err(WeatherError::SeriesError {
            filepath: String::from("<series>"),
            msg: String::from("cannot mix step and timestamp readings"),
        }),
    }
}

/// RFC 3339, or `YYYY-MM-DD HH:MM:SS` read as UTC
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .map(|t| t.and_utc())
}
