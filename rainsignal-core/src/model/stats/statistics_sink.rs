use super::{IntersectionSummary, StatisticsRecord};
use std::io::Write;

/// append-only time series of [`StatisticsRecord`]s
#[derive(Debug, Clone, Default)]
pub struct StatisticsSink {
    records: Vec<StatisticsRecord>,
}

impl StatisticsSink {
    pub fn new() -> StatisticsSink {
        StatisticsSink::default()
    }

    pub fn push(&mut self, record: StatisticsRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[StatisticsRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// mean vehicle wait over all recorded steps, or zero when empty
    pub fn mean_vehicle_wait(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let total: f64 = self.records.iter().map(|r| r.vehicle_wait_time).sum();
        total / self.records.len() as f64
    }

    pub fn total_traffic_flow(&self) -> usize {
        self.records.iter().map(|r| r.traffic_flow).sum()
    }

    /// writes every record as a CSV row with a header
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        for record in self.records.iter() {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// writes intersection summaries as CSV rows with a header
    pub fn write_summaries_csv<W: Write>(
        summaries: &[IntersectionSummary],
        writer: W,
    ) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        for summary in summaries.iter() {
            writer.serialize(summary)?;
        }
        writer.flush()?;
        Ok(())
    }
}
