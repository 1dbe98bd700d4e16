mod intersection_summary;
mod statistics_record;
mod statistics_sink;

pub use intersection_summary::IntersectionSummary;
pub use statistics_record::StatisticsRecord;
pub use statistics_sink::StatisticsSink;
