mod metrics;
mod sink;

pub use metrics::StoreMetrics;
pub use sink::MetricsSink;
