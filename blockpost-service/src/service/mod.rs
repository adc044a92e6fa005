pub mod flow;
pub mod metrics;

pub use flow::OperatorFlow;
pub use metrics::{Metrics, MetricsSnapshot};
