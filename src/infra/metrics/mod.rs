pub mod metrics_server;
pub mod prometheus_metrics;

pub use metrics_server::{metrics_router, serve_metrics};
pub use prometheus_metrics::PrometheusMetrics;
