//! Prometheus metrics for the conversion engine
//!
//! Counts resolutions by path kind and outcome, and stream failures by
//! error category. Stream failures are only known once a consumer reads the
//! terminal item, so they are recorded by the stream wrapper in
//! [`MetricsCollector::observe_stream`].
use crate::error::ConversionError;
use futures::StreamExt;
use futures::stream::BoxStream;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::Duration;

/// Global metrics registry instance
pub static METRICS: Lazy<Arc<MetricsCollector>> = Lazy::new(|| Arc::new(MetricsCollector::new()));

/// Labels for conversion attempts
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ConversionLabels {
    /// "direct", "chain" or "none"
    pub path: String,
    /// "started" or an error category
    pub outcome: String,
}

/// Labels for failures surfaced on an output stream
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StreamFailureLabels {
    pub kind: String,
}

pub struct MetricsCollector {
    registry: RwLock<Registry>,

    /// Conversions by path kind and outcome
    pub conneg_conversions_total: Family<ConversionLabels, Counter>,

    /// Terminal stream errors by category
    pub conneg_stream_failures_total: Family<StreamFailureLabels, Counter>,

    /// Time spent resolving a converter or chain
    pub conneg_resolution_duration_seconds: Histogram,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let conneg_conversions_total = Family::<ConversionLabels, Counter>::default();
        registry.register(
            "conneg_conversions_total",
            "Total number of conversion attempts",
            conneg_conversions_total.clone(),
        );

        let conneg_stream_failures_total = Family::<StreamFailureLabels, Counter>::default();
        registry.register(
            "conneg_stream_failures_total",
            "Total number of conversions that failed while streaming",
            conneg_stream_failures_total.clone(),
        );

        // Buckets: 10µs up to ~10ms
        let conneg_resolution_duration_seconds = Histogram::new(exponential_buckets(0.00001, 2.0, 10));
        registry.register(
            "conneg_resolution_duration_seconds",
            "Converter resolution latency in seconds",
            conneg_resolution_duration_seconds.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            conneg_conversions_total,
            conneg_stream_failures_total,
            conneg_resolution_duration_seconds,
        }
    }

    pub fn record_conversion_started(&self, path: &str) {
        self.conneg_conversions_total
            .get_or_create(&ConversionLabels {
                path: path.to_string(),
                outcome: "started".to_string(),
            })
            .inc();
    }

    pub fn record_conversion_rejected(&self, path: &str, error: &ConversionError) {
        self.conneg_conversions_total
            .get_or_create(&ConversionLabels {
                path: path.to_string(),
                outcome: error.category().to_string(),
            })
            .inc();
    }

    pub fn record_stream_failure(&self, error: &ConversionError) {
        self.conneg_stream_failures_total
            .get_or_create(&StreamFailureLabels {
                kind: error.category().to_string(),
            })
            .inc();
    }

    pub fn record_resolution(&self, duration: Duration) {
        self.conneg_resolution_duration_seconds
            .observe(duration.as_secs_f64());
    }

    /// Count the terminal error of `stream`, if the consumer reaches one
    pub fn observe_stream<T: Send + 'static>(
        self: &Arc<Self>,
        stream: BoxStream<'static, Result<T, ConversionError>>,
    ) -> BoxStream<'static, Result<T, ConversionError>> {
        let metrics = Arc::clone(self);
        stream
            .inspect(move |item| {
                if let Err(error) = item {
                    metrics.record_stream_failure(error);
                }
            })
            .boxed()
    }

    /// Encode all metrics in Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.read();
        if let Err(error) = encode(&mut buffer, &registry) {
            tracing::error!(%error, "failed to encode metrics");
        }
        buffer
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
