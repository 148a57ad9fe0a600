use once_cell::sync::Lazy;
use opentelemetry::global;
use opentelemetry::metrics::{Histogram, Meter, UpDownCounter};
use opentelemetry::KeyValue;

/// Millisecond histogram buckets, spanning sub-millisecond state decodes up
/// to multi-minute persistence calls. Installed as an SDK view at
/// instrumentation setup.
pub const MILLISECONDS_BOUNDARIES: &[f64] = &[
    0.01, 0.05, 0.1, 0.3, 0.6, 0.8, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0, 10.0, 13.0, 16.0, 20.0,
    25.0, 30.0, 40.0, 50.0, 65.0, 80.0, 100.0, 130.0, 160.0, 200.0, 250.0, 300.0, 400.0, 500.0,
    650.0, 800.0, 1000.0, 2000.0, 5000.0, 10000.0, 20000.0, 50000.0, 100000.0,
];

pub static INDEXER_METRICS: Lazy<IndexerMetrics> = Lazy::new(IndexerMetrics::register);

/// Process-wide instrumentation sink. Instruments are no-ops until a meter
/// provider is installed, so recording never blocks a worker and never fails
/// the operation being measured.
pub struct IndexerMetrics {
    pub task_queue_len: UpDownCounter<i64>,
    pub processing_duration: Histogram<f64>,
    pub persist_duration: Histogram<f64>,
}

impl IndexerMetrics {
    pub fn register() -> Self {
        let meter: Meter = global::meter("indexer.opentelemetry");

        let task_queue_len = meter
            .i64_up_down_counter("task_queue_len")
            .with_description("Length of a task queue")
            .with_unit("tasks")
            .init();

        let processing_duration = meter
            .f64_histogram("processing_duration_ms")
            .with_description("Duration of a single state extraction")
            .with_unit("ms")
            .init();

        let persist_duration = meter
            .f64_histogram("persist_duration_ms")
            .with_description("Duration of a models persist operation")
            .with_unit("ms")
            .init();

        Self { task_queue_len, processing_duration, persist_duration }
    }
}

/// Tag set for measurements attributed to one task namespace.
pub fn namespace_attrs(namespace: &str) -> [KeyValue; 1] {
    [KeyValue::new("namespace", namespace.to_string())]
}

/// Publish a change in a task queue's depth.
pub fn record_queue_len(namespace: &str, delta: i64) {
    INDEXER_METRICS.task_queue_len.add(delta, &namespace_attrs(namespace));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_a_provider_is_a_noop() {
        // No meter provider installed in tests: instruments must still
        // accept measurements without panicking or blocking.
        record_queue_len("reward", 3);
        record_queue_len("reward", -3);
        INDEXER_METRICS.persist_duration.record(12.5, &namespace_attrs("blocks"));
        INDEXER_METRICS.processing_duration.record(0.02, &namespace_attrs("reward"));
    }

    #[test]
    fn bucket_boundaries_cover_the_contracted_span() {
        assert_eq!(MILLISECONDS_BOUNDARIES.first(), Some(&0.01));
        assert_eq!(MILLISECONDS_BOUNDARIES.last(), Some(&100000.0));
        assert!(MILLISECONDS_BOUNDARIES.windows(2).all(|w| w[0] < w[1]));
    }
}
