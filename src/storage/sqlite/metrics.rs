//! Per-operation metrics.

use std::time::Instant;

/// Records the outcome of one store operation.
///
/// Emits `recordkit_operations_total` (counter) and
/// `recordkit_operation_duration_ms` (histogram), both labelled with
/// `backend`, `operation` and `status`.
///
/// # Examples
///
/// ```
/// use std::time::Instant;
/// use recordkit::storage::record_operation_metrics;
///
/// let start = Instant::now();
/// record_operation_metrics("sqlite", "fetch_all", start, "success");
/// ```
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "recordkit_operations_total",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "recordkit_operation_duration_ms",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::{
        Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    /// Recorder that keeps the name and labels of every registered metric.
    #[derive(Default)]
    struct KeyCapture {
        keys: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl KeyCapture {
        fn capture(&self, key: &Key) {
            let labels = key
                .labels()
                .map(|l| (l.key().to_string(), l.value().to_string()))
                .collect();
            self.keys
                .lock()
                .unwrap()
                .push((key.name().to_string(), labels));
        }

        fn keys(&self) -> Vec<(String, Vec<(String, String)>)> {
            self.keys.lock().unwrap().clone()
        }
    }

    impl Recorder for KeyCapture {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            self.capture(key);
            Counter::noop()
        }

        fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
            self.capture(key);
            Gauge::noop()
        }

        fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
            self.capture(key);
            Histogram::noop()
        }
    }

    fn labels(backend: &str, operation: &str, status: &str) -> Vec<(String, String)> {
        vec![
            ("backend".to_string(), backend.to_string()),
            ("operation".to_string(), operation.to_string()),
            ("status".to_string(), status.to_string()),
        ]
    }

    #[test]
    fn test_record_operation_metrics_labels() {
        let recorder = KeyCapture::default();
        metrics::with_local_recorder(&recorder, || {
            let start = Instant::now();
            record_operation_metrics("sqlite", "fetch_by_id", start, "success");
            record_operation_metrics("sqlite", "insert_many", start, "error");
        });

        assert_eq!(
            recorder.keys(),
            vec![
                (
                    "recordkit_operations_total".to_string(),
                    labels("sqlite", "fetch_by_id", "success")
                ),
                (
                    "recordkit_operation_duration_ms".to_string(),
                    labels("sqlite", "fetch_by_id", "success")
                ),
                (
                    "recordkit_operations_total".to_string(),
                    labels("sqlite", "insert_many", "error")
                ),
                (
                    "recordkit_operation_duration_ms".to_string(),
                    labels("sqlite", "insert_many", "error")
                ),
            ]
        );
    }

    #[test]
    fn test_record_operation_metrics_without_recorder() {
        // No global recorder is installed in tests; recording is a no-op.
        let start = Instant::now();
        thread::sleep(Duration::from_millis(5));
        record_operation_metrics("mock", "delete_by_ids", start, "success");
        assert!(start.elapsed().as_millis() >= 5);
    }
}
