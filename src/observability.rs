use tracing::info;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Transition engine usage metrics
#[derive(Debug, Default)]
pub struct TransitionMetrics {
    pub batches: AtomicU64,
    pub executions: AtomicU64,
    pub moved_items: AtomicU64,
    pub missing_steps: AtomicU64,
    pub failures: AtomicU64,
}

impl TransitionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_execution(&self) {
        self.executions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_moved(&self) {
        self.moved_items.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_missing_step(&self) {
        self.missing_steps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> TransitionStats {
        TransitionStats {
            batches: self.batches.load(Ordering::Relaxed),
            executions: self.executions.load(Ordering::Relaxed),
            moved_items: self.moved_items.load(Ordering::Relaxed),
            missing_steps: self.missing_steps.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Transition metrics: batches={}, executions={}, moved={}, missing_steps={}, failures={}",
            stats.batches,
            stats.executions,
            stats.moved_items,
            stats.missing_steps,
            stats.failures
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionStats {
    pub batches: u64,
    pub executions: u64,
    pub moved_items: u64,
    pub missing_steps: u64,
    pub failures: u64,
}

/// Global metrics instance
static TRANSITION_METRICS: std::sync::LazyLock<TransitionMetrics> =
    std::sync::LazyLock::new(TransitionMetrics::new);

pub fn transition_metrics() -> &'static TransitionMetrics {
    &TRANSITION_METRICS
}

/// Create a correlated span for one batch
pub fn create_batch_span(mode: &str, workflow_id: &str, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "transition_batch",
        batch.mode = mode,
        workflow.id = workflow_id,
        correlation.id = correlation_id,
        otel.kind = "internal"
    )
}

/// Time an operation and log its duration
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_accumulate() {
        let metrics = TransitionMetrics::new();
        metrics.record_batch();
        metrics.record_execution();
        metrics.record_execution();
        metrics.record_moved();

        let stats = metrics.get_stats();
        assert_eq!(stats.batches, 1);
        assert_eq!(stats.executions, 2);
        assert_eq!(stats.moved_items, 1);
        assert_eq!(stats.missing_steps, 0);
        assert_eq!(stats.failures, 0);
    }
}
