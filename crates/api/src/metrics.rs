use query::{QaTrace, RetrievalResult};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

pub struct Metrics {
    // Counters
    total_questions: AtomicUsize,
    successful_questions: AtomicUsize,
    failed_questions: AtomicUsize,
    graph_requests: AtomicUsize,

    // Per-entity outcomes of answered questions
    entities_requested: AtomicUsize,
    entities_unmatched: AtomicUsize,
    entities_failed: AtomicUsize,

    // Per-entity outcomes of graph and retrieve requests
    graph_entities_unmatched: AtomicUsize,
    graph_entities_failed: AtomicUsize,

    // Timing (in microseconds)
    total_extraction_time_us: AtomicU64,
    total_retrieval_time_us: AtomicU64,
    total_synthesis_time_us: AtomicU64,
    total_graph_time_us: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_questions: AtomicUsize::new(0),
            successful_questions: AtomicUsize::new(0),
            failed_questions: AtomicUsize::new(0),
            graph_requests: AtomicUsize::new(0),
            entities_requested: AtomicUsize::new(0),
            entities_unmatched: AtomicUsize::new(0),
            entities_failed: AtomicUsize::new(0),
            graph_entities_unmatched: AtomicUsize::new(0),
            graph_entities_failed: AtomicUsize::new(0),
            total_extraction_time_us: AtomicU64::new(0),
            total_retrieval_time_us: AtomicU64::new(0),
            total_synthesis_time_us: AtomicU64::new(0),
            total_graph_time_us: AtomicU64::new(0),
        })
    }

    pub fn record_answer(&self, trace: &QaTrace) {
        self.total_questions.fetch_add(1, Ordering::Relaxed);
        self.successful_questions.fetch_add(1, Ordering::Relaxed);
        self.entities_requested.fetch_add(trace.entities_found, Ordering::Relaxed);
        self.entities_unmatched.fetch_add(trace.entities_unmatched, Ordering::Relaxed);
        self.entities_failed.fetch_add(trace.entities_failed, Ordering::Relaxed);
        self.total_extraction_time_us.fetch_add(trace.extraction_ms * 1000, Ordering::Relaxed);
        self.total_retrieval_time_us.fetch_add(trace.retrieval_ms * 1000, Ordering::Relaxed);
        self.total_synthesis_time_us.fetch_add(trace.synthesis_ms * 1000, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.total_questions.fetch_add(1, Ordering::Relaxed);
        self.failed_questions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_graph(&self, duration: std::time::Duration, graph: &RetrievalResult) {
        self.graph_requests.fetch_add(1, Ordering::Relaxed);
        self.graph_entities_unmatched.fetch_add(graph.unmatched.len(), Ordering::Relaxed);
        self.graph_entities_failed.fetch_add(graph.failed.len(), Ordering::Relaxed);
        self.total_graph_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_questions: self.total_questions.load(Ordering::Relaxed),
            successful_questions: self.successful_questions.load(Ordering::Relaxed),
            failed_questions: self.failed_questions.load(Ordering::Relaxed),
            graph_requests: self.graph_requests.load(Ordering::Relaxed),
            entities_requested: self.entities_requested.load(Ordering::Relaxed),
            entities_unmatched: self.entities_unmatched.load(Ordering::Relaxed),
            entities_failed: self.entities_failed.load(Ordering::Relaxed),
            graph_entities_unmatched: self.graph_entities_unmatched.load(Ordering::Relaxed),
            graph_entities_failed: self.graph_entities_failed.load(Ordering::Relaxed),
            avg_extraction_time_ms: self.avg_time_ms(&self.total_extraction_time_us, &self.successful_questions),
            avg_retrieval_time_ms: self.avg_time_ms(&self.total_retrieval_time_us, &self.successful_questions),
            avg_synthesis_time_ms: self.avg_time_ms(&self.total_synthesis_time_us, &self.successful_questions),
            avg_graph_time_ms: self.avg_time_ms(&self.total_graph_time_us, &self.graph_requests),
        }
    }

    fn avg_time_ms(&self, total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
        let total = total_us.load(Ordering::Relaxed) as f64;
        let cnt = count.load(Ordering::Relaxed) as f64;
        if cnt > 0.0 {
            total / cnt / 1000.0 // Convert to ms
        } else {
            0.0
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_questions: usize,
    pub successful_questions: usize,
    pub failed_questions: usize,
    pub graph_requests: usize,
    pub entities_requested: usize,
    pub entities_unmatched: usize,
    pub entities_failed: usize,
    pub graph_entities_unmatched: usize,
    pub graph_entities_failed: usize,
    pub avg_extraction_time_ms: f64,
    pub avg_retrieval_time_ms: f64,
    pub avg_synthesis_time_ms: f64,
    pub avg_graph_time_ms: f64,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_averages() {
        let metrics = Metrics::new();
        metrics.record_answer(&QaTrace {
            entities_found: 2,
            entities_unmatched: 1,
            extraction_ms: 10,
            retrieval_ms: 4,
            synthesis_ms: 100,
            ..QaTrace::default()
        });
        metrics.record_answer(&QaTrace {
            entities_found: 1,
            extraction_ms: 30,
            retrieval_ms: 8,
            synthesis_ms: 300,
            ..QaTrace::default()
        });
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_questions, 3);
        assert_eq!(snapshot.successful_questions, 2);
        assert_eq!(snapshot.failed_questions, 1);
        assert_eq!(snapshot.entities_requested, 3);
        assert_eq!(snapshot.entities_unmatched, 1);
        assert_eq!(snapshot.avg_extraction_time_ms, 20.0);
        assert_eq!(snapshot.avg_synthesis_time_ms, 200.0);
        assert_eq!(snapshot.avg_graph_time_ms, 0.0);
    }

    #[test]
    fn test_graph_requests_do_not_skew_question_counters() {
        let metrics = Metrics::new();
        metrics.record_answer(&QaTrace {
            entities_found: 1,
            ..QaTrace::default()
        });

        let mut graph = RetrievalResult::new();
        graph.unmatched.push("Ghost".to_string());
        graph.unmatched.push("Phantom".to_string());
        metrics.record_graph(std::time::Duration::from_millis(4), &graph);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.entities_requested, 1);
        assert_eq!(snapshot.entities_unmatched, 0);
        assert_eq!(snapshot.graph_requests, 1);
        assert_eq!(snapshot.graph_entities_unmatched, 2);
        assert_eq!(snapshot.avg_graph_time_ms, 4.0);
    }
}
