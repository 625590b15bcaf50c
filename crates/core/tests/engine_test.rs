// Integration tests for BenchmarkRunner with an in-process provider
//
// The fake provider echoes the first argument back as its sample and reports
// a fixed latency, so runs are fast and their histograms predictable.
//
// Run with: cargo test -p imdbench-core --test engine_test

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use imdbench_core::{
    bucket_count, BenchConfig, BenchError, BenchmarkRunner, BoxedOperation, BoxedProvider,
    ConfigError, Execution, Operation, OperationError, OperationProvider, Phase,
    ProviderRegistry,
};

#[derive(Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    calls: AtomicUsize,
}

struct FakeProvider {
    latency: Duration,
    /// Every operation fails on this (1-based) call
    fail_on: Option<usize>,
    /// Every operation panics on this (1-based) call
    panic_on: Option<usize>,
    /// Time spent opening each operation
    connect_delay: Duration,
    /// Real time spent in each call
    exec_delay: Duration,
    counters: Arc<Counters>,
}

impl FakeProvider {
    fn new(latency: Duration) -> Self {
        Self {
            latency,
            fail_on: None,
            panic_on: None,
            connect_delay: Duration::ZERO,
            exec_delay: Duration::ZERO,
            counters: Arc::new(Counters::default()),
        }
    }
}

struct FakeOperation {
    latency: Duration,
    fail_on: Option<usize>,
    panic_on: Option<usize>,
    exec_delay: Duration,
    calls: usize,
    counters: Arc<Counters>,
}

#[async_trait]
impl Operation for FakeOperation {
    async fn exec(&mut self, args: &[String]) -> Result<Execution, OperationError> {
        if self.exec_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.exec_delay).await;
        }
        self.calls += 1;
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(self.calls) {
            return Err(OperationError::request("HTTP 500"));
        }
        if self.panic_on == Some(self.calls) {
            panic!("driver bug on call {}", self.calls);
        }
        Ok(Execution::new(self.latency, args[0].clone()))
    }

    async fn close(&mut self) -> Result<(), OperationError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl OperationProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn make_worker(&self, _config: &BenchConfig) -> Result<BoxedOperation, OperationError> {
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeOperation {
            latency: self.latency,
            fail_on: self.fail_on,
            panic_on: self.panic_on,
            exec_delay: self.exec_delay,
            calls: 0,
            counters: Arc::clone(&self.counters),
        }))
    }
}

fn inputs(values: &[&str]) -> Vec<Vec<String>> {
    values.iter().map(|v| vec![v.to_string()]).collect()
}

fn config(values: &[&str]) -> BenchConfig {
    BenchConfig::new(inputs(values))
        .with_benchmark("fake")
        .with_warmup(Duration::ZERO)
        .with_timeout(Duration::from_millis(10))
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn test_zero_duration_reports_only_samples() {
    let provider = Arc::new(FakeProvider::new(Duration::from_micros(50)));
    let counters = Arc::clone(&provider.counters);
    let config = config(&["a", "b", "c"])
        .with_concurrency(2)
        .with_duration(Duration::ZERO)
        .with_sample_count(2);

    let report = BenchmarkRunner::new(config, provider).run().await.unwrap();

    assert_eq!(report.queries, 0);
    assert_eq!(report.latency_counts.len(), bucket_count(Duration::from_millis(10)));
    assert_eq!(report.latency_counts.iter().sum::<u64>(), 0);
    assert_eq!(report.min_latency, 0);
    assert_eq!(report.max_latency, 0);
    assert_eq!(report.samples.len(), 2);
    for sample in &report.samples {
        assert!(["a", "b", "c"].contains(&sample.as_str()), "unexpected sample {sample}");
    }

    // Two workers per phase, each sampling twice
    assert_eq!(counters.opened.load(Ordering::SeqCst), 4);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 4);
    assert_eq!(counters.calls.load(Ordering::SeqCst), 8);
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn test_histogram_conserves_query_count() {
    let provider = Arc::new(FakeProvider::new(Duration::from_micros(250)));
    let counters = Arc::clone(&provider.counters);
    let config = config(&["a", "b", "c", "d", "e", "f"])
        .with_concurrency(3)
        .with_duration(Duration::from_millis(50))
        .with_sample_count(4);

    let report = BenchmarkRunner::new(config, provider).run().await.unwrap();

    assert!(report.queries > 0);
    assert_eq!(report.latency_counts.iter().sum::<u64>(), report.queries);
    assert_eq!(report.latency_counts[25], report.queries);
    assert_eq!(report.min_latency, 25);
    assert_eq!(report.max_latency, 25);
    assert!(report.duration >= 0.05);
    assert!(report.qps() > 0.0);
    assert_eq!(report.samples.len(), 4);
    assert_eq!(
        counters.opened.load(Ordering::SeqCst),
        counters.closed.load(Ordering::SeqCst)
    );
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn test_failure_aborts_run_and_closes_every_worker() {
    let mut provider = FakeProvider::new(Duration::from_micros(10));
    provider.fail_on = Some(3);
    let provider = Arc::new(provider);
    let counters = Arc::clone(&provider.counters);
    let config = config(&["a", "b", "c", "d"])
        .with_concurrency(2)
        .with_duration(Duration::from_secs(30))
        .with_sample_count(1);

    let err = BenchmarkRunner::new(config, provider).run().await.unwrap_err();

    match err {
        BenchError::Operation { phase, source, .. } => {
            assert_eq!(phase, Phase::Measured);
            assert!(matches!(source, OperationError::Request(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(counters.opened.load(Ordering::SeqCst), 4);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 4);
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn test_report_duration_is_the_configured_phase_length() {
    for duration in [Duration::from_millis(100), Duration::ZERO] {
        let mut provider = FakeProvider::new(Duration::from_micros(10));
        provider.connect_delay = Duration::from_millis(150);
        provider.exec_delay = Duration::from_millis(20);
        let config = config(&["a", "b"])
            .with_concurrency(1)
            .with_duration(duration)
            .with_sample_count(5);

        let report = BenchmarkRunner::new(config, Arc::new(provider))
            .run()
            .await
            .unwrap();

        // Connection setup and 100ms of sampling are not part of the phase
        assert_eq!(report.duration, duration.as_secs_f64());
        if duration.is_zero() {
            assert_eq!(report.queries, 0);
            assert_eq!(report.qps(), 0.0);
        } else {
            assert!(report.queries > 0);
            assert!(report.queries <= 6, "queries = {}", report.queries);
        }
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn test_panicking_worker_fails_the_run() {
    let mut provider = FakeProvider::new(Duration::from_micros(10));
    provider.panic_on = Some(1);
    let config = config(&["a"])
        .with_concurrency(1)
        .with_duration(Duration::from_millis(10))
        .with_sample_count(1);

    let err = BenchmarkRunner::new(config, Arc::new(provider))
        .run()
        .await
        .unwrap_err();

    match err {
        BenchError::WorkerPanicked(msg) => assert!(msg.contains("panicked"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn test_seeded_runs_draw_identical_samples() {
    let values: Vec<String> = (0..40).map(|i| format!("q{i}")).collect();
    let refs: Vec<&str> = values.iter().map(String::as_str).collect();

    let mut runs = Vec::new();
    for _ in 0..2 {
        let config = config(&refs)
            .with_concurrency(4)
            .with_duration(Duration::ZERO)
            .with_sample_count(6)
            .with_seed(42);
        let provider = Arc::new(FakeProvider::new(Duration::from_micros(10)));
        runs.push(BenchmarkRunner::new(config, provider).run().await.unwrap().samples);
    }

    assert_eq!(runs[0].len(), 6);
    assert_eq!(runs[0], runs[1]);
}

#[test_log::test(tokio::test)]
async fn test_more_workers_than_inputs_is_rejected() {
    let provider = Arc::new(FakeProvider::new(Duration::from_micros(10)));
    let counters = Arc::clone(&provider.counters);
    let config = config(&["a", "b"]).with_concurrency(3);

    let err = BenchmarkRunner::new(config, provider).run().await.unwrap_err();

    assert!(matches!(
        err,
        BenchError::Config(ConfigError::EmptyPartition { worker: 2, .. })
    ));
    assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unknown_provider_tag() {
    let mut registry = ProviderRegistry::new();
    registry.register("fake", || {
        Arc::new(FakeProvider::new(Duration::ZERO)) as BoxedProvider
    });

    assert!(registry.has_provider("fake"));
    assert!(matches!(
        registry.create("grpc"),
        Err(ConfigError::UnknownProvider(tag)) if tag == "grpc"
    ));
    assert_eq!(registry.create("fake").unwrap().name(), "fake");
}
