use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use voxbench::application::ports::{
    ArtifactStore, BenchmarkRepository, SpeechSynthesizer, Synthesis, SynthesisConfig, VendorError,
};
use voxbench::application::services::{ExecutionPolicy, RunExecutor, VendorRegistry};
use voxbench::domain::{
    ArtifactKind, ItemStatus, Run, RunConfig, RunItem, RunMode, RunStatus, ServiceKind,
    VendorLabel,
};
use voxbench::infrastructure::audio::ContainerDurationProbe;
use voxbench::infrastructure::persistence::{SqliteBenchmarkRepository, create_pool, init_schema};
use voxbench::infrastructure::storage::InMemoryArtifactStore;
use voxbench::infrastructure::vendors::{MockRecognizer, MockSynthesizer};

const REFERENCE: &str = "The quick brown fox jumps over the lazy dog";

struct Harness {
    repository: Arc<dyn BenchmarkRepository>,
    artifacts: Arc<InMemoryArtifactStore>,
    executor: Arc<RunExecutor>,
}

async fn harness(registry: VendorRegistry, policy: ExecutionPolicy) -> Harness {
    let pool = create_pool("sqlite::memory:", 1).await.unwrap();
    init_schema(&pool).await.unwrap();
    let repository: Arc<dyn BenchmarkRepository> = Arc::new(SqliteBenchmarkRepository::new(pool));
    let artifacts = Arc::new(InMemoryArtifactStore::new());
    let store: Arc<dyn ArtifactStore> = artifacts.clone();
    let executor = Arc::new(RunExecutor::new(
        Arc::new(registry),
        repository.clone(),
        store,
        Arc::new(ContainerDurationProbe),
        policy,
    ));
    Harness {
        repository,
        artifacts,
        executor,
    }
}

fn echo_registry() -> VendorRegistry {
    let mut registry = VendorRegistry::new();
    registry.register_synthesizer("mock_tts", Arc::new(MockSynthesizer::new()));
    registry.register_recognizer("mock_stt", Arc::new(MockRecognizer::with_transcript(REFERENCE)));
    registry
}

fn test_policy() -> ExecutionPolicy {
    ExecutionPolicy {
        retry_backoff: Duration::from_millis(10),
        default_synthesizer: "mock_tts".to_string(),
        default_evaluator: "mock_stt".to_string(),
        ..ExecutionPolicy::default()
    }
}

async fn seed_run(
    harness: &Harness,
    mode: RunMode,
    labels: Vec<VendorLabel>,
    config: RunConfig,
    inputs: &[&str],
) -> (Run, Vec<RunItem>) {
    let run = Run::new(mode, labels.clone(), config);
    let mut items = Vec::new();
    for label in &labels {
        for input in inputs {
            items.push(RunItem::new(run.id, label.clone(), input.to_string(), None));
        }
    }
    harness.repository.create_run(&run).await.unwrap();
    harness.repository.append_items(&items).await.unwrap();
    (run, items)
}

fn summary_metrics(item: &RunItem) -> HashMap<String, f64> {
    let mut metrics = HashMap::new();
    if let Some(summary) = &item.metrics_summary {
        for pair in summary.split('|') {
            if let Some((name, value)) = pair.split_once(':') {
                metrics.insert(name.to_string(), value.parse::<f64>().unwrap());
            }
        }
    }
    metrics
}

fn metric_names(item: &RunItem) -> HashSet<String> {
    summary_metrics(item).into_keys().collect()
}

fn name_set(names: &[&str]) -> HashSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn given_isolated_tts_run_when_executed_then_item_completes_with_the_full_metric_set() {
    let h = harness(echo_registry(), test_policy()).await;
    let config = RunConfig {
        service: Some(ServiceKind::Tts),
        ..RunConfig::default()
    };
    let (run, _) = seed_run(
        &h,
        RunMode::Isolated,
        vec![VendorLabel::single("mock_tts")],
        config,
        &[REFERENCE],
    )
    .await;

    h.executor.clone().execute(run.id).await;

    let finished = h.repository.get_run(run.id).await.unwrap().unwrap();
    assert_eq!(finished.status, RunStatus::Completed);
    assert!(finished.started_at.is_some());
    assert!(finished.finished_at.is_some());

    let items = h.repository.list_items_by_run(run.id).await.unwrap();
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.status, ItemStatus::Completed);

    assert_eq!(
        metric_names(item),
        name_set(&[
            "tts_latency",
            "tts_ttfb",
            "audio_duration",
            "tts_rtf",
            "wer",
            "accuracy",
            "confidence",
        ])
    );

    let metrics = summary_metrics(item);
    assert!(metrics["tts_latency"] > 0.0);
    assert!(metrics["tts_ttfb"] > 0.0);
    assert!(metrics["tts_ttfb"] <= metrics["tts_latency"]);
    assert!(metrics["audio_duration"] > 0.0);
    assert!(
        (metrics["tts_rtf"] - metrics["tts_latency"] / metrics["audio_duration"]).abs() < 1e-6
    );
    assert_eq!(metrics["wer"], 0.0);
    assert_eq!(metrics["accuracy"], 100.0);
    assert!((0.0..=1.0).contains(&metrics["confidence"]));

    // The probe parsed a real WAV container, not an estimate.
    assert!(!item.sidecar.duration_estimated);
    assert_eq!(item.sidecar.service_type, Some(ServiceKind::Tts));
    assert_eq!(item.sidecar.tts_vendor.as_deref(), Some("mock_tts"));
}

#[tokio::test]
async fn given_isolated_tts_run_when_executed_then_artifacts_round_trip_byte_identical() {
    let h = harness(echo_registry(), test_policy()).await;
    let config = RunConfig {
        service: Some(ServiceKind::Tts),
        ..RunConfig::default()
    };
    let (run, _) = seed_run(
        &h,
        RunMode::Isolated,
        vec![VendorLabel::single("mock_tts")],
        config,
        &[REFERENCE],
    )
    .await;

    h.executor.clone().execute(run.id).await;

    let items = h.repository.list_items_by_run(run.id).await.unwrap();
    let item = &items[0];

    let audio_file = item.audio_file.clone().unwrap();
    assert_eq!(audio_file, format!("audio_{}.wav", item.id));
    let audio = h
        .artifacts
        .fetch(ArtifactKind::Audio, &audio_file)
        .await
        .unwrap();
    assert!(!audio.is_empty());
    assert_eq!(&audio[..4], b"RIFF");

    let transcript_file = format!("transcript_{}.txt", item.id);
    let transcript = h
        .artifacts
        .fetch(ArtifactKind::Transcript, &transcript_file)
        .await
        .unwrap();
    assert_eq!(transcript, item.transcript.clone().unwrap().into_bytes());
}

#[tokio::test]
async fn given_isolated_stt_run_when_executed_then_stimulus_and_transcript_are_persisted() {
    let h = harness(echo_registry(), test_policy()).await;
    let config = RunConfig {
        service: Some(ServiceKind::Stt),
        ..RunConfig::default()
    };
    let (run, _) = seed_run(
        &h,
        RunMode::Isolated,
        vec![VendorLabel::single("mock_stt")],
        config,
        &[REFERENCE],
    )
    .await;

    h.executor.clone().execute(run.id).await;

    let items = h.repository.list_items_by_run(run.id).await.unwrap();
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.status, ItemStatus::Completed);
    assert!(item.audio_file.is_some());
    assert_eq!(item.transcript.as_deref(), Some(REFERENCE));

    assert_eq!(
        metric_names(item),
        name_set(&[
            "stt_latency",
            "audio_duration",
            "stt_rtf",
            "wer",
            "accuracy",
            "confidence",
        ])
    );

    let metrics = summary_metrics(item);
    assert!(metrics["stt_latency"] > 0.0);
    assert_eq!(metrics["wer"], 0.0);
    assert_eq!(metrics["accuracy"], 100.0);
    assert_eq!(item.sidecar.service_type, Some(ServiceKind::Stt));
    assert_eq!(item.sidecar.stt_vendor.as_deref(), Some("mock_stt"));
}

#[tokio::test]
async fn given_chained_run_when_executed_then_e2e_latency_is_the_sum_of_stages() {
    let h = harness(echo_registry(), test_policy()).await;
    let (run, _) = seed_run(
        &h,
        RunMode::Chained,
        vec![VendorLabel::chained("mock_tts", "mock_stt")],
        RunConfig::default(),
        &["Hello world"],
    )
    .await;

    h.executor.clone().execute(run.id).await;

    let items = h.repository.list_items_by_run(run.id).await.unwrap();
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.status, ItemStatus::Completed);
    assert_eq!(item.vendor.to_string(), "mock_tts\u{2192}mock_stt");

    assert_eq!(
        metric_names(item),
        name_set(&[
            "tts_latency",
            "tts_ttfb",
            "stt_latency",
            "e2e_latency",
            "audio_duration",
            "tts_rtf",
            "stt_rtf",
            "wer",
            "accuracy",
            "confidence",
        ])
    );

    let metrics = summary_metrics(item);
    assert!(
        (metrics["e2e_latency"] - (metrics["tts_latency"] + metrics["stt_latency"])).abs() < 0.001
    );
    assert_eq!(item.sidecar.service_type, Some(ServiceKind::E2e));
    assert_eq!(item.sidecar.tts_vendor.as_deref(), Some("mock_tts"));
    assert_eq!(item.sidecar.stt_vendor.as_deref(), Some("mock_stt"));
}

#[tokio::test]
async fn given_six_item_batch_when_executed_then_every_item_completes() {
    let mut registry = echo_registry();
    registry.register_synthesizer("mock_tts_b", Arc::new(MockSynthesizer::new()));
    let h = harness(registry, test_policy()).await;
    let config = RunConfig {
        service: Some(ServiceKind::Tts),
        ..RunConfig::default()
    };
    let (run, _) = seed_run(
        &h,
        RunMode::Isolated,
        vec![
            VendorLabel::single("mock_tts"),
            VendorLabel::single("mock_tts_b"),
        ],
        config,
        &["a", "b", "c"],
    )
    .await;

    h.executor.clone().execute(run.id).await;

    let items = h.repository.list_items_by_run(run.id).await.unwrap();
    assert_eq!(items.len(), 6);
    assert!(items.iter().all(|i| i.status == ItemStatus::Completed));
    assert_eq!(
        h.repository.get_run(run.id).await.unwrap().unwrap().status,
        RunStatus::Completed
    );
}

struct RejectingSynthesizer;

#[async_trait::async_trait]
impl SpeechSynthesizer for RejectingSynthesizer {
    async fn synthesize(
        &self,
        _text: &str,
        _config: &SynthesisConfig,
    ) -> Result<Synthesis, VendorError> {
        Err(VendorError::HttpStatus {
            status: 401,
            message: "invalid api key".to_string(),
        })
    }
}

#[tokio::test]
async fn given_one_failing_vendor_when_executed_then_run_is_partial_and_siblings_complete() {
    let mut registry = echo_registry();
    registry.register_synthesizer("broken", Arc::new(RejectingSynthesizer));
    let h = harness(registry, test_policy()).await;
    let config = RunConfig {
        service: Some(ServiceKind::Tts),
        ..RunConfig::default()
    };
    let (run, _) = seed_run(
        &h,
        RunMode::Isolated,
        vec![
            VendorLabel::single("mock_tts"),
            VendorLabel::single("broken"),
        ],
        config,
        &[REFERENCE],
    )
    .await;

    h.executor.clone().execute(run.id).await;

    let items = h.repository.list_items_by_run(run.id).await.unwrap();
    let completed: Vec<_> = items
        .iter()
        .filter(|i| i.status == ItemStatus::Completed)
        .collect();
    let failed: Vec<_> = items
        .iter()
        .filter(|i| i.status == ItemStatus::Failed)
        .collect();
    assert_eq!(completed.len(), 1);
    assert_eq!(failed.len(), 1);
    assert!(failed[0].failure_reason.as_deref().unwrap().contains("401"));

    assert_eq!(
        h.repository.get_run(run.id).await.unwrap().unwrap().status,
        RunStatus::Partial
    );
}

#[tokio::test]
async fn given_every_item_failing_when_executed_then_run_is_failed() {
    let mut registry = VendorRegistry::new();
    registry.register_synthesizer("broken", Arc::new(RejectingSynthesizer));
    registry.register_recognizer("mock_stt", Arc::new(MockRecognizer::new()));
    let h = harness(registry, test_policy()).await;
    let config = RunConfig {
        service: Some(ServiceKind::Tts),
        ..RunConfig::default()
    };
    let (run, _) = seed_run(
        &h,
        RunMode::Isolated,
        vec![VendorLabel::single("broken")],
        config,
        &["a", "b"],
    )
    .await;

    h.executor.clone().execute(run.id).await;

    assert_eq!(
        h.repository.get_run(run.id).await.unwrap().unwrap().status,
        RunStatus::Failed
    );
}

struct FlakySynthesizer {
    inner: MockSynthesizer,
    attempts: AtomicU32,
    failures_before_success: u32,
}

#[async_trait::async_trait]
impl SpeechSynthesizer for FlakySynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        config: &SynthesisConfig,
    ) -> Result<Synthesis, VendorError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures_before_success {
            return Err(VendorError::HttpStatus {
                status: 503,
                message: "temporarily unavailable".to_string(),
            });
        }
        self.inner.synthesize(text, config).await
    }
}

#[tokio::test]
async fn given_a_transient_vendor_error_when_executed_then_the_call_is_retried() {
    let flaky = Arc::new(FlakySynthesizer {
        inner: MockSynthesizer::new(),
        attempts: AtomicU32::new(0),
        failures_before_success: 1,
    });
    let mut registry = VendorRegistry::new();
    registry.register_synthesizer("flaky", flaky.clone());
    registry.register_recognizer("mock_stt", Arc::new(MockRecognizer::with_transcript(REFERENCE)));
    let h = harness(registry, test_policy()).await;
    let config = RunConfig {
        service: Some(ServiceKind::Tts),
        ..RunConfig::default()
    };
    let (run, _) = seed_run(
        &h,
        RunMode::Isolated,
        vec![VendorLabel::single("flaky")],
        config,
        &[REFERENCE],
    )
    .await;

    h.executor.clone().execute(run.id).await;

    assert_eq!(flaky.attempts.load(Ordering::SeqCst), 2);
    let items = h.repository.list_items_by_run(run.id).await.unwrap();
    assert_eq!(items[0].status, ItemStatus::Completed);
}

struct StallingSynthesizer;

#[async_trait::async_trait]
impl SpeechSynthesizer for StallingSynthesizer {
    async fn synthesize(
        &self,
        _text: &str,
        _config: &SynthesisConfig,
    ) -> Result<Synthesis, VendorError> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Err(VendorError::EmptyBody)
    }
}

#[tokio::test]
async fn given_a_stalled_vendor_call_when_the_timeout_expires_then_the_item_fails_with_timeout() {
    let mut registry = VendorRegistry::new();
    registry.register_synthesizer("stalled", Arc::new(StallingSynthesizer));
    registry.register_recognizer("mock_stt", Arc::new(MockRecognizer::new()));
    let policy = ExecutionPolicy {
        synthesize_timeout: Duration::from_millis(50),
        ..test_policy()
    };
    let h = harness(registry, policy).await;
    let config = RunConfig {
        service: Some(ServiceKind::Tts),
        ..RunConfig::default()
    };
    let (run, _) = seed_run(
        &h,
        RunMode::Isolated,
        vec![VendorLabel::single("stalled")],
        config,
        &["hello"],
    )
    .await;

    h.executor.clone().execute(run.id).await;

    let items = h.repository.list_items_by_run(run.id).await.unwrap();
    assert_eq!(items[0].status, ItemStatus::Failed);
    assert_eq!(items[0].failure_reason.as_deref(), Some("timeout"));
    assert_eq!(
        h.repository.get_run(run.id).await.unwrap().unwrap().status,
        RunStatus::Failed
    );
}
