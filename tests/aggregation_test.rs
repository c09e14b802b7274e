use std::sync::Arc;

use voxbench::application::ports::{BenchmarkRepository, ItemCompletion};
use voxbench::application::services::{AggregationService, percentile};
use voxbench::domain::{
    ItemSidecar, Metric, MetricName, Run, RunConfig, RunItem, RunMode, RunStatus, ServiceKind,
    VendorLabel,
};
use voxbench::infrastructure::persistence::{SqliteBenchmarkRepository, create_pool, init_schema};

#[test]
fn given_an_empty_sample_when_taking_percentiles_then_none() {
    assert!(percentile(&[], 0.5).is_none());
}

#[test]
fn given_a_single_sample_when_taking_percentiles_then_that_value() {
    assert_eq!(percentile(&[4.2], 0.5), Some(4.2));
    assert_eq!(percentile(&[4.2], 0.9), Some(4.2));
}

#[test]
fn given_a_sorted_sample_when_interpolating_then_values_straddle_the_fractional_index() {
    let values = [1.0, 2.0, 3.0, 4.0, 5.0];
    // p50 at index (5-1)*0.5 = 2 exactly.
    assert_eq!(percentile(&values, 0.5), Some(3.0));
    // p90 at index 3.6, between values[3]=4 and values[4]=5.
    let p90 = percentile(&values, 0.9).unwrap();
    assert!((p90 - 4.6).abs() < 1e-12);
    assert!(p90 >= values[3] && p90 <= values[4]);
}

#[test]
fn given_any_sorted_sample_when_taking_percentiles_then_p50_is_not_above_p90() {
    let samples: Vec<Vec<f64>> = vec![
        vec![0.1],
        vec![0.5, 0.6],
        vec![1.0, 1.0, 1.0],
        vec![0.2, 0.4, 0.8, 1.6, 3.2, 6.4],
    ];
    for sorted in samples {
        let p50 = percentile(&sorted, 0.5).unwrap();
        let p90 = percentile(&sorted, 0.9).unwrap();
        assert!(p50 <= p90, "p50 {} > p90 {} for {:?}", p50, p90, sorted);
    }
}

async fn seeded_repository() -> Arc<dyn BenchmarkRepository> {
    let pool = create_pool("sqlite::memory:", 1).await.unwrap();
    init_schema(&pool).await.unwrap();
    let repo: Arc<dyn BenchmarkRepository> = Arc::new(SqliteBenchmarkRepository::new(pool));

    // Two chained items on the same pairing, one isolated STT item and one
    // isolated TTS item, plus a failed run for the success-rate figure.
    let chained = Run::new(
        RunMode::Chained,
        vec![VendorLabel::chained("elevenlabs", "deepgram")],
        RunConfig::default(),
    );
    repo.create_run(&chained).await.unwrap();
    for (e2e, wer) in [(1.0, 0.1), (2.0, 0.3)] {
        let item = RunItem::new(
            chained.id,
            VendorLabel::chained("elevenlabs", "deepgram"),
            "x".into(),
            None,
        );
        repo.append_items(std::slice::from_ref(&item)).await.unwrap();
        let sidecar = ItemSidecar {
            service_type: Some(ServiceKind::E2e),
            tts_vendor: Some("elevenlabs".to_string()),
            stt_vendor: Some("deepgram".to_string()),
            ..ItemSidecar::default()
        };
        let completion = ItemCompletion {
            item_id: item.id,
            metrics: vec![
                Metric::new(item.id, MetricName::TtsLatency, e2e * 0.4),
                Metric::new(item.id, MetricName::SttLatency, e2e * 0.6),
                Metric::new(item.id, MetricName::E2eLatency, e2e),
                Metric::new(item.id, MetricName::Wer, wer),
            ],
            artifacts: vec![],
            audio_file: Some(format!("audio_{}.mp3", item.id)),
            transcript: Some("x".to_string()),
            sidecar,
        };
        repo.complete_item(&completion).await.unwrap();
    }
    repo.finish_run(chained.id, RunStatus::Completed).await.unwrap();

    let stt = Run::new(
        RunMode::Isolated,
        vec![VendorLabel::single("deepgram")],
        RunConfig {
            service: Some(ServiceKind::Stt),
            ..RunConfig::default()
        },
    );
    repo.create_run(&stt).await.unwrap();
    let item = RunItem::new(stt.id, VendorLabel::single("deepgram"), "y".into(), None);
    repo.append_items(std::slice::from_ref(&item)).await.unwrap();
    repo.complete_item(&ItemCompletion {
        item_id: item.id,
        metrics: vec![
            Metric::new(item.id, MetricName::SttLatency, 4.0),
            Metric::new(item.id, MetricName::Wer, 0.2),
        ],
        artifacts: vec![],
        audio_file: None,
        transcript: Some("y".to_string()),
        sidecar: ItemSidecar {
            service_type: Some(ServiceKind::Stt),
            stt_vendor: Some("deepgram".to_string()),
            ..ItemSidecar::default()
        },
    })
    .await
    .unwrap();
    repo.finish_run(stt.id, RunStatus::Completed).await.unwrap();

    let tts = Run::new(
        RunMode::Isolated,
        vec![VendorLabel::single("elevenlabs")],
        RunConfig {
            service: Some(ServiceKind::Tts),
            ..RunConfig::default()
        },
    );
    repo.create_run(&tts).await.unwrap();
    let item = RunItem::new(tts.id, VendorLabel::single("elevenlabs"), "z".into(), None);
    repo.append_items(std::slice::from_ref(&item)).await.unwrap();
    repo.complete_item(&ItemCompletion {
        item_id: item.id,
        metrics: vec![Metric::new(item.id, MetricName::TtsLatency, 0.5)],
        artifacts: vec![],
        audio_file: Some(format!("audio_{}.mp3", item.id)),
        transcript: None,
        sidecar: ItemSidecar {
            service_type: Some(ServiceKind::Tts),
            tts_vendor: Some("elevenlabs".to_string()),
            ..ItemSidecar::default()
        },
    })
    .await
    .unwrap();
    repo.finish_run(tts.id, RunStatus::Completed).await.unwrap();

    let doomed = Run::new(
        RunMode::Isolated,
        vec![VendorLabel::single("deepgram")],
        RunConfig::default(),
    );
    repo.create_run(&doomed).await.unwrap();
    repo.finish_run(doomed.id, RunStatus::Failed).await.unwrap();

    repo
}

#[tokio::test]
async fn given_a_seeded_window_when_computing_stats_then_counts_and_averages_match() {
    let repo = seeded_repository().await;
    let aggregation = AggregationService::new(repo, 7);

    let stats = aggregation.dashboard_stats().await.unwrap();
    assert_eq!(stats.total_runs, 4);
    assert_eq!(stats.completed_runs, 3);
    assert_eq!(stats.total_items, 4);
    assert!((stats.success_rate - 0.75).abs() < 1e-9);

    // wer values: 0.1, 0.3, 0.2
    assert!((stats.avg_wer.unwrap() - 0.2).abs() < 1e-9);
    assert!((stats.avg_accuracy.unwrap() - 80.0).abs() < 1e-6);

    // Per-item latency: e2e 1.0 and 2.0 for the chained items, stt 4.0,
    // tts 0.5 -> mean of [1.0, 2.0, 4.0, 0.5].
    assert!((stats.avg_latency.unwrap() - 1.875).abs() < 1e-9);
}

#[tokio::test]
async fn given_a_seeded_window_when_computing_insights_then_mix_usage_and_pairings_match() {
    let repo = seeded_repository().await;
    let aggregation = AggregationService::new(repo, 7);

    let insights = aggregation.insights().await.unwrap();
    assert_eq!(insights.service_mix.e2e, 2);
    assert_eq!(insights.service_mix.stt, 1);
    assert_eq!(insights.service_mix.tts, 1);
    assert_eq!(insights.service_mix.unknown, 0);

    assert_eq!(insights.vendor_usage.tts.get("elevenlabs"), Some(&3));
    assert_eq!(insights.vendor_usage.stt.get("deepgram"), Some(&3));

    assert_eq!(insights.top_vendor_pairings.len(), 1);
    let pairing = &insights.top_vendor_pairings[0];
    assert_eq!(pairing.tts_vendor, "elevenlabs");
    assert_eq!(pairing.stt_vendor, "deepgram");
    assert_eq!(pairing.tests, 2);
    assert!((pairing.avg_wer - 0.2).abs() < 1e-9);
}

#[tokio::test]
async fn given_latency_metrics_when_computing_percentiles_then_count_and_order_hold() {
    let repo = seeded_repository().await;
    let aggregation = AggregationService::new(repo, 7);

    let e2e = aggregation
        .latency_percentiles(MetricName::E2eLatency, 7)
        .await
        .unwrap();
    assert_eq!(e2e.metric, "e2e_latency");
    assert_eq!(e2e.count, 2);
    let p50 = e2e.p50.unwrap();
    let p90 = e2e.p90.unwrap();
    assert!(p50 <= p90);
    assert!((p50 - 1.5).abs() < 1e-9);
    assert!((p90 - 1.9).abs() < 1e-9);

    let empty = aggregation
        .latency_percentiles(MetricName::TtsTtfb, 7)
        .await
        .unwrap();
    assert_eq!(empty.count, 0);
    assert!(empty.p50.is_none());
}
