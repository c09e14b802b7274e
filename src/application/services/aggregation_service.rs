use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::application::ports::{BenchmarkRepository, RepositoryError};
use crate::domain::MetricName;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_runs: i64,
    pub completed_runs: i64,
    pub total_items: i64,
    /// completed / total, in [0, 1]. 1.0 when the window holds no runs.
    pub success_rate: f64,
    pub avg_wer: Option<f64>,
    pub avg_accuracy: Option<f64>,
    /// Per item: e2e_latency when present, otherwise whichever of
    /// tts_latency/stt_latency the item recorded.
    pub avg_latency: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceMix {
    pub e2e: i64,
    pub stt: i64,
    pub tts: i64,
    pub unknown: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VendorUsage {
    pub tts: HashMap<String, i64>,
    pub stt: HashMap<String, i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VendorPairing {
    pub tts_vendor: String,
    pub stt_vendor: String,
    pub tests: i64,
    pub avg_wer: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Insights {
    pub service_mix: ServiceMix,
    pub vendor_usage: VendorUsage,
    pub top_vendor_pairings: Vec<VendorPairing>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyPercentiles {
    pub metric: String,
    pub days: i64,
    pub count: usize,
    pub p50: Option<f64>,
    pub p90: Option<f64>,
}

/// Derived dashboard views over a lookback window. Reads only; all data
/// comes from the repository's metric rows and item summaries. The window
/// keys on item creation time.
pub struct AggregationService {
    repository: Arc<dyn BenchmarkRepository>,
    lookback_days: i64,
}

impl AggregationService {
    pub fn new(repository: Arc<dyn BenchmarkRepository>, lookback_days: i64) -> Self {
        Self {
            repository,
            lookback_days,
        }
    }

    #[instrument(skip(self))]
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, RepositoryError> {
        let now = Utc::now();
        let since = now - Duration::days(self.lookback_days);
        let totals = self.repository.run_totals_since(since).await?;

        let wer_values = self
            .repository
            .metric_values_between(MetricName::Wer, since, now)
            .await?;
        let avg_wer = mean(&wer_values);
        let avg_accuracy = avg_wer.map(|wer| 100.0 * (1.0 - wer).max(0.0));

        let items = self.repository.items_since(since).await?;
        let latencies: Vec<f64> = items
            .iter()
            .filter_map(|item| {
                let metrics = parse_summary(item.metrics_summary.as_deref());
                metrics
                    .get(MetricName::E2eLatency.as_str())
                    .or_else(|| metrics.get(MetricName::TtsLatency.as_str()))
                    .or_else(|| metrics.get(MetricName::SttLatency.as_str()))
                    .copied()
            })
            .collect();

        let success_rate = if totals.total_runs > 0 {
            totals.completed_runs as f64 / totals.total_runs as f64
        } else {
            1.0
        };

        Ok(DashboardStats {
            total_runs: totals.total_runs,
            completed_runs: totals.completed_runs,
            total_items: totals.total_items,
            success_rate,
            avg_wer,
            avg_accuracy,
            avg_latency: mean(&latencies),
        })
    }

    #[instrument(skip(self))]
    pub async fn insights(&self) -> Result<Insights, RepositoryError> {
        let since = Utc::now() - Duration::days(self.lookback_days);
        let items = self.repository.items_since(since).await?;

        let mut mix = ServiceMix::default();
        let mut usage = VendorUsage::default();
        let mut pairings: HashMap<(String, String), (f64, i64, i64)> = HashMap::new();

        for item in &items {
            let metrics = parse_summary(item.metrics_summary.as_deref());
            match detect_service(&metrics) {
                DetectedService::E2e => {
                    mix.e2e += 1;
                    let tts = item.sidecar.tts_vendor.clone();
                    let stt = item.sidecar.stt_vendor.clone();
                    if let Some(tts) = &tts {
                        *usage.tts.entry(tts.clone()).or_default() += 1;
                    }
                    if let Some(stt) = &stt {
                        *usage.stt.entry(stt.clone()).or_default() += 1;
                    }
                    if let (Some(tts), Some(stt)) = (tts, stt) {
                        let entry = pairings.entry((tts, stt)).or_default();
                        entry.2 += 1;
                        if let Some(wer) = metrics.get(MetricName::Wer.as_str()) {
                            entry.0 += wer;
                            entry.1 += 1;
                        }
                    }
                }
                DetectedService::Stt => {
                    mix.stt += 1;
                    *usage.stt.entry(item.vendor.to_string()).or_default() += 1;
                }
                DetectedService::Tts => {
                    mix.tts += 1;
                    *usage.tts.entry(item.vendor.to_string()).or_default() += 1;
                }
                DetectedService::Unknown => mix.unknown += 1,
            }
        }

        let mut top: Vec<VendorPairing> = pairings
            .into_iter()
            .filter(|(_, (_, scored, _))| *scored > 0)
            .map(|((tts, stt), (wer_sum, scored, tests))| VendorPairing {
                tts_vendor: tts,
                stt_vendor: stt,
                tests,
                avg_wer: wer_sum / scored as f64,
            })
            .collect();
        top.sort_by(|a, b| {
            b.tests
                .cmp(&a.tests)
                .then(a.avg_wer.total_cmp(&b.avg_wer))
        });
        top.truncate(5);

        Ok(Insights {
            service_mix: mix,
            vendor_usage: usage,
            top_vendor_pairings: top,
        })
    }

    #[instrument(skip(self))]
    pub async fn latency_percentiles(
        &self,
        metric: MetricName,
        days: i64,
    ) -> Result<LatencyPercentiles, RepositoryError> {
        let now = Utc::now();
        let since = now - Duration::days(days);
        let values = self
            .repository
            .metric_values_between(metric, since, now)
            .await?;

        Ok(LatencyPercentiles {
            metric: metric.as_str().to_string(),
            days,
            count: values.len(),
            p50: percentile(&values, 0.5),
            p90: percentile(&values, 0.9),
        })
    }
}

enum DetectedService {
    E2e,
    Stt,
    Tts,
    Unknown,
}

/// Classification follows the metrics an item recorded: an end-to-end
/// latency marks a chained item, an STT latency an STT item, a TTS latency
/// a TTS item.
fn detect_service(metrics: &HashMap<String, f64>) -> DetectedService {
    if metrics.contains_key(MetricName::E2eLatency.as_str()) {
        DetectedService::E2e
    } else if metrics.contains_key(MetricName::SttLatency.as_str()) {
        DetectedService::Stt
    } else if metrics.contains_key(MetricName::TtsLatency.as_str()) {
        DetectedService::Tts
    } else {
        DetectedService::Unknown
    }
}

fn parse_summary(summary: Option<&str>) -> HashMap<String, f64> {
    let mut metrics = HashMap::new();
    let Some(summary) = summary else {
        return metrics;
    };
    for pair in summary.split('|') {
        if let Some((name, value)) = pair.split_once(':') {
            if let Ok(value) = value.parse::<f64>() {
                metrics.insert(name.to_string(), value);
            }
        }
    }
    metrics
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Percentile over an ascending sample: value at fractional index
/// `(n - 1) * k`, linearly interpolated between the straddling elements.
pub fn percentile(sorted: &[f64], k: f64) -> Option<f64> {
    match sorted.len() {
        0 => None,
        1 => Some(sorted[0]),
        n => {
            let index = k * (n - 1) as f64;
            let lo = index.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            if lo == hi {
                Some(sorted[lo])
            } else {
                let upper_weight = index - lo as f64;
                Some(sorted[lo] * (1.0 - upper_weight) + sorted[hi] * upper_weight)
            }
        }
    }
}
