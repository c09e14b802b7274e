use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::instrument;

use crate::application::ports::{
    ArtifactStore, ArtifactStoreError, BenchmarkRepository, DurationProbe, ItemCompletion,
    ProbedDuration, RepositoryError, SpeechRecognizer, SpeechSynthesizer, Synthesis,
    SynthesisConfig, Transcription, TranscriptionConfig, VendorError,
};
use crate::application::services::registry::VendorRegistry;
use crate::application::services::scoring::{
    accuracy_percent, normalize_confidence, real_time_factor, word_error_rate,
};
use crate::domain::{
    Artifact, ArtifactKind, ItemSidecar, ItemStatus, Metric, MetricName, Run, RunConfig, RunId,
    RunItem, RunItemId, RunMode, RunStatus, ServiceKind, VendorLabel,
};

/// Knobs governing item execution: the per-run worker limit, vendor call
/// timeouts, the retry budget for retryable vendor errors, and the fixed
/// vendors used as the isolated-STT stimulus and the isolated-TTS scorer.
#[derive(Debug, Clone)]
pub struct ExecutionPolicy {
    pub concurrency: usize,
    pub synthesize_timeout: Duration,
    pub transcribe_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub default_synthesizer: String,
    pub default_evaluator: String,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            concurrency: 4,
            synthesize_timeout: Duration::from_secs(60),
            transcribe_timeout: Duration::from_secs(120),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            default_synthesizer: "elevenlabs".to_string(),
            default_evaluator: "deepgram".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("vendor {vendor} lacks the required {capability} capability")]
    MissingCapability {
        vendor: String,
        capability: &'static str,
    },
    #[error("{vendor}: {source}")]
    Vendor { vendor: String, source: VendorError },
    #[error("timeout")]
    Timeout,
    #[error("artifact store: {0}")]
    Artifact(#[from] ArtifactStoreError),
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
    #[error("item vendor label does not fit the run mode: {0}")]
    LabelMismatch(String),
}

impl ItemError {
    /// The failure reason persisted on the item. Timeouts use the bare
    /// word so they can be filtered on.
    fn reason(&self) -> String {
        match self {
            ItemError::Timeout => "timeout".to_string(),
            other => other.to_string(),
        }
    }
}

/// Drives a run to its terminal state: expands nothing (items already
/// exist), dispatches each item through a bounded worker pool, records
/// metrics and artifacts transactionally, and derives the run's terminal
/// status from its items. Item failures never abort siblings.
pub struct RunExecutor {
    registry: Arc<VendorRegistry>,
    repository: Arc<dyn BenchmarkRepository>,
    artifacts: Arc<dyn ArtifactStore>,
    probe: Arc<dyn DurationProbe>,
    policy: ExecutionPolicy,
}

impl RunExecutor {
    pub fn new(
        registry: Arc<VendorRegistry>,
        repository: Arc<dyn BenchmarkRepository>,
        artifacts: Arc<dyn ArtifactStore>,
        probe: Arc<dyn DurationProbe>,
        policy: ExecutionPolicy,
    ) -> Self {
        Self {
            registry,
            repository,
            artifacts,
            probe,
            policy,
        }
    }

    #[instrument(skip(self), fields(run_id = %run_id))]
    pub async fn execute(self: Arc<Self>, run_id: RunId) {
        let run = match self.repository.get_run(run_id).await {
            Ok(Some(run)) => run,
            Ok(None) => {
                tracing::error!("Run disappeared before execution");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load run");
                return;
            }
        };

        if let Err(e) = self.repository.mark_run_started(run_id).await {
            tracing::error!(error = %e, "Failed to mark run running");
            return;
        }

        let items = match self.repository.list_items_by_run(run_id).await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load run items");
                let _ = self.repository.finish_run(run_id, RunStatus::Failed).await;
                return;
            }
        };

        // Items queue FIFO behind the per-run worker limit; siblings run
        // concurrently but independently.
        let semaphore = Arc::new(Semaphore::new(self.policy.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for item in items {
            let executor = Arc::clone(&self);
            let run = run.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                executor.process_item(&run, item).await;
            });
        }
        while tasks.join_next().await.is_some() {}

        let status = match self.repository.list_items_by_run(run_id).await {
            Ok(items) => terminal_status(&items),
            Err(e) => {
                tracing::error!(error = %e, "Failed to re-read items for terminal status");
                RunStatus::Failed
            }
        };
        if let Err(e) = self.repository.finish_run(run_id, status).await {
            tracing::error!(error = %e, "Failed to finish run");
        }
        tracing::info!(status = %status, "Run finished");
    }

    #[instrument(skip(self, run, item), fields(item_id = %item.id, vendor = %item.vendor))]
    async fn process_item(&self, run: &Run, item: RunItem) {
        if let Err(e) = self.repository.set_item_running(item.id).await {
            tracing::error!(error = %e, "Failed to mark item running");
            return;
        }

        let outcome = match run.mode {
            RunMode::Chained => self.process_chained(run, &item).await,
            RunMode::Isolated => match run.config.service {
                Some(ServiceKind::Stt) => self.process_isolated_stt(run, &item).await,
                // Rows without a service are legacy; treated as TTS.
                _ => self.process_isolated_tts(run, &item).await,
            },
        };

        match outcome {
            Ok(completion) => {
                if let Err(e) = self.repository.complete_item(&completion).await {
                    tracing::error!(error = %e, "Failed to commit item result");
                    let _ = self
                        .repository
                        .fail_item(item.id, &ItemError::from(e).reason())
                        .await;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "Item failed");
                if let Err(e) = self.repository.fail_item(item.id, &err.reason()).await {
                    tracing::error!(error = %e, "Failed to record item failure");
                }
            }
        }
    }

    /// Isolated TTS: synthesize with the vendor under test, persist the
    /// audio, then score it with the designated evaluator recognizer.
    async fn process_isolated_tts(
        &self,
        run: &Run,
        item: &RunItem,
    ) -> Result<ItemCompletion, ItemError> {
        let vendor = single_vendor(&item.vendor)?;
        let synthesizer = self
            .registry
            .synthesizer(vendor)
            .ok_or_else(|| ItemError::MissingCapability {
                vendor: vendor.to_string(),
                capability: "tts",
            })?;

        let syn_cfg = synthesis_config_for(&run.config, vendor);
        let synthesis = self
            .synthesize_with_retry(vendor, synthesizer.as_ref(), &item.input_text, &syn_cfg)
            .await?;

        let audio_file = audio_filename(item.id, &synthesis.content_type);
        self.artifacts
            .put(ArtifactKind::Audio, &audio_file, &synthesis.audio)
            .await?;

        let duration = self.probe.probe(
            &synthesis.audio,
            &synthesis.content_type,
            synthesis.vendor_duration_secs,
        );

        let evaluator = self.policy.default_evaluator.clone();
        let recognizer =
            self.registry
                .recognizer(&evaluator)
                .ok_or_else(|| ItemError::MissingCapability {
                    vendor: evaluator.clone(),
                    capability: "stt",
                })?;
        let tr_cfg = transcription_config_for(&run.config, &evaluator);
        let transcription = self
            .transcribe_with_retry(
                &evaluator,
                recognizer.as_ref(),
                &synthesis.audio,
                &synthesis.content_type,
                &tr_cfg,
            )
            .await?;

        let transcript_file = transcript_filename(item.id);
        self.artifacts
            .put(
                ArtifactKind::Transcript,
                &transcript_file,
                transcription.transcript.as_bytes(),
            )
            .await?;

        let wer = word_error_rate(&item.input_text, &transcription.transcript);
        let mut sidecar = ItemSidecar {
            service_type: Some(ServiceKind::Tts),
            tts_vendor: Some(vendor.to_string()),
            tts_model: synthesis.model.clone(),
            voice_id: synthesis.voice_id.clone(),
            language: run.config.language.clone(),
            ..ItemSidecar::default()
        };

        let mut metrics = vec![Metric::new(
            item.id,
            MetricName::TtsLatency,
            synthesis.latency_secs,
        )];
        if let Some(ttfb) = synthesis.ttfb_secs {
            metrics.push(Metric::new(item.id, MetricName::TtsTtfb, ttfb));
        }
        push_duration_metrics(
            &mut metrics,
            &mut sidecar,
            item.id,
            duration,
            &[(MetricName::TtsRtf, synthesis.latency_secs)],
        );
        metrics.push(Metric::new(item.id, MetricName::Wer, wer));
        metrics.push(Metric::new(
            item.id,
            MetricName::Accuracy,
            accuracy_percent(wer),
        ));
        metrics.push(Metric::new(
            item.id,
            MetricName::Confidence,
            normalize_confidence(transcription.confidence),
        ));

        Ok(ItemCompletion {
            item_id: item.id,
            artifacts: vec![
                Artifact::new(
                    item.id,
                    ArtifactKind::Audio,
                    synthesis.content_type.clone(),
                    audio_file.clone(),
                    synthesis.audio.len() as u64,
                ),
                Artifact::new(
                    item.id,
                    ArtifactKind::Transcript,
                    "text/plain",
                    transcript_file,
                    transcription.transcript.len() as u64,
                ),
            ],
            metrics,
            audio_file: Some(audio_file),
            transcript: Some(transcription.transcript),
            sidecar,
        })
    }

    /// Isolated STT: render the input with the designated default
    /// synthesizer so every vendor under test hears the same stimulus,
    /// then transcribe with the vendor under test.
    async fn process_isolated_stt(
        &self,
        run: &Run,
        item: &RunItem,
    ) -> Result<ItemCompletion, ItemError> {
        let vendor = single_vendor(&item.vendor)?;
        let recognizer =
            self.registry
                .recognizer(vendor)
                .ok_or_else(|| ItemError::MissingCapability {
                    vendor: vendor.to_string(),
                    capability: "stt",
                })?;

        let stimulus_vendor = self.policy.default_synthesizer.clone();
        let synthesizer = self.registry.synthesizer(&stimulus_vendor).ok_or_else(|| {
            ItemError::MissingCapability {
                vendor: stimulus_vendor.clone(),
                capability: "tts",
            }
        })?;

        let syn_cfg = synthesis_config_for(&run.config, &stimulus_vendor);
        let synthesis = self
            .synthesize_with_retry(
                &stimulus_vendor,
                synthesizer.as_ref(),
                &item.input_text,
                &syn_cfg,
            )
            .await?;

        let audio_file = audio_filename(item.id, &synthesis.content_type);
        self.artifacts
            .put(ArtifactKind::Audio, &audio_file, &synthesis.audio)
            .await?;

        let duration = self.probe.probe(
            &synthesis.audio,
            &synthesis.content_type,
            synthesis.vendor_duration_secs,
        );

        let tr_cfg = transcription_config_for(&run.config, vendor);
        let transcription = self
            .transcribe_with_retry(
                vendor,
                recognizer.as_ref(),
                &synthesis.audio,
                &synthesis.content_type,
                &tr_cfg,
            )
            .await?;

        let transcript_file = transcript_filename(item.id);
        self.artifacts
            .put(
                ArtifactKind::Transcript,
                &transcript_file,
                transcription.transcript.as_bytes(),
            )
            .await?;

        let wer = word_error_rate(&item.input_text, &transcription.transcript);
        let mut sidecar = ItemSidecar {
            service_type: Some(ServiceKind::Stt),
            stt_vendor: Some(vendor.to_string()),
            stt_model: transcription.model.clone(),
            language: transcription
                .language
                .clone()
                .or_else(|| run.config.language.clone()),
            ..ItemSidecar::default()
        };

        let mut metrics = vec![Metric::new(
            item.id,
            MetricName::SttLatency,
            transcription.latency_secs,
        )];
        push_duration_metrics(
            &mut metrics,
            &mut sidecar,
            item.id,
            duration,
            &[(MetricName::SttRtf, transcription.latency_secs)],
        );
        metrics.push(Metric::new(item.id, MetricName::Wer, wer));
        metrics.push(Metric::new(
            item.id,
            MetricName::Accuracy,
            accuracy_percent(wer),
        ));
        metrics.push(Metric::new(
            item.id,
            MetricName::Confidence,
            normalize_confidence(transcription.confidence),
        ));

        Ok(ItemCompletion {
            item_id: item.id,
            artifacts: vec![
                Artifact::new(
                    item.id,
                    ArtifactKind::Audio,
                    synthesis.content_type.clone(),
                    audio_file.clone(),
                    synthesis.audio.len() as u64,
                ),
                Artifact::new(
                    item.id,
                    ArtifactKind::Transcript,
                    "text/plain",
                    transcript_file,
                    transcription.transcript.len() as u64,
                ),
            ],
            metrics,
            audio_file: Some(audio_file),
            transcript: Some(transcription.transcript),
            sidecar,
        })
    }

    /// Chained: synthesize with the pairing's TTS vendor, transcribe those
    /// exact bytes with the pairing's STT vendor. End-to-end latency is
    /// the sum of the two observed latencies, independent of how long the
    /// item spent suspended between stages.
    async fn process_chained(
        &self,
        run: &Run,
        item: &RunItem,
    ) -> Result<ItemCompletion, ItemError> {
        let (tts_vendor, stt_vendor) = match &item.vendor {
            VendorLabel::Chained { tts, stt } => (tts.clone(), stt.clone()),
            VendorLabel::Single(v) => return Err(ItemError::LabelMismatch(v.clone())),
        };

        let synthesizer = self.registry.synthesizer(&tts_vendor).ok_or_else(|| {
            ItemError::MissingCapability {
                vendor: tts_vendor.clone(),
                capability: "tts",
            }
        })?;
        let recognizer = self.registry.recognizer(&stt_vendor).ok_or_else(|| {
            ItemError::MissingCapability {
                vendor: stt_vendor.clone(),
                capability: "stt",
            }
        })?;

        let syn_cfg = synthesis_config_for(&run.config, &tts_vendor);
        let synthesis = self
            .synthesize_with_retry(&tts_vendor, synthesizer.as_ref(), &item.input_text, &syn_cfg)
            .await?;

        let audio_file = audio_filename(item.id, &synthesis.content_type);
        self.artifacts
            .put(ArtifactKind::Audio, &audio_file, &synthesis.audio)
            .await?;

        let duration = self.probe.probe(
            &synthesis.audio,
            &synthesis.content_type,
            synthesis.vendor_duration_secs,
        );

        let tr_cfg = transcription_config_for(&run.config, &stt_vendor);
        let transcription = self
            .transcribe_with_retry(
                &stt_vendor,
                recognizer.as_ref(),
                &synthesis.audio,
                &synthesis.content_type,
                &tr_cfg,
            )
            .await?;

        let transcript_file = transcript_filename(item.id);
        self.artifacts
            .put(
                ArtifactKind::Transcript,
                &transcript_file,
                transcription.transcript.as_bytes(),
            )
            .await?;

        let wer = word_error_rate(&item.input_text, &transcription.transcript);
        let mut sidecar = ItemSidecar {
            service_type: Some(ServiceKind::E2e),
            tts_vendor: Some(tts_vendor),
            stt_vendor: Some(stt_vendor),
            tts_model: synthesis.model.clone(),
            stt_model: transcription.model.clone(),
            voice_id: synthesis.voice_id.clone(),
            language: transcription
                .language
                .clone()
                .or_else(|| run.config.language.clone()),
            ..ItemSidecar::default()
        };

        let mut metrics = vec![
            Metric::new(item.id, MetricName::TtsLatency, synthesis.latency_secs),
            Metric::new(item.id, MetricName::SttLatency, transcription.latency_secs),
            Metric::new(
                item.id,
                MetricName::E2eLatency,
                synthesis.latency_secs + transcription.latency_secs,
            ),
        ];
        if let Some(ttfb) = synthesis.ttfb_secs {
            metrics.push(Metric::new(item.id, MetricName::TtsTtfb, ttfb));
        }
        push_duration_metrics(
            &mut metrics,
            &mut sidecar,
            item.id,
            duration,
            &[
                (MetricName::TtsRtf, synthesis.latency_secs),
                (MetricName::SttRtf, transcription.latency_secs),
            ],
        );
        metrics.push(Metric::new(item.id, MetricName::Wer, wer));
        metrics.push(Metric::new(
            item.id,
            MetricName::Accuracy,
            accuracy_percent(wer),
        ));
        metrics.push(Metric::new(
            item.id,
            MetricName::Confidence,
            normalize_confidence(transcription.confidence),
        ));

        Ok(ItemCompletion {
            item_id: item.id,
            artifacts: vec![
                Artifact::new(
                    item.id,
                    ArtifactKind::Audio,
                    synthesis.content_type.clone(),
                    audio_file.clone(),
                    synthesis.audio.len() as u64,
                ),
                Artifact::new(
                    item.id,
                    ArtifactKind::Transcript,
                    "text/plain",
                    transcript_file,
                    transcription.transcript.len() as u64,
                ),
            ],
            metrics,
            audio_file: Some(audio_file),
            transcript: Some(transcription.transcript),
            sidecar,
        })
    }

    async fn synthesize_with_retry(
        &self,
        vendor: &str,
        adapter: &dyn SpeechSynthesizer,
        text: &str,
        config: &SynthesisConfig,
    ) -> Result<Synthesis, ItemError> {
        let mut attempt = 0u32;
        let mut delay = self.policy.retry_backoff;
        loop {
            match tokio::time::timeout(
                self.policy.synthesize_timeout,
                adapter.synthesize(text, config),
            )
            .await
            {
                Err(_) => return Err(ItemError::Timeout),
                Ok(Ok(synthesis)) => return Ok(synthesis),
                Ok(Err(e)) if e.is_retryable() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    tracing::warn!(vendor, error = %e, attempt, "Retrying synthesize");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Ok(Err(e)) => {
                    return Err(ItemError::Vendor {
                        vendor: vendor.to_string(),
                        source: e,
                    });
                }
            }
        }
    }

    async fn transcribe_with_retry(
        &self,
        vendor: &str,
        adapter: &dyn SpeechRecognizer,
        audio: &[u8],
        content_type: &str,
        config: &TranscriptionConfig,
    ) -> Result<Transcription, ItemError> {
        let mut attempt = 0u32;
        let mut delay = self.policy.retry_backoff;
        loop {
            match tokio::time::timeout(
                self.policy.transcribe_timeout,
                adapter.transcribe(audio, content_type, config),
            )
            .await
            {
                Err(_) => return Err(ItemError::Timeout),
                Ok(Ok(transcription)) => return Ok(transcription),
                Ok(Err(e)) if e.is_retryable() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    tracing::warn!(vendor, error = %e, attempt, "Retrying transcribe");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Ok(Err(e)) => {
                    return Err(ItemError::Vendor {
                        vendor: vendor.to_string(),
                        source: e,
                    });
                }
            }
        }
    }
}

fn single_vendor(label: &VendorLabel) -> Result<&str, ItemError> {
    match label {
        VendorLabel::Single(v) => Ok(v),
        VendorLabel::Chained { .. } => Err(ItemError::LabelMismatch(label.to_string())),
    }
}

/// Record `audio_duration` and the requested RTF metrics when the probe
/// produced a usable duration; propagate estimation and anomaly flags into
/// the sidecar. RTF anomalies are flagged but still recorded.
fn push_duration_metrics(
    metrics: &mut Vec<Metric>,
    sidecar: &mut ItemSidecar,
    item_id: RunItemId,
    duration: Option<ProbedDuration>,
    rtf_specs: &[(MetricName, f64)],
) {
    let Some(duration) = duration else {
        return;
    };
    metrics.push(Metric::new(
        item_id,
        MetricName::AudioDuration,
        duration.seconds,
    ));
    sidecar.duration_estimated = duration.estimated;
    for (name, latency) in rtf_specs {
        if let Some(rtf) = real_time_factor(*latency, duration.seconds) {
            metrics.push(Metric::new(item_id, *name, rtf.value));
            sidecar.rtf_anomaly |= rtf.anomalous;
        }
    }
}

fn audio_filename(item_id: RunItemId, content_type: &str) -> String {
    let ext = if content_type.contains("wav") {
        "wav"
    } else if content_type.contains("ogg") {
        "ogg"
    } else if content_type.contains("flac") {
        "flac"
    } else {
        "mp3"
    };
    format!("audio_{}.{}", item_id, ext)
}

fn transcript_filename(item_id: RunItemId) -> String {
    format!("transcript_{}.txt", item_id)
}

fn synthesis_config_for(config: &RunConfig, vendor: &str) -> SynthesisConfig {
    let models = config.models_for(vendor);
    SynthesisConfig {
        model_id: models.tts_model,
        voice_id: models.voice_id.or_else(|| config.voice_id.clone()),
        format: config.format.unwrap_or_default(),
        language: config.language.clone(),
        sample_rate: None,
    }
}

fn transcription_config_for(config: &RunConfig, vendor: &str) -> TranscriptionConfig {
    let models = config.models_for(vendor);
    TranscriptionConfig {
        model_id: models.stt_model,
        language: config.language.clone(),
        ..TranscriptionConfig::default()
    }
}

/// Terminal run status from terminal item statuses: all completed →
/// completed, all failed → failed, anything mixed → partial.
pub fn terminal_status(items: &[RunItem]) -> RunStatus {
    let completed = items
        .iter()
        .filter(|i| i.status == ItemStatus::Completed)
        .count();
    let failed = items.len() - completed;
    if failed == 0 {
        RunStatus::Completed
    } else if completed == 0 {
        RunStatus::Failed
    } else {
        RunStatus::Partial
    }
}
