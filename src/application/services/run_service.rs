use std::io::Cursor;
use std::str::FromStr;
use std::sync::Arc;

use tracing::instrument;

use crate::application::ports::{BenchmarkRepository, RepositoryError};
use crate::application::services::registry::VendorRegistry;
use crate::application::services::run_executor::RunExecutor;
use crate::domain::{Run, RunConfig, RunId, RunItem, RunMode, ServiceKind, VendorLabel};

/// Accepted formats for a pasted batch corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFormat {
    Txt,
    Jsonl,
    Csv,
}

impl FromStr for BatchFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "txt" => Ok(BatchFormat::Txt),
            "jsonl" => Ok(BatchFormat::Jsonl),
            "csv" => Ok(BatchFormat::Csv),
            _ => Err(format!("Invalid batch format: {}", s)),
        }
    }
}

/// A run creation request, after the transport layer has parsed mode and
/// config but before expansion into items.
#[derive(Debug, Clone, Default)]
pub struct NewRun {
    pub mode: Option<RunMode>,
    pub vendors: Vec<String>,
    pub config: RunConfig,
    pub text_inputs: Vec<String>,
    pub script_ids: Vec<String>,
    pub batch_input: Option<String>,
    pub batch_format: Option<BatchFormat>,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("mode must be one of: isolated, chained")]
    InvalidMode,
    #[error("at least one vendor is required")]
    NoVendors,
    #[error("unknown vendor: {0}")]
    UnknownVendor(String),
    #[error("vendor {vendor} does not support {capability}")]
    UnsupportedCapability {
        vendor: String,
        capability: &'static str,
    },
    #[error("isolated runs must set config.service to tts or stt")]
    MissingService,
    #[error("chained runs must set config.chain.tts_vendor and config.chain.stt_vendor")]
    MissingChain,
    #[error("no inputs provided")]
    EmptyInputs,
}

#[derive(Debug, thiserror::Error)]
pub enum RunServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, Copy)]
pub struct CreatedRun {
    pub run_id: RunId,
    pub accepted_items: usize,
}

struct SeedInput {
    text: String,
    script_item_id: Option<String>,
}

/// Validates run requests, expands inputs into run items, persists the
/// pending run, and hands it to the executor. Creation returns as soon as
/// the rows exist; the benchmark itself proceeds asynchronously.
pub struct RunService {
    registry: Arc<VendorRegistry>,
    repository: Arc<dyn BenchmarkRepository>,
    executor: Arc<RunExecutor>,
}

impl RunService {
    pub fn new(
        registry: Arc<VendorRegistry>,
        repository: Arc<dyn BenchmarkRepository>,
        executor: Arc<RunExecutor>,
    ) -> Self {
        Self {
            registry,
            repository,
            executor,
        }
    }

    #[instrument(skip(self, request))]
    pub async fn create_run(&self, request: NewRun) -> Result<CreatedRun, RunServiceError> {
        let mode = request.mode.ok_or(ValidationError::InvalidMode)?;
        self.validate(mode, &request)?;

        let inputs = self.collect_inputs(&request).await?;
        if inputs.is_empty() {
            return Err(ValidationError::EmptyInputs.into());
        }

        // Isolated runs expand to |inputs| x |vendors| items; chained runs
        // to one item per input, labeled with the pairing.
        let labels: Vec<VendorLabel> = match mode {
            RunMode::Isolated => request
                .vendors
                .iter()
                .map(|v| VendorLabel::single(v.clone()))
                .collect(),
            RunMode::Chained => {
                let chain = request
                    .config
                    .chain
                    .as_ref()
                    .ok_or(ValidationError::MissingChain)?;
                vec![VendorLabel::chained(
                    chain.tts_vendor.clone(),
                    chain.stt_vendor.clone(),
                )]
            }
        };
        let run = Run::new(mode, labels.clone(), request.config.clone());
        let mut items = Vec::with_capacity(inputs.len() * labels.len());
        for label in &labels {
            for input in &inputs {
                items.push(RunItem::new(
                    run.id,
                    label.clone(),
                    input.text.clone(),
                    input.script_item_id.clone(),
                ));
            }
        }

        self.repository.create_run(&run).await?;
        self.repository.append_items(&items).await?;

        tracing::info!(
            run_id = %run.id,
            mode = %mode,
            items = items.len(),
            "Run created, dispatching to executor"
        );

        let executor = Arc::clone(&self.executor);
        let run_id = run.id;
        tokio::spawn(async move {
            executor.execute(run_id).await;
        });

        Ok(CreatedRun {
            run_id,
            accepted_items: items.len(),
        })
    }

    fn validate(&self, mode: RunMode, request: &NewRun) -> Result<(), ValidationError> {
        match mode {
            RunMode::Isolated => {
                if request.vendors.is_empty() {
                    return Err(ValidationError::NoVendors);
                }
                let service = request.config.service.ok_or(ValidationError::MissingService)?;
                for vendor in &request.vendors {
                    if !self.registry.knows(vendor) {
                        return Err(ValidationError::UnknownVendor(vendor.clone()));
                    }
                    match service {
                        ServiceKind::Tts if !self.registry.supports_tts(vendor) => {
                            return Err(ValidationError::UnsupportedCapability {
                                vendor: vendor.clone(),
                                capability: "tts",
                            });
                        }
                        ServiceKind::Stt if !self.registry.supports_stt(vendor) => {
                            return Err(ValidationError::UnsupportedCapability {
                                vendor: vendor.clone(),
                                capability: "stt",
                            });
                        }
                        ServiceKind::Tts | ServiceKind::Stt => {}
                        ServiceKind::E2e => return Err(ValidationError::MissingService),
                    }
                }
                Ok(())
            }
            RunMode::Chained => {
                let chain = request
                    .config
                    .chain
                    .as_ref()
                    .ok_or(ValidationError::MissingChain)?;
                if !self.registry.knows(&chain.tts_vendor) {
                    return Err(ValidationError::UnknownVendor(chain.tts_vendor.clone()));
                }
                if !self.registry.knows(&chain.stt_vendor) {
                    return Err(ValidationError::UnknownVendor(chain.stt_vendor.clone()));
                }
                if !self.registry.supports_tts(&chain.tts_vendor) {
                    return Err(ValidationError::UnsupportedCapability {
                        vendor: chain.tts_vendor.clone(),
                        capability: "tts",
                    });
                }
                if !self.registry.supports_stt(&chain.stt_vendor) {
                    return Err(ValidationError::UnsupportedCapability {
                        vendor: chain.stt_vendor.clone(),
                        capability: "stt",
                    });
                }
                Ok(())
            }
        }
    }

    async fn collect_inputs(&self, request: &NewRun) -> Result<Vec<SeedInput>, RunServiceError> {
        let mut inputs: Vec<SeedInput> = Vec::new();

        for text in &request.text_inputs {
            push_text(&mut inputs, text, None);
        }

        if let Some(raw) = &request.batch_input {
            parse_batch(
                &mut inputs,
                raw,
                request.batch_format.unwrap_or(BatchFormat::Txt),
            );
        }

        for script_id in &request.script_ids {
            let items = self.repository.get_script_items(script_id).await?;
            for item in items {
                push_text(&mut inputs, &item.text, Some(item.id));
            }
        }

        Ok(inputs)
    }
}

fn push_text(inputs: &mut Vec<SeedInput>, text: &str, script_item_id: Option<String>) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        inputs.push(SeedInput {
            text: trimmed.to_string(),
            script_item_id,
        });
    }
}

/// Pasted corpora: one prompt per line (txt), one JSON object per line
/// with a text/prompt/sentence key (jsonl), or a headed CSV with one of
/// those columns. Malformed lines are skipped rather than rejected.
fn parse_batch(inputs: &mut Vec<SeedInput>, raw: &str, format: BatchFormat) {
    match format {
        BatchFormat::Txt => {
            for line in raw.lines() {
                push_text(inputs, line, None);
            }
        }
        BatchFormat::Jsonl => {
            for line in raw.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
                    continue;
                };
                if let Some(text) = recognized_text(&value) {
                    push_text(inputs, text, None);
                }
            }
        }
        BatchFormat::Csv => {
            let mut reader = csv::Reader::from_reader(Cursor::new(raw.as_bytes()));
            let headers = match reader.headers() {
                Ok(headers) => headers.clone(),
                Err(_) => return,
            };
            let column = ["text", "prompt", "sentence"]
                .iter()
                .find_map(|key| headers.iter().position(|h| h.eq_ignore_ascii_case(key)));
            let Some(column) = column else {
                return;
            };
            for record in reader.records().flatten() {
                if let Some(text) = record.get(column) {
                    push_text(inputs, text, None);
                }
            }
        }
    }
}

fn recognized_text(value: &serde_json::Value) -> Option<&str> {
    ["text", "prompt", "sentence"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
}

