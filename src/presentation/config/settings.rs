use config::{Config, ConfigError, File};
use serde::Deserialize;

use super::Environment;

/// Full settings tree. Every field has a default, so a bare environment
/// boots; `appsettings.{env}.toml` and `VOX__`-prefixed environment
/// variables (e.g. `VOX__EXECUTION__CONCURRENCY=8`) layer on top.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub vendors: VendorSettings,
    #[serde(default)]
    pub execution: ExecutionSettings,
    #[serde(default)]
    pub aggregation: AggregationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(
                File::with_name(&format!("appsettings.{}", environment.as_str())).required(false),
            )
            .add_source(config::Environment::with_prefix("VOX").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8001
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://data/voxbench.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,
    #[serde(default = "default_transcript_dir")]
    pub transcript_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            audio_dir: default_audio_dir(),
            transcript_dir: default_transcript_dir(),
        }
    }
}

fn default_audio_dir() -> String {
    "storage/audio".to_string()
}

fn default_transcript_dir() -> String {
    "storage/transcripts".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorSettings {
    #[serde(default)]
    pub elevenlabs_api_key: String,
    #[serde(default)]
    pub deepgram_api_key: String,
    #[serde(default)]
    pub azure_endpoint: String,
    #[serde(default)]
    pub azure_api_key: String,
    #[serde(default = "default_azure_api_version")]
    pub azure_api_version: String,
    #[serde(default = "default_azure_tts_deployment")]
    pub azure_tts_deployment: String,
    #[serde(default = "default_azure_stt_deployment")]
    pub azure_stt_deployment: String,
    /// Renders the stimulus for isolated STT runs.
    #[serde(default = "default_synthesizer")]
    pub default_synthesizer: String,
    /// Scores the output of isolated TTS runs.
    #[serde(default = "default_evaluator")]
    pub default_evaluator: String,
    /// Registers the offline mock vendor alongside the real ones.
    #[serde(default)]
    pub scaffold_mode: bool,
}

impl Default for VendorSettings {
    fn default() -> Self {
        Self {
            elevenlabs_api_key: String::new(),
            deepgram_api_key: String::new(),
            azure_endpoint: String::new(),
            azure_api_key: String::new(),
            azure_api_version: default_azure_api_version(),
            azure_tts_deployment: default_azure_tts_deployment(),
            azure_stt_deployment: default_azure_stt_deployment(),
            default_synthesizer: default_synthesizer(),
            default_evaluator: default_evaluator(),
            scaffold_mode: false,
        }
    }
}

fn default_azure_api_version() -> String {
    "2024-06-01".to_string()
}

fn default_azure_tts_deployment() -> String {
    "tts-1".to_string()
}

fn default_azure_stt_deployment() -> String {
    "whisper-1".to_string()
}

fn default_synthesizer() -> String {
    "elevenlabs".to_string()
}

fn default_evaluator() -> String {
    "deepgram".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionSettings {
    /// Per-run worker limit.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_synthesize_timeout")]
    pub synthesize_timeout_secs: u64,
    #[serde(default = "default_transcribe_timeout")]
    pub transcribe_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            synthesize_timeout_secs: default_synthesize_timeout(),
            transcribe_timeout_secs: default_transcribe_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

fn default_synthesize_timeout() -> u64 {
    60
}

fn default_transcribe_timeout() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationSettings {
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
        }
    }
}

fn default_lookback_days() -> i64 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
