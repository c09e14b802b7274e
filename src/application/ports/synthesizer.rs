use async_trait::async_trait;

use super::VendorError;
use crate::domain::AudioFormat;

#[derive(Debug, Clone, Default)]
pub struct SynthesisConfig {
    pub model_id: Option<String>,
    pub voice_id: Option<String>,
    pub format: AudioFormat,
    /// BCP-47 tag, e.g. "en-US".
    pub language: Option<String>,
    /// Bitrate (compressed formats) or sample rate (PCM) hint.
    pub sample_rate: Option<u32>,
}

/// Outcome of a synthesize call.
///
/// `latency_secs` spans from immediately before the request until the last
/// audio byte was received; `ttfb_secs` to the first byte for streaming
/// vendors. Adapters never touch the filesystem, so local I/O is excluded
/// from both readings. `vendor_duration_secs` is filled only when the
/// response alone determines the clip duration (e.g. WAV PCM).
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub audio: Vec<u8>,
    pub content_type: String,
    pub latency_secs: f64,
    pub ttfb_secs: Option<f64>,
    pub vendor_duration_secs: Option<f64>,
    pub model: Option<String>,
    pub voice_id: Option<String>,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        config: &SynthesisConfig,
    ) -> Result<Synthesis, VendorError>;
}
