use async_trait::async_trait;

use super::VendorError;

#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    pub model_id: Option<String>,
    /// BCP-47 tag, e.g. "en-US".
    pub language: Option<String>,
    pub smart_format: bool,
    pub punctuate: bool,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        // smart_format stays off so vendor number/currency formatting does
        // not inflate WER against plain-text references.
        Self {
            model_id: None,
            language: None,
            smart_format: false,
            punctuate: true,
        }
    }
}

/// Outcome of a transcribe call.
///
/// `latency_secs` spans from immediately before the request until the final
/// response was received, upload included. This is asymmetric with
/// synthesis latency on purpose: upload time is part of what an STT caller
/// experiences, and keeping it comparable across vendors matters more than
/// symmetry with TTS.
#[derive(Debug, Clone)]
pub struct Transcription {
    pub transcript: String,
    /// Raw vendor score; vendors that emit none leave this empty.
    pub confidence: Option<f64>,
    pub latency_secs: f64,
    pub model: Option<String>,
    pub language: Option<String>,
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn transcribe(
        &self,
        audio: &[u8],
        content_type: &str,
        config: &TranscriptionConfig,
    ) -> Result<Transcription, VendorError>;
}
