use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;

use crate::application::ports::{
    SpeechRecognizer, SpeechSynthesizer, Synthesis, SynthesisConfig, Transcription,
    TranscriptionConfig, VendorError,
};
use crate::domain::{AudioFormat, Stopwatch};

const DEFAULT_BASE_URL: &str = "https://api.deepgram.com";
const DEFAULT_STT_MODEL: &str = "nova-3";
const DEFAULT_TTS_MODEL: &str = "aura-2";
const DEFAULT_VOICE: &str = "thalia";
const DEFAULT_SAMPLE_RATE: u32 = 24_000;
const WAV_HEADER_LEN: usize = 44;

/// Deepgram Aura speak API (streamed) and Nova listen API.
pub struct DeepgramAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DeepgramAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn ensure_key(&self) -> Result<(), VendorError> {
        if self.api_key.trim().is_empty() {
            Err(VendorError::MissingCredentials(
                "Deepgram API key".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Aura voices are addressed as a combined model id, `aura-2-<voice>-en`.
/// Callers may pass either the bare family or an already combined id.
fn combined_speak_model(model: &str, voice: &str) -> String {
    if model == DEFAULT_TTS_MODEL {
        format!("aura-2-{}-en", voice)
    } else {
        model.to_string()
    }
}

#[derive(Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Deserialize)]
struct ListenResults {
    channels: Vec<ListenChannel>,
}

#[derive(Deserialize)]
struct ListenChannel {
    alternatives: Vec<ListenAlternative>,
}

#[derive(Deserialize)]
struct ListenAlternative {
    transcript: String,
    #[serde(default)]
    confidence: Option<f64>,
}

#[async_trait]
impl SpeechSynthesizer for DeepgramAdapter {
    async fn synthesize(
        &self,
        text: &str,
        config: &SynthesisConfig,
    ) -> Result<Synthesis, VendorError> {
        self.ensure_key()?;

        let voice = config
            .voice_id
            .clone()
            .unwrap_or_else(|| DEFAULT_VOICE.to_string());
        let model = combined_speak_model(
            config.model_id.as_deref().unwrap_or(DEFAULT_TTS_MODEL),
            &voice,
        );
        let sample_rate = config.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);

        let query: Vec<(&str, String)> = match config.format {
            AudioFormat::Wav => vec![
                ("model", model.clone()),
                ("encoding", "linear16".to_string()),
                ("container", "wav".to_string()),
                ("sample_rate", sample_rate.to_string()),
            ],
            AudioFormat::Mp3 => vec![
                ("model", model.clone()),
                ("encoding", "mp3".to_string()),
                ("bit_rate", "48000".to_string()),
            ],
        };

        let watch = Stopwatch::start();
        let response = self
            .client
            .post(format!("{}/v1/speak", self.base_url))
            .header("Authorization", format!("Token {}", self.api_key))
            .query(&query)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| VendorError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(VendorError::HttpStatus { status, message });
        }

        let mut stream = response.bytes_stream();
        let mut audio: Vec<u8> = Vec::new();
        let mut ttfb = None;
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| VendorError::RequestFailed(e.to_string()))?;
            if ttfb.is_none() && !bytes.is_empty() {
                ttfb = Some(watch.elapsed_secs());
            }
            audio.extend_from_slice(&bytes);
        }
        let latency = watch.elapsed_secs();

        if audio.is_empty() {
            return Err(VendorError::EmptyBody);
        }

        // For linear16 WAV the response alone pins down the duration:
        // payload bytes over the mono 16-bit byte rate.
        let (content_type, vendor_duration) = match config.format {
            AudioFormat::Wav => (
                "audio/wav".to_string(),
                wav_linear16_duration(audio.len(), sample_rate),
            ),
            AudioFormat::Mp3 => ("audio/mpeg".to_string(), None),
        };

        tracing::info!(
            latency_secs = latency,
            ttfb_secs = ttfb,
            bytes = audio.len(),
            chars = text.len(),
            "Deepgram synthesis completed"
        );

        Ok(Synthesis {
            audio,
            content_type,
            latency_secs: latency,
            ttfb_secs: ttfb,
            vendor_duration_secs: vendor_duration,
            model: Some(model),
            voice_id: Some(voice),
        })
    }
}

fn wav_linear16_duration(byte_len: usize, sample_rate: u32) -> Option<f64> {
    if byte_len <= WAV_HEADER_LEN || sample_rate == 0 {
        return None;
    }
    let payload = (byte_len - WAV_HEADER_LEN) as f64;
    Some(payload / (sample_rate as f64 * 2.0))
}

#[async_trait]
impl SpeechRecognizer for DeepgramAdapter {
    async fn transcribe(
        &self,
        audio: &[u8],
        content_type: &str,
        config: &TranscriptionConfig,
    ) -> Result<Transcription, VendorError> {
        self.ensure_key()?;

        let model = config
            .model_id
            .clone()
            .unwrap_or_else(|| DEFAULT_STT_MODEL.to_string());
        let language = config
            .language
            .clone()
            .unwrap_or_else(|| "en-US".to_string());
        let query = [
            ("model", model.clone()),
            ("smart_format", config.smart_format.to_string()),
            ("punctuate", config.punctuate.to_string()),
            ("language", language.clone()),
        ];

        let watch = Stopwatch::start();
        let response = self
            .client
            .post(format!("{}/v1/listen", self.base_url))
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", content_type)
            .query(&query)
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| VendorError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(VendorError::HttpStatus { status, message });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| VendorError::RequestFailed(e.to_string()))?;
        let latency = watch.elapsed_secs();

        let parsed: ListenResponse = serde_json::from_slice(&body)
            .map_err(|e| VendorError::InvalidResponse(e.to_string()))?;
        let alternative = parsed
            .results
            .channels
            .into_iter()
            .next()
            .and_then(|c| c.alternatives.into_iter().next())
            .ok_or_else(|| {
                VendorError::InvalidResponse("no transcription alternatives".to_string())
            })?;

        tracing::info!(
            latency_secs = latency,
            chars = alternative.transcript.len(),
            "Deepgram transcription completed"
        );

        Ok(Transcription {
            transcript: alternative.transcript.trim().to_string(),
            confidence: alternative.confidence,
            latency_secs: latency,
            model: Some(model),
            language: Some(language),
        })
    }
}
