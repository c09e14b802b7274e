use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart;
use serde::Deserialize;

use crate::application::ports::{
    SpeechRecognizer, SpeechSynthesizer, Synthesis, SynthesisConfig, Transcription,
    TranscriptionConfig, VendorError,
};
use crate::domain::Stopwatch;

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
const DEFAULT_TTS_MODEL: &str = "eleven_flash_v2_5";
const DEFAULT_STT_MODEL: &str = "scribe_v1";
const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// ElevenLabs TTS (streaming convert endpoint) and STT (Scribe).
pub struct ElevenLabsAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ElevenLabsAdapter {
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
                "ElevenLabs API key".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[derive(Deserialize)]
struct ScribeResponse {
    text: String,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    language_probability: Option<f64>,
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsAdapter {
    async fn synthesize(
        &self,
        text: &str,
        config: &SynthesisConfig,
    ) -> Result<Synthesis, VendorError> {
        self.ensure_key()?;

        let voice = config
            .voice_id
            .clone()
            .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string());
        let model = config
            .model_id
            .clone()
            .unwrap_or_else(|| DEFAULT_TTS_MODEL.to_string());
        // ElevenLabs only serves compressed containers; WAV requests fall
        // back to MP3 and the caller sees it in the content type.
        let url = format!("{}/v1/text-to-speech/{}/stream", self.base_url, voice);

        let watch = Stopwatch::start();
        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .query(&[("output_format", "mp3_44100_128")])
            .json(&serde_json::json!({ "text": text, "model_id": model }))
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

        tracing::info!(
            latency_secs = latency,
            ttfb_secs = ttfb,
            bytes = audio.len(),
            chars = text.len(),
            "ElevenLabs synthesis completed"
        );

        Ok(Synthesis {
            audio,
            content_type: "audio/mpeg".to_string(),
            latency_secs: latency,
            ttfb_secs: ttfb,
            vendor_duration_secs: None,
            model: Some(model),
            voice_id: Some(voice),
        })
    }
}

#[async_trait]
impl SpeechRecognizer for ElevenLabsAdapter {
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
        let file_part = multipart::Part::bytes(audio.to_vec())
            .file_name("audio")
            .mime_str(content_type)
            .map_err(|e| VendorError::RequestFailed(format!("mime: {}", e)))?;
        let form = multipart::Form::new()
            .text("model_id", model.clone())
            .part("file", file_part);

        let watch = Stopwatch::start();
        let response = self
            .client
            .post(format!("{}/v1/speech-to-text", self.base_url))
            .header("xi-api-key", &self.api_key)
            .multipart(form)
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

        let parsed: ScribeResponse = serde_json::from_slice(&body)
            .map_err(|e| VendorError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            latency_secs = latency,
            chars = parsed.text.len(),
            "ElevenLabs transcription completed"
        );

        Ok(Transcription {
            transcript: parsed.text.trim().to_string(),
            confidence: parsed.language_probability,
            latency_secs: latency,
            model: Some(model),
            language: parsed.language_code,
        })
    }
}
