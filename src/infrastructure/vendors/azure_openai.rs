use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart;
use serde::Deserialize;

use crate::application::ports::{
    SpeechRecognizer, SpeechSynthesizer, Synthesis, SynthesisConfig, Transcription,
    TranscriptionConfig, VendorError,
};
use crate::domain::Stopwatch;

const DEFAULT_API_VERSION: &str = "2024-06-01";
const DEFAULT_TTS_VOICE: &str = "alloy";

/// Azure OpenAI speech deployments: a TTS deployment for synthesis and a
/// Whisper deployment for transcription. Whisper reports no confidence
/// score; the normalized metric bottoms out at 0 for those items.
pub struct AzureOpenAiAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    tts_deployment: String,
    stt_deployment: String,
}

impl AzureOpenAiAdapter {
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        tts_deployment: impl Into<String>,
        stt_deployment: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            tts_deployment: tts_deployment.into(),
            stt_deployment: stt_deployment.into(),
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    fn ensure_configured(&self) -> Result<(), VendorError> {
        if self.api_key.trim().is_empty() {
            return Err(VendorError::MissingCredentials(
                "Azure OpenAI API key".to_string(),
            ));
        }
        if self.endpoint.is_empty() {
            return Err(VendorError::MissingCredentials(
                "Azure OpenAI endpoint".to_string(),
            ));
        }
        Ok(())
    }

    fn deployment_url(&self, deployment: &str, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/audio/{}?api-version={}",
            self.endpoint, deployment, operation, self.api_version
        )
    }
}

#[derive(Deserialize)]
struct WhisperResponse {
    text: String,
}

#[async_trait]
impl SpeechSynthesizer for AzureOpenAiAdapter {
    async fn synthesize(
        &self,
        text: &str,
        config: &SynthesisConfig,
    ) -> Result<Synthesis, VendorError> {
        self.ensure_configured()?;

        let voice = config
            .voice_id
            .clone()
            .unwrap_or_else(|| DEFAULT_TTS_VOICE.to_string());
        let model = config
            .model_id
            .clone()
            .unwrap_or_else(|| self.tts_deployment.clone());
        let url = self.deployment_url(&self.tts_deployment, "speech");

        let watch = Stopwatch::start();
        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&serde_json::json!({
                "model": model,
                "input": text,
                "voice": voice,
                "response_format": "mp3",
            }))
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
            bytes = audio.len(),
            chars = text.len(),
            "Azure OpenAI synthesis completed"
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
impl SpeechRecognizer for AzureOpenAiAdapter {
    async fn transcribe(
        &self,
        audio: &[u8],
        content_type: &str,
        config: &TranscriptionConfig,
    ) -> Result<Transcription, VendorError> {
        self.ensure_configured()?;

        let file_part = multipart::Part::bytes(audio.to_vec())
            .file_name("audio.wav")
            .mime_str(content_type)
            .map_err(|e| VendorError::RequestFailed(format!("mime: {}", e)))?;
        let mut form = multipart::Form::new().part("file", file_part);
        if let Some(language) = &config.language {
            // Whisper expects a bare ISO 639-1 code, not a full BCP-47 tag.
            let code = language.split('-').next().unwrap_or(language);
            form = form.text("language", code.to_string());
        }

        let url = self.deployment_url(&self.stt_deployment, "transcriptions");

        let watch = Stopwatch::start();
        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
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

        let parsed: WhisperResponse = serde_json::from_slice(&body)
            .map_err(|e| VendorError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            latency_secs = latency,
            chars = parsed.text.len(),
            "Azure OpenAI transcription completed"
        );

        Ok(Transcription {
            transcript: parsed.text.trim().to_string(),
            confidence: None,
            latency_secs: latency,
            model: Some(self.stt_deployment.clone()),
            language: config.language.clone(),
        })
    }
}
