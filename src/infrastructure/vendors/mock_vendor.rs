use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::application::ports::{
    SpeechRecognizer, SpeechSynthesizer, Synthesis, SynthesisConfig, Transcription,
    TranscriptionConfig, VendorError,
};
use crate::domain::Stopwatch;

const SAMPLE_RATE: u32 = 16_000;
const SECONDS_PER_CHAR: f64 = 0.05;
const MIN_CLIP_SECS: f64 = 0.5;

/// Offline synthesizer for scaffold mode and tests: emits a real mono
/// 16-bit WAV tone sized proportionally to the input text, after a fixed
/// simulated network delay. TTFB is read when the delay elapses, latency
/// when the clip is fully "received", so both are genuine stopwatch
/// readings.
pub struct MockSynthesizer {
    delay: Duration,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::with_delay(Duration::from_millis(40))
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        config: &SynthesisConfig,
    ) -> Result<Synthesis, VendorError> {
        let watch = Stopwatch::start();
        tokio::time::sleep(self.delay).await;
        let ttfb = watch.elapsed_secs();

        let seconds = (text.chars().count() as f64 * SECONDS_PER_CHAR).max(MIN_CLIP_SECS);
        let audio = render_tone(seconds)?;
        let latency = watch.elapsed_secs();

        Ok(Synthesis {
            audio,
            content_type: "audio/wav".to_string(),
            latency_secs: latency,
            ttfb_secs: Some(ttfb),
            vendor_duration_secs: None,
            model: Some("mock-tts-1".to_string()),
            voice_id: Some(
                config
                    .voice_id
                    .clone()
                    .unwrap_or_else(|| "mock-voice".to_string()),
            ),
        })
    }
}

fn render_tone(seconds: f64) -> Result<Vec<u8>, VendorError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| VendorError::InvalidResponse(e.to_string()))?;
        let total = (seconds * SAMPLE_RATE as f64) as usize;
        for n in 0..total {
            let t = n as f64 / SAMPLE_RATE as f64;
            let sample = (0.2 * (2.0 * std::f64::consts::PI * 220.0 * t).sin()
                * i16::MAX as f64) as i16;
            writer
                .write_sample(sample)
                .map_err(|e| VendorError::InvalidResponse(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| VendorError::InvalidResponse(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}

/// Offline recognizer counterpart. A single-transcript instance always
/// returns that transcript (handy for WER assertions); otherwise one of
/// the canned phrases is picked deterministically from the payload size.
pub struct MockRecognizer {
    delay: Duration,
    transcripts: Vec<String>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(40),
            transcripts: vec![
                "Welcome to our banking services. How can I help you today?".to_string(),
                "The quick brown fox jumps over the lazy dog.".to_string(),
                "Hello world, this is a test of the speech recognition system.".to_string(),
            ],
        }
    }

    pub fn with_transcript(transcript: impl Into<String>) -> Self {
        Self {
            delay: Duration::from_millis(40),
            transcripts: vec![transcript.into()],
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechRecognizer for MockRecognizer {
    async fn transcribe(
        &self,
        audio: &[u8],
        _content_type: &str,
        config: &TranscriptionConfig,
    ) -> Result<Transcription, VendorError> {
        let watch = Stopwatch::start();
        tokio::time::sleep(self.delay).await;

        let transcript = self.transcripts[audio.len() % self.transcripts.len()].clone();
        let latency = watch.elapsed_secs();

        Ok(Transcription {
            transcript,
            confidence: Some(0.93),
            latency_secs: latency,
            model: Some("mock-stt-1".to_string()),
            language: config
                .language
                .clone()
                .or_else(|| Some("en-US".to_string())),
        })
    }
}
