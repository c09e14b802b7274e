use axum::Router;
use axum::response::IntoResponse;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use voxbench::application::ports::{
    SpeechRecognizer, SpeechSynthesizer, SynthesisConfig, TranscriptionConfig, VendorError,
};
use voxbench::domain::AudioFormat;
use voxbench::infrastructure::vendors::{AzureOpenAiAdapter, DeepgramAdapter, ElevenLabsAdapter};

async fn start_mock_server(
    path: &'static str,
    response_status: u16,
    response_body: &'static [u8],
) -> (String, oneshot::Sender<()>) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let app = Router::new().route(
        path,
        post(move || async move {
            let status = axum::http::StatusCode::from_u16(response_status).unwrap();
            (status, response_body.to_vec()).into_response()
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .ok();
    });

    (base_url, shutdown_tx)
}

fn fake_wav(payload_len: usize) -> Vec<u8> {
    // Just enough of a RIFF header for byte-rate math; the probe itself is
    // exercised elsewhere.
    let mut bytes = vec![0u8; 44 + payload_len];
    bytes[..4].copy_from_slice(b"RIFF");
    bytes[8..12].copy_from_slice(b"WAVE");
    bytes
}

#[tokio::test]
async fn given_a_streamed_speak_response_when_deepgram_synthesizes_then_latency_and_ttfb_are_read()
{
    let body: &'static [u8] = b"mp3-bytes-mp3-bytes-mp3-bytes";
    let (base_url, shutdown_tx) = start_mock_server("/v1/speak", 200, body).await;

    let adapter = DeepgramAdapter::with_base_url("test-key", &base_url);
    let synthesis = adapter
        .synthesize("Hello world", &SynthesisConfig::default())
        .await
        .unwrap();

    assert_eq!(synthesis.audio, body);
    assert_eq!(synthesis.content_type, "audio/mpeg");
    assert!(synthesis.latency_secs > 0.0);
    let ttfb = synthesis.ttfb_secs.unwrap();
    assert!(ttfb > 0.0 && ttfb <= synthesis.latency_secs);
    assert_eq!(synthesis.model.as_deref(), Some("aura-2-thalia-en"));
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_a_wav_speak_response_when_deepgram_synthesizes_then_vendor_duration_is_derived() {
    // 24000 Hz mono 16-bit: 48000 payload bytes is exactly one second.
    let body: &'static [u8] = Box::leak(fake_wav(48_000).into_boxed_slice());
    let (base_url, shutdown_tx) = start_mock_server("/v1/speak", 200, body).await;

    let adapter = DeepgramAdapter::with_base_url("test-key", &base_url);
    let config = SynthesisConfig {
        format: AudioFormat::Wav,
        ..SynthesisConfig::default()
    };
    let synthesis = adapter.synthesize("Hello world", &config).await.unwrap();

    assert_eq!(synthesis.content_type, "audio/wav");
    let duration = synthesis.vendor_duration_secs.unwrap();
    assert!((duration - 1.0).abs() < 1e-9);
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_a_listen_response_when_deepgram_transcribes_then_transcript_and_confidence_flow() {
    let body = br#"{"results":{"channels":[{"alternatives":[{"transcript":"Hello world","confidence":0.97}]}]}}"#;
    let (base_url, shutdown_tx) = start_mock_server("/v1/listen", 200, body).await;

    let adapter = DeepgramAdapter::with_base_url("test-key", &base_url);
    let transcription = adapter
        .transcribe(b"fake audio", "audio/wav", &TranscriptionConfig::default())
        .await
        .unwrap();

    assert_eq!(transcription.transcript, "Hello world");
    assert_eq!(transcription.confidence, Some(0.97));
    assert!(transcription.latency_secs > 0.0);
    assert_eq!(transcription.model.as_deref(), Some("nova-3"));
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_a_server_error_when_deepgram_transcribes_then_the_error_is_retryable() {
    let (base_url, shutdown_tx) =
        start_mock_server("/v1/listen", 503, b"upstream unavailable").await;

    let adapter = DeepgramAdapter::with_base_url("test-key", &base_url);
    let err = adapter
        .transcribe(b"fake audio", "audio/wav", &TranscriptionConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, VendorError::HttpStatus { status: 503, .. }));
    assert!(err.is_retryable());
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_an_auth_failure_when_deepgram_synthesizes_then_the_error_is_not_retryable() {
    let (base_url, shutdown_tx) = start_mock_server("/v1/speak", 401, b"invalid key").await;

    let adapter = DeepgramAdapter::with_base_url("bad-key", &base_url);
    let err = adapter
        .synthesize("Hello", &SynthesisConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, VendorError::HttpStatus { status: 401, .. }));
    assert!(!err.is_retryable());
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_an_empty_speak_body_when_deepgram_synthesizes_then_empty_body_error() {
    let (base_url, shutdown_tx) = start_mock_server("/v1/speak", 200, b"").await;

    let adapter = DeepgramAdapter::with_base_url("test-key", &base_url);
    let err = adapter
        .synthesize("Hello", &SynthesisConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, VendorError::EmptyBody));
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_a_blank_api_key_when_calling_a_vendor_then_missing_credentials() {
    let deepgram = DeepgramAdapter::new("  ");
    let err = deepgram
        .synthesize("Hello", &SynthesisConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VendorError::MissingCredentials(_)));

    let elevenlabs = ElevenLabsAdapter::new("");
    let err = elevenlabs
        .transcribe(b"audio", "audio/wav", &TranscriptionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VendorError::MissingCredentials(_)));
}

#[tokio::test]
async fn given_a_streamed_convert_response_when_elevenlabs_synthesizes_then_audio_is_collected() {
    let body: &'static [u8] = b"ID3fake-mp3-audio";
    let (base_url, shutdown_tx) = start_mock_server(
        "/v1/text-to-speech/{voice_id}/stream",
        200,
        body,
    )
    .await;

    let adapter = ElevenLabsAdapter::with_base_url("test-key", &base_url);
    let synthesis = adapter
        .synthesize("Hello world", &SynthesisConfig::default())
        .await
        .unwrap();

    assert_eq!(synthesis.audio, body);
    assert_eq!(synthesis.content_type, "audio/mpeg");
    assert!(synthesis.ttfb_secs.is_some());
    assert_eq!(synthesis.model.as_deref(), Some("eleven_flash_v2_5"));
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_a_scribe_response_when_elevenlabs_transcribes_then_language_probability_is_confidence()
 {
    let body = br#"{"text": "Hello from Scribe", "language_code": "en", "language_probability": 0.99}"#;
    let (base_url, shutdown_tx) = start_mock_server("/v1/speech-to-text", 200, body).await;

    let adapter = ElevenLabsAdapter::with_base_url("test-key", &base_url);
    let transcription = adapter
        .transcribe(b"fake audio", "audio/mpeg", &TranscriptionConfig::default())
        .await
        .unwrap();

    assert_eq!(transcription.transcript, "Hello from Scribe");
    assert_eq!(transcription.confidence, Some(0.99));
    assert_eq!(transcription.language.as_deref(), Some("en"));
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_a_whisper_response_when_azure_transcribes_then_text_flows_without_confidence() {
    let body = br#"{"text": "Hello from Whisper"}"#;
    let (base_url, shutdown_tx) = start_mock_server(
        "/openai/deployments/whisper-1/audio/transcriptions",
        200,
        body,
    )
    .await;

    let adapter = AzureOpenAiAdapter::new(&base_url, "test-key", "tts-1", "whisper-1");
    let transcription = adapter
        .transcribe(b"fake audio", "audio/wav", &TranscriptionConfig::default())
        .await
        .unwrap();

    assert_eq!(transcription.transcript, "Hello from Whisper");
    assert_eq!(transcription.confidence, None);
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_a_malformed_whisper_response_when_azure_transcribes_then_invalid_response() {
    let body = b"not json";
    let (base_url, shutdown_tx) = start_mock_server(
        "/openai/deployments/whisper-1/audio/transcriptions",
        200,
        body,
    )
    .await;

    let adapter = AzureOpenAiAdapter::new(&base_url, "test-key", "tts-1", "whisper-1");
    let err = adapter
        .transcribe(b"fake audio", "audio/wav", &TranscriptionConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, VendorError::InvalidResponse(_)));
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_a_speech_response_when_azure_synthesizes_then_audio_and_voice_are_reported() {
    let body: &'static [u8] = b"azure-mp3-bytes";
    let (base_url, shutdown_tx) =
        start_mock_server("/openai/deployments/tts-1/audio/speech", 200, body).await;

    let adapter = AzureOpenAiAdapter::new(&base_url, "test-key", "tts-1", "whisper-1");
    let synthesis = adapter
        .synthesize("Hello world", &SynthesisConfig::default())
        .await
        .unwrap();

    assert_eq!(synthesis.audio, body);
    assert_eq!(synthesis.voice_id.as_deref(), Some("alloy"));
    shutdown_tx.send(()).ok();
}
