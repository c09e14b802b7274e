use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use voxbench::application::ports::{ArtifactStore, BenchmarkRepository};
use voxbench::application::services::{
    AggregationService, ExecutionPolicy, RunExecutor, RunService, VendorRegistry,
};
use voxbench::infrastructure::audio::ContainerDurationProbe;
use voxbench::infrastructure::observability::init_tracing;
use voxbench::infrastructure::persistence::{SqliteBenchmarkRepository, create_pool, init_schema};
use voxbench::infrastructure::storage::LocalArtifactStore;
use voxbench::infrastructure::vendors::{
    AzureOpenAiAdapter, DeepgramAdapter, ElevenLabsAdapter, MockRecognizer, MockSynthesizer,
};
use voxbench::presentation::{AppState, Environment, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let settings = Settings::load(environment).map_err(|e| anyhow::anyhow!(e))?;

    init_tracing(
        environment.as_str(),
        settings.logging.json,
        settings.server.port,
    );

    if let Some(parent) = db_file_parent(&settings.database.url) {
        std::fs::create_dir_all(parent)?;
    }
    let pool = create_pool(&settings.database.url, settings.database.max_connections).await?;
    init_schema(&pool).await?;
    let repository: Arc<dyn BenchmarkRepository> =
        Arc::new(SqliteBenchmarkRepository::new(pool));

    let artifacts: Arc<dyn ArtifactStore> = Arc::new(LocalArtifactStore::new(
        PathBuf::from(&settings.storage.audio_dir),
        PathBuf::from(&settings.storage.transcript_dir),
    )?);

    let mut registry = VendorRegistry::new();
    let elevenlabs = Arc::new(ElevenLabsAdapter::new(
        settings.vendors.elevenlabs_api_key.clone(),
    ));
    registry.register_synthesizer("elevenlabs", elevenlabs.clone());
    registry.register_recognizer("elevenlabs", elevenlabs);
    let deepgram = Arc::new(DeepgramAdapter::new(settings.vendors.deepgram_api_key.clone()));
    registry.register_synthesizer("deepgram", deepgram.clone());
    registry.register_recognizer("deepgram", deepgram);
    let azure = Arc::new(
        AzureOpenAiAdapter::new(
            &settings.vendors.azure_endpoint,
            settings.vendors.azure_api_key.clone(),
            settings.vendors.azure_tts_deployment.clone(),
            settings.vendors.azure_stt_deployment.clone(),
        )
        .with_api_version(settings.vendors.azure_api_version.clone()),
    );
    registry.register_synthesizer("azure_openai", azure.clone());
    registry.register_recognizer("azure_openai", azure);
    if settings.vendors.scaffold_mode {
        registry.register_synthesizer("mock", Arc::new(MockSynthesizer::new()));
        registry.register_recognizer("mock", Arc::new(MockRecognizer::new()));
        tracing::info!("Scaffold mode enabled: offline mock vendor registered");
    }
    let registry = Arc::new(registry);

    let policy = ExecutionPolicy {
        concurrency: settings.execution.concurrency,
        synthesize_timeout: Duration::from_secs(settings.execution.synthesize_timeout_secs),
        transcribe_timeout: Duration::from_secs(settings.execution.transcribe_timeout_secs),
        max_retries: settings.execution.max_retries,
        default_synthesizer: settings.vendors.default_synthesizer.clone(),
        default_evaluator: settings.vendors.default_evaluator.clone(),
        ..ExecutionPolicy::default()
    };

    let executor = Arc::new(RunExecutor::new(
        Arc::clone(&registry),
        repository.clone(),
        artifacts.clone(),
        Arc::new(ContainerDurationProbe),
        policy,
    ));
    let run_service = Arc::new(RunService::new(
        Arc::clone(&registry),
        repository.clone(),
        executor,
    ));
    let aggregation = Arc::new(AggregationService::new(
        repository.clone(),
        settings.aggregation.lookback_days,
    ));

    let state = AppState {
        run_service,
        aggregation,
        repository,
        artifacts,
        registry,
    };

    let router = create_router(state);
    let addr = SocketAddr::new(settings.server.host.parse()?, settings.server.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// `sqlite://data/voxbench.db` needs `data/` to exist before the first
/// connection; in-memory URLs have no parent to create.
fn db_file_parent(url: &str) -> Option<PathBuf> {
    let path = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    if path.contains(":memory:") || path.is_empty() {
        return None;
    }
    PathBuf::from(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
}
