mod artifact_store;
mod duration_probe;
mod recognizer;
mod repository;
mod repository_error;
mod synthesizer;
mod vendor_error;

pub use artifact_store::{ArtifactStore, ArtifactStoreError};
pub use duration_probe::{DurationProbe, ProbedDuration};
pub use recognizer::{SpeechRecognizer, Transcription, TranscriptionConfig};
pub use repository::{BenchmarkRepository, ItemCompletion, RunTotals};
pub use repository_error::RepositoryError;
pub use synthesizer::{SpeechSynthesizer, Synthesis, SynthesisConfig};
pub use vendor_error::VendorError;
