mod azure_openai;
mod deepgram;
mod elevenlabs;
mod mock_vendor;

pub use azure_openai::AzureOpenAiAdapter;
pub use deepgram::DeepgramAdapter;
pub use elevenlabs::ElevenLabsAdapter;
pub use mock_vendor::{MockRecognizer, MockSynthesizer};
