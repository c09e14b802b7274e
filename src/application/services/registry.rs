use std::collections::HashMap;
use std::sync::Arc;

use crate::application::ports::{SpeechRecognizer, SpeechSynthesizer};

/// Closed mapping of {vendor key, capability} → adapter.
///
/// Adapters are registered once at process start and shared; they hold no
/// per-run state. A vendor key absent from both maps is unknown and gets
/// rejected at run creation.
#[derive(Default)]
pub struct VendorRegistry {
    synthesizers: HashMap<String, Arc<dyn SpeechSynthesizer>>,
    recognizers: HashMap<String, Arc<dyn SpeechRecognizer>>,
}

impl VendorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_synthesizer(
        &mut self,
        vendor: impl Into<String>,
        adapter: Arc<dyn SpeechSynthesizer>,
    ) {
        self.synthesizers.insert(vendor.into(), adapter);
    }

    pub fn register_recognizer(
        &mut self,
        vendor: impl Into<String>,
        adapter: Arc<dyn SpeechRecognizer>,
    ) {
        self.recognizers.insert(vendor.into(), adapter);
    }

    pub fn synthesizer(&self, vendor: &str) -> Option<Arc<dyn SpeechSynthesizer>> {
        self.synthesizers.get(vendor).cloned()
    }

    pub fn recognizer(&self, vendor: &str) -> Option<Arc<dyn SpeechRecognizer>> {
        self.recognizers.get(vendor).cloned()
    }

    pub fn supports_tts(&self, vendor: &str) -> bool {
        self.synthesizers.contains_key(vendor)
    }

    pub fn supports_stt(&self, vendor: &str) -> bool {
        self.recognizers.contains_key(vendor)
    }

    pub fn knows(&self, vendor: &str) -> bool {
        self.supports_tts(vendor) || self.supports_stt(vendor)
    }

    pub fn vendors(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .synthesizers
            .keys()
            .chain(self.recognizers.keys())
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}
