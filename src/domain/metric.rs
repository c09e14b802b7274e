use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::RunItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricId(Uuid);

impl MetricId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MetricId {
    fn default() -> Self {
        Self::new()
    }
}

/// Closed vocabulary of objective measurements. Every recorded metric
/// names one of these; anything else is a programmer error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    TtsLatency,
    TtsTtfb,
    SttLatency,
    E2eLatency,
    AudioDuration,
    TtsRtf,
    SttRtf,
    Wer,
    Accuracy,
    Confidence,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::TtsLatency => "tts_latency",
            MetricName::TtsTtfb => "tts_ttfb",
            MetricName::SttLatency => "stt_latency",
            MetricName::E2eLatency => "e2e_latency",
            MetricName::AudioDuration => "audio_duration",
            MetricName::TtsRtf => "tts_rtf",
            MetricName::SttRtf => "stt_rtf",
            MetricName::Wer => "wer",
            MetricName::Accuracy => "accuracy",
            MetricName::Confidence => "confidence",
        }
    }

    pub fn unit(&self) -> MetricUnit {
        match self {
            MetricName::TtsLatency
            | MetricName::TtsTtfb
            | MetricName::SttLatency
            | MetricName::E2eLatency
            | MetricName::AudioDuration => MetricUnit::Seconds,
            MetricName::TtsRtf | MetricName::SttRtf => MetricUnit::Factor,
            MetricName::Wer | MetricName::Confidence => MetricUnit::Ratio,
            MetricName::Accuracy => MetricUnit::Percent,
        }
    }
}

impl FromStr for MetricName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tts_latency" => Ok(MetricName::TtsLatency),
            "tts_ttfb" => Ok(MetricName::TtsTtfb),
            "stt_latency" => Ok(MetricName::SttLatency),
            "e2e_latency" => Ok(MetricName::E2eLatency),
            "audio_duration" => Ok(MetricName::AudioDuration),
            "tts_rtf" => Ok(MetricName::TtsRtf),
            "stt_rtf" => Ok(MetricName::SttRtf),
            "wer" => Ok(MetricName::Wer),
            "accuracy" => Ok(MetricName::Accuracy),
            "confidence" => Ok(MetricName::Confidence),
            _ => Err(format!("Unknown metric name: {}", s)),
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricUnit {
    Seconds,
    Ratio,
    Percent,
    Factor,
}

impl MetricUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricUnit::Seconds => "seconds",
            MetricUnit::Ratio => "ratio",
            MetricUnit::Percent => "percent",
            MetricUnit::Factor => "x",
        }
    }
}

impl FromStr for MetricUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seconds" => Ok(MetricUnit::Seconds),
            "ratio" => Ok(MetricUnit::Ratio),
            "percent" => Ok(MetricUnit::Percent),
            "x" => Ok(MetricUnit::Factor),
            _ => Err(format!("Unknown metric unit: {}", s)),
        }
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named numeric measurement attached to a run item. At most one row
/// per (item, name) pair; values are always finite.
#[derive(Debug, Clone)]
pub struct Metric {
    pub id: MetricId,
    pub item_id: RunItemId,
    pub name: MetricName,
    pub value: f64,
    pub unit: MetricUnit,
}

impl Metric {
    pub fn new(item_id: RunItemId, name: MetricName, value: f64) -> Self {
        Self {
            id: MetricId::new(),
            item_id,
            name,
            value,
            unit: name.unit(),
        }
    }
}
