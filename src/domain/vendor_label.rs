use std::fmt;
use std::str::FromStr;

/// Vendor assignment of a run item.
///
/// Isolated items carry a single vendor key; chained items carry the
/// pairing rendered as `"tts→stt"`. Every item carries exactly one label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VendorLabel {
    Single(String),
    Chained { tts: String, stt: String },
}

impl VendorLabel {
    pub fn single(vendor: impl Into<String>) -> Self {
        VendorLabel::Single(vendor.into())
    }

    pub fn chained(tts: impl Into<String>, stt: impl Into<String>) -> Self {
        VendorLabel::Chained {
            tts: tts.into(),
            stt: stt.into(),
        }
    }

    pub fn is_chained(&self) -> bool {
        matches!(self, VendorLabel::Chained { .. })
    }

    /// The vendor responsible for synthesis, when the label names one.
    pub fn tts_vendor(&self) -> Option<&str> {
        match self {
            VendorLabel::Single(_) => None,
            VendorLabel::Chained { tts, .. } => Some(tts),
        }
    }

    pub fn stt_vendor(&self) -> Option<&str> {
        match self {
            VendorLabel::Single(_) => None,
            VendorLabel::Chained { stt, .. } => Some(stt),
        }
    }
}

impl fmt::Display for VendorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VendorLabel::Single(vendor) => write!(f, "{}", vendor),
            VendorLabel::Chained { tts, stt } => write!(f, "{}\u{2192}{}", tts, stt),
        }
    }
}

impl FromStr for VendorLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('\u{2192}') {
            Some((tts, stt)) => {
                if tts.is_empty() || stt.is_empty() || stt.contains('\u{2192}') {
                    Err(format!("Invalid chained vendor label: {}", s))
                } else {
                    Ok(VendorLabel::chained(tts, stt))
                }
            }
            None if s.is_empty() => Err("Empty vendor label".to_string()),
            None => Ok(VendorLabel::Single(s.to_string())),
        }
    }
}
