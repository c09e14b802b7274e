//! Pure metric computations: WER text normalization, word-level edit
//! distance, accuracy, confidence normalization and real-time factor.
//! Everything here is deterministic so scores reproduce bit-for-bit.

use regex::Regex;
use std::sync::LazyLock;

static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{P}").unwrap());

/// Normalization applied to both reference and hypothesis before scoring:
/// lowercase, strip punctuation (Unicode category P), collapse whitespace,
/// trim. Idempotent.
pub fn normalize_transcript(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = PUNCTUATION.replace_all(&lowered, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Word error rate: word-level edit distance with equal-weight
/// substitution/insertion/deletion, divided by `max(1, reference words)`.
/// May exceed 1.0 when the hypothesis is much longer than the reference.
pub fn word_error_rate(reference: &str, hypothesis: &str) -> f64 {
    let reference = normalize_transcript(reference);
    let hypothesis = normalize_transcript(hypothesis);
    let ref_words: Vec<&str> = reference.split_whitespace().collect();
    let hyp_words: Vec<&str> = hypothesis.split_whitespace().collect();

    if ref_words.is_empty() && hyp_words.is_empty() {
        return 0.0;
    }

    let edits = edit_distance(&ref_words, &hyp_words);
    edits as f64 / ref_words.len().max(1) as f64
}

fn edit_distance(reference: &[&str], hypothesis: &[&str]) -> usize {
    let n = hypothesis.len();
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for (i, ref_word) in reference.iter().enumerate() {
        curr[0] = i + 1;
        for (j, hyp_word) in hypothesis.iter().enumerate() {
            curr[j + 1] = if ref_word == hyp_word {
                prev[j]
            } else {
                1 + prev[j].min(prev[j + 1]).min(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Accuracy as a percentage: `100 * max(0, 1 - wer)`.
pub fn accuracy_percent(wer: f64) -> f64 {
    100.0 * (1.0 - wer).max(0.0)
}

/// Normalize a vendor confidence hint into [0, 1].
///
/// Absent or non-finite scores map to 0.0; scores on a percent scale
/// (1, 100] are divided by 100; everything else is clamped. Scores remain
/// vendor-defined hints and are never comparable across vendors.
pub fn normalize_confidence(raw: Option<f64>) -> f64 {
    match raw {
        None => 0.0,
        Some(x) if !x.is_finite() => 0.0,
        Some(x) if x > 1.0 && x <= 100.0 => x / 100.0,
        Some(x) => x.clamp(0.0, 1.0),
    }
}

/// A real-time factor reading. `anomalous` marks ratios outside
/// [0.01, 100]; the value is still recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rtf {
    pub value: f64,
    pub anomalous: bool,
}

/// Processing time divided by audio duration. Absent when the duration is
/// unusable or the latency is negative.
pub fn real_time_factor(latency_secs: f64, duration_secs: f64) -> Option<Rtf> {
    if duration_secs <= 0.0 || latency_secs < 0.0 {
        return None;
    }
    let value = latency_secs / duration_secs;
    Some(Rtf {
        value,
        anomalous: !(0.01..=100.0).contains(&value),
    })
}
