/// Clip duration recovered from generated audio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbedDuration {
    pub seconds: f64,
    /// True when the value came from the size-based fallback rather than a
    /// vendor figure or a container parse.
    pub estimated: bool,
}

/// Audio duration probe with a fixed strategy order: vendor-reported
/// duration, then container-aware parsing, then a size-based estimate.
/// Implementations return `None` when nothing plausible (0 < d ≤ 24h)
/// can be recovered; callers then omit duration-derived metrics.
pub trait DurationProbe: Send + Sync {
    fn probe(
        &self,
        audio: &[u8],
        content_type: &str,
        vendor_hint: Option<f64>,
    ) -> Option<ProbedDuration>;
}
