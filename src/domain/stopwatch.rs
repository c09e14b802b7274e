use std::time::Instant;

/// Monotonic stopwatch for latency and TTFB measurements.
///
/// Backed by `Instant`, so readings are immune to wall-clock adjustments.
/// Wall-clock timestamps (`started_at`, `finished_at`) live on the entities
/// and are never derived from this type.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch(Instant);

impl Stopwatch {
    pub fn start() -> Self {
        Self(Instant::now())
    }

    /// Seconds since `start()`, with sub-millisecond precision.
    pub fn elapsed_secs(&self) -> f64 {
        self.0.elapsed().as_secs_f64()
    }
}
