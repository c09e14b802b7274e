use std::io::Cursor;

use hound::WavReader;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{DurationProbe, ProbedDuration};

/// Anything longer than a day is treated as a parse gone wrong.
const MAX_DURATION_SECS: f64 = 86_400.0;

/// Duration probe with three strategies in fixed priority order:
///
/// 1. the duration the vendor reported with the response, when present;
/// 2. a container-aware parse (hound for WAV, symphonia for mp3/ogg/flac);
/// 3. a size-based estimate under documented bitrate assumptions, marked
///    `estimated` so downstream RTF consumers know it is approximate.
pub struct ContainerDurationProbe;

impl DurationProbe for ContainerDurationProbe {
    fn probe(
        &self,
        audio: &[u8],
        content_type: &str,
        vendor_hint: Option<f64>,
    ) -> Option<ProbedDuration> {
        if let Some(seconds) = vendor_hint.filter(|d| plausible(*d)) {
            return Some(ProbedDuration {
                seconds,
                estimated: false,
            });
        }

        if let Some(seconds) = parse_container(audio, content_type).filter(|d| plausible(*d)) {
            return Some(ProbedDuration {
                seconds,
                estimated: false,
            });
        }

        let seconds = estimate_from_size(audio.len(), content_type);
        if plausible(seconds) {
            tracing::debug!(
                content_type,
                bytes = audio.len(),
                seconds,
                "Audio duration fell back to size-based estimate"
            );
            Some(ProbedDuration {
                seconds,
                estimated: true,
            })
        } else {
            tracing::warn!(content_type, bytes = audio.len(), "Unable to probe audio duration");
            None
        }
    }
}

fn plausible(seconds: f64) -> bool {
    seconds.is_finite() && seconds > 0.0 && seconds <= MAX_DURATION_SECS
}

fn parse_container(audio: &[u8], content_type: &str) -> Option<f64> {
    if content_type.contains("wav") {
        return parse_wav(audio);
    }
    parse_compressed(audio, content_type)
}

fn parse_wav(audio: &[u8]) -> Option<f64> {
    let reader = WavReader::new(Cursor::new(audio)).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return None;
    }
    Some(reader.duration() as f64 / spec.sample_rate as f64)
}

fn parse_compressed(audio: &[u8], content_type: &str) -> Option<f64> {
    let source = Cursor::new(audio.to_vec());
    let stream = MediaSourceStream::new(Box::new(source), Default::default());

    let mut hint = Hint::new();
    if content_type.contains("mpeg") || content_type.contains("mp3") {
        hint.with_extension("mp3");
    } else if content_type.contains("ogg") {
        hint.with_extension("ogg");
    } else if content_type.contains("flac") {
        hint.with_extension("flac");
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;
    let mut format = probed.format;

    let track = format.default_track()?;
    let track_id = track.id;
    let n_frames = track.codec_params.n_frames;
    let sample_rate = track.codec_params.sample_rate;
    let time_base = track.codec_params.time_base;

    if let (Some(frames), Some(rate)) = (n_frames, sample_rate) {
        if rate > 0 {
            return Some(frames as f64 / rate as f64);
        }
    }

    // Headers did not carry a frame count (common for MP3): walk the
    // packets and sum their durations in time-base units.
    let mut frames: u64 = 0;
    while let Ok(packet) = format.next_packet() {
        if packet.track_id() == track_id {
            frames += packet.dur();
        }
    }
    if frames == 0 {
        return None;
    }

    if let Some(tb) = time_base {
        let time = tb.calc_time(frames);
        return Some(time.seconds as f64 + time.frac);
    }
    match sample_rate {
        Some(rate) if rate > 0 => Some(frames as f64 / rate as f64),
        _ => None,
    }
}

/// Last-resort estimate from the blob size alone. Assumptions: compressed
/// speech at ~128 kbit/s; WAV at 44.1 kHz 16-bit stereo; FLAC at roughly
/// one MiB per minute.
fn estimate_from_size(byte_len: usize, content_type: &str) -> f64 {
    let bytes = byte_len as f64;
    if content_type.contains("wav") {
        bytes / (44_100.0 * 2.0 * 2.0)
    } else if content_type.contains("flac") {
        bytes * 60.0 / (1024.0 * 1024.0)
    } else {
        bytes * 8.0 / 128_000.0
    }
}
