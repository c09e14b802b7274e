use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use voxbench::application::ports::DurationProbe;
use voxbench::infrastructure::audio::ContainerDurationProbe;

fn wav_clip(seconds: f64, sample_rate: u32) -> Vec<u8> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        let total = (seconds * sample_rate as f64) as usize;
        for n in 0..total {
            let t = n as f64 / sample_rate as f64;
            let sample = (0.3 * (2.0 * std::f64::consts::PI * 440.0 * t).sin()
                * i16::MAX as f64) as i16;
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[test]
fn given_vendor_reported_duration_when_probing_then_it_wins() {
    let audio = wav_clip(1.0, 16_000);
    let probed = ContainerDurationProbe
        .probe(&audio, "audio/wav", Some(2.5))
        .unwrap();
    assert_eq!(probed.seconds, 2.5);
    assert!(!probed.estimated);
}

#[test]
fn given_implausible_vendor_duration_when_probing_then_container_parse_wins() {
    let audio = wav_clip(1.0, 16_000);
    for bad_hint in [0.0, -3.0, 90_000.0] {
        let probed = ContainerDurationProbe
            .probe(&audio, "audio/wav", Some(bad_hint))
            .unwrap();
        assert!((probed.seconds - 1.0).abs() < 0.01, "hint {}", bad_hint);
        assert!(!probed.estimated);
    }
}

#[test]
fn given_a_wav_clip_when_probing_then_duration_matches_the_container() {
    let audio = wav_clip(2.0, 24_000);
    let probed = ContainerDurationProbe
        .probe(&audio, "audio/wav", None)
        .unwrap();
    assert!((probed.seconds - 2.0).abs() < 0.01);
    assert!(!probed.estimated);
}

#[test]
fn given_unparseable_bytes_when_probing_then_size_estimate_is_flagged() {
    // 16000 opaque bytes at the assumed 128 kbit/s is exactly one second.
    let garbage = vec![0x55u8; 16_000];
    let probed = ContainerDurationProbe
        .probe(&garbage, "audio/mpeg", None)
        .unwrap();
    assert!((probed.seconds - 1.0).abs() < 0.01);
    assert!(probed.estimated);
}

#[test]
fn given_an_empty_blob_when_probing_then_absent() {
    assert!(ContainerDurationProbe.probe(&[], "audio/mpeg", None).is_none());
}

#[test]
fn given_truncated_wav_header_when_probing_then_falls_back_to_estimate() {
    // Too short for a RIFF header; the WAV size assumption still applies.
    let garbage = vec![0u8; 44_100 * 4];
    let probed = ContainerDurationProbe
        .probe(&garbage, "audio/wav", None)
        .unwrap();
    assert!((probed.seconds - 1.0).abs() < 0.01);
    assert!(probed.estimated);
}
