// Shared fixtures for integration tests

#![allow(dead_code)]

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};

/// Write a sine-wave WAV of `seconds` length and return its path
pub fn write_tone(dir: &Path, name: &str, seconds: f32, sample_rate: u32, channels: u16) -> PathBuf {
    let path = dir.join(name);
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    let frames = (seconds * sample_rate as f32) as usize;
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = ((t * 440.0 * std::f32::consts::TAU).sin() * 8000.0) as i16;
        for _ in 0..channels {
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
    path
}

/// In-memory WAV bytes for a short tone
pub fn tone_bytes(seconds: f32) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = write_tone(dir.path(), "tone.wav", seconds, 16000, 1);
    std::fs::read(path).unwrap()
}

/// Silent MPEG-1 Layer III frames (128 kbps, 44.1 kHz, 417 bytes each)
pub fn mp3_frames() -> Vec<u8> {
    let mut frame = vec![0u8; 417];
    frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
    frame.repeat(10)
}

/// A 1x1 PNG as a data URL
pub const PHOTO_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
