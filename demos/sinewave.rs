//! Play two seconds of a 440 Hz sine wave on the default output device.
//!
//! Run with: cargo run --example sinewave --features cpal_backend

use std::f32::consts::TAU;
use std::thread::sleep;
use std::time::Duration;

use chirp::{AudioFormat, AudioPlatform, SampleFormat, StreamState};

fn main() {
    tracing_subscriber::fmt().init();

    let platform = AudioPlatform::new().expect("no audio platform");
    let device = platform.default_output_device().expect("no output device");
    println!("Playing on: {}", device.name());

    let format = AudioFormat::new(44_100, SampleFormat::SIXTEEN_BIT_LE_STEREO).unwrap();
    let stream = device.create_stream(format);
    if stream.state() != StreamState::Ready {
        eprintln!("Could not create a stream buffer");
        return;
    }

    stream
        .play_async(move |elapsed, mut request| {
            let rate = request.format().sample_rate() as f32;
            let mut t = elapsed.as_secs_f32();
            for frame in request.frames_mut() {
                let value = ((TAU * 440.0 * t).sin() * 0.25 * i16::MAX as f32) as i16;
                let bytes = value.to_le_bytes();
                frame[..2].copy_from_slice(&bytes);
                frame[2..].copy_from_slice(&bytes);
                t += 1.0 / rate;
            }
        })
        .expect("playback failed");

    sleep(Duration::from_secs(2));
    stream.stop();
}
