//! List every audio output device the default backend can see.
//!
//! Run with: cargo run --example devices --features cpal_backend

use chirp::AudioPlatform;

fn main() {
    tracing_subscriber::fmt().init();

    let platform = match AudioPlatform::new() {
        Ok(platform) => platform,
        Err(err) => {
            eprintln!("No audio platform available: {}", err);
            return;
        }
    };

    let default_name = platform
        .default_output_device()
        .map(|device| device.name())
        .unwrap_or_default();

    println!("Output devices ({} backend):", platform.backend_name());
    for (i, device) in platform.output_devices().iter().enumerate() {
        let marker = if device.name() == default_name { " (default)" } else { "" };
        println!("  [{}] {}{}", i, device.name(), marker);
    }
}
