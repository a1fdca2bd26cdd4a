//! tinytune CLI: plays the built-in song or renders it to WAV.
//!
//! Usage:
//!   tt-cli [--seconds N] [--rate HZ] [--voices N] [--buffer N] [--shift N]
//!   tt-cli --wav output.wav [--seconds N] ...
//!
//! Songs loop forever, so playback and rendering both stop after
//! `--seconds` (default 20).

use std::io::Write;
use std::time::{Duration, Instant};
use std::{env, fs};

use tt_master::{analyze, Controller, SynthConfig};

const DEFAULT_SECONDS: u32 = 20;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let config = config_from_args(&args);
    let seconds = flag(&args, "--seconds").map_or(DEFAULT_SECONDS, |v| parse("--seconds", v));
    let wav_path = flag(&args, "--wav").cloned();

    let mut ctrl = Controller::new(config).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    let song = ctrl.song();
    println!("Title:        {}", song.title);
    println!("Patterns:     {}", song.patterns.len());
    println!("Orders:       {}", song.order.len());
    println!("Instruments:  {}", song.instruments.len());
    println!(
        "Tempo:        {} BPM, {} rows/beat, {} ticks/row",
        song.bpm, song.rows_per_beat, song.ticks_per_row
    );
    println!(
        "Synth:        {} Hz, {} voices, buffer {}, shift {}",
        config.sample_rate, config.voice_count, config.buffer_size, config.output_scale_shift
    );
    println!();

    let features = analyze(song);
    print!("{}", features);
    println!();

    match wav_path {
        Some(wav) => render_to_wav(&ctrl, &wav, seconds),
        None => play_audio(&mut ctrl, seconds),
    }
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
}

fn parse<T: std::str::FromStr>(name: &str, value: &str) -> T {
    value.parse().unwrap_or_else(|_| {
        eprintln!("Bad value for {}: {}", name, value);
        std::process::exit(1);
    })
}

fn config_from_args(args: &[String]) -> SynthConfig {
    let mut config = SynthConfig::default();
    if let Some(v) = flag(args, "--rate") {
        config = config.with_sample_rate(parse("--rate", v));
    }
    if let Some(v) = flag(args, "--voices") {
        config = config.with_voice_count(parse("--voices", v));
    }
    if let Some(v) = flag(args, "--buffer") {
        config = config.with_buffer_size(parse("--buffer", v));
    }
    if let Some(v) = flag(args, "--shift") {
        config = config.with_output_scale_shift(parse("--shift", v));
    }
    config
}

fn play_audio(ctrl: &mut Controller, seconds: u32) {
    if let Err(e) = ctrl.play() {
        eprintln!("Cannot play: {}", e);
        std::process::exit(1);
    }
    println!("Playing...");
    println!();

    let deadline = Instant::now() + Duration::from_secs(seconds as u64);
    while ctrl.is_playing() && Instant::now() < deadline {
        if let Some(pos) = ctrl.position() {
            print!(
                "\rOrd: {:02X} | Pat: {:02X} | Off: {:03} | Tick: {:04}",
                pos.order_index, pos.pattern, pos.offset, pos.tick
            );
            let _ = std::io::stdout().flush();
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    ctrl.stop();
    println!("\rDone.                                        ");
}

fn render_to_wav(ctrl: &Controller, path: &str, seconds: u32) {
    println!(
        "Rendering {} s to {} at {} Hz...",
        seconds,
        path,
        ctrl.config().sample_rate
    );

    let wav = ctrl.render_to_wav(seconds).unwrap_or_else(|e| {
        eprintln!("Render failed: {}", e);
        std::process::exit(1);
    });
    println!("Rendered {} bytes", wav.len());

    fs::write(path, &wav).unwrap_or_else(|e| {
        eprintln!("Failed to write {}: {}", path, e);
        std::process::exit(1);
    });

    println!("Done.");
}
