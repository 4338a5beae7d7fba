// Renders a drum-machine style pattern, repeats it, and checks that the
// detector recovers the pattern length.

use std::f32::consts::PI;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use tracing::{info, Level};

use loop_finder::{AudioSignal, LoopDetector};

#[derive(Parser)]
#[command(name = "synthetic_loop", about = "Run loop detection on a generated pattern")]
struct Args {
    /// Pattern tempo
    #[arg(long, default_value_t = 120.0)]
    bpm: f64,

    /// Pattern length in bars
    #[arg(long, default_value_t = 1)]
    bars: usize,

    /// How many times the pattern repeats
    #[arg(long, default_value_t = 4)]
    repeats: usize,

    /// Amplitude of the background noise
    #[arg(long, default_value_t = 0.01)]
    noise: f32,

    /// Seed for the noise generator
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Also write the rendered track as a 16-bit WAV
    #[arg(short, long)]
    output: Option<PathBuf>,
}

const SAMPLE_RATE: u32 = 22050;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    let pattern = render_pattern(args.bpm, args.bars, args.noise, args.seed);
    let pattern_len = pattern.len() as f64 / SAMPLE_RATE as f64;
    let samples: Vec<f32> = pattern
        .iter()
        .copied()
        .cycle()
        .take(pattern.len() * args.repeats)
        .collect();

    if let Some(path) = &args.output {
        write_wav(path, &samples).with_context(|| format!("writing {:?}", path))?;
        info!("Wrote {:?}", path);
    }

    let signal = AudioSignal::new(samples, SAMPLE_RATE)?;
    info!(
        "Rendered {} x {:.3}s pattern ({:.2}s total)",
        args.repeats, pattern_len, signal.duration()
    );

    let result = LoopDetector::new().analyze(&signal).await?;

    println!("Pattern:    {:.3}s ({} bars at {:.0} BPM)", pattern_len, args.bars, args.bpm);
    println!("Detected:   {:.3}s - {:.3}s ({:.3}s)", result.start, result.end, result.duration);
    println!("Bars:       {:.2} at {:.0} BPM", result.bars, result.bpm);
    println!("Confidence: {:.3} ({:?})", result.confidence, result.strategy);

    let error = (result.duration - pattern_len).abs();
    let multiple = (result.duration / pattern_len).round();
    if error < 0.05 {
        println!("Loop length matches the pattern");
    } else if multiple >= 1.0 && (result.duration - multiple * pattern_len).abs() < 0.05 {
        println!("Loop length is {} patterns", multiple);
    } else {
        println!("Loop length is off by {:.3}s", error);
    }

    Ok(())
}

/// Kick on every beat, louder on the downbeat, with a hat between beats
fn render_pattern(bpm: f64, bars: usize, noise: f32, seed: u64) -> Vec<f32> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let beat_samples = (60.0 / bpm * SAMPLE_RATE as f64) as usize;
    let beats = bars.max(1) * 4;
    let sr = SAMPLE_RATE as f32;

    (0..beat_samples * beats)
        .map(|n| {
            let beat = n / beat_samples;
            let in_beat = (n % beat_samples) as f32 / sr;
            let accent = if beat % 4 == 0 { 0.9 } else { 0.5 };

            let kick = accent * (-in_beat * 18.0).exp() * (2.0 * PI * 60.0 * in_beat).sin();

            let half = beat_samples / 2;
            let hat = if n % beat_samples >= half {
                let t = ((n % beat_samples) - half) as f32 / sr;
                0.15 * (-t * 60.0).exp() * (2.0 * PI * 6000.0 * t).sin()
            } else {
                0.0
            };

            kick + hat + noise * rng.gen_range(-1.0f32..1.0)
        })
        .collect()
}

fn write_wav(path: &PathBuf, samples: &[f32]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}
