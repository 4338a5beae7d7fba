use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{info, Level};

use loop_finder::{
    audio::AudioLoader,
    config::Config,
    LoopCandidate, LoopDetector, LoopResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Toml,
}

#[derive(Parser)]
#[command(
    name = "loop-finder",
    version,
    about = "Find a seamless loop in an audio file",
    long_about = "loop-finder analyzes a recording for onsets, tempo and bar structure, then proposes the start and end points of the loop that repeats most cleanly."
)]
struct Cli {
    /// Audio file path (WAV, MP3, FLAC, OGG)
    #[arg(short, long)]
    audio: PathBuf,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the minimum loop length in seconds
    #[arg(long)]
    min_duration: Option<f64>,

    /// Override the maximum loop length in seconds
    #[arg(long)]
    max_duration: Option<f64>,

    /// Override the confidence needed to accept a precise loop
    #[arg(long)]
    threshold: Option<f64>,

    /// Also list the N highest-ranked candidates
    #[arg(long, value_name = "N")]
    candidates: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    #[serde(rename = "loop")]
    result: &'a LoopResult,
    #[serde(skip_serializing_if = "no_candidates")]
    candidates: &'a [LoopCandidate],
}

fn no_candidates(candidates: &&[LoopCandidate]) -> bool {
    candidates.is_empty()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting loop-finder v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => Config::default(),
    };
    if let Some(min) = cli.min_duration {
        config.analysis.min_duration = min;
    }
    if let Some(max) = cli.max_duration {
        config.analysis.max_duration = max;
    }
    if let Some(threshold) = cli.threshold {
        config.analysis.confidence_threshold = threshold;
    }
    config.validate()?;

    let signal = AudioLoader::load(&cli.audio)
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    info!("Loaded {:?}: {:.1}s at {} Hz", cli.audio, signal.duration(), signal.sample_rate());

    let detector = LoopDetector::with_config(config);
    let result = detector.analyze(&signal).await?;

    let mut ranked = Vec::new();
    if let Some(count) = cli.candidates {
        ranked = detector.find_loop_candidates(&signal)?;
        // Stable sort keeps generation order between equal confidences
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        ranked.truncate(count);
    }

    match cli.format {
        OutputFormat::Text => print_text(&result, &ranked),
        OutputFormat::Toml => {
            let report = Report { result: &result, candidates: &ranked };
            let text = toml::to_string_pretty(&report).context("serializing report")?;
            print!("{}", text);
        }
    }

    Ok(())
}

fn print_text(result: &LoopResult, candidates: &[LoopCandidate]) {
    println!("Loop:       {:.3}s - {:.3}s", result.start, result.end);
    println!("Duration:   {:.3}s", result.duration);
    println!("Bars:       {:.2}", result.bars);
    println!("BPM:        {:.0}", result.bpm);
    println!("Confidence: {:.3} ({:?})", result.confidence, result.strategy);

    if !candidates.is_empty() {
        println!("\nTop candidates:");
        for (i, candidate) in candidates.iter().enumerate() {
            println!(
                "  {:>2}. {:.3}s - {:.3}s  bars {:.2}  confidence {:.3}  correlation {:.5}",
                i + 1,
                candidate.start,
                candidate.end,
                candidate.musical_division,
                candidate.confidence,
                candidate.correlation
            );
        }
    }
}
