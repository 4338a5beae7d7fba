use tracing::{debug, info, warn};

use crate::audio::{
    beat_grid::{build_beat_grid, find_downbeats},
    onset::detect_onsets,
    sections::find_main_section,
    tempo::estimate_tempo,
    types::{AudioSignal, LoopCandidate, LoopResult, LoopStrategy},
};
use crate::config::{Config, LoopOptions};
use crate::error::Result;
use crate::loops::candidates::{find_candidates, CandidateContext};
use crate::loops::precise::{find_precise_loop, PreciseLoop, PreciseSearchParams};

/// Which stage of the decision policy produced the answer
///
/// The policy stops at the first stage that yields something:
/// 1. too few onsets to say anything ([`LoopOutcome::Silent`])
/// 2. a confident exact repetition ([`LoopOutcome::Precise`])
/// 3. the best-ranked candidate ([`LoopOutcome::Ranked`])
/// 4. a one-bar loop from the start ([`LoopOutcome::BarFallback`])
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    Silent,
    Precise { found: PreciseLoop, bpm: f64 },
    Ranked { best: LoopCandidate, bpm: f64 },
    BarFallback { bpm: f64 },
}

impl LoopOutcome {
    /// Turn the outcome into the public result for a track of `duration`
    pub fn into_result(self, duration: f64, options: &LoopOptions) -> LoopResult {
        match self {
            Self::Silent => {
                let end = duration.min(options.max_duration);
                LoopResult::new(0.0, end, 0.0, 0.0, 0.0, LoopStrategy::Default)
            }
            Self::Precise { found, bpm } => {
                let bars = found.duration / bar_duration(bpm);
                LoopResult::new(
                    found.start,
                    found.end,
                    bars,
                    found.score,
                    bpm,
                    LoopStrategy::Precise,
                )
            }
            Self::Ranked { best, bpm } => LoopResult::new(
                best.start,
                best.end,
                best.musical_division,
                best.confidence,
                bpm,
                LoopStrategy::Candidate,
            ),
            Self::BarFallback { bpm } => {
                let bar = bar_duration(bpm);
                let end = duration.min(bar);
                LoopResult::new(0.0, end, end / bar, 0.0, bpm, LoopStrategy::Default)
            }
        }
    }
}

fn bar_duration(bpm: f64) -> f64 {
    60.0 / bpm * 4.0
}

/// Highest-confidence candidate; on ties the earliest generated wins
pub fn select_best(candidates: &[LoopCandidate]) -> Option<&LoopCandidate> {
    candidates.iter().fold(None, |best: Option<&LoopCandidate>, candidate| match best {
        Some(current) if candidate.confidence <= current.confidence => Some(current),
        _ => Some(candidate),
    })
}

/// Loop detection pipeline with a fixed, validated configuration
///
/// Every call recomputes all intermediate data from the signal, so one
/// detector can be shared across threads and tracks.
#[derive(Debug, Clone, Default)]
pub struct LoopDetector {
    config: Config,
}

impl LoopDetector {
    /// Create a detector with default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a detector with a custom configuration
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Create a detector with default settings apart from the loop options
    pub fn with_options(options: LoopOptions) -> Self {
        Self::with_config(Config {
            analysis: options,
            ..Config::default()
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Find the best loop in `signal`
    pub fn analyze_loop(&self, signal: &AudioSignal) -> Result<LoopResult> {
        let outcome = self.decide(signal)?;
        let result = outcome.into_result(signal.duration(), &self.config.analysis);

        info!(
            "Loop {:.3}s-{:.3}s ({:.2} bars, {:.0} BPM, confidence {:.3}, {:?})",
            result.start, result.end, result.bars, result.bpm, result.confidence, result.strategy
        );
        Ok(result)
    }

    /// Async entry point for callers running inside tokio
    ///
    /// The analysis itself never yields; the whole pipeline runs to
    /// completion on the calling task.
    pub async fn analyze(&self, signal: &AudioSignal) -> Result<LoopResult> {
        self.analyze_loop(signal)
    }

    /// Run the decision policy and report which stage answered
    pub fn decide(&self, signal: &AudioSignal) -> Result<LoopOutcome> {
        self.config.validate()?;
        let options = &self.config.analysis;

        info!(
            "Starting loop analysis for {:.2}s of audio at {} Hz",
            signal.duration(), signal.sample_rate()
        );

        let onsets = detect_onsets(signal);
        if onsets.len() < 2 {
            warn!("Only {} onsets detected, returning default loop", onsets.len());
            return Ok(LoopOutcome::Silent);
        }

        let bpm = estimate_tempo(&onsets);

        let params = PreciseSearchParams::new(
            options.min_duration,
            options.max_duration,
            &self.config.precise,
        );
        match find_precise_loop(signal, &onsets, bpm, &params) {
            Some(found) if found.score >= options.confidence_threshold => {
                debug!("Precise loop accepted with score {:.3}", found.score);
                return Ok(LoopOutcome::Precise { found, bpm });
            }
            Some(found) => {
                debug!(
                    "Precise loop score {:.3} below threshold {:.3}, ranking candidates",
                    found.score, options.confidence_threshold
                );
            }
            None => debug!("No precise loop found, ranking candidates"),
        }

        let candidates = self.score_candidates(signal, &onsets, bpm);
        match select_best(&candidates) {
            Some(best) => Ok(LoopOutcome::Ranked { best: best.clone(), bpm }),
            None => {
                warn!("No loop candidates generated, returning one-bar default");
                Ok(LoopOutcome::BarFallback { bpm })
            }
        }
    }

    /// Every scored candidate in generation order, skipping the precise search
    pub fn find_loop_candidates(&self, signal: &AudioSignal) -> Result<Vec<LoopCandidate>> {
        self.config.validate()?;

        let onsets = detect_onsets(signal);
        let bpm = estimate_tempo(&onsets);
        Ok(self.score_candidates(signal, &onsets, bpm))
    }

    /// Shared by the ranking stage and `find_loop_candidates`
    fn score_candidates(
        &self,
        signal: &AudioSignal,
        onsets: &[f64],
        bpm: f64,
    ) -> Vec<LoopCandidate> {
        let grid = build_beat_grid(bpm, signal.duration());
        let downbeats = find_downbeats(signal, &grid);
        let section = find_main_section(signal);

        debug!(
            "Beat grid: {} beats at {:.0} BPM, {} downbeats",
            grid.beats.len(), bpm, downbeats.len()
        );

        let ctx = CandidateContext {
            signal,
            grid: &grid,
            onsets,
            section,
            downbeats: &downbeats,
        };
        find_candidates(&ctx, self.config.scoring.parallel)
    }
}
