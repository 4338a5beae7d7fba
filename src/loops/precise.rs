//! Exhaustive onset-pair search for a segment that repeats immediately.

use crate::audio::correlation::{fade_score, normalized_cross_correlation};
use crate::audio::types::AudioSignal;
use crate::config::PreciseSearchConfig;

/// Loops shorter than this many beats are never considered
const MIN_BEATS: f64 = 0.5;

/// Bounds for one precise search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreciseSearchParams {
    pub min_duration: f64,
    pub max_duration: f64,
    /// Earliest allowed loop start (seconds)
    pub search_start: f64,
    /// Latest allowed loop start, as a fraction of the track
    pub search_end_fraction: f64,
}

impl PreciseSearchParams {
    pub fn new(min_duration: f64, max_duration: f64, window: &PreciseSearchConfig) -> Self {
        Self {
            min_duration,
            max_duration,
            search_start: window.search_start,
            search_end_fraction: window.search_end_fraction,
        }
    }
}

/// A verified repeating segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreciseLoop {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    /// Correlation with the following segment times the fade score, without
    /// the musical-length bonus used for ranking
    pub score: f64,
}

/// Search all onset pairs for the loop that best repeats right after itself.
///
/// Pairs are ranked by `score * (1 + musical_bonus)`; the first strictly
/// better pair wins. Onsets must be sorted: for a fixed start, loop length
/// grows with `j`, so the inner scan stops at the first over-long pair.
pub fn find_precise_loop(
    signal: &AudioSignal,
    onsets: &[f64],
    bpm: f64,
    params: &PreciseSearchParams,
) -> Option<PreciseLoop> {
    if onsets.len() < 2 {
        return None;
    }

    let duration = signal.duration();
    let beat_duration = 60.0 / bpm;
    let min_len = params.min_duration.max(beat_duration * MIN_BEATS);
    let max_len = params.max_duration;
    let search_end = duration * params.search_end_fraction;

    let mut best: Option<PreciseLoop> = None;
    let mut best_rank = 0.0;
    let mut evaluated = 0usize;

    for (i, &start) in onsets.iter().enumerate() {
        if start < params.search_start {
            continue;
        }
        if start > search_end {
            break;
        }

        for &end in &onsets[i + 1..] {
            let loop_len = end - start;
            if loop_len < min_len {
                continue;
            }
            if loop_len > max_len {
                break;
            }
            if end + loop_len > duration {
                continue;
            }

            let score = score_precise_loop(signal, start, end);
            let rank = score * (1.0 + musical_bonus(loop_len, beat_duration));
            evaluated += 1;

            if rank > best_rank {
                best_rank = rank;
                best = Some(PreciseLoop {
                    start,
                    end,
                    duration: loop_len,
                    score,
                });
            }
        }
    }

    tracing::debug!("Precise search evaluated {} onset pairs", evaluated);
    best
}

/// How cleanly `[start, end)` repeats: correlation with the next segment of
/// equal length, scaled down when the segment fades at its edges.
pub fn score_precise_loop(signal: &AudioSignal, start: f64, end: f64) -> f64 {
    let samples = signal.samples();
    let start_sample = signal.sample_index(start);
    let end_sample = signal.sample_index(end);
    let loop_len = end_sample.saturating_sub(start_sample);

    if loop_len == 0 || end_sample + loop_len > samples.len() {
        return 0.0;
    }

    let first = &samples[start_sample..end_sample];
    let second = &samples[end_sample..end_sample + loop_len];
    normalized_cross_correlation(first, second) * fade_score(first)
}

/// Ranking bonus for loop lengths close to 1, 2 or 4 bars, or 2 or 8 beats
pub fn musical_bonus(loop_len: f64, beat_duration: f64) -> f64 {
    let bar = beat_duration * 4.0;
    let targets = [bar, bar * 2.0, bar * 4.0, beat_duration * 2.0, beat_duration * 8.0];

    let closest = targets
        .iter()
        .map(|&target| (loop_len - target).abs() / target)
        .fold(f64::INFINITY, f64::min);

    if closest < 0.02 {
        0.2
    } else if closest < 0.05 {
        0.1
    } else if closest < 0.10 {
        0.05
    } else {
        0.0
    }
}
