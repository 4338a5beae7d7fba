//! Grid- and onset-based loop candidates and their scoring.

use rayon::prelude::*;

use crate::audio::correlation::{cross_correlation, normalize_correlation, segment_consistency};
use crate::audio::types::{AudioSignal, BeatGrid, LoopCandidate, MainSection};

/// Loop lengths in beats, in order of preference
const MUSICAL_LENGTHS: [usize; 5] = [8, 16, 4, 32, 2];

const MIN_GRID_LOOP_SECS: f64 = 0.1;
const MAX_GRID_LOOP_SECS: f64 = 16.0;
/// Grid loops may cover at most this fraction of the track
const MAX_GRID_LOOP_FRACTION: f64 = 0.8;

const MIN_ONSET_LOOP_SECS: f64 = 0.5;
const MAX_ONSET_LOOP_SECS: f64 = 8.0;
/// Each onset is paired with at most this many following onsets (exclusive)
const ONSET_PAIR_REACH: usize = 10;

const DOWNBEAT_BOOST: f64 = 1.2;
const GRID_BOOST: f64 = 1.0;
const ONSET_PAIR_BOOST: f64 = 0.8;

/// Boundaries closer than this to an onset earn a bonus (seconds)
const ONSET_TOLERANCE: f64 = 0.05;
const ONSET_BONUS_PER_BOUNDARY: f64 = 0.1;

const CORRELATION_WEIGHT: f64 = 0.7;
const ONSET_WEIGHT: f64 = 0.3;

/// Fraction of the loop length that must follow it for a repetition check
const MIN_TRAILING_FRACTION: f64 = 0.8;

/// An unscored loop proposal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateSpan {
    pub start: f64,
    pub end: f64,
    /// Loop length in beats
    pub num_beats: usize,
    /// Strategy-specific confidence multiplier
    pub boost: f64,
}

/// Everything candidate generation needs from the earlier stages
#[derive(Debug, Clone, Copy)]
pub struct CandidateContext<'a> {
    pub signal: &'a AudioSignal,
    pub grid: &'a BeatGrid,
    pub onsets: &'a [f64],
    pub section: MainSection,
    pub downbeats: &'a [f64],
}

/// Enumerate candidate spans in generation order.
///
/// For each preferred length: downbeat-anchored spans when downbeats exist,
/// otherwise a sliding window over the beat grid. Onset-to-onset spans are
/// appended last.
pub fn generate_spans(ctx: &CandidateContext<'_>) -> Vec<CandidateSpan> {
    let duration = ctx.signal.duration();
    let beat_duration = ctx.grid.beat_duration();
    let beats = &ctx.grid.beats;
    let mut spans = Vec::new();

    for &num_beats in &MUSICAL_LENGTHS {
        let loop_secs = num_beats as f64 * beat_duration;
        if loop_secs < MIN_GRID_LOOP_SECS
            || loop_secs > duration * MAX_GRID_LOOP_FRACTION
            || loop_secs > MAX_GRID_LOOP_SECS
        {
            continue;
        }

        if !ctx.downbeats.is_empty() {
            for &start in ctx.downbeats {
                let end = start + loop_secs;
                if !ctx.section.contains(start, end) || end > duration {
                    continue;
                }
                // Prefer an exact bar boundary over accumulated drift
                let end = ctx
                    .downbeats
                    .iter()
                    .copied()
                    .find(|&db| (db - end).abs() < beat_duration / 2.0)
                    .unwrap_or(end);

                spans.push(CandidateSpan { start, end, num_beats, boost: DOWNBEAT_BOOST });
            }
        } else {
            let step = (num_beats / 4).max(1);
            let last_start = beats.len().saturating_sub(num_beats);
            for start_idx in (0..last_start).step_by(step) {
                let start = beats[start_idx];
                let end = start + loop_secs;
                if !ctx.section.contains(start, end) || end > duration {
                    continue;
                }
                let end = beats.get(start_idx + num_beats).copied().unwrap_or(end);

                spans.push(CandidateSpan { start, end, num_beats, boost: GRID_BOOST });
            }
        }
    }

    let onsets = ctx.onsets;
    for i in 0..onsets.len() {
        for j in (i + 1)..(i + ONSET_PAIR_REACH).min(onsets.len()) {
            let (start, end) = (onsets[i], onsets[j]);
            let loop_secs = end - start;
            if !(MIN_ONSET_LOOP_SECS..=MAX_ONSET_LOOP_SECS).contains(&loop_secs) {
                continue;
            }
            if !ctx.section.contains(start, end) {
                continue;
            }
            let num_beats = (loop_secs / beat_duration).round() as usize;

            spans.push(CandidateSpan { start, end, num_beats, boost: ONSET_PAIR_BOOST });
        }
    }

    spans
}

/// Score every span, keeping generation order.
///
/// Spans are independent, so the parallel path only changes where the work
/// runs, never the result.
pub fn score_spans(
    signal: &AudioSignal,
    onsets: &[f64],
    spans: &[CandidateSpan],
    parallel: bool,
) -> Vec<LoopCandidate> {
    if parallel {
        spans.par_iter().map(|span| score_candidate(signal, onsets, span)).collect()
    } else {
        spans.iter().map(|span| score_candidate(signal, onsets, span)).collect()
    }
}

/// Generate and score candidates in one pass
pub fn find_candidates(ctx: &CandidateContext<'_>, parallel: bool) -> Vec<LoopCandidate> {
    let spans = generate_spans(ctx);
    tracing::debug!("Scoring {} loop candidates", spans.len());
    score_spans(ctx.signal, ctx.onsets, &spans, parallel)
}

/// Score a single span.
///
/// Correlates the loop with the audio right after it when enough follows,
/// otherwise falls back to the loop's own energy consistency. Boundary onsets
/// add a bonus, then the strategy boost and musical-length weight apply.
pub fn score_candidate(
    signal: &AudioSignal,
    onsets: &[f64],
    span: &CandidateSpan,
) -> LoopCandidate {
    let samples = signal.samples();
    let musical_division = span.num_beats as f64 / 4.0;

    let start_sample = signal.sample_index(span.start).min(samples.len());
    let end_sample = signal.sample_index(span.end).min(samples.len());
    let loop_len = end_sample.saturating_sub(start_sample);

    if loop_len < 1 {
        return LoopCandidate {
            start: span.start,
            end: span.end,
            confidence: 0.0,
            musical_division,
            correlation: 0.0,
        };
    }

    let segment = &samples[start_sample..end_sample];
    let trailing_end = (end_sample + loop_len).min(samples.len());
    let trailing = &samples[end_sample..trailing_end];

    let correlation = if trailing.len() as f64 >= loop_len as f64 * MIN_TRAILING_FRACTION {
        cross_correlation(segment, trailing)
    } else {
        segment_consistency(segment)
    };

    let near_onset = |t: f64| onsets.iter().any(|&o| (o - t).abs() < ONSET_TOLERANCE);
    let mut onset_bonus = 0.0;
    if near_onset(span.start) {
        onset_bonus += ONSET_BONUS_PER_BOUNDARY;
    }
    if near_onset(span.end) {
        onset_bonus += ONSET_BONUS_PER_BOUNDARY;
    }

    let base = normalize_correlation(correlation) * CORRELATION_WEIGHT + onset_bonus * ONSET_WEIGHT;
    let confidence = base * span.boost * musical_length_weight(span.num_beats);

    LoopCandidate {
        start: span.start,
        end: span.end,
        confidence,
        musical_division,
        correlation,
    }
}

/// Taste weighting by loop length: 2- and 4-bar loops are favoured, one bar
/// slightly, half bars and very long loops are discouraged.
pub fn musical_length_weight(num_beats: usize) -> f64 {
    match num_beats {
        8 | 16 => 1.3,
        4 => 1.1,
        2 => 0.7,
        n if n >= 32 => 0.8,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::beat_grid::build_beat_grid;
    use std::f32::consts::PI;

    const SR: u32 = 8000;

    fn tone(seconds: f64) -> AudioSignal {
        let samples = (0..(seconds * SR as f64) as usize)
            .map(|n| 0.5 * (2.0 * PI * 200.0 * n as f32 / SR as f32).sin())
            .collect();
        AudioSignal::new(samples, SR).unwrap()
    }

    fn whole(signal: &AudioSignal) -> MainSection {
        MainSection { start: 0.0, end: signal.duration() }
    }

    #[test]
    fn test_length_weights() {
        assert_eq!(musical_length_weight(16), 1.3);
        assert_eq!(musical_length_weight(8), 1.3);
        assert_eq!(musical_length_weight(4), 1.1);
        assert_eq!(musical_length_weight(2), 0.7);
        assert_eq!(musical_length_weight(32), 0.8);
        assert_eq!(musical_length_weight(40), 0.8);
        assert_eq!(musical_length_weight(6), 1.0);
    }

    #[test]
    fn test_two_bars_outrank_half_bar() {
        let signal = tone(6.0);
        let long = CandidateSpan { start: 1.0, end: 2.0, num_beats: 8, boost: 1.0 };
        let short = CandidateSpan { num_beats: 2, ..long };

        let long = score_candidate(&signal, &[], &long);
        let short = score_candidate(&signal, &[], &short);

        assert_eq!(long.correlation, short.correlation);
        assert_eq!(long.musical_division, 2.0);
        assert_eq!(short.musical_division, 0.5);
        assert!(long.confidence > short.confidence);
        assert!((long.confidence / short.confidence - 1.3 / 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_onset_bonus_per_boundary() {
        let signal = tone(6.0);
        let span = CandidateSpan { start: 1.0, end: 2.0, num_beats: 6, boost: 1.0 };

        let plain = score_candidate(&signal, &[], &span).confidence;
        let one = score_candidate(&signal, &[1.02], &span).confidence;
        // Several onsets near the same boundary still count once
        let both = score_candidate(&signal, &[0.98, 1.01, 1.99, 2.03], &span).confidence;

        assert!((one - plain - 0.03).abs() < 1e-9);
        assert!((both - plain - 0.06).abs() < 1e-9);
    }

    #[test]
    fn test_trailing_audio_uses_cross_correlation() {
        // 200 Hz at 8 kHz repeats every 40 samples, so a 1s loop lines up
        let signal = tone(4.0);
        let span = CandidateSpan { start: 1.0, end: 2.0, num_beats: 6, boost: 1.0 };
        let candidate = score_candidate(&signal, &[], &span);

        assert!((candidate.correlation - 0.125).abs() < 1e-3);
        assert!((candidate.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_track_end_uses_consistency() {
        let signal = tone(3.0);
        let span = CandidateSpan { start: 2.0, end: 3.0, num_beats: 6, boost: 1.0 };
        let candidate = score_candidate(&signal, &[], &span);
        assert!(candidate.correlation > 0.99);
    }

    #[test]
    fn test_zero_length_span() {
        let signal = tone(1.0);
        let span = CandidateSpan { start: 0.5, end: 0.5, num_beats: 0, boost: 1.0 };
        let candidate = score_candidate(&signal, &[], &span);
        assert_eq!(candidate.confidence, 0.0);
        assert_eq!(candidate.correlation, 0.0);
    }

    #[test]
    fn test_downbeat_spans_snap_to_bars() {
        let signal = tone(10.0);
        let grid = build_beat_grid(120.0, signal.duration());
        // Slightly late third downbeat; 4-beat loops from 0.0 should end on it
        let downbeats = [0.0, 2.0, 4.1, 6.0];
        let ctx = CandidateContext {
            signal: &signal,
            grid: &grid,
            onsets: &[],
            section: whole(&signal),
            downbeats: &downbeats,
        };

        let spans = generate_spans(&ctx);
        assert!(spans.iter().all(|s| s.boost == DOWNBEAT_BOOST));
        // 8 beats first: 4.0s loops from each downbeat that fits
        let expected = CandidateSpan { start: 0.0, end: 4.1, num_beats: 8, boost: DOWNBEAT_BOOST };
        assert_eq!(spans[0], expected);
        assert_eq!(spans[1].start, 2.0);
        assert_eq!(spans[1].end, 6.0);
        assert_eq!(spans[2].start, 4.1);
        assert!((spans[2].end - 8.1).abs() < 1e-12);
        // 16 beats (8s) is exactly 80% of the track and still allowed; 32 beats is not
        assert!(spans.iter().any(|s| s.num_beats == 16));
        assert!(spans.iter().all(|s| s.num_beats != 32));
    }

    #[test]
    fn test_grid_window_without_downbeats() {
        let signal = tone(4.0);
        let grid = build_beat_grid(120.0, signal.duration());
        let ctx = CandidateContext {
            signal: &signal,
            grid: &grid,
            onsets: &[],
            section: whole(&signal),
            downbeats: &[],
        };

        let spans = generate_spans(&ctx);
        // 8 beats (4s) exceeds 80% of the track; 4 beats steps by one, 2 beats by one
        let four: Vec<_> = spans.iter().filter(|s| s.num_beats == 4).collect();
        let two: Vec<_> = spans.iter().filter(|s| s.num_beats == 2).collect();
        assert_eq!(four.len(), 4);
        assert_eq!(two.len(), 6);
        assert_eq!(spans[0].num_beats, 4);
        assert!(spans.iter().all(|s| s.end == s.start + s.num_beats as f64 * 0.5));
    }

    #[test]
    fn test_grid_window_respects_main_section() {
        let signal = tone(4.0);
        let grid = build_beat_grid(120.0, signal.duration());
        let ctx = CandidateContext {
            signal: &signal,
            grid: &grid,
            onsets: &[],
            section: MainSection { start: 0.0, end: 2.2 },
            downbeats: &[],
        };

        let spans = generate_spans(&ctx);
        assert!(spans.iter().all(|s| s.boost == GRID_BOOST));
        assert!(spans.iter().all(|s| s.end <= 2.2), "{:?}", spans);

        // Only the one-bar loop from 0.0 ends inside the section
        let four: Vec<f64> = spans.iter().filter(|s| s.num_beats == 4).map(|s| s.start).collect();
        assert_eq!(four, vec![0.0]);
        let two: Vec<f64> = spans.iter().filter(|s| s.num_beats == 2).map(|s| s.start).collect();
        assert_eq!(two, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_onset_pairs() {
        let signal = tone(12.0);
        let grid = build_beat_grid(120.0, signal.duration());
        let onsets = [1.0, 1.2, 2.0, 10.0];
        let ctx = CandidateContext {
            signal: &signal,
            grid: &grid,
            onsets: &onsets,
            section: MainSection { start: 0.5, end: 9.0 },
            downbeats: &[100.0],
        };

        let pairs: Vec<_> = generate_spans(&ctx)
            .into_iter()
            .filter(|s| s.boost == ONSET_PAIR_BOOST)
            .collect();
        // 1.0-1.2 too short, anything ending at 10.0 leaves the section
        assert_eq!(pairs.len(), 2);
        assert_eq!((pairs[0].start, pairs[0].end, pairs[0].num_beats), (1.0, 2.0, 2));
        assert_eq!((pairs[1].start, pairs[1].end, pairs[1].num_beats), (1.2, 2.0, 2));
    }

    #[test]
    fn test_parallel_and_serial_scoring_agree() {
        let signal = tone(8.0);
        let grid = build_beat_grid(100.0, signal.duration());
        let onsets = [0.6, 1.8, 3.0, 4.2];
        let ctx = CandidateContext {
            signal: &signal,
            grid: &grid,
            onsets: &onsets,
            section: whole(&signal),
            downbeats: &[],
        };
        assert_eq!(find_candidates(&ctx, true), find_candidates(&ctx, false));
    }
}
