use crate::audio::energy::{rms, FRAME_SIZE};
use crate::audio::types::{AudioSignal, BeatGrid};

/// Beats per 4/4 bar
pub const BEATS_PER_BAR: usize = 4;

/// Half-width of the window used to measure a beat's strength, in samples
const STRENGTH_HALF_WINDOW: usize = FRAME_SIZE;

/// Build a uniform beat grid `0, b, 2b, ...` covering `[0, duration)`
pub fn build_beat_grid(bpm: f64, duration: f64) -> BeatGrid {
    let mut beats = Vec::new();

    if bpm.is_finite() && bpm > 0.0 {
        let beat_duration = 60.0 / bpm;
        let mut index = 0usize;
        loop {
            let time = index as f64 * beat_duration;
            if time >= duration {
                break;
            }
            beats.push(time);
            index += 1;
        }
    }

    BeatGrid { bpm, beats }
}

/// Find bar-start times from the beat grid, assuming 4/4.
///
/// Beats whose local energy is at least that of the following three beats
/// are taken as downbeats; when fewer than two such peaks exist the grid is
/// simply split every fourth beat.
pub fn find_downbeats(signal: &AudioSignal, grid: &BeatGrid) -> Vec<f64> {
    if grid.beats.is_empty() {
        return Vec::new();
    }

    let strengths: Vec<f64> = grid
        .beats
        .iter()
        .map(|&time| beat_strength(signal, time))
        .collect();

    pick_downbeats(&grid.beats, &strengths)
}

/// RMS level in a window centred on the beat, clipped to the signal
fn beat_strength(signal: &AudioSignal, time: f64) -> f64 {
    let samples = signal.samples();
    let centre = signal.sample_index(time);
    let start = centre.saturating_sub(STRENGTH_HALF_WINDOW);
    let end = (centre + STRENGTH_HALF_WINDOW).min(samples.len());

    if start >= end {
        return 0.0;
    }
    rms(&samples[start..end])
}

/// Choose downbeats from per-beat strengths.
///
/// A peak consumes its bar: after accepting beat `i` the scan resumes at
/// `i + 4`, so two downbeats are never closer than one bar.
pub fn pick_downbeats(beats: &[f64], strengths: &[f64]) -> Vec<f64> {
    let naive: Vec<f64> = beats.iter().step_by(BEATS_PER_BAR).copied().collect();

    let lookahead = BEATS_PER_BAR - 1;
    let mut refined = Vec::new();
    let mut i = 0;
    while i + lookahead < strengths.len() {
        let current = strengths[i];
        let is_peak = strengths[i + 1..=i + lookahead].iter().all(|&s| s <= current);

        if is_peak {
            refined.push(beats[i]);
            i += BEATS_PER_BAR;
        } else {
            i += 1;
        }
    }

    if refined.len() >= 2 {
        tracing::debug!("Found {} energy-peak downbeats", refined.len());
        refined
    } else {
        tracing::debug!("Too few energy peaks, using every {}th beat", BEATS_PER_BAR);
        naive
    }
}
