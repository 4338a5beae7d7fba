//! Similarity measures between audio segments.
//!
//! All functions work over the overlapping length of their inputs and return
//! 0 instead of failing on empty or degenerate (zero-variance) data.

use crate::audio::energy::{mean_square, FRAME_SIZE};

/// Numerical guard for energy ratios
const EPSILON: f64 = 1e-9;

/// Empirical scale that brings raw correlation into a usable 0-1 range
const RAW_CORRELATION_SCALE: f64 = 100.0;

/// Edge windows cover this fraction of the segment...
const FADE_FRACTION: f64 = 0.05;
/// ...capped at this many samples
const MAX_FADE_LEN: usize = 1024;
/// Lowest score a fading segment can receive
const MIN_FADE_SCORE: f64 = 0.5;

/// Mean of elementwise products, without centering or normalization
pub fn cross_correlation(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| x as f64 * y as f64)
        .sum();
    sum / len as f64
}

/// Map a raw cross-correlation onto `[0, 1]` as `min(1, |value| * 100)`
pub fn normalize_correlation(value: f64) -> f64 {
    (value.abs() * RAW_CORRELATION_SCALE).min(1.0)
}

/// Pearson correlation coefficient in `[-1, 1]`; 0 if either side is flat
pub fn normalized_cross_correlation(x: &[f32], y: &[f32]) -> f64 {
    let len = x.len().min(y.len());
    if len == 0 {
        return 0.0;
    }
    let (x, y) = (&x[..len], &y[..len]);

    let mean_x = x.iter().map(|&v| v as f64).sum::<f64>() / len as f64;
    let mean_y = y.iter().map(|&v| v as f64).sum::<f64>() / len as f64;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&a, &b) in x.iter().zip(y.iter()) {
        let dx = a as f64 - mean_x;
        let dy = b as f64 - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    covariance / (var_x * var_y).sqrt()
}

/// Score how even a segment's energy is, for when nothing follows it to
/// compare against.
///
/// Uses non-overlapping frames and returns `max(0, 1 - var / mean²)`;
/// segments shorter than two frames score 0.
pub fn segment_consistency(segment: &[f32]) -> f64 {
    let energies: Vec<f64> = segment.chunks_exact(FRAME_SIZE).map(mean_square).collect();
    if energies.len() < 2 {
        return 0.0;
    }

    let count = energies.len() as f64;
    let mean = energies.iter().sum::<f64>() / count;
    let variance = energies.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / count;

    (1.0 - variance / (mean * mean + EPSILON)).max(0.0)
}

/// Penalise segments whose edges are quieter than their middle.
///
/// Compares mean-square energy of the first and last edge windows with a
/// window of the same size in the middle. Result lies in `[0.5, 1]`.
pub fn fade_score(segment: &[f32]) -> f64 {
    let len = segment.len();
    if len < 2 {
        return 1.0;
    }
    let fade_len = MAX_FADE_LEN.min((len as f64 * FADE_FRACTION).floor() as usize);
    if fade_len == 0 {
        return 1.0;
    }

    let start_energy = mean_square(&segment[..fade_len]);
    let end_energy = mean_square(&segment[len - fade_len..]);

    let mid_start = (len as f64 / 2.0 - fade_len as f64 / 2.0).floor() as usize;
    let mid_energy = mean_square(&segment[mid_start..mid_start + fade_len]);

    let start_ratio = start_energy / (mid_energy + EPSILON);
    let end_ratio = end_energy / (mid_energy + EPSILON);

    start_ratio.min(end_ratio).min(1.0).max(MIN_FADE_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(len: usize, period: f32, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|n| amplitude * (2.0 * PI * n as f32 / period).sin())
            .collect()
    }

    #[test]
    fn test_cross_correlation_mean_product() {
        assert_eq!(cross_correlation(&[1.0, 2.0], &[3.0, 4.0]), 5.5);
        assert_eq!(cross_correlation(&[], &[1.0]), 0.0);
        // Uses the shorter length
        assert_eq!(cross_correlation(&[2.0, 2.0, 9.0], &[0.5, 0.5]), 1.0);
    }

    #[test]
    fn test_normalize_correlation_clamps() {
        assert!((normalize_correlation(0.004) - 0.4).abs() < 1e-12);
        assert_eq!(normalize_correlation(-0.5), 1.0);
        assert_eq!(normalize_correlation(0.0), 0.0);
    }

    #[test]
    fn test_ncc_identical_and_inverted() {
        let x = sine(4096, 64.0, 0.7);
        let inverted: Vec<f32> = x.iter().map(|v| -v).collect();

        assert!((normalized_cross_correlation(&x, &x) - 1.0).abs() < 1e-9);
        assert!((normalized_cross_correlation(&x, &inverted) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ncc_flat_input_is_zero() {
        let x = sine(512, 32.0, 0.5);
        assert_eq!(normalized_cross_correlation(&x, &[0.25; 512]), 0.0);
        assert_eq!(normalized_cross_correlation(&[], &x), 0.0);
    }

    #[test]
    fn test_ncc_is_scale_invariant() {
        let x = sine(2048, 50.0, 0.2);
        let y = sine(2048, 50.0, 0.9);
        assert!((normalized_cross_correlation(&x, &y) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_consistency_of_steady_tone() {
        let tone = sine(FRAME_SIZE * 8, 64.0, 0.5);
        assert!(segment_consistency(&tone) > 0.99);
    }

    #[test]
    fn test_consistency_of_uneven_segment() {
        let mut segment = sine(FRAME_SIZE * 4, 64.0, 0.8);
        for s in segment.iter_mut().skip(FRAME_SIZE) {
            *s *= 0.01;
        }
        assert!(segment_consistency(&segment) < 0.1);
    }

    #[test]
    fn test_consistency_needs_two_frames() {
        assert_eq!(segment_consistency(&sine(FRAME_SIZE + 500, 64.0, 0.5)), 0.0);
    }

    #[test]
    fn test_fade_score_flat_segment() {
        assert!((fade_score(&[0.5; 40_000]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fade_score_floors_fade_in() {
        let fade_in: Vec<f32> = (0..40_000).map(|n| n as f32 / 40_000.0).collect();
        assert_eq!(fade_score(&fade_in), MIN_FADE_SCORE);
    }

    #[test]
    fn test_fade_score_tiny_segments() {
        assert_eq!(fade_score(&[0.1]), 1.0);
        assert_eq!(fade_score(&[0.1; 10]), 1.0);
    }
}
