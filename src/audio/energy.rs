//! Frame-level energy measurements shared by the analysis stages.

/// Analysis frame length in samples
pub const FRAME_SIZE: usize = 1024;

/// Distance between consecutive analysis frames in samples
pub const HOP_SIZE: usize = 512;

/// Number of overlapping frames analysed over a buffer of `len` samples.
///
/// Computed as `(len - FRAME_SIZE) / HOP_SIZE`, so the final partial hop is
/// never visited and buffers shorter than one frame yield zero frames.
pub fn frame_count(len: usize) -> usize {
    len.saturating_sub(FRAME_SIZE) / HOP_SIZE
}

/// Mean of squared samples, 0 for an empty slice
pub fn mean_square(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / samples.len() as f64
}

/// Root-mean-square level, 0 for an empty slice
pub fn rms(samples: &[f32]) -> f64 {
    mean_square(samples).sqrt()
}

/// Mean-square energy of every analysis frame
pub fn frame_energies(samples: &[f32]) -> Vec<f64> {
    (0..frame_count(samples.len()))
        .map(|i| {
            let start = i * HOP_SIZE;
            mean_square(&samples[start..start + FRAME_SIZE])
        })
        .collect()
}

/// Centered moving average; the window shrinks at the edges.
///
/// Each output averages indices `i - window/2 ..= i + window/2` that exist,
/// so an even `window` spans `window + 1` values.
pub fn smooth(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(values.len() - 1);
            let span = &values[lo..=hi];
            span.iter().sum::<f64>() / span.len() as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count() {
        assert_eq!(frame_count(0), 0);
        assert_eq!(frame_count(1000), 0);
        assert_eq!(frame_count(1024), 0);
        assert_eq!(frame_count(1536), 1);
        assert_eq!(frame_count(1024 + 512 * 10 + 100), 10);
    }

    #[test]
    fn test_rms_of_constant() {
        assert!((rms(&[0.5; 64]) - 0.5).abs() < 1e-12);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_frame_energies_length() {
        let samples = vec![0.25f32; 1024 + 512 * 4];
        let energies = frame_energies(&samples);
        assert_eq!(energies.len(), 4);
        assert!(energies.iter().all(|&e| (e - 0.0625).abs() < 1e-12));
    }

    #[test]
    fn test_smooth_edges() {
        let values = [0.0, 0.0, 6.0, 0.0, 0.0];
        let smoothed = smooth(&values, 2);
        assert_eq!(smoothed, vec![0.0, 2.0, 2.0, 2.0, 0.0]);
    }
}
