use crate::audio::energy::{frame_count, rms, FRAME_SIZE, HOP_SIZE};
use crate::audio::types::AudioSignal;

/// A frame must be this many times louder than its predecessor
const ONSET_RATIO: f64 = 1.5;

/// Absolute RMS floor; keeps noise in near-silence from triggering
const ONSET_FLOOR: f64 = 0.01;

/// Detect onset times (seconds) where frame RMS energy jumps sharply.
///
/// Frame 0 has no predecessor and never triggers. Times are frame start
/// positions, so the output is strictly increasing.
pub fn detect_onsets(signal: &AudioSignal) -> Vec<f64> {
    let samples = signal.samples();
    let mut onsets = Vec::new();
    let mut prev_energy: Option<f64> = None;

    for i in 0..frame_count(samples.len()) {
        let start = i * HOP_SIZE;
        let energy = rms(&samples[start..start + FRAME_SIZE]);

        if let Some(prev) = prev_energy {
            if energy > prev * ONSET_RATIO && energy > ONSET_FLOOR {
                onsets.push(signal.time_for_sample(start));
            }
        }
        prev_energy = Some(energy);
    }

    tracing::debug!("Detected {} onsets over {:.2}s", onsets.len(), signal.duration());
    onsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SR: u32 = 8192;

    /// Silence with 440 Hz bursts starting at the given sample positions
    fn bursts(len: usize, starts: &[usize], burst_len: usize, amplitude: f32) -> AudioSignal {
        let mut samples = vec![0.0f32; len];
        for &start in starts {
            for n in start..(start + burst_len).min(len) {
                samples[n] = amplitude * (2.0 * PI * 440.0 * n as f32 / SR as f32).sin();
            }
        }
        AudioSignal::new(samples, SR).unwrap()
    }

    #[test]
    fn test_silence_has_no_onsets() {
        let signal = AudioSignal::new(vec![0.0; SR as usize * 2], SR).unwrap();
        assert!(detect_onsets(&signal).is_empty());
    }

    #[test]
    fn test_short_signal_has_no_frames() {
        let signal = AudioSignal::new(vec![0.9; 1000], SR).unwrap();
        assert!(detect_onsets(&signal).is_empty());
    }

    #[test]
    fn test_bursts_after_silence() {
        // The frame straddling each burst start is the first to rise above silence
        let signal = bursts(SR as usize * 2, &[4096, 12288], 2048, 0.5);
        let onsets = detect_onsets(&signal);
        assert_eq!(onsets, vec![3584.0 / SR as f64, 11776.0 / SR as f64]);
    }

    #[test]
    fn test_first_frame_never_triggers() {
        let signal = bursts(SR as usize, &[0], 4096, 0.8);
        assert!(detect_onsets(&signal).is_empty());
    }

    #[test]
    fn test_quiet_bursts_stay_below_floor() {
        let signal = bursts(SR as usize * 2, &[4096], 2048, 0.005);
        assert!(detect_onsets(&signal).is_empty());
    }

    #[test]
    fn test_onsets_are_deterministic_and_sorted() {
        let signal = bursts(SR as usize * 4, &[4096, 12288, 20480], 1024, 0.6);
        let first = detect_onsets(&signal);
        let second = detect_onsets(&signal);
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0] < w[1]));
    }
}
