use crate::audio::energy::{frame_energies, smooth, HOP_SIZE};
use crate::audio::types::{AudioSignal, MainSection};

/// Moving-average window applied to frame energies
const SMOOTHING_WINDOW: usize = 10;

/// Fraction of the mean smoothed energy a frame needs to count as "main"
const THRESHOLD_RATIO: f64 = 0.7;

/// Padding added on both sides of the detected section (seconds)
const PADDING_SECS: f64 = 0.5;

/// Locate the high-energy body of the track.
///
/// The start stays anchored at frame 0 and the end is the last frame whose
/// smoothed energy reaches the threshold. Quiet intros are therefore not
/// trimmed, only quiet outros.
pub fn find_main_section(signal: &AudioSignal) -> MainSection {
    let duration = signal.duration();
    let energies = frame_energies(signal.samples());

    if energies.is_empty() {
        return MainSection { start: 0.0, end: duration };
    }

    let smoothed = smooth(&energies, SMOOTHING_WINDOW);
    let mean = smoothed.iter().sum::<f64>() / smoothed.len() as f64;
    let threshold = mean * THRESHOLD_RATIO;

    let start_frame = 0usize;
    let mut end_frame = 0usize;
    for (i, &energy) in smoothed.iter().enumerate() {
        if energy >= threshold && i > end_frame {
            end_frame = i;
        }
    }

    let hop = HOP_SIZE as f64;
    let sample_rate = signal.sample_rate() as f64;
    let start = (start_frame as f64 * hop) / sample_rate - PADDING_SECS;
    let end = ((end_frame + 1) as f64 * hop) / sample_rate + PADDING_SECS;

    let section = MainSection {
        start: start.max(0.0),
        end: end.min(duration),
    };
    tracing::debug!(
        "Main section {:.2}s-{:.2}s (threshold {:.5})",
        section.start, section.end, threshold
    );
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SR: u32 = 8192;

    fn tone(amplitudes: &[(f64, f32)]) -> AudioSignal {
        // (seconds, amplitude) blocks laid end to end
        let mut samples = Vec::new();
        for &(seconds, amplitude) in amplitudes {
            let count = (seconds * SR as f64) as usize;
            for _ in 0..count {
                let n = samples.len();
                samples.push(amplitude * (2.0 * PI * 330.0 * n as f32 / SR as f32).sin());
            }
        }
        AudioSignal::new(samples, SR).unwrap()
    }

    #[test]
    fn test_short_signal_is_whole_track() {
        let signal = AudioSignal::new(vec![0.3; 800], SR).unwrap();
        let section = find_main_section(&signal);
        assert_eq!(section.start, 0.0);
        assert_eq!(section.end, signal.duration());
    }

    #[test]
    fn test_quiet_outro_is_trimmed() {
        let signal = tone(&[(2.0, 0.01), (4.0, 0.5), (2.0, 0.01)]);
        let section = find_main_section(&signal);

        assert_eq!(section.start, 0.0);
        assert!(section.end > 6.0 && section.end < 7.0, "end was {}", section.end);
    }

    #[test]
    fn test_steady_signal_spans_track() {
        let signal = tone(&[(4.0, 0.4)]);
        let section = find_main_section(&signal);
        assert_eq!(section.start, 0.0);
        assert_eq!(section.end, signal.duration());
    }

    #[test]
    fn test_end_is_last_loud_frame_not_longest_run() {
        // A long loud block followed by a short loud blip near the end
        let signal = tone(&[(4.0, 0.5), (2.5, 0.0), (0.5, 0.5), (3.0, 0.0)]);
        let section = find_main_section(&signal);
        assert!(section.end > 7.0 && section.end < 8.0, "end was {}", section.end);
    }
}
