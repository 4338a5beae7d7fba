/// Tempo reported when there is too little onset data to estimate one
pub const DEFAULT_BPM: f64 = 120.0;

const MIN_BPM: f64 = 60.0;
const MAX_BPM: f64 = 180.0;

/// Intervals outside this open range are double-triggers or gaps, not beats
const MIN_INTERVAL: f64 = 0.05;
const MAX_INTERVAL: f64 = 2.0;

/// Estimate tempo from onset times using the median inter-onset interval.
///
/// The raw tempo is folded into the 60-180 BPM range by halving (while above
/// 180) then doubling (while below 60), and only then rounded to a whole BPM.
pub fn estimate_tempo(onsets: &[f64]) -> f64 {
    if onsets.len() < 2 {
        return DEFAULT_BPM;
    }

    let mut intervals: Vec<f64> = onsets
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|&dt| dt > MIN_INTERVAL && dt < MAX_INTERVAL)
        .collect();

    if intervals.is_empty() {
        tracing::debug!("No usable inter-onset intervals, assuming {} BPM", DEFAULT_BPM);
        return DEFAULT_BPM;
    }

    intervals.sort_by(f64::total_cmp);
    let median = intervals[intervals.len() / 2];

    let mut bpm = 60.0 / median;
    while bpm > MAX_BPM {
        bpm /= 2.0;
    }
    while bpm < MIN_BPM {
        bpm *= 2.0;
    }
    let bpm = bpm.round();

    tracing::debug!(
        "Tempo estimation: {:.0} BPM from {} intervals (median {:.3}s)",
        bpm, intervals.len(), median
    );
    bpm
}
