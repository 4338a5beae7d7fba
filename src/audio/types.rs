use serde::{Deserialize, Serialize};

use crate::error::{LoopError, Result};

/// Mono audio handed to the loop pipeline
///
/// Construction validates the buffer once; every analysis stage downstream
/// assumes a non-empty buffer and a positive sample rate.
#[derive(Debug, Clone)]
pub struct AudioSignal {
    samples: Vec<f32>,
    sample_rate: u32,
    duration: f64,
}

impl AudioSignal {
    /// Wrap mono samples, rejecting empty buffers and a zero sample rate
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if samples.is_empty() {
            return Err(LoopError::invalid_input("sample buffer is empty"));
        }
        if sample_rate == 0 {
            return Err(LoopError::invalid_input("sample rate must be positive"));
        }

        let duration = samples.len() as f64 / sample_rate as f64;
        Ok(Self {
            samples,
            sample_rate,
            duration,
        })
    }

    /// Downmix interleaved multi-channel audio by averaging each frame
    pub fn from_interleaved(samples: &[f32], channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(LoopError::invalid_input("channel count must be positive"));
        }
        if channels == 1 {
            return Self::new(samples.to_vec(), sample_rate);
        }

        let mono = samples
            .chunks_exact(channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        Self::new(mono, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample index at `time` seconds (floored, not clamped)
    pub fn sample_index(&self, time: f64) -> usize {
        (time * self.sample_rate as f64).floor().max(0.0) as usize
    }

    /// Get time in seconds for a sample index
    pub fn time_for_sample(&self, sample_index: usize) -> f64 {
        sample_index as f64 / self.sample_rate as f64
    }
}

/// Uniform beat timeline derived from a tempo estimate
#[derive(Debug, Clone, PartialEq)]
pub struct BeatGrid {
    /// Tempo the grid was built from
    pub bpm: f64,

    /// Beat times in seconds, starting at 0
    pub beats: Vec<f64>,
}

impl BeatGrid {
    /// Seconds per beat
    pub fn beat_duration(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Seconds per 4/4 bar
    pub fn bar_duration(&self) -> f64 {
        self.beat_duration() * 4.0
    }
}

/// The high-energy body of a track, as a half-open time interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MainSection {
    pub start: f64,
    pub end: f64,
}

impl MainSection {
    /// True when `[start, end)` lies entirely inside the section
    pub fn contains(&self, start: f64, end: f64) -> bool {
        start >= self.start && end <= self.end
    }
}

/// A scored loop proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopCandidate {
    /// Loop start in seconds
    pub start: f64,

    /// Loop end in seconds
    pub end: f64,

    /// Heuristic ranking score; boosts can push it above 1.0
    pub confidence: f64,

    /// Loop length in 4/4 bars (beats / 4), possibly fractional
    pub musical_division: f64,

    /// Raw correlation before normalization, may be negative
    pub correlation: f64,
}

impl LoopCandidate {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Which branch of the decision policy produced a [`LoopResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStrategy {
    /// Exact repetition found by the onset-pair search
    Precise,

    /// Best-ranked grid or onset candidate
    Candidate,

    /// Nothing usable was found; a fixed default segment
    Default,
}

/// Final answer of a loop analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopResult {
    pub start: f64,
    pub end: f64,

    /// Always `end - start`
    pub duration: f64,

    /// Loop length in bars
    pub bars: f64,

    pub confidence: f64,

    /// Estimated tempo, 0 when no tempo could be estimated
    pub bpm: f64,

    pub strategy: LoopStrategy,
}

impl LoopResult {
    pub(crate) fn new(
        start: f64,
        end: f64,
        bars: f64,
        confidence: f64,
        bpm: f64,
        strategy: LoopStrategy,
    ) -> Self {
        Self {
            start,
            end,
            duration: end - start,
            bars,
            confidence,
            bpm,
            strategy,
        }
    }
}
