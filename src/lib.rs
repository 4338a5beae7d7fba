//! # loop-finder
//!
//! Find a seamless loop in a mono audio recording: a start/end pair that can
//! be repeated without an audible seam, with a confidence score, a tempo
//! estimate, and the loop length in bars.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use loop_finder::{audio::AudioLoader, LoopDetector};
//!
//! # fn main() -> loop_finder::Result<()> {
//! let signal = AudioLoader::load("break.wav")?;
//! let result = LoopDetector::new().analyze_loop(&signal)?;
//!
//! println!("{:.3}s - {:.3}s ({} bars at {} BPM)", result.start, result.end, result.bars, result.bpm);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`audio`] - Signal container, decoding, and feature extraction
//! - [`loops`] - Precise search, candidate ranking, and the decision policy
//! - [`config`] - Configuration management
//!
//! The pipeline only reads the samples it is given. Degraded inputs (silence,
//! very short clips) produce default loops rather than errors; the only
//! failure is a malformed signal, rejected when the [`AudioSignal`] is built.

pub mod audio;
pub mod config;
pub mod error;
pub mod loops;

// Re-export commonly used types for convenience
pub use crate::{
    audio::{AudioSignal, LoopCandidate, LoopResult, LoopStrategy},
    config::{Config, LoopOptions},
    error::{LoopError, Result},
    loops::{analyze_loop, find_loop_candidates, LoopDetector, LoopOutcome},
};
