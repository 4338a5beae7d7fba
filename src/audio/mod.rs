//! # Audio Analysis Module
//!
//! Feature extraction feeding the loop search: energy framing, onsets, tempo,
//! beat grid and downbeats, the main high-energy section, and correlation
//! measures between segments.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use loop_finder::audio::{AudioSignal, onset::detect_onsets, tempo::estimate_tempo};
//!
//! # fn main() -> loop_finder::Result<()> {
//! let signal = AudioSignal::new(vec![0.0; 44100 * 4], 44100)?;
//! let onsets = detect_onsets(&signal);
//! println!("Estimated BPM: {}", estimate_tempo(&onsets));
//! # Ok(())
//! # }
//! ```

pub mod beat_grid;
pub mod correlation;
pub mod energy;
pub mod loader;
pub mod onset;
pub mod sections;
pub mod tempo;
pub mod types;

pub use loader::AudioLoader;
pub use types::{
    AudioSignal, BeatGrid, LoopCandidate, LoopResult,
    LoopStrategy, MainSection
};
