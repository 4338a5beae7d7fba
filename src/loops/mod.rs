//! # Loop Search
//!
//! Turns the audio features into a loop decision. Two independent strategies
//! feed the [`LoopDetector`]:
//!
//! - **Precise search**: onset pairs whose segment correlates with the audio
//!   right after it
//! - **Candidate ranking**: downbeat-, grid- and onset-aligned spans scored by
//!   repetition, boundary onsets and musical length
//!
//! ```rust,no_run
//! use loop_finder::{AudioSignal, LoopOptions, analyze_loop};
//!
//! # fn main() -> loop_finder::Result<()> {
//! let signal = AudioSignal::new(vec![0.0; 44100 * 4], 44100)?;
//! let result = analyze_loop(&signal, &LoopOptions::default())?;
//! println!("Loop {:.2}s-{:.2}s, {} bars", result.start, result.end, result.bars);
//! # Ok(())
//! # }
//! ```

pub mod candidates;
pub mod detector;
pub mod precise;

pub use detector::{LoopDetector, LoopOutcome};
pub use precise::PreciseLoop;

use crate::audio::types::{AudioSignal, LoopCandidate, LoopResult};
use crate::config::LoopOptions;
use crate::error::Result;

/// Find the best loop using default settings apart from `options`
pub fn analyze_loop(signal: &AudioSignal, options: &LoopOptions) -> Result<LoopResult> {
    LoopDetector::with_options(*options).analyze_loop(signal)
}

/// All scored loop candidates in generation order, without the precise search
pub fn find_loop_candidates(
    signal: &AudioSignal,
    options: &LoopOptions,
) -> Result<Vec<LoopCandidate>> {
    LoopDetector::with_options(*options).find_loop_candidates(signal)
}
