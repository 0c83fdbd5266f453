//! Cross-modal synchronization
//!
//! Audio transients (RMS envelope peaks) and motion transients (energy
//! peaks) of the same clip are compared to estimate how far the movement
//! trails or leads the music, and how many beats it actually hits.

mod lag;
mod matching;
mod pattern;

pub use lag::{
    estimate_lag, estimate_lag_with, match_rate, synchronize, synchronize_with_config, SyncResult,
    LAG_BIN_MS, MAX_LAG_MS, MAX_SYNC_PEAKS,
};
pub use pattern::{
    compare_patterns, normalize_peaks, pattern_similarity, MultimodalComparison,
    PatternInterpretation, PeakTrack, PATTERN_CLOSE_THRESHOLD,
};
