//! DSP module
//!
//! Signal utilities shared by the motion and audio paths:
//! - `moving_average` / `smooth_columns` - centered smoothing
//! - `detect_peaks` - adaptive-threshold local maxima
//! - `rms_envelope` / `audio_peaks_ms` - audio transients

mod envelope;
mod peaks;
mod smoothing;

pub use envelope::{audio_peaks_ms, envelope_of, rms_envelope, AudioInput, RmsEnvelope};
pub use peaks::{detect_peaks, MAX_PEAKS};
pub use smoothing::{moving_average, row_delta, smooth_columns};
