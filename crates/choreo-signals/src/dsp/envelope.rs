//! Short-time RMS envelope and audio transient timestamps
//!
//! Decoding is out of scope: callers hand over mono PCM (any scale) with
//! its sample rate, or an envelope they computed themselves.

use serde::{Deserialize, Serialize};

use super::peaks::detect_peaks;
use crate::config::SyncConfig;
use crate::{ChoreoError, Result};

/// Audio handed to the synchronizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioInput {
    /// Mono PCM samples
    Pcm { samples: Vec<f32>, sample_rate: u32 },
    /// Precomputed RMS envelope
    Envelope {
        rms: Vec<f32>,
        hop_samples: usize,
        window_samples: usize,
        sample_rate: u32,
    },
}

impl AudioInput {
    pub fn sample_rate(&self) -> u32 {
        match self {
            AudioInput::Pcm { sample_rate, .. } | AudioInput::Envelope { sample_rate, .. } => {
                *sample_rate
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            AudioInput::Pcm { samples, .. } => samples.is_empty(),
            AudioInput::Envelope { rms, .. } => rms.is_empty(),
        }
    }

    /// Track duration in milliseconds
    pub fn duration_ms(&self) -> i64 {
        let sr = self.sample_rate().max(1) as f64;
        let samples = match self {
            AudioInput::Pcm { samples, .. } => samples.len(),
            AudioInput::Envelope {
                rms,
                hop_samples,
                window_samples,
                ..
            } => {
                if rms.is_empty() {
                    0
                } else {
                    (rms.len() - 1) * hop_samples + window_samples
                }
            }
        };
        (samples as f64 / sr * 1000.0) as i64
    }
}

/// RMS values on a fixed hop grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RmsEnvelope {
    pub values: Vec<f32>,
    pub hop_samples: usize,
    pub window_samples: usize,
    pub sample_rate: u32,
}

impl RmsEnvelope {
    /// Start time of envelope frame `idx` (floored to whole ms)
    pub fn index_to_ms(&self, idx: usize) -> i64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (idx as u64 * self.hop_samples as u64 * 1000 / self.sample_rate as u64) as i64
    }
}

/// Short-time RMS.
///
/// Window and hop are truncated to whole samples. Windows start at
/// `0, hop, 2*hop, ...` strictly before `len - window`, so a clip shorter
/// than one window yields an empty envelope.
pub fn rms_envelope(samples: &[f32], sample_rate: u32, window_ms: f32, hop_ms: f32) -> RmsEnvelope {
    let win = (sample_rate as f32 * window_ms / 1000.0) as usize;
    let hop = (sample_rate as f32 * hop_ms / 1000.0) as usize;

    let mut values = Vec::new();
    if win > 0 && hop > 0 && samples.len() >= win {
        let mut start = 0;
        while start < samples.len() - win {
            let chunk = &samples[start..start + win];
            let energy: f32 = chunk.iter().map(|s| s * s).sum::<f32>() / win as f32;
            values.push(energy.sqrt());
            start += hop;
        }
    }

    RmsEnvelope {
        values,
        hop_samples: hop,
        window_samples: win,
        sample_rate,
    }
}

/// Resolve any [`AudioInput`] to an envelope.
pub fn envelope_of(audio: &AudioInput, config: &SyncConfig) -> Result<RmsEnvelope> {
    if audio.is_empty() || audio.sample_rate() == 0 {
        return Err(ChoreoError::EmptyAudio);
    }

    let envelope = match audio {
        AudioInput::Pcm {
            samples,
            sample_rate,
        } => rms_envelope(samples, *sample_rate, config.window_ms, config.hop_ms),
        AudioInput::Envelope {
            rms,
            hop_samples,
            window_samples,
            sample_rate,
        } => RmsEnvelope {
            values: rms.clone(),
            hop_samples: *hop_samples,
            window_samples: *window_samples,
            sample_rate: *sample_rate,
        },
    };

    log::debug!(
        "audio envelope: {} frames (hop {} samples @ {} Hz)",
        envelope.values.len(),
        envelope.hop_samples,
        envelope.sample_rate
    );
    Ok(envelope)
}

/// Audio transient timestamps in milliseconds.
pub fn audio_peaks_ms(audio: &AudioInput, config: &SyncConfig) -> Result<Vec<i64>> {
    let envelope = envelope_of(audio, config)?;
    let peaks = detect_peaks(
        &envelope.values,
        config.audio_min_distance,
        config.max_peaks,
    );
    Ok(peaks.into_iter().map(|i| envelope.index_to_ms(i)).collect())
}
